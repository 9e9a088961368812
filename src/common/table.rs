//! Plain-text table rendering
//!
//! Renders rows of string cells in one of several [`TableType`] styles.
//! Colours are applied with crossterm only when the sink is a terminal.

use crossterm::style::Stylize;
use std::io::{self, Write};

/// Maximum cell width in narrow mode
const MAX_CELL_WIDTH: usize = 40;

/// Output style for exported tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TableType {
    Csv,
    Markdown,
    Preview,
    #[default]
    Basic,
    Vertical,
}

impl TableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Markdown => "Markdown",
            Self::Preview => "Preview",
            Self::Basic => "Basic",
            Self::Vertical => "Vertical",
        }
    }
}

/// Table under construction
#[derive(Debug, Clone, Default)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    style: TableType,
    wide: bool,
    color: bool,
}

impl Table {
    pub fn new(style: TableType) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    /// Disable cell truncation
    pub fn wide(mut self, wide: bool) -> Self {
        self.wide = wide;
        self
    }

    /// Emit ANSI styling for headers
    pub fn color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn set_header(&mut self, header: Vec<String>) {
        self.header = header;
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn append(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    fn cell(&self, text: &str) -> String {
        if self.wide || text.chars().count() <= MAX_CELL_WIDTH {
            return text.to_string();
        }
        let truncated: String = text.chars().take(MAX_CELL_WIDTH - 3).collect();
        format!("{}...", truncated)
    }

    /// Column widths over header and rows; rows may be longer than the header
    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = Vec::new();
        for line in std::iter::once(&self.header).chain(self.rows.iter()) {
            for (idx, text) in line.iter().enumerate() {
                let len = self.cell(text).chars().count();
                if idx >= widths.len() {
                    widths.push(len);
                } else if widths[idx] < len {
                    widths[idx] = len;
                }
            }
        }
        widths
    }

    fn header_cell(&self, text: String) -> String {
        if !self.color {
            return text;
        }
        match self.style {
            TableType::Preview => text.bold().red().to_string(),
            TableType::Basic | TableType::Vertical => text.bold().yellow().to_string(),
            TableType::Csv | TableType::Markdown => text,
        }
    }

    fn padded(&self, line: &[String], widths: &[usize]) -> Vec<String> {
        line.iter()
            .enumerate()
            .map(|(idx, text)| {
                let width = widths.get(idx).copied().unwrap_or(0);
                format!("{:<width$}", self.cell(text), width = width)
            })
            .collect()
    }

    /// Write the table to a sink
    pub fn render<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self.style {
            TableType::Csv => self.render_csv(out),
            TableType::Markdown | TableType::Preview => self.render_bordered(out),
            TableType::Basic => self.render_basic(out),
            TableType::Vertical => self.render_vertical(out),
        }
    }

    fn render_csv<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let escape = |text: &String| {
            let text = self.cell(text);
            if text.contains([',', '"', '\n']) {
                format!("\"{}\"", text.replace('"', "\"\""))
            } else {
                text
            }
        };
        if !self.header.is_empty() {
            let line: Vec<String> = self.header.iter().map(escape).collect();
            writeln!(out, "{}", line.join(","))?;
        }
        for row in &self.rows {
            let line: Vec<String> = row.iter().map(escape).collect();
            writeln!(out, "{}", line.join(","))?;
        }
        Ok(())
    }

    fn render_bordered<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let widths = self.widths();
        if !self.header.is_empty() {
            let cells: Vec<String> = self
                .padded(&self.header, &widths)
                .into_iter()
                .map(|c| self.header_cell(c))
                .collect();
            writeln!(out, "| {} |", cells.join(" | "))?;
            let rule: Vec<String> = widths
                .iter()
                .take(self.header.len())
                .map(|w| "-".repeat(*w))
                .collect();
            writeln!(out, "|-{}-|", rule.join("-|-"))?;
        }
        for row in &self.rows {
            writeln!(out, "| {} |", self.padded(row, &widths).join(" | "))?;
        }
        Ok(())
    }

    fn render_basic<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let widths = self.widths();
        if !self.header.is_empty() {
            let cells: Vec<String> = self
                .padded(&self.header, &widths)
                .into_iter()
                .map(|c| self.header_cell(c))
                .collect();
            writeln!(out, "{}", cells.join("  ").trim_end())?;
        }
        for row in &self.rows {
            writeln!(out, "{}", self.padded(row, &widths).join("  ").trim_end())?;
        }
        Ok(())
    }

    fn render_vertical<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let key_width = self.header.iter().map(|k| k.chars().count()).max().unwrap_or(0);
        for (idx, row) in self.rows.iter().enumerate() {
            if idx > 0 {
                writeln!(out)?;
            }
            for (col, value) in row.iter().enumerate() {
                let key = self.header.get(col).cloned().unwrap_or_default();
                let key = self.header_cell(format!("{:<width$}", key, width = key_width));
                writeln!(out, "{} {}", key, self.cell(value))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(style: TableType) -> Table {
        let mut table = Table::new(style);
        table.set_header(vec!["ID".into(), "Name".into()]);
        table.append(vec!["1".into(), "alpha".into()]);
        table.append(vec!["22".into(), "b".into()]);
        table
    }

    fn render_to_string(table: &Table) -> String {
        let mut buf = Vec::new();
        table.render(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_markdown_render() {
        let out = render_to_string(&sample(TableType::Markdown));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "| ID | Name  |");
        assert_eq!(lines[1], "|----|-------|");
        assert_eq!(lines[2], "| 1  | alpha |");
        assert_eq!(lines[3], "| 22 | b     |");
    }

    #[test]
    fn test_csv_render_quotes_separators() {
        let mut table = Table::new(TableType::Csv);
        table.set_header(vec!["ID".into(), "Note".into()]);
        table.append(vec!["1".into(), "a, b".into()]);
        let out = render_to_string(&table);
        assert_eq!(out, "ID,Note\n1,\"a, b\"\n");
    }

    #[test]
    fn test_basic_render_without_color() {
        let out = render_to_string(&sample(TableType::Basic));
        assert_eq!(out, "ID  Name\n1   alpha\n22  b\n");
    }

    #[test]
    fn test_vertical_render() {
        let out = render_to_string(&sample(TableType::Vertical));
        assert_eq!(out, "ID   1\nName alpha\n\nID   22\nName b\n");
    }

    #[test]
    fn test_narrow_mode_truncates() {
        let long = "x".repeat(60);
        let mut table = Table::new(TableType::Csv);
        table.append(vec![long.clone()]);
        let out = render_to_string(&table);
        assert_eq!(out.trim_end().chars().count(), MAX_CELL_WIDTH);
        assert!(out.trim_end().ends_with("..."));

        let mut wide = Table::new(TableType::Csv).wide(true);
        wide.append(vec![long.clone()]);
        assert_eq!(render_to_string(&wide).trim_end(), long);
    }

    #[test]
    fn test_colored_header_contains_escape() {
        let table = sample(TableType::Preview).color(true);
        let out = render_to_string(&table);
        assert!(out.lines().next().unwrap().contains('\u{1b}'));
    }
}
