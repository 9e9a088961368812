//! Table export of resource lists
//!
//! Known inconsistency, kept on purpose: when extra columns are supplied the
//! header is `ID` plus the extra column names of the *first* resource only.
//! Rows for later resources append their own extra values positionally, even
//! if their column sets differ. If the first resource has no extra columns
//! the table is rendered without a header.

use crate::common::{Generic, Table, TableType};
use crate::model::Resource;
use std::collections::HashMap;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;

/// What to export and where
#[derive(Debug, Clone)]
pub struct ExportModel<'a, R> {
    pub data: &'a [R],
    /// Extra columns keyed by resource identity
    pub extra_fields: Option<&'a HashMap<String, Generic>>,
    pub table_type: TableType,
    pub is_wide: bool,
    /// Write to this file instead of stdout; forces wide mode
    pub output_file: Option<PathBuf>,
}

impl<'a, R> ExportModel<'a, R> {
    pub fn new(data: &'a [R]) -> Self {
        Self {
            data,
            extra_fields: None,
            table_type: TableType::default(),
            is_wide: false,
            output_file: None,
        }
    }

    pub fn with_extra_fields(mut self, extra: &'a HashMap<String, Generic>) -> Self {
        self.extra_fields = Some(extra);
        self
    }

    pub fn with_table_type(mut self, table_type: TableType) -> Self {
        self.table_type = table_type;
        self
    }

    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    pub fn wide(mut self, wide: bool) -> Self {
        self.is_wide = wide;
        self
    }
}

/// Build the table for an export without rendering it
pub fn build_table<R: Resource>(export: &ExportModel<'_, R>) -> Table {
    let wide = export.is_wide || export.output_file.is_some();
    let mut table = Table::new(export.table_type).wide(wide);

    let extra = export.extra_fields.filter(|extra| !extra.is_empty());
    let mut header = vec!["ID".to_string()];

    match (extra, export.data.first()) {
        (Some(extra), Some(first)) => {
            if let Some(columns) = extra.get(&first.key()) {
                header.extend(columns.keys.iter().cloned());
                table.set_header(header);
            }
        }
        _ => table.set_header(header),
    }

    for resource in export.data {
        let key = resource.key();
        let mut row = vec![key.clone()];
        if let Some(columns) = extra.and_then(|extra| extra.get(&key)) {
            row.extend(columns.values.iter().cloned());
        }
        table.append(row);
    }

    table
}

/// Render to stdout, or to the output file in wide mode
pub fn export<R: Resource>(export: &ExportModel<'_, R>) -> crate::error::Result<()> {
    let table = build_table(export);

    match &export.output_file {
        Some(path) => {
            tracing::info!(
                "Exporting {} rows as {} to {:?}",
                export.data.len(),
                export.table_type.as_str(),
                path
            );
            let mut file = std::fs::File::create(path)?;
            table.render(&mut file)?;
            file.flush()?;
        }
        None => {
            let stdout = std::io::stdout();
            let color = stdout.is_terminal();
            let mut out = stdout.lock();
            table.color(color).render(&mut out)?;
        }
    }
    Ok(())
}
