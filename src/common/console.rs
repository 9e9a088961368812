//! User-facing console messages
//!
//! Styled title, success, warning and error lines plus a single-line
//! progress counter for bulk runs. Styling and redraws only happen when
//! stdout is a terminal; otherwise lines are written plain.

use crossterm::style::Stylize;
use std::io::{self, IsTerminal, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Kind of console line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Title,
    Subtitle,
    Info,
    Success,
    Warn,
    Error,
}

/// Message printer for stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct Console {
    color: bool,
}

impl Console {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Console that styles output only when stdout is a terminal
    pub fn stdout() -> Self {
        Self::new(io::stdout().is_terminal())
    }

    /// Render one line without printing it
    pub fn line(&self, tone: Tone, text: &str) -> String {
        if !self.color {
            return match tone {
                Tone::Title => format!("== {} ==", text),
                Tone::Subtitle => format!("  > {}", text),
                Tone::Info => text.to_string(),
                Tone::Success => format!("[ok] {}", text),
                Tone::Warn => format!("[warn] {}", text),
                Tone::Error => format!("Error: {}", text),
            };
        }
        match tone {
            Tone::Title => text.bold().underlined().to_string(),
            Tone::Subtitle => format!("  {} {}", ">".yellow(), text.bold()),
            Tone::Info => text.to_string(),
            Tone::Success => format!("{} {}", "✔".green(), text.bold()),
            Tone::Warn => format!("{} {}", "!".yellow(), text.dim()),
            Tone::Error => format!("{} {}", "Error:".red().bold(), text.bold()),
        }
    }

    fn print(&self, tone: Tone, text: &str) {
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "{}", self.line(tone, text));
    }

    pub fn title(&self, text: &str) {
        self.print(Tone::Title, text);
    }

    pub fn subtitle(&self, text: &str) {
        self.print(Tone::Subtitle, text);
    }

    pub fn info(&self, text: &str) {
        self.print(Tone::Info, text);
    }

    pub fn success(&self, text: &str) {
        self.print(Tone::Success, text);
    }

    pub fn warn(&self, text: &str) {
        self.print(Tone::Warn, text);
    }

    pub fn error(&self, text: &str) {
        self.print(Tone::Error, text);
    }

    /// Success line when every item succeeded, warning otherwise
    pub fn tally(&self, action: &str, succeeded: usize, total: usize) {
        let text = format!("{} {}/{} objects", action, succeeded, total);
        if succeeded == total {
            self.success(&text);
        } else {
            self.warn(&text);
        }
    }

    /// Progress counter for `total` units, drawn only on a terminal
    pub fn progress(&self, title: &str, total: usize) -> Progress {
        Progress::new(title, total, self.color)
    }
}

#[derive(Debug)]
struct ProgressState {
    title: String,
    total: usize,
    done: AtomicUsize,
    draw: bool,
}

/// Shared completion counter for one bulk run
///
/// Clones tick the same counter. The line is cleared on [`Progress::finish`].
#[derive(Debug, Clone)]
pub struct Progress {
    state: Arc<ProgressState>,
}

impl Progress {
    pub fn new(title: &str, total: usize, draw: bool) -> Self {
        Self {
            state: Arc::new(ProgressState {
                title: title.to_string(),
                total,
                done: AtomicUsize::new(0),
                draw,
            }),
        }
    }

    /// Record one finished unit
    pub fn tick(&self) {
        let done = self.state.done.fetch_add(1, Ordering::SeqCst) + 1;
        if self.state.draw {
            let mut out = io::stdout().lock();
            let _ = write!(out, "\r{}", self.render(done));
            let _ = out.flush();
        }
    }

    pub fn done(&self) -> usize {
        self.state.done.load(Ordering::SeqCst)
    }

    fn render(&self, done: usize) -> String {
        format!(
            "  {} {}... ({}/{})",
            "[+]".yellow(),
            self.state.title,
            done,
            self.state.total
        )
    }

    /// Clear the progress line
    pub fn finish(&self) {
        if self.state.draw {
            let mut out = io::stdout().lock();
            let _ = write!(out, "\r\x1b[2K");
            let _ = out.flush();
        }
    }
}
