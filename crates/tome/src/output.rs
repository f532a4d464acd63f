//! Colored terminal output utilities.
//!
//! Everything goes to stderr so response bodies on stdout stay clean.

use console::{Style, Term};

/// Terminal output formatter.
pub(crate) struct Output {
    term: Term,
    green: Style,
    yellow: Style,
    red: Style,
    dim: Style,
    cyan_bold: Style,
}

impl Output {
    /// Create a new output formatter.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
            dim: Style::new().dim(),
            cyan_bold: Style::new().cyan().bold(),
        }
    }

    /// Print an info message.
    pub(crate) fn info(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    /// Print a de-emphasized message.
    pub(crate) fn detail(&self, msg: &str) {
        let _ = self.term.write_line(&self.dim.apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.term.write_line(&self.red.apply_to(msg).to_string());
    }

    /// Print a highlighted message (cyan bold).
    pub(crate) fn highlight(&self, msg: &str) {
        let _ = self
            .term
            .write_line(&self.cyan_bold.apply_to(msg).to_string());
    }

    /// Print a response status line colored by status class.
    ///
    /// 2xx green, 3xx and 4xx yellow, 5xx red.
    pub(crate) fn status(&self, status: u16, msg: &str) {
        let style = match status {
            200..=299 => &self.green,
            300..=499 => &self.yellow,
            _ => &self.red,
        };
        let _ = self.term.write_line(&style.apply_to(msg).to_string());
    }

    /// Print a separator line.
    pub(crate) fn separator(&self) {
        let _ = self.term.write_line(&"=".repeat(70));
    }
}
