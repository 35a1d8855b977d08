//! Conversion diagnostics on stderr.
//!
//! Stdout may carry the converted HTML, so every user-facing message goes
//! to stderr through [`Diagnostics`].

use console::{Style, Term};

/// Stderr reporter for warnings, render failures and fatal errors.
pub(crate) struct Diagnostics {
    term: Term,
    warning_style: Style,
    failure_style: Style,
    tool_output_style: Style,
}

impl Diagnostics {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            warning_style: Style::new().yellow(),
            failure_style: Style::new().red(),
            tool_output_style: Style::new().dim(),
        }
    }

    /// A lenient condition; conversion carried on.
    pub(crate) fn warning(&self, msg: &str) {
        self.emit(&self.warning_style, &format!("Warning: {msg}"));
    }

    /// A failed diagram render or a fatal error.
    pub(crate) fn failure(&self, msg: &str) {
        self.emit(&self.failure_style, msg);
    }

    /// Output captured from the layout tool, indented under its failure.
    pub(crate) fn tool_output(&self, text: &str) {
        for line in text.lines() {
            self.emit(&self.tool_output_style, &format!("    {line}"));
        }
    }

    fn emit(&self, style: &Style, line: &str) {
        // Nothing sensible is left to do when stderr is gone
        let _ = self.term.write_line(&style.apply_to(line).to_string());
    }
}
