//! Diagnostic rendering for compile errors.

use crate::source::{SourceMap, Span};
use std::fmt;

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
        })
    }
}

/// A single reportable message, optionally anchored to source.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Option<Span>,
    pub code: Option<&'static str>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            span: None,
            code: None,
            notes: Vec::new(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Render the diagnostic with the offending source line underlined.
    pub fn render(&self, source_map: &SourceMap) -> String {
        let mut output = match self.code {
            Some(code) => format!("{}[{}]: {}\n", self.severity, code, self.message),
            None => format!("{}: {}\n", self.severity, self.message),
        };

        if let Some(span) = self.span {
            if let Some(file) = source_map.get(span.source) {
                let (line, col) = file.line_col(span.start);
                let text = file.line_text(line);
                let gutter = line.to_string().len();
                let width = span
                    .len()
                    .clamp(1, text.chars().count().saturating_sub(col - 1).max(1));

                output.push_str(&format!(
                    "{:gutter$}--> {}:{}:{}\n",
                    "",
                    file.name(),
                    line,
                    col
                ));
                output.push_str(&format!("{:gutter$} |\n", ""));
                output.push_str(&format!("{} | {}\n", line, text));
                output.push_str(&format!(
                    "{:gutter$} | {}{}\n",
                    "",
                    " ".repeat(col - 1),
                    "^".repeat(width)
                ));
            }
        }

        for note in &self.notes {
            output.push_str(&format!("  = note: {}\n", note));
        }

        output
    }
}
