//! Terminal diagnostics with source snippets.

use crate::CompileError;

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A rendered diagnostic with source context
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<usize>,
    pub col: Option<usize>,
    pub source_line: Option<String>,
}

impl Diagnostic {
    /// Builds a diagnostic from a compile error, pulling the offending
    /// line out of the script source when a location is known.
    pub fn from_compile_error(err: &CompileError, source: &str, file: Option<&str>) -> Self {
        let location = match err {
            CompileError::Lex(e) => Some(e.location()),
            CompileError::Parse(e) => e.location(),
            CompileError::Resolve(_) => None,
        };
        let (line, col) = match location {
            Some((l, c)) => (Some(l), Some(c)),
            None => (None, None),
        };
        let source_line = line.and_then(|l| source.lines().nth(l.saturating_sub(1)))
            .map(|s| s.to_string());
        Diagnostic {
            severity: Severity::Error,
            message: err.to_string(),
            file: file.map(|f| f.to_string()),
            line,
            col,
            source_line,
        }
    }

    /// Render with ANSI colors for the terminal.
    pub fn render_ansi(&self) -> String {
        let mut out = String::new();
        let label = match self.severity {
            Severity::Error => red("error"),
            Severity::Warning => yellow("warning"),
        };
        out.push_str(&format!("{}: {}\n", bold(&label), self.message));
        if let (Some(line), Some(src)) = (self.line, &self.source_line) {
            let loc = match (&self.file, self.col) {
                (Some(f), Some(c)) => format!("{}:{}:{}", f, line, c),
                (Some(f), None) => format!("{}:{}", f, line),
                (None, Some(c)) => format!("line {}, col {}", line, c),
                (None, None) => format!("line {}", line),
            };
            out.push_str(&format!("  {} {}\n", cyan("-->"), loc));
            out.push_str(&format!("   {}\n", cyan("|")));
            out.push_str(&format!("   {} {}\n", cyan("|"), src));
            if let Some(col) = self.col {
                let pad = " ".repeat(col.saturating_sub(1));
                out.push_str(&format!("   {} {}{}\n", cyan("|"), pad, red("^")));
            }
        }
        out
    }

    /// Render without colors, for logs and tests.
    pub fn render_plain(&self) -> String {
        let mut out = String::new();
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        out.push_str(&format!("{}: {}\n", label, self.message));
        if let (Some(line), Some(src)) = (self.line, &self.source_line) {
            out.push_str(&format!("  line {}: {}\n", line, src));
        }
        out
    }
}

fn red(s: &str) -> String {
    format!("\x1b[31m{}\x1b[0m", s)
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{}\x1b[0m", s)
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{}\x1b[0m", s)
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{}\x1b[0m", s)
}
