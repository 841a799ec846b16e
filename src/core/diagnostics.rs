// File: src/core/diagnostics.rs
//! Formatting of error and warning lines. Holds no state.

use std::fmt;
use std::panic::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    fn label(self) -> &'static str {
        match self {
            Severity::Error => "ERROR :",
            Severity::Warning => "WARNING:",
        }
    }
}

/// Where a diagnostic came from: a scheme source line, or the Rust call site
/// when the driver has not supplied one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self::new(location.file(), location.line())
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Builds a line such as
/// `ml.scheme:12 : ERROR : In expression consonants. token 'ka' has an empty value1`.
pub fn format_diagnostic(
    severity: Severity,
    location: &SourceLocation,
    expression: Option<&str>,
    message: &str,
) -> String {
    match expression {
        Some(expr) => format!(
            "{} : {} In expression {}. {}",
            location,
            severity.label(),
            expr,
            message
        ),
        None => format!("{} : {} {}", location, severity.label(), message),
    }
}
