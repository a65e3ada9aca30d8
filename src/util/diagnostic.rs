//! User-friendly diagnostic messages.
//!
//! Every resolution or environment failure must include the root cause,
//! the requirement that could not be met, and suggested fixes. The engine
//! never prints directly: it hands `Diagnostic` values to a `Reporter`.

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when the compiler could not be invoked.
    pub const NO_COMPILER: &str = "Install a C compiler or set the CC environment variable";

    /// Suggestion when a requested module cannot be satisfied.
    pub const MODULE_UNSATISFIED: &str =
        "Run `drydock doctor` to inspect the detected environment";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
    Help,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
            Severity::Help => write!(f, "help"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related location (file path)
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Error,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Warning,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Create a new note diagnostic.
    pub fn note(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Note,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = if color {
            match self.severity {
                Severity::Error => "\x1b[1;31merror\x1b[0m",
                Severity::Warning => "\x1b[1;33mwarning\x1b[0m",
                Severity::Note => "\x1b[1;36mnote\x1b[0m",
                Severity::Help => "\x1b[1;32mhelp\x1b[0m",
            }
        } else {
            match self.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Note => "note",
                Severity::Help => "help",
            }
        };

        output.push_str(&format!("{}: {}\n", severity_str, self.message));

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  -> {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Sink for engine diagnostics.
///
/// The engine reports dropped modules, probe warnings, and progress notes
/// through this trait instead of printing. The CLI installs a
/// `StderrReporter`; tests install a collecting reporter.
pub trait Reporter {
    fn report(&self, diagnostic: &Diagnostic);
}

/// Reporter that prints to stderr.
#[derive(Debug, Default)]
pub struct StderrReporter {
    pub color: bool,
}

impl Reporter for StderrReporter {
    fn report(&self, diagnostic: &Diagnostic) {
        eprint!("{}", diagnostic.format(self.color));
    }
}

/// Reporter that discards everything. Useful for library callers that
/// only want the typed result.
#[derive(Debug, Default)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn report(&self, _diagnostic: &Diagnostic) {}
}

/// Catalog validation error surfaced to the CLI with miette rendering.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("invalid catalog: {message}")]
#[diagnostic(
    code(drydock::catalog::invalid),
    help("Check the catalog file against the drydock catalog schema")
)]
pub struct CatalogError {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error("cannot satisfy module `lz_stream`")
            .with_context("lz_stream requires library `z`")
            .with_context("link check for `z` failed: cannot find -lz")
            .with_suggestion("Install the zlib development package")
            .with_suggestion("Drop `lz_stream` from the requested module set");

        let output = diag.format(false);
        assert!(output.contains("error: cannot satisfy module"));
        assert!(output.contains("lz_stream requires library"));
        assert!(output.contains("help: consider:"));
        assert!(output.contains("1. Install the zlib"));
    }

    #[test]
    fn test_warning_formatting() {
        let diag = Diagnostic::warning("dropping optional module `aio_backend`")
            .with_context("feature `posix_aio` was not detected");

        let output = diag.format(false);
        assert!(output.starts_with("warning:"));
        assert!(output.contains("posix_aio"));
    }
}
