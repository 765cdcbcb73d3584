//! Compiler diagnostics and their rendering through `codespan-reporting`.

use std::fmt;
use std::panic::Location;

use codespan_reporting::diagnostic::{Diagnostic as CsDiagnostic, Label, Severity as CsSeverity};
use codespan_reporting::term::{self, termcolor::NoColor, termcolor::WriteColor};

use crate::span::{SourceMap, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

/// A single message about a source location.
///
/// `origin` is the place inside the compiler that raised the diagnostic,
/// captured through `#[track_caller]` on the constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub code: Option<&'static str>,
    pub span: Option<Span>,
    pub notes: Vec<String>,
    pub origin: &'static Location<'static>,
}

impl Diagnostic {
    #[track_caller]
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Diagnostic::new(Severity::Error, message, Some(span))
    }

    #[track_caller]
    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Diagnostic::new(Severity::Warning, message, Some(span))
    }

    /// An error that is not attached to any source text.
    #[track_caller]
    pub fn unspanned(message: impl Into<String>) -> Self {
        Diagnostic::new(Severity::Error, message, None)
    }

    #[track_caller]
    fn new(severity: Severity, message: impl Into<String>, span: Option<Span>) -> Self {
        Diagnostic {
            severity,
            message: message.into(),
            code: None,
            span,
            notes: Vec::new(),
            origin: Location::caller(),
        }
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    fn to_codespan(&self) -> CsDiagnostic<usize> {
        let severity = match self.severity {
            Severity::Error => CsSeverity::Error,
            Severity::Warning => CsSeverity::Warning,
            Severity::Note => CsSeverity::Note,
        };
        let mut diag = CsDiagnostic::new(severity).with_message(self.message.clone());
        if let Some(code) = self.code {
            diag = diag.with_code(code);
        }
        if let Some(span) = self.span {
            diag = diag.with_labels(vec![Label::primary(span.file.0, span.range())]);
        }
        let mut notes = self.notes.clone();
        notes.push(format!(
            "raised at {}:{}",
            self.origin.file(),
            self.origin.line()
        ));
        diag.with_notes(notes)
    }

    /// Writes the diagnostic with the offending source line underlined.
    pub fn emit(&self, sources: &SourceMap, writer: &mut dyn WriteColor) -> std::io::Result<()> {
        let config = term::Config::default();
        term::emit(writer, &config, sources.files(), &self.to_codespan())
            .map_err(|err| std::io::Error::other(err.to_string()))
    }

    /// Renders the diagnostic as plain text.
    pub fn render(&self, sources: &SourceMap) -> String {
        let mut out = NoColor::new(Vec::new());
        if self.emit(sources, &mut out).is_err() {
            return self.to_string();
        }
        String::from_utf8_lossy(&out.into_inner()).into_owned()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        };
        match self.code {
            Some(code) => write!(f, "{level}[{code}]: {}", self.message),
            None => write!(f, "{level}: {}", self.message),
        }
    }
}
