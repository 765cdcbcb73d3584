use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostic::Diagnostic;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read source {path:?}: {source}")]
    SourceIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("lex error: {0}")]
    LexError(Diagnostic),
    #[error("parse error: {0}")]
    ParseError(Diagnostic),
    #[error("import error: {0}")]
    ImportError(Diagnostic),
    #[error("validation failed with {} error(s)", .0.len())]
    ValidationError(Vec<Diagnostic>),
    #[error("internal compiler error: {0}")]
    CompilerError(String),
}

impl CoreError {
    /// Diagnostics carried by this error, if any.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            CoreError::LexError(diag) | CoreError::ParseError(diag) | CoreError::ImportError(diag) => {
                std::slice::from_ref(diag)
            }
            CoreError::ValidationError(diags) => diags,
            CoreError::SourceIo { .. } | CoreError::CompilerError(_) => &[],
        }
    }
}
