use std::path::PathBuf;

use crate::compiler::CompileError;

/// Error aborting a document build.
///
/// Per-diagram render failures never surface here; they are recovered with
/// a placeholder and recorded in the build report.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Extract(#[from] folio_text::ExtractError),

    #[error("splice failed: {0}")]
    Splice(#[from] folio_text::SpliceError),

    #[error("invalid diagram delimiter pattern: {0}")]
    Delimiter(#[from] regex::Error),

    #[error(transparent)]
    Config(#[from] folio_config::ConfigError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
