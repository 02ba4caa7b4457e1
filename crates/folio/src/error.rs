//! CLI error types.

use folio_build::{BuildError, CompileError};
use folio_config::ConfigError;
use folio_diagrams::CodecError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Build(#[from] BuildError),

    #[error("{0}")]
    Compile(#[from] CompileError),

    #[error("{0}")]
    Codec(#[from] CodecError),

    #[error("{0}")]
    Splice(#[from] folio_text::SpliceError),

    #[error("{0}")]
    Validation(String),
}
