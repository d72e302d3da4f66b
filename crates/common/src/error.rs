//! Error taxonomy for the scoring pipeline.
//!
//! Every variant is terminal for a run: the binary logs it and exits
//! non-zero without writing partial output.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("source not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("schema error: {0}")]
    SchemaError(String),

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("wallet not found: {0}")]
    WalletNotFound(String),
}

impl PipelineError {
    pub fn missing_field(field: &str) -> Self {
        Self::SchemaError(format!("required field missing: {field}"))
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short machine-friendly label, used as a metric label and log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceNotFound { .. } => "source_not_found",
            Self::MalformedInput(_) => "malformed_input",
            Self::SchemaError(_) => "schema_error",
            Self::Io { .. } => "io",
            Self::Csv(_) => "csv",
            Self::WalletNotFound(_) => "wallet_not_found",
        }
    }
}
