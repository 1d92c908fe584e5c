use crate::storage::ExportError;
use log_parser::SourceError;

/// Fatal errors of a whole run. Per-line parse failures never end up here.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("cannot read input: {0}")]
    Source(#[from] SourceError),
    #[error("export failed: {0}")]
    Export(#[from] ExportError),
    #[error("invalid configuration: {0}")]
    Config(String),
}
