//! Report pipeline errors.

use cb_client::ClientError;
use thiserror::Error;

/// Errors surfaced by the report pipeline.
///
/// Transformation problems never appear here: malformed items degrade to
/// per-item skips inside the transformers. Only fetch-layer failures abort
/// a run.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("platform error: {0}")]
    Source(#[from] ClientError),
}
