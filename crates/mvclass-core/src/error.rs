/*!
Failure taxonomy shared by every stage of the classification pipeline.
*/

use thiserror::Error;

/// Errors that can abort an analysis.
///
/// None of these are transient within a single process lifetime, so
/// callers are expected to surface them rather than retry.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed decoding image: {0}")]
    Decode(String),

    #[error("no images were provided")]
    EmptyBatch,

    #[error("cannot adapt a rank {rank} tensor (shape {shape:?}) to a {kind} model")]
    UnsupportedRank {
        rank: usize,
        shape: Vec<usize>,
        kind: &'static str,
    },

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("invalid k {k} for {classes} classes")]
    InvalidK { k: usize, classes: usize },

    #[error("internal error occurred: {0}")]
    Internal(anyhow::Error),
}

impl Error {
    /// A short stable identifier for the error kind, suitable for wire formats.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Decode(_) => "decode_error",
            Error::EmptyBatch => "empty_batch",
            Error::UnsupportedRank { .. } => "unsupported_rank",
            Error::ModelUnavailable(_) => "model_unavailable",
            Error::InvalidK { .. } => "invalid_k",
            Error::Internal(_) => "internal",
        }
    }

    /// Whether the failure was caused by the request rather than the deployment.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Decode(_) | Error::EmptyBatch | Error::InvalidK { .. }
        )
    }
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        match value.downcast::<Error>() {
            Ok(inner) => inner,
            Err(other) => Error::Internal(other),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
