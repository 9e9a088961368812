//! Error taxonomy
//!
//! Single-item operations return these as typed failures. Bulk operations
//! never propagate them: each per-item failure is folded into an outcome
//! record instead (see [`crate::common::status`]).

/// Errors surfaced by the library
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network failure or non-OK response from the backend
    #[error("{message}")]
    Transport { status_code: u16, message: String },

    /// A response body or partial-update payload could not be decoded
    #[error("parse error: {0}")]
    Parse(String),

    /// The partial-update merge could not be carried out
    #[error("merge error: {0}")]
    Merge(String),

    /// Missing or invalid input, e.g. absent credentials or endpoint
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn transport(status_code: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            status_code,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
