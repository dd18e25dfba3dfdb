use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset unavailable at {path:?}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read dataset: {0}")]
    Io(#[from] io::Error),

    #[error("malformed sample on line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("dataset contains no samples")]
    Empty,

    #[error("feature scale must be positive and finite, got {0}")]
    InvalidScale(f32),
}

pub type Result<T> = std::result::Result<T, DatasetError>;
