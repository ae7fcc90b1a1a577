use thiserror::Error;

use crate::error::StorageError;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Feed storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Malformed feed document: {0}")]
    Parse(String),

    #[error("Failed to serialize feed: {0}")]
    Serialize(String),
}
