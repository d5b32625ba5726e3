use thiserror::Error;

use crate::model::BookId;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("book {0} not found")]
    NotFound(BookId),

    #[error("a book titled '{title}' already exists")]
    Conflict { title: String },

    #[error("field '{field}' must not be empty")]
    InvalidInput { field: &'static str },

    #[error("catalog is inconsistent: {reason}")]
    Corrupt { reason: String },

    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to (de)serialize catalog: {0}")]
    Serialization(#[from] serde_json::Error),
}
