use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub type BookId = i64;

/// A stored book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Store-assigned identifier, immutable once created
    pub id: BookId,
    /// Title of the book, unique across the catalog
    pub title: String,
    /// Author of the book
    pub author: String,
    /// Free-form description, may be empty
    pub description: String,
}

impl Book {
    pub fn new(id: BookId, fields: BookFields) -> Self {
        Self {
            id,
            title: fields.title,
            author: fields.author,
            description: fields.description,
        }
    }

    /// Splits the mutable fields off the id.
    pub fn fields(&self) -> BookFields {
        BookFields {
            title: self.title.clone(),
            author: self.author.clone(),
            description: self.description.clone(),
        }
    }
}

/// The mutable part of a book, as submitted on create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookFields {
    pub title: String,
    pub author: String,
    pub description: String,
}

impl BookFields {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            description: description.into(),
        }
    }

    /// Rejects blank titles and authors. Descriptions may be empty.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.title.trim().is_empty() {
            return Err(StoreError::InvalidInput { field: "title" });
        }
        if self.author.trim().is_empty() {
            return Err(StoreError::InvalidInput { field: "author" });
        }
        Ok(())
    }
}
