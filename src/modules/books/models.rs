use bookshelf_db::{Book, BookFields, BookId};
use bookshelf_http::error::{AppError, REQUIRED_FIELDS_MESSAGE};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Request body for create and update.
///
/// Every field is optional on the wire so that missing fields are reported
/// through [`AppError::validation`] instead of a generic decode failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BookPayload {
    /// Must match the path id on update, ignored on create
    pub id: Option<BookId>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
}

impl BookPayload {
    /// Checks that title and author are present and non-blank and that a
    /// description was sent.
    pub fn into_fields(self) -> Result<BookFields, AppError> {
        let mut details = Vec::new();

        if self.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
            details.push(json!({"field": "title", "error": "required"}));
        }
        if self.author.as_deref().map_or(true, |a| a.trim().is_empty()) {
            details.push(json!({"field": "author", "error": "required"}));
        }
        if self.description.is_none() {
            details.push(json!({"field": "description", "error": "required"}));
        }

        match (self.title, self.author, self.description) {
            (Some(title), Some(author), Some(description)) if details.is_empty() => {
                Ok(BookFields {
                    title,
                    author,
                    description,
                })
            }
            _ => Err(AppError::validation(details, REQUIRED_FIELDS_MESSAGE)),
        }
    }
}

/// Acknowledgement returned by update and delete.
#[derive(Debug, Clone, Serialize)]
pub struct Ack {
    pub message: String,
    /// The stored book after an update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book: Option<Book>,
}

impl Ack {
    pub fn updated(book: Book) -> Self {
        Self {
            message: "Book updated successfully".to_string(),
            book: Some(book),
        }
    }

    pub fn deleted() -> Self {
        Self {
            message: "Book deleted successfully".to_string(),
            book: None,
        }
    }
}
