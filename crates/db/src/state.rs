//! Catalog state shared by both backends.
//!
//! Mutations go through [`Catalog`] so the in-memory and file stores apply
//! exactly the same rules.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::model::{Book, BookFields, BookId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Catalog {
    /// Next id to hand out. Persisted so ids survive deletes and restarts.
    next_id: BookId,
    books: BTreeMap<BookId, Book>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            next_id: 1,
            books: BTreeMap::new(),
        }
    }
}

impl Catalog {
    /// Checks a catalog read back from storage.
    ///
    /// Every book must sit under its own id. A counter at or below the highest
    /// stored id is raised past it so no id is handed out twice. Duplicate
    /// titles are accepted: updates do not enforce uniqueness.
    pub(crate) fn checked(mut self) -> Result<Self, StoreError> {
        if let Some((key, book)) = self.books.iter().find(|(key, book)| **key != book.id) {
            return Err(StoreError::Corrupt {
                reason: format!("entry {key} holds book {}", book.id),
            });
        }

        let floor = self.books.keys().next_back().map_or(1, |last| last + 1);
        if self.next_id < floor {
            tracing::warn!(
                next_id = self.next_id,
                raised_to = floor,
                "stored id counter is behind the catalog"
            );
            self.next_id = floor;
        }

        Ok(self)
    }

    pub(crate) fn list(&self) -> Vec<Book> {
        self.books.values().cloned().collect()
    }

    pub(crate) fn get(&self, id: BookId) -> Result<Book, StoreError> {
        self.books.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    pub(crate) fn create(&mut self, fields: BookFields) -> Result<Book, StoreError> {
        fields.validate()?;

        if self.books.values().any(|book| book.title == fields.title) {
            return Err(StoreError::Conflict {
                title: fields.title,
            });
        }

        let id = self.next_id;
        let Entry::Vacant(slot) = self.books.entry(id) else {
            return Err(StoreError::Corrupt {
                reason: format!("id {id} is already taken"),
            });
        };
        self.next_id += 1;

        let book = Book::new(id, fields);
        slot.insert(book.clone());
        Ok(book)
    }

    pub(crate) fn update(&mut self, id: BookId, fields: BookFields) -> Result<Book, StoreError> {
        fields.validate()?;

        let book = self.books.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        *book = Book::new(id, fields);
        Ok(book.clone())
    }

    pub(crate) fn delete(&mut self, id: BookId) -> Result<(), StoreError> {
        self.books
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }
}
