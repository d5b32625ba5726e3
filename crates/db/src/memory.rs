use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::model::{Book, BookFields, BookId};
use crate::state::Catalog;
use crate::BookStore;

/// Process-local [`BookStore`]. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryBookStore {
    catalog: RwLock<Catalog>,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookStore for MemoryBookStore {
    async fn list(&self) -> Result<Vec<Book>, StoreError> {
        Ok(self.catalog.read().await.list())
    }

    async fn get(&self, id: BookId) -> Result<Book, StoreError> {
        self.catalog.read().await.get(id)
    }

    async fn create(&self, fields: BookFields) -> Result<Book, StoreError> {
        let book = self.catalog.write().await.create(fields)?;
        tracing::debug!(book_id = book.id, title = %book.title, "book created");
        Ok(book)
    }

    async fn update(&self, id: BookId, fields: BookFields) -> Result<Book, StoreError> {
        let book = self.catalog.write().await.update(id, fields)?;
        tracing::debug!(book_id = id, "book updated");
        Ok(book)
    }

    async fn delete(&self, id: BookId) -> Result<(), StoreError> {
        self.catalog.write().await.delete(id)?;
        tracing::debug!(book_id = id, "book deleted");
        Ok(())
    }
}
