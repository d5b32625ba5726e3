//! Book storage for bookshelf.
//!
//! The [`BookStore`] trait owns the catalog invariants: titles are unique,
//! ids are allocated by the store and never reused, and every mutation is
//! committed before the call returns.
//!
//! Two backends are provided:
//! - [`MemoryBookStore`]: process-local, used in tests and for throwaway runs.
//! - [`FileBookStore`]: a JSON snapshot on disk, replaced atomically on every write.

pub mod error;
pub mod file;
pub mod memory;
pub mod model;

mod state;

use async_trait::async_trait;

pub use error::StoreError;
pub use file::FileBookStore;
pub use memory::MemoryBookStore;
pub use model::{Book, BookFields, BookId};

/// Durable CRUD over [`Book`] records.
#[async_trait]
pub trait BookStore: Send + Sync + 'static {
    /// Returns every stored book in ascending id order.
    async fn list(&self) -> Result<Vec<Book>, StoreError>;

    /// Fetches a single book.
    async fn get(&self, id: BookId) -> Result<Book, StoreError>;

    /// Stores a new book and returns it with its assigned id.
    ///
    /// Fails with [`StoreError::Conflict`] when another book already has the
    /// same title. The check and the insert happen under one write lock.
    async fn create(&self, fields: BookFields) -> Result<Book, StoreError>;

    /// Replaces title, author and description of an existing book.
    ///
    /// Title uniqueness is only enforced on create.
    async fn update(&self, id: BookId, fields: BookFields) -> Result<Book, StoreError>;

    /// Removes a book.
    async fn delete(&self, id: BookId) -> Result<(), StoreError>;
}
