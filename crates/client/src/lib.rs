//! Operator-side client for the bookshelf API.
//!
//! [`HttpBooksApi`] talks to a running server. [`BookListViewModel`] keeps a
//! local projection of the catalog plus a single create/edit form, and merges
//! the outcome of every remote call into that projection.

pub mod api;
pub mod error;
pub mod notice;
pub mod view_model;

pub use api::{BooksApi, HttpBooksApi};
pub use error::ClientError;
pub use notice::{Notice, NoticeKind, NoticeSlot};
pub use view_model::{BookForm, BookListViewModel, LocalBooks};
