//! HTTP handlers for the Books module.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    routing::get,
    Json, Router,
};
use bookshelf_db::{Book, BookId, BookStore};
use bookshelf_http::error::AppError;

use super::models::{Ack, BookPayload};

type Store = Arc<dyn BookStore>;
type IdParam = Result<Path<BookId>, PathRejection>;
type Payload = Result<Json<BookPayload>, JsonRejection>;

/// Builds the Books router over the given store.
pub fn router(store: Store) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/health", get(health_check))
        .route(
            "/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(store)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "books module is healthy"
}

async fn list_books(State(store): State<Store>) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(store.list().await?))
}

async fn get_book(State(store): State<Store>, id: IdParam) -> Result<Json<Book>, AppError> {
    let Path(id) = id?;
    Ok(Json(store.get(id).await?))
}

async fn create_book(State(store): State<Store>, body: Payload) -> Result<Json<Book>, AppError> {
    let Json(payload) = body?;
    if let Some(id) = payload.id {
        tracing::debug!(book_id = id, "ignoring client-supplied id on create");
    }

    let fields = payload.into_fields()?;
    let book = store.create(fields).await?;

    tracing::info!(book_id = book.id, title = %book.title, "book created");
    Ok(Json(book))
}

async fn update_book(
    State(store): State<Store>,
    id: IdParam,
    body: Payload,
) -> Result<Json<Ack>, AppError> {
    let Path(id) = id?;
    let Json(payload) = body?;

    if payload.id != Some(id) {
        tracing::warn!(path_id = id, body_id = ?payload.id, "book id mismatch on update");
        return Err(AppError::bad_request(
            "The book id in the path does not match the id in the body.",
        ));
    }

    let fields = payload.into_fields()?;
    let book = store.update(id, fields).await?;

    tracing::info!(book_id = id, title = %book.title, "book updated");
    Ok(Json(Ack::updated(book)))
}

async fn delete_book(State(store): State<Store>, id: IdParam) -> Result<Json<Ack>, AppError> {
    let Path(id) = id?;
    store.delete(id).await?;

    tracing::info!(book_id = id, "book deleted");
    Ok(Json(Ack::deleted()))
}
