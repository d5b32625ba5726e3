use async_trait::async_trait;
use bookshelf_db::{Book, BookFields, BookId};
use reqwest::{Response, Url};
use serde::{de::DeserializeOwned, Deserialize};

use crate::error::ClientError;

/// Remote operations on the catalog.
#[async_trait]
pub trait BooksApi: Send + Sync {
    async fn list(&self) -> Result<Vec<Book>, ClientError>;

    async fn get(&self, id: BookId) -> Result<Book, ClientError>;

    /// Returns the stored book with its server-assigned id.
    async fn create(&self, fields: &BookFields) -> Result<Book, ClientError>;

    /// Returns the book as stored by the server.
    async fn update(&self, book: &Book) -> Result<Book, ClientError>;

    async fn delete(&self, id: BookId) -> Result<(), ClientError>;
}

/// Update and delete acknowledgement; only the stored book is of interest.
#[derive(Deserialize)]
struct Ack {
    #[serde(default)]
    book: Option<Book>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// [`BooksApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBooksApi {
    client: reqwest::Client,
    books_url: Url,
}

impl HttpBooksApi {
    /// `base_url` is the server origin, `api_prefix` the mount prefix (`/api` by default).
    pub fn new(base_url: &str, api_prefix: &str) -> Result<Self, url::ParseError> {
        let base = Url::parse(base_url)?;
        let path = format!("{}/books/", api_prefix.trim_end_matches('/'));
        Ok(Self {
            client: reqwest::Client::new(),
            books_url: base.join(&path)?,
        })
    }

    fn collection_url(&self) -> Url {
        let mut url = self.books_url.clone();
        let trimmed = url.path().trim_end_matches('/').to_string();
        url.set_path(&trimmed);
        url
    }

    fn item_url(&self, id: BookId) -> Url {
        let mut url = self.books_url.clone();
        let path = format!("{}{}", url.path(), id);
        url.set_path(&path);
        url
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let text = response.text().await?;
        let message = serde_json::from_str::<ErrorEnvelope>(&text)
            .map(|envelope| envelope.error.message)
            .unwrap_or(text);

        tracing::debug!(status = status.as_u16(), %message, "books api call failed");
        Err(ClientError::from_status(status.as_u16(), message))
    }
}

#[async_trait]
impl BooksApi for HttpBooksApi {
    async fn list(&self) -> Result<Vec<Book>, ClientError> {
        let response = self.client.get(self.collection_url()).send().await?;
        Self::decode(response).await
    }

    async fn get(&self, id: BookId) -> Result<Book, ClientError> {
        let response = self.client.get(self.item_url(id)).send().await?;
        Self::decode(response).await
    }

    async fn create(&self, fields: &BookFields) -> Result<Book, ClientError> {
        let response = self
            .client
            .post(self.collection_url())
            .json(fields)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn update(&self, book: &Book) -> Result<Book, ClientError> {
        let response = self
            .client
            .put(self.item_url(book.id))
            .json(book)
            .send()
            .await?;
        let ack: Ack = Self::decode(response).await?;
        // An ack without the stored book falls back to a re-read.
        match ack.book {
            Some(stored) => Ok(stored),
            None => self.get(book.id).await,
        }
    }

    async fn delete(&self, id: BookId) -> Result<(), ClientError> {
        let response = self.client.delete(self.item_url(id)).send().await?;
        let _: Ack = Self::decode(response).await?;
        Ok(())
    }
}
