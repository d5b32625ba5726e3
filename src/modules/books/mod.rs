pub mod models;
pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_db::BookStore;
use bookshelf_kernel::{InitCtx, Module};

/// Books module: the catalog CRUD surface over a [`BookStore`]
pub struct BooksModule {
    store: Arc<dyn BookStore>,
}

impl BooksModule {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let count = self.store.list().await?.len();
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            book_count = count,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(Arc::clone(&self.store))
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn error_response(description: &str) -> serde_json::Value {
    serde_json::json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn json_response(description: &str, schema: &serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "description": description,
        "content": {
            "application/json": { "schema": schema }
        }
    })
}

fn id_parameter() -> serde_json::Value {
    serde_json::json!([{
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "integer", "format": "int64" }
    }])
}

fn openapi_fragment() -> serde_json::Value {
    let book_ref = serde_json::json!({ "$ref": "#/components/schemas/Book" });
    let ack_ref = serde_json::json!({ "$ref": "#/components/schemas/Ack" });
    let payload_body = serde_json::json!({
        "required": true,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/BookPayload" }
            }
        }
    });

    serde_json::json!({
        "paths": {
            "": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "responses": {
                        "200": json_response(
                            "All books",
                            &serde_json::json!({ "type": "array", "items": book_ref })
                        ),
                        "500": error_response("Internal server error")
                    }
                },
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": payload_body,
                    "responses": {
                        "200": json_response("The created book", &book_ref),
                        "400": error_response("Missing or empty fields"),
                        "409": error_response("A book with the same title exists")
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Get a book by id",
                    "tags": ["Books"],
                    "parameters": id_parameter(),
                    "responses": {
                        "200": json_response("The book", &book_ref),
                        "404": error_response("Book not found")
                    }
                },
                "put": {
                    "summary": "Replace title, author and description",
                    "tags": ["Books"],
                    "parameters": id_parameter(),
                    "requestBody": payload_body,
                    "responses": {
                        "200": json_response("Update acknowledgement", &ack_ref),
                        "400": error_response("Id mismatch or missing fields"),
                        "404": error_response("Book not found")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": id_parameter(),
                    "responses": {
                        "200": json_response("Delete acknowledgement", &ack_ref),
                        "404": error_response("Book not found")
                    }
                }
            },
            "/health": {
                "get": {
                    "summary": "Books health check",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": {
                                "text/plain": { "schema": { "type": "string" } }
                            }
                        }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": {
                            "type": "integer",
                            "format": "int64",
                            "description": "Server-assigned identifier"
                        },
                        "title": {
                            "type": "string",
                            "description": "Title of the book, unique across the catalog"
                        },
                        "author": {
                            "type": "string",
                            "description": "Author of the book"
                        },
                        "description": {
                            "type": "string",
                            "description": "Free-form description"
                        }
                    },
                    "required": ["id", "title", "author", "description"]
                },
                "BookPayload": {
                    "type": "object",
                    "properties": {
                        "id": {
                            "type": "integer",
                            "format": "int64",
                            "description": "Required on update, must equal the path id"
                        },
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "description": { "type": "string" }
                    },
                    "required": ["title", "author", "description"]
                },
                "Ack": {
                    "type": "object",
                    "properties": {
                        "message": { "type": "string" },
                        "book": { "$ref": "#/components/schemas/Book" }
                    },
                    "required": ["message"]
                }
            }
        }
    })
}

/// Create a new instance of the books module
pub fn create_module(store: Arc<dyn BookStore>) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(store))
}
