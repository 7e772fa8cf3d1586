pub mod models;
pub mod payload;
pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use serde_json::{json, Value};
use shelf_db::{Database, StoreResult};
use shelf_kernel::{InitCtx, Module};

use super::genres::models::Genre;
use models::Book;
use routes::BooksState;

/// Book catalog with embedded comments.
pub struct BooksModule {
    state: BooksState,
}

impl BooksModule {
    pub fn new(state: BooksState) -> Self {
        Self { state }
    }
}

fn json_content(schema: Value) -> Value {
    json!({ "application/json": { "schema": schema } })
}

fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{}", name) })
}

fn path_params(names: &[&str]) -> Value {
    Value::Array(
        names
            .iter()
            .map(|name| {
                json!({
                    "name": name,
                    "in": "path",
                    "required": true,
                    "schema": { "type": "string", "format": "uuid" }
                })
            })
            .collect(),
    )
}

fn forbidden() -> Value {
    json!({
        "description": "Operation not supported",
        "content": { "text/plain": { "schema": { "type": "string" } } }
    })
}

fn schemas() -> Value {
    json!({
        "Comment": {
            "type": "object",
            "properties": {
                "id": { "type": "string", "format": "uuid" },
                "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                "comment": { "type": "string" },
                "author": { "type": "string" },
                "createdAt": { "type": "string", "format": "date-time" },
                "updatedAt": { "type": "string", "format": "date-time" }
            },
            "required": ["id", "rating", "comment", "author", "createdAt", "updatedAt"]
        },
        "NewComment": {
            "type": "object",
            "properties": {
                "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                "comment": { "type": "string" },
                "author": { "type": "string" }
            },
            "required": ["rating", "comment", "author"]
        },
        "CommentPatch": {
            "type": "object",
            "properties": {
                "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                "comment": { "type": "string" }
            }
        },
        "Book": {
            "type": "object",
            "properties": {
                "id": { "type": "string", "format": "uuid" },
                "isbn": { "type": "string" },
                "title": { "type": "string" },
                "subTitle": { "type": "string" },
                "publish_date": { "type": "string", "format": "date-time" },
                "publisher": { "type": "string" },
                "pages": { "type": "integer", "minimum": 0 },
                "price": { "type": "number", "minimum": 0 },
                "description": { "type": "string" },
                "website": { "type": "string" },
                "genre": { "type": "string", "format": "uuid" },
                "comments": { "type": "array", "items": schema_ref("Comment") },
                "createdAt": { "type": "string", "format": "date-time" },
                "updatedAt": { "type": "string", "format": "date-time" }
            },
            "required": [
                "id", "isbn", "title", "publish_date", "publisher", "pages",
                "price", "description", "genre", "comments", "createdAt", "updatedAt"
            ]
        },
        "NewBook": {
            "type": "object",
            "properties": {
                "isbn": { "type": "string" },
                "title": { "type": "string" },
                "subTitle": { "type": "string" },
                "publish_date": { "type": "string", "format": "date" },
                "publisher": { "type": "string" },
                "pages": { "type": "integer", "minimum": 0 },
                "price": { "type": "number", "minimum": 0 },
                "description": { "type": "string" },
                "website": { "type": "string" },
                "genre": { "type": "string", "format": "uuid" },
                "comments": { "type": "array", "items": schema_ref("NewComment") }
            },
            "required": [
                "isbn", "title", "publish_date", "publisher", "pages",
                "price", "description", "genre"
            ]
        },
        "DeleteSummary": {
            "type": "object",
            "properties": {
                "acknowledged": { "type": "boolean" },
                "deletedCount": { "type": "integer", "minimum": 0 }
            },
            "required": ["acknowledged", "deletedCount"]
        }
    })
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            database = ctx.db.name(),
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.state.clone())
    }

    fn route_table(&self) -> Vec<(&'static str, &'static str)> {
        vec![
            ("GET", "/"),
            ("POST", "/"),
            ("DELETE", "/"),
            ("GET", "/{book_id}"),
            ("PUT", "/{book_id}"),
            ("DELETE", "/{book_id}"),
            ("GET", "/{book_id}/comments"),
            ("POST", "/{book_id}/comments"),
            ("DELETE", "/{book_id}/comments"),
            ("GET", "/{book_id}/comments/{comment_id}"),
            ("PUT", "/{book_id}/comments/{comment_id}"),
            ("DELETE", "/{book_id}/comments/{comment_id}"),
        ]
    }

    fn openapi(&self) -> Option<Value> {
        let error = json_content(schema_ref("ErrorResponse"));
        let book = json_content(schema_ref("Book"));
        let book_params = path_params(&["book_id"]);
        let comment_params = path_params(&["book_id", "comment_id"]);

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books, optionally capped by price",
                        "tags": ["Books"],
                        "parameters": [{
                            "name": "price",
                            "in": "query",
                            "required": false,
                            "schema": { "type": "number" }
                        }],
                        "responses": {
                            "200": {
                                "description": "Matching books",
                                "content": json_content(json!({ "type": "array", "items": schema_ref("Book") }))
                            },
                            "400": { "description": "Invalid price value", "content": error }
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": { "required": true, "content": json_content(schema_ref("NewBook")) },
                        "responses": {
                            "200": { "description": "Created book", "content": book },
                            "409": { "description": "ISBN already used", "content": error },
                            "422": { "description": "Invalid payload", "content": error }
                        }
                    },
                    "put": {
                        "summary": "Not supported",
                        "tags": ["Books"],
                        "responses": { "403": forbidden() }
                    },
                    "delete": {
                        "summary": "Delete every book",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "Deletion summary",
                                "content": json_content(schema_ref("DeleteSummary"))
                            }
                        }
                    }
                },
                "/{book_id}": {
                    "get": {
                        "summary": "Get a book",
                        "tags": ["Books"],
                        "parameters": book_params,
                        "responses": {
                            "200": { "description": "Book", "content": book },
                            "404": { "description": "Book not found", "content": error }
                        }
                    },
                    "post": {
                        "summary": "Not supported",
                        "tags": ["Books"],
                        "parameters": book_params,
                        "responses": { "403": forbidden() }
                    },
                    "put": {
                        "summary": "Update the supplied fields of a book",
                        "tags": ["Books"],
                        "parameters": book_params,
                        "requestBody": { "required": true, "content": json_content(schema_ref("NewBook")) },
                        "responses": {
                            "200": { "description": "Updated book", "content": book },
                            "404": { "description": "Book not found", "content": error },
                            "409": { "description": "ISBN already used", "content": error },
                            "422": { "description": "Invalid payload", "content": error }
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "parameters": book_params,
                        "responses": {
                            "200": { "description": "Deleted book", "content": book },
                            "404": { "description": "Book not found", "content": error }
                        }
                    }
                },
                "/{book_id}/comments": {
                    "get": {
                        "summary": "List a book's comments",
                        "tags": ["Comments"],
                        "parameters": book_params,
                        "responses": {
                            "200": {
                                "description": "Comments in insertion order",
                                "content": json_content(json!({ "type": "array", "items": schema_ref("Comment") }))
                            },
                            "404": { "description": "Book not found", "content": error }
                        }
                    },
                    "post": {
                        "summary": "Append a comment",
                        "tags": ["Comments"],
                        "parameters": book_params,
                        "requestBody": { "required": true, "content": json_content(schema_ref("NewComment")) },
                        "responses": {
                            "200": { "description": "Book with the new comment", "content": book },
                            "404": { "description": "Book not found", "content": error },
                            "422": { "description": "Invalid comment", "content": error }
                        }
                    },
                    "put": {
                        "summary": "Not supported",
                        "tags": ["Comments"],
                        "parameters": book_params,
                        "responses": { "403": forbidden() }
                    },
                    "delete": {
                        "summary": "Remove every comment of a book",
                        "tags": ["Comments"],
                        "parameters": book_params,
                        "responses": {
                            "200": { "description": "Book without comments", "content": book },
                            "404": { "description": "Book not found", "content": error }
                        }
                    }
                },
                "/{book_id}/comments/{comment_id}": {
                    "get": {
                        "summary": "Get a comment",
                        "tags": ["Comments"],
                        "parameters": comment_params,
                        "responses": {
                            "200": { "description": "Comment", "content": json_content(schema_ref("Comment")) },
                            "404": { "description": "Book or comment not found", "content": error }
                        }
                    },
                    "post": {
                        "summary": "Not supported",
                        "tags": ["Comments"],
                        "parameters": comment_params,
                        "responses": { "403": forbidden() }
                    },
                    "put": {
                        "summary": "Update a comment's rating or text",
                        "tags": ["Comments"],
                        "parameters": comment_params,
                        "requestBody": { "required": true, "content": json_content(schema_ref("CommentPatch")) },
                        "responses": {
                            "200": { "description": "Book with the updated comment", "content": book },
                            "404": { "description": "Book or comment not found", "content": error },
                            "422": { "description": "Invalid comment", "content": error }
                        }
                    },
                    "delete": {
                        "summary": "Remove a comment",
                        "tags": ["Comments"],
                        "parameters": comment_params,
                        "responses": {
                            "200": { "description": "Book without the comment", "content": book },
                            "404": { "description": "Book or comment not found", "content": error }
                        }
                    }
                }
            },
            "components": { "schemas": schemas() }
        }))
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(db: &Database) -> StoreResult<Arc<dyn Module>> {
    let state = BooksState {
        books: db.collection::<Book>()?,
        genres: db.collection::<Genre>()?,
    };
    Ok(Arc::new(BooksModule::new(state)))
}
