pub mod models;
pub mod routes;

use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use axum::Router;
use serde_json::json;
use shelf_db::{All, Database, StoreResult};
use shelf_kernel::{InitCtx, Module};
use time::OffsetDateTime;

use models::Genre;
use routes::Genres;

/// Genre catalog: the categories books reference.
pub struct GenresModule {
    genres: Genres,
}

impl GenresModule {
    pub fn new(genres: Genres) -> Self {
        Self { genres }
    }
}

/// Insert every configured genre that does not exist yet.
async fn seed(genres: &Genres, names: &[String]) -> anyhow::Result<usize> {
    let mut known: HashSet<String> = genres
        .find(&All)
        .await?
        .into_iter()
        .map(|genre| genre.name)
        .collect();
    let mut inserted = 0;

    for name in names {
        if !known.insert(name.clone()) {
            continue;
        }
        genres
            .insert(Genre::new(name.clone(), OffsetDateTime::now_utc()))
            .await?;
        inserted += 1;
    }

    Ok(inserted)
}

#[async_trait]
impl Module for GenresModule {
    fn name(&self) -> &'static str {
        "genres"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let genres = ctx.db.collection::<Genre>()?;
        let inserted = seed(&genres, &ctx.settings.catalog.seed_genres).await?;

        tracing::info!(
            module = self.name(),
            database = ctx.db.name(),
            seeded = inserted,
            "genres module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.genres.clone())
    }

    fn route_table(&self) -> Vec<(&'static str, &'static str)> {
        vec![
            ("GET", "/"),
            ("POST", "/"),
            ("DELETE", "/"),
            ("GET", "/{genre_id}"),
            ("PUT", "/{genre_id}"),
            ("DELETE", "/{genre_id}"),
        ]
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = json!({
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                }
            }
        });
        let genre = json!({
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/Genre" }
                }
            }
        });
        let id_param = json!([{
            "name": "genre_id",
            "in": "path",
            "required": true,
            "schema": { "type": "string", "format": "uuid" }
        }]);

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List genres",
                        "tags": ["Genres"],
                        "responses": {
                            "200": {
                                "description": "All genres",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Genre" }
                                        }
                                    }
                                }
                            }
                        }
                    },
                    "post": {
                        "summary": "Create a genre",
                        "tags": ["Genres"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/NewGenre" }
                                }
                            }
                        },
                        "responses": {
                            "200": { "description": "Created genre", "content": genre["content"] },
                            "409": { "description": "Name already used", "content": error["content"] },
                            "422": { "description": "Invalid payload", "content": error["content"] }
                        }
                    },
                    "delete": {
                        "summary": "Delete every genre",
                        "tags": ["Genres"],
                        "responses": {
                            "200": {
                                "description": "Deletion summary",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/DeleteSummary" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/{genre_id}": {
                    "get": {
                        "summary": "Get a genre",
                        "tags": ["Genres"],
                        "parameters": id_param,
                        "responses": {
                            "200": { "description": "Genre", "content": genre["content"] },
                            "404": { "description": "Genre not found", "content": error["content"] }
                        }
                    },
                    "put": {
                        "summary": "Rename a genre",
                        "tags": ["Genres"],
                        "parameters": id_param,
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/NewGenre" }
                                }
                            }
                        },
                        "responses": {
                            "200": { "description": "Updated genre", "content": genre["content"] },
                            "404": { "description": "Genre not found", "content": error["content"] }
                        }
                    },
                    "delete": {
                        "summary": "Delete a genre",
                        "tags": ["Genres"],
                        "parameters": id_param,
                        "responses": {
                            "200": { "description": "Deleted genre", "content": genre["content"] },
                            "404": { "description": "Genre not found", "content": error["content"] }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Genre": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "format": "uuid" },
                            "name": { "type": "string" },
                            "createdAt": { "type": "string", "format": "date-time" },
                            "updatedAt": { "type": "string", "format": "date-time" }
                        },
                        "required": ["id", "name", "createdAt", "updatedAt"]
                    },
                    "NewGenre": {
                        "type": "object",
                        "properties": { "name": { "type": "string" } },
                        "required": ["name"]
                    }
                }
            }
        }))
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "genres module stopped");
        Ok(())
    }
}

/// Create a new instance of the genres module
pub fn create_module(db: &Database) -> StoreResult<Arc<dyn Module>> {
    Ok(Arc::new(GenresModule::new(db.collection::<Genre>()?)))
}
