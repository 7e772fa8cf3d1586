//! SHELF book catalog
//!
//! Catalog modules (genres, books with embedded comments) plus the wiring
//! that boots them on top of the SHELF kernel.

#![recursion_limit = "256"]

pub mod modules;
pub mod utils;

use anyhow::Context;
use shelf_db::Database;
use shelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// Build a registry holding every catalog module bound to `db`
pub fn build_registry(db: &Database) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, db).context("failed to register catalog modules")?;
    Ok(registry)
}

/// Boot the catalog and serve HTTP until Ctrl-C.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.name,
        "shelf-app bootstrap starting"
    );

    let db = Database::in_memory(settings.database.name.clone());
    let registry = build_registry(&db)?;
    let ctx = InitCtx {
        settings: &settings,
        db: &db,
    };

    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;
    tracing::info!(modules = registry.module_count(), "shelf-app bootstrap complete");

    let served = shelf_http::start_server(&registry, &settings, shutdown_signal()).await;

    registry.stop_modules().await?;
    served
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn app() -> Router {
        let mut settings = Settings::default();
        settings.catalog.seed_genres = vec!["Programming".into()];
        let db = Database::in_memory("test");
        let registry = build_registry(&db).unwrap();
        registry
            .init_modules(&InitCtx {
                settings: &settings,
                db: &db,
            })
            .await
            .unwrap();
        shelf_http::build_router(&registry, &settings)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[test]
    fn registry_orders_genres_before_books() {
        let registry = build_registry(&Database::in_memory("test")).unwrap();
        let names: Vec<_> = registry.modules().map(|module| module.name()).collect();
        assert_eq!(names, vec!["genres", "books"]);
    }

    #[tokio::test]
    async fn catalog_round_trip_through_full_router() {
        let app = app().await;

        let (status, genres) = call(&app, "GET", "/genres", None).await;
        assert_eq!(status, StatusCode::OK);
        let genre_id = genres[0]["id"].clone();

        let (status, book) = call(
            &app,
            "POST",
            "/books",
            Some(json!({
                "isbn": "9781718503106",
                "title": "The Rust Programming Language",
                "publish_date": "2023-02-28",
                "publisher": "No Starch Press",
                "pages": 560,
                "price": 39.99,
                "description": "The official book",
                "genre": genre_id
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let book_id = book["id"].as_str().unwrap().to_string();

        let (status, with_comment) = call(
            &app,
            "POST",
            &format!("/books/{}/comments", book_id),
            Some(json!({ "rating": 5, "comment": "Thorough", "author": "ferris" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(with_comment["comments"][0]["author"], "ferris");

        let (status, listed) = call(&app, "GET", "/books?price=40", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed[0]["id"], book_id.as_str());

        let (status, listed) = call(&app, "GET", "/books?price=39.98", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed, json!([]));

        let (status, summary) = call(&app, "DELETE", "/books", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["deletedCount"], 1);
    }

    #[tokio::test]
    async fn unknown_paths_fall_back_to_error_envelope() {
        let app = app().await;
        let (status, body) = call(&app, "GET", "/authors", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");
    }
}
