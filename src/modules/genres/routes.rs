use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use shelf_db::{All, Collection};
use shelf_http::{ApiJson, AppError, AppResult};
use time::OffsetDateTime;

use super::models::{Genre, GenreId, GenrePatch, NewGenre};
use crate::modules::DeleteSummary;

pub type Genres = Arc<dyn Collection<Genre>>;

/// HTTP routes for `/genres`, relative to the module mount point
pub fn router(genres: Genres) -> Router {
    Router::new()
        .route(
            "/",
            get(list_genres)
                .post(create_genre)
                .put(reject_replace_genres)
                .delete(delete_genres),
        )
        .route(
            "/{genre_id}",
            get(get_genre)
                .post(reject_create_at_genre)
                .put(update_genre)
                .delete(delete_genre),
        )
        .with_state(genres)
}

fn genre_not_found(raw_id: &str) -> AppError {
    AppError::not_found(format!("Genre {} not found", raw_id))
}

fn parse_genre_id(raw_id: &str) -> AppResult<GenreId> {
    GenreId::parse(raw_id).ok_or_else(|| genre_not_found(raw_id))
}

async fn list_genres(State(genres): State<Genres>) -> AppResult<Json<Vec<Genre>>> {
    Ok(Json(genres.find(&All).await?))
}

async fn create_genre(
    State(genres): State<Genres>,
    ApiJson(payload): ApiJson<NewGenre>,
) -> AppResult<Json<Genre>> {
    let genre = payload.into_genre(OffsetDateTime::now_utc())?;
    let genre = genres.insert(genre).await?;
    tracing::info!(genre_id = %genre.id, name = %genre.name, "genre created");
    Ok(Json(genre))
}

async fn reject_replace_genres() -> AppError {
    AppError::unsupported("PUT", "/genres")
}

async fn delete_genres(State(genres): State<Genres>) -> AppResult<Json<DeleteSummary>> {
    let count = genres.delete_all().await?;
    tracing::info!(count, "all genres deleted");
    Ok(Json(DeleteSummary::new(count)))
}

async fn get_genre(
    State(genres): State<Genres>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<Genre>> {
    let id = parse_genre_id(&raw_id)?;
    genres
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| genre_not_found(&raw_id))
}

async fn reject_create_at_genre(Path(raw_id): Path<String>) -> AppError {
    AppError::unsupported("POST", format!("/genres/{}", raw_id))
}

async fn update_genre(
    State(genres): State<Genres>,
    Path(raw_id): Path<String>,
    ApiJson(patch): ApiJson<GenrePatch>,
) -> AppResult<Json<Genre>> {
    let id = parse_genre_id(&raw_id)?;
    let update = patch.resolve(OffsetDateTime::now_utc())?;
    genres
        .update_by_id(id, &update)
        .await?
        .map(Json)
        .ok_or_else(|| genre_not_found(&raw_id))
}

async fn delete_genre(
    State(genres): State<Genres>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<Genre>> {
    let id = parse_genre_id(&raw_id)?;
    let genre = genres
        .delete_by_id(id)
        .await?
        .ok_or_else(|| genre_not_found(&raw_id))?;
    tracing::info!(genre_id = %genre.id, "genre deleted");
    Ok(Json(genre))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use shelf_db::MemoryCollection;
    use tower::ServiceExt;

    fn app() -> (Router, Genres) {
        let genres: Genres = Arc::new(MemoryCollection::<Genre>::new());
        (router(genres.clone()), genres)
    }

    fn request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
        let builder = Request::builder().method(method).uri(uri);
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn create_then_fetch_genre() {
        let (app, _) = app();
        let response = app
            .clone()
            .oneshot(request("POST", "/", Some(serde_json::json!({"name": "Fantasy"}))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let created = json_body(response).await;

        let uri = format!("/{}", created["id"].as_str().unwrap());
        let response = app.oneshot(request("GET", &uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, created);
    }

    #[tokio::test]
    async fn duplicate_name_is_conflict() {
        let (app, genres) = app();
        genres
            .insert(Genre::new("Fantasy", OffsetDateTime::now_utc()))
            .await
            .unwrap();

        let response = app
            .oneshot(request("POST", "/", Some(serde_json::json!({"name": "Fantasy"}))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(response).await["error"]["code"], "duplicate_key");
    }

    #[tokio::test]
    async fn rename_and_delete_genre() {
        let (app, genres) = app();
        let genre = genres
            .insert(Genre::new("Sci-fi", OffsetDateTime::now_utc()))
            .await
            .unwrap();
        let uri = format!("/{}", genre.id);

        let response = app
            .clone()
            .oneshot(request(
                "PUT",
                &uri,
                Some(serde_json::json!({"name": "Science Fiction"})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["name"], "Science Fiction");

        let response = app.clone().oneshot(request("DELETE", &uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(request("GET", &uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            json_body(response).await["error"]["message"],
            format!("Genre {} not found", genre.id)
        );
    }

    #[tokio::test]
    async fn disabled_methods_are_forbidden() {
        let (app, genres) = app();

        let response = app
            .clone()
            .oneshot(request("PUT", "/", Some(serde_json::json!({"name": "X"}))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app.oneshot(request("POST", "/abc", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"POST operation not supported on /genres/abc");

        assert!(genres.find(&All).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_all_reports_count() {
        let (app, genres) = app();
        for name in ["Drama", "Poetry"] {
            genres
                .insert(Genre::new(name, OffsetDateTime::now_utc()))
                .await
                .unwrap();
        }

        let response = app.oneshot(request("DELETE", "/", None)).await.unwrap();
        assert_eq!(
            json_body(response).await,
            serde_json::json!({"acknowledged": true, "deletedCount": 2})
        );
    }
}
