//! Handlers for `/books` and `/books/{book_id}`; nested comment handlers live
//! in [`comments`].

mod comments;

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use shelf_db::{All, Collection};
use shelf_http::{ApiJson, ApiQuery, AppError, AppResult};
use time::OffsetDateTime;

use super::{
    models::{Book, BookId, PriceAtMost},
    payload::{BookPatch, NewBook},
};
use crate::modules::{
    genres::models::{Genre, GenreId},
    DeleteSummary,
};

/// Shared handler state: the book collection plus the genres it references
#[derive(Clone)]
pub struct BooksState {
    pub books: Arc<dyn Collection<Book>>,
    pub genres: Arc<dyn Collection<Genre>>,
}

/// HTTP routes for `/books`, relative to the module mount point
pub fn router(state: BooksState) -> Router {
    Router::new()
        .route(
            "/",
            get(list_books)
                .post(create_book)
                .put(reject_replace_books)
                .delete(delete_books),
        )
        .route(
            "/{book_id}",
            get(get_book)
                .post(reject_create_at_book)
                .put(update_book)
                .delete(delete_book),
        )
        .route(
            "/{book_id}/comments",
            get(comments::list_comments)
                .post(comments::append_comment)
                .put(comments::reject_replace_comments)
                .delete(comments::delete_comments),
        )
        .route(
            "/{book_id}/comments/{comment_id}",
            get(comments::get_comment)
                .post(comments::reject_create_at_comment)
                .put(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .with_state(state)
}

pub(super) fn book_not_found(raw_id: &str) -> AppError {
    AppError::not_found(format!("Book {} not found", raw_id))
}

/// Resolve a path id to a stored book. Ids that cannot name a book are
/// reported as not found.
pub(super) async fn load_book(state: &BooksState, raw_id: &str) -> AppResult<Book> {
    let id = BookId::parse(raw_id).ok_or_else(|| book_not_found(raw_id))?;
    state
        .books
        .find_by_id(id)
        .await?
        .ok_or_else(|| book_not_found(raw_id))
}

/// Persist a book mutated in memory. Last write wins: a concurrent change to
/// the same book between load and save is overwritten.
pub(super) async fn save_book(state: &BooksState, book: Book, raw_id: &str) -> AppResult<Json<Book>> {
    state
        .books
        .save(book)
        .await?
        .map(Json)
        .ok_or_else(|| book_not_found(raw_id))
}

async fn ensure_genre_exists(state: &BooksState, genre: GenreId) -> AppResult<()> {
    if state.genres.find_by_id(genre).await?.is_some() {
        return Ok(());
    }
    Err(AppError::validation(
        vec![serde_json::json!({ "field": "genre", "error": "unknown_genre" })],
        format!("Genre {} does not exist", genre),
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListBooksParams {
    pub price: Option<String>,
}

/// Parse the `price` filter. An empty value counts as no filter.
fn max_price(params: &ListBooksParams) -> AppResult<Option<f64>> {
    let Some(raw) = params.price.as_deref().map(str::trim) else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(None);
    }

    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(AppError::invalid_filter("Invalid price value")),
    }
}

async fn list_books(
    State(state): State<BooksState>,
    ApiQuery(params): ApiQuery<ListBooksParams>,
) -> AppResult<Json<Vec<Book>>> {
    let books = match max_price(&params)? {
        Some(max) => {
            tracing::debug!(max_price = max, "price filter applied");
            state.books.find(&PriceAtMost(max)).await?
        }
        None => state.books.find(&All).await?,
    };
    Ok(Json(books))
}

async fn create_book(
    State(state): State<BooksState>,
    ApiJson(payload): ApiJson<NewBook>,
) -> AppResult<Json<Book>> {
    let book = payload.into_book(OffsetDateTime::now_utc())?;
    ensure_genre_exists(&state, book.genre).await?;

    let book = state.books.insert(book).await?;
    tracing::info!(book_id = %book.id, isbn = %book.isbn, "book created");
    Ok(Json(book))
}

async fn reject_replace_books() -> AppError {
    AppError::unsupported("PUT", "/books")
}

async fn delete_books(State(state): State<BooksState>) -> AppResult<Json<DeleteSummary>> {
    let count = state.books.delete_all().await?;
    tracing::info!(count, "all books deleted");
    Ok(Json(DeleteSummary::new(count)))
}

async fn get_book(
    State(state): State<BooksState>,
    Path(book_id): Path<String>,
) -> AppResult<Json<Book>> {
    load_book(&state, &book_id).await.map(Json)
}

async fn reject_create_at_book(Path(book_id): Path<String>) -> AppError {
    AppError::unsupported("POST", format!("/books/{}", book_id))
}

async fn update_book(
    State(state): State<BooksState>,
    Path(book_id): Path<String>,
    ApiJson(patch): ApiJson<BookPatch>,
) -> AppResult<Json<Book>> {
    let id = load_book(&state, &book_id).await?.id;
    let update = patch.resolve(OffsetDateTime::now_utc())?;
    if let Some(genre) = update.genre() {
        ensure_genre_exists(&state, genre).await?;
    }

    let book = state
        .books
        .update_by_id(id, &update)
        .await?
        .ok_or_else(|| book_not_found(&book_id))?;
    tracing::info!(book_id = %book.id, "book updated");
    Ok(Json(book))
}

async fn delete_book(
    State(state): State<BooksState>,
    Path(book_id): Path<String>,
) -> AppResult<Json<Book>> {
    let id = BookId::parse(&book_id).ok_or_else(|| book_not_found(&book_id))?;
    let book = state
        .books
        .delete_by_id(id)
        .await?
        .ok_or_else(|| book_not_found(&book_id))?;
    tracing::info!(book_id = %book.id, comments = book.comments.len(), "book deleted");
    Ok(Json(book))
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-process harness for the books router.

    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use shelf_db::{MemoryCollection, Query, StoreResult, Update};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    /// Book collection that counts `find` calls before delegating.
    #[derive(Default)]
    pub struct CountingBooks {
        inner: MemoryCollection<Book>,
        pub finds: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Collection<Book> for CountingBooks {
        async fn find(&self, query: &dyn Query<Book>) -> StoreResult<Vec<Book>> {
            self.finds.fetch_add(1, Ordering::SeqCst);
            self.inner.find(query).await
        }

        async fn insert(&self, doc: Book) -> StoreResult<Book> {
            self.inner.insert(doc).await
        }

        async fn find_by_id(&self, id: BookId) -> StoreResult<Option<Book>> {
            self.inner.find_by_id(id).await
        }

        async fn update_by_id(
            &self,
            id: BookId,
            update: &dyn Update<Book>,
        ) -> StoreResult<Option<Book>> {
            self.inner.update_by_id(id, update).await
        }

        async fn save(&self, doc: Book) -> StoreResult<Option<Book>> {
            self.inner.save(doc).await
        }

        async fn delete_by_id(&self, id: BookId) -> StoreResult<Option<Book>> {
            self.inner.delete_by_id(id).await
        }

        async fn delete_all(&self) -> StoreResult<u64> {
            self.inner.delete_all().await
        }
    }

    pub struct Harness {
        pub app: Router,
        pub books: Arc<CountingBooks>,
        pub genres: Arc<MemoryCollection<Genre>>,
        pub genre: Genre,
    }

    pub struct Reply {
        pub status: StatusCode,
        pub content_type: Option<String>,
        pub body: String,
    }

    impl Reply {
        pub fn json(&self) -> serde_json::Value {
            serde_json::from_str(&self.body).unwrap()
        }
    }

    impl Harness {
        pub async fn new() -> Self {
            let books = Arc::new(CountingBooks::default());
            let genres = Arc::new(MemoryCollection::<Genre>::new());
            let genre = genres
                .insert(Genre::new("Programming", OffsetDateTime::now_utc()))
                .await
                .unwrap();

            let app = router(BooksState {
                books: books.clone(),
                genres: genres.clone(),
            });

            Self {
                app,
                books,
                genres,
                genre,
            }
        }

        pub async fn send(
            &self,
            method: &str,
            uri: &str,
            body: Option<serde_json::Value>,
        ) -> Reply {
            let builder = Request::builder().method(method).uri(uri);
            let request = match body {
                Some(json) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = self.app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let content_type = response
                .headers()
                .get(header::CONTENT_TYPE)
                .map(|value| value.to_str().unwrap().to_string());
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

            Reply {
                status,
                content_type,
                body: String::from_utf8(bytes.to_vec()).unwrap(),
            }
        }

        pub fn book_json(&self, isbn: &str, price: f64) -> serde_json::Value {
            serde_json::json!({
                "isbn": isbn,
                "title": format!("Title {}", isbn),
                "subTitle": "A subtitle",
                "publish_date": "2020-01-15",
                "publisher": "O'Reilly",
                "pages": 320,
                "price": price,
                "description": "Something worth reading",
                "website": "https://example.com",
                "genre": self.genre.id
            })
        }

        /// Create a book through the API and return its JSON
        pub async fn create_book(&self, isbn: &str, price: f64) -> serde_json::Value {
            let reply = self.send("POST", "/", Some(self.book_json(isbn, price))).await;
            assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
            reply.json()
        }
    }
}
