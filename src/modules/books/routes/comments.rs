//! Handlers for the comments embedded in a book.
//!
//! Every mutation loads the owning book, edits its comment list in memory and
//! saves the whole book back.

use axum::{
    extract::{Path, State},
    Json,
};
use shelf_http::{ApiJson, AppError, AppResult};
use time::OffsetDateTime;

use super::{load_book, save_book, BooksState};
use crate::modules::books::{
    models::{Book, Comment, CommentId},
    payload::{CommentPatch, NewComment},
};

fn comment_not_found(raw_id: &str) -> AppError {
    AppError::not_found(format!("Comment {} not found", raw_id))
}

fn find_comment<'a>(book: &'a Book, raw_id: &str) -> AppResult<&'a Comment> {
    CommentId::parse(raw_id)
        .and_then(|id| book.comment(id))
        .ok_or_else(|| comment_not_found(raw_id))
}

pub(super) async fn list_comments(
    State(state): State<BooksState>,
    Path(book_id): Path<String>,
) -> AppResult<Json<Vec<Comment>>> {
    let book = load_book(&state, &book_id).await?;
    Ok(Json(book.comments))
}

pub(super) async fn append_comment(
    State(state): State<BooksState>,
    Path(book_id): Path<String>,
    ApiJson(payload): ApiJson<NewComment>,
) -> AppResult<Json<Book>> {
    let mut book = load_book(&state, &book_id).await?;
    let comment = payload.into_comment(OffsetDateTime::now_utc())?;
    let comment_id = comment.id;
    book.push_comment(comment);

    let saved = save_book(&state, book, &book_id).await?;
    tracing::info!(book_id = %book_id, comment_id = %comment_id, "comment added");
    Ok(saved)
}

pub(super) async fn reject_replace_comments(Path(book_id): Path<String>) -> AppError {
    AppError::unsupported("PUT", format!("/books/{}/comments", book_id))
}

pub(super) async fn delete_comments(
    State(state): State<BooksState>,
    Path(book_id): Path<String>,
) -> AppResult<Json<Book>> {
    let mut book = load_book(&state, &book_id).await?;
    let removed = book.clear_comments(OffsetDateTime::now_utc());

    let saved = save_book(&state, book, &book_id).await?;
    tracing::info!(book_id = %book_id, removed, "all comments removed");
    Ok(saved)
}

pub(super) async fn get_comment(
    State(state): State<BooksState>,
    Path((book_id, comment_id)): Path<(String, String)>,
) -> AppResult<Json<Comment>> {
    let book = load_book(&state, &book_id).await?;
    find_comment(&book, &comment_id).cloned().map(Json)
}

pub(super) async fn reject_create_at_comment(
    Path((book_id, comment_id)): Path<(String, String)>,
) -> AppError {
    AppError::unsupported(
        "POST",
        format!("/books/{}/comments/{}", book_id, comment_id),
    )
}

pub(super) async fn update_comment(
    State(state): State<BooksState>,
    Path((book_id, comment_id)): Path<(String, String)>,
    ApiJson(patch): ApiJson<CommentPatch>,
) -> AppResult<Json<Book>> {
    let mut book = load_book(&state, &book_id).await?;
    let id = find_comment(&book, &comment_id)?.id;

    let now = OffsetDateTime::now_utc();
    if let Some(comment) = book.comment_mut(id) {
        patch.apply_to(comment, now)?;
    }
    book.updated_at = now;

    let saved = save_book(&state, book, &book_id).await?;
    tracing::info!(book_id = %book_id, comment_id = %id, "comment updated");
    Ok(saved)
}

pub(super) async fn delete_comment(
    State(state): State<BooksState>,
    Path((book_id, comment_id)): Path<(String, String)>,
) -> AppResult<Json<Book>> {
    let mut book = load_book(&state, &book_id).await?;
    let id = find_comment(&book, &comment_id)?.id;
    book.remove_comment(id, OffsetDateTime::now_utc());

    let saved = save_book(&state, book, &book_id).await?;
    tracing::info!(book_id = %book_id, comment_id = %id, "comment removed");
    Ok(saved)
}
