//! Request bodies for the book and comment endpoints.
//!
//! Every field is optional at the serde level so missing values surface as
//! validation details instead of opaque deserialization errors.

use serde::Deserialize;
use serde_json::Value;
use shelf_db::Update;
use shelf_http::{error::validation_details, AppError};
use time::OffsetDateTime;
use validator::{Validate, ValidationErrors};

use super::models::{Book, BookId, Comment, CommentId, Price};
use crate::modules::genres::models::GenreId;
use crate::utils::{nullable, parse_publish_date};

fn collect(details: &mut Vec<Value>, prefix: &str, result: Result<(), ValidationErrors>) {
    if let Err(errors) = result {
        details.extend(validation_details(prefix, &errors));
    }
}

fn invalid(field: &str, error: &str) -> Value {
    serde_json::json!({ "field": field, "error": error })
}

fn reject_if_any(details: Vec<Value>, message: &str) -> Result<(), AppError> {
    if details.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation(details, message))
    }
}

/// Pull a required value after validation has already vouched for it.
fn required<T>(field: &str, value: Option<T>) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::validation(vec![invalid(field, "required")], "missing field"))
}

/// Body of a comment append, or one element of a book's `comments` list.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewComment {
    #[validate(required, range(min = 1, max = 5))]
    pub rating: Option<i64>,
    #[validate(required, length(min = 1))]
    pub comment: Option<String>,
    #[validate(required, length(min = 1))]
    pub author: Option<String>,
}

impl NewComment {
    pub fn into_comment(self, now: OffsetDateTime) -> Result<Comment, AppError> {
        self.validate()?;
        self.build(now)
    }

    fn build(self, now: OffsetDateTime) -> Result<Comment, AppError> {
        let rating = required("rating", self.rating)?;
        let rating = u8::try_from(rating)
            .map_err(|_| AppError::validation(vec![invalid("rating", "range")], "invalid rating"))?;

        Ok(Comment {
            id: CommentId::generate(),
            rating,
            comment: required("comment", self.comment)?,
            author: required("author", self.author)?,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Validate a list of embedded comments, reporting errors as `comments[i].field`.
fn collect_comments(details: &mut Vec<Value>, comments: &[NewComment]) {
    for (index, comment) in comments.iter().enumerate() {
        collect(details, &format!("comments[{}].", index), comment.validate());
    }
}

fn build_comments(comments: Vec<NewComment>, now: OffsetDateTime) -> Result<Vec<Comment>, AppError> {
    comments.into_iter().map(|comment| comment.build(now)).collect()
}

/// Partial update of a single comment. Only `rating` and `comment` may change.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CommentPatch {
    #[validate(range(min = 1, max = 5))]
    pub rating: Option<i64>,
    #[validate(length(min = 1))]
    pub comment: Option<String>,
}

impl CommentPatch {
    /// Validate the whole patch, then overwrite the supplied fields.
    /// On error `comment` is left untouched.
    pub fn apply_to(&self, comment: &mut Comment, now: OffsetDateTime) -> Result<(), AppError> {
        self.validate()?;
        let rating = self
            .rating
            .map(u8::try_from)
            .transpose()
            .map_err(|_| AppError::validation(vec![invalid("rating", "range")], "invalid rating"))?;

        if let Some(rating) = rating {
            comment.rating = rating;
        }
        if let Some(text) = &self.comment {
            comment.comment = text.clone();
        }
        comment.updated_at = now;
        Ok(())
    }
}

/// Body of a book creation.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewBook {
    #[validate(required, length(min = 1))]
    pub isbn: Option<String>,
    #[validate(required, length(min = 1))]
    pub title: Option<String>,
    #[serde(rename = "subTitle")]
    pub sub_title: Option<String>,
    #[validate(required)]
    pub publish_date: Option<String>,
    #[validate(required, length(min = 1))]
    pub publisher: Option<String>,
    #[validate(required)]
    pub pages: Option<u32>,
    #[validate(required)]
    pub price: Option<f64>,
    #[validate(required, length(min = 1))]
    pub description: Option<String>,
    pub website: Option<String>,
    #[validate(required)]
    pub genre: Option<GenreId>,
    #[serde(default)]
    pub comments: Vec<NewComment>,
}

impl NewBook {
    /// Check every invariant and build the document with fresh ids and timestamps.
    pub fn into_book(self, now: OffsetDateTime) -> Result<Book, AppError> {
        let mut details = Vec::new();
        collect(&mut details, "", self.validate());
        collect_comments(&mut details, &self.comments);

        let publish_date = self.publish_date.as_deref().map(parse_publish_date);
        if let Some(None) = publish_date {
            details.push(invalid("publish_date", "date"));
        }
        let price = self.price.map(Price::from_amount);
        if let Some(None) = price {
            details.push(invalid("price", "range"));
        }
        reject_if_any(details, "book validation failed")?;

        Ok(Book {
            id: BookId::generate(),
            isbn: required("isbn", self.isbn)?,
            title: required("title", self.title)?,
            sub_title: self.sub_title,
            publish_date: required("publish_date", publish_date.flatten())?,
            publisher: required("publisher", self.publisher)?,
            pages: required("pages", self.pages)?,
            price: required("price", price.flatten())?,
            description: required("description", self.description)?,
            website: self.website,
            genre: required("genre", self.genre)?,
            comments: build_comments(self.comments, now)?,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Body of a book update: only the supplied top-level fields are overwritten.
///
/// `subTitle` and `website` may be sent as `null` to clear them. A supplied
/// `comments` list replaces the existing comments wholesale.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct BookPatch {
    #[validate(length(min = 1))]
    pub isbn: Option<String>,
    #[validate(length(min = 1))]
    pub title: Option<String>,
    #[serde(rename = "subTitle", default, deserialize_with = "nullable")]
    pub sub_title: Option<Option<String>>,
    pub publish_date: Option<String>,
    #[validate(length(min = 1))]
    pub publisher: Option<String>,
    pub pages: Option<u32>,
    pub price: Option<f64>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub website: Option<Option<String>>,
    pub genre: Option<GenreId>,
    pub comments: Option<Vec<NewComment>>,
}

/// Validated, typed book changes.
#[derive(Debug, Clone)]
pub struct BookUpdate {
    isbn: Option<String>,
    title: Option<String>,
    sub_title: Option<Option<String>>,
    publish_date: Option<OffsetDateTime>,
    publisher: Option<String>,
    pages: Option<u32>,
    price: Option<Price>,
    description: Option<String>,
    website: Option<Option<String>>,
    genre: Option<GenreId>,
    comments: Option<Vec<Comment>>,
    at: OffsetDateTime,
}

impl BookPatch {
    pub fn resolve(self, now: OffsetDateTime) -> Result<BookUpdate, AppError> {
        let mut details = Vec::new();
        collect(&mut details, "", self.validate());
        if let Some(comments) = &self.comments {
            collect_comments(&mut details, comments);
        }

        let publish_date = match self.publish_date.as_deref() {
            Some(raw) => {
                let parsed = parse_publish_date(raw);
                if parsed.is_none() {
                    details.push(invalid("publish_date", "date"));
                }
                parsed
            }
            None => None,
        };
        let price = match self.price {
            Some(amount) => {
                let parsed = Price::from_amount(amount);
                if parsed.is_none() {
                    details.push(invalid("price", "range"));
                }
                parsed
            }
            None => None,
        };
        reject_if_any(details, "book validation failed")?;

        let comments = match self.comments {
            Some(comments) => Some(build_comments(comments, now)?),
            None => None,
        };

        Ok(BookUpdate {
            isbn: self.isbn,
            title: self.title,
            sub_title: self.sub_title,
            publish_date,
            publisher: self.publisher,
            pages: self.pages,
            price,
            description: self.description,
            website: self.website,
            genre: self.genre,
            comments,
            at: now,
        })
    }
}

impl BookUpdate {
    /// Genre the update points the book at, if it changes it
    pub fn genre(&self) -> Option<GenreId> {
        self.genre
    }
}

impl Update<Book> for BookUpdate {
    fn apply(&self, book: &mut Book) {
        if let Some(isbn) = &self.isbn {
            book.isbn = isbn.clone();
        }
        if let Some(title) = &self.title {
            book.title = title.clone();
        }
        if let Some(sub_title) = &self.sub_title {
            book.sub_title = sub_title.clone();
        }
        if let Some(publish_date) = self.publish_date {
            book.publish_date = publish_date;
        }
        if let Some(publisher) = &self.publisher {
            book.publisher = publisher.clone();
        }
        if let Some(pages) = self.pages {
            book.pages = pages;
        }
        if let Some(price) = self.price {
            book.price = price;
        }
        if let Some(description) = &self.description {
            book.description = description.clone();
        }
        if let Some(website) = &self.website {
            book.website = website.clone();
        }
        if let Some(genre) = self.genre {
            book.genre = genre;
        }
        if let Some(comments) = &self.comments {
            book.comments = comments.clone();
        }
        book.updated_at = self.at;
    }
}
