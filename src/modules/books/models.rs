use serde::{Deserialize, Deserializer, Serialize, Serializer};
use shelf_db::{Document, Query};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::modules::genres::models::GenreId;

/// Identifier of a book document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(Uuid);

impl BookId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw).ok().map(Self)
    }
}

impl std::fmt::Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a comment, unique within its book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(Uuid);

impl CommentId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw).ok().map(Self)
    }
}

impl std::fmt::Display for CommentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Largest cent count an `f64` represents without gaps (2^53).
const MAX_EXACT_CENTS: f64 = 9_007_199_254_740_992.0;

/// Non-negative currency amount kept in cents.
///
/// Rendered as a decimal number, e.g. `39.95`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price {
    cents: u64,
}

impl Price {
    pub const fn from_cents(cents: u64) -> Self {
        Self { cents }
    }

    /// Round `amount` to whole cents; `None` for negative or non-finite input
    /// and for amounts whose cents cannot be held exactly.
    pub fn from_amount(amount: f64) -> Option<Self> {
        if !amount.is_finite() || amount < 0.0 {
            return None;
        }
        let cents = (amount * 100.0).round();
        if cents > MAX_EXACT_CENTS {
            return None;
        }
        Some(Self {
            cents: cents as u64,
        })
    }

    pub fn cents(&self) -> u64 {
        self.cents
    }

    pub fn amount(&self) -> f64 {
        self.cents as f64 / 100.0
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.amount())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        Price::from_amount(amount)
            .ok_or_else(|| serde::de::Error::custom("price must be a non-negative amount"))
    }
}

/// A rating and review owned by exactly one book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub rating: u8,
    pub comment: String,
    pub author: String,
    #[serde(rename = "createdAt", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(rename = "updatedAt", with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Catalog entry with its embedded comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub isbn: String,
    pub title: String,
    #[serde(rename = "subTitle", default, skip_serializing_if = "Option::is_none")]
    pub sub_title: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub publish_date: OffsetDateTime,
    pub publisher: String,
    pub pages: u32,
    pub price: Price,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub genre: GenreId,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(rename = "createdAt", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(rename = "updatedAt", with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Book {
    pub fn comment(&self, id: CommentId) -> Option<&Comment> {
        self.comments.iter().find(|comment| comment.id == id)
    }

    pub fn comment_mut(&mut self, id: CommentId) -> Option<&mut Comment> {
        self.comments.iter_mut().find(|comment| comment.id == id)
    }

    /// Append `comment` at the end of the sequence.
    pub fn push_comment(&mut self, comment: Comment) {
        self.updated_at = comment.created_at;
        self.comments.push(comment);
    }

    pub fn remove_comment(&mut self, id: CommentId, now: OffsetDateTime) -> Option<Comment> {
        let position = self.comments.iter().position(|comment| comment.id == id)?;
        self.updated_at = now;
        Some(self.comments.remove(position))
    }

    /// Drop every comment, returning how many were removed
    pub fn clear_comments(&mut self, now: OffsetDateTime) -> usize {
        let removed = self.comments.len();
        self.comments.clear();
        self.updated_at = now;
        removed
    }
}

impl Document for Book {
    type Id = BookId;
    const COLLECTION: &'static str = "books";

    fn id(&self) -> BookId {
        self.id
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("isbn", self.isbn.clone())]
    }
}

/// Books priced at or below a maximum amount.
#[derive(Debug, Clone, Copy)]
pub struct PriceAtMost(pub f64);

impl Query<Book> for PriceAtMost {
    fn matches(&self, book: &Book) -> bool {
        book.price.amount() <= self.0
    }
}
