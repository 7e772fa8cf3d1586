use serde::{Deserialize, Serialize};
use shelf_db::{Document, Update};
use shelf_http::AppError;
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

/// Identifier of a genre document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenreId(Uuid);

impl GenreId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw).ok().map(Self)
    }
}

impl std::fmt::Display for GenreId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A named category books point to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
    #[serde(rename = "createdAt", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(rename = "updatedAt", with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Genre {
    pub fn new(name: impl Into<String>, now: OffsetDateTime) -> Self {
        Self {
            id: GenreId::generate(),
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Document for Genre {
    type Id = GenreId;
    const COLLECTION: &'static str = "genres";

    fn id(&self) -> GenreId {
        self.id
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("name", self.name.clone())]
    }
}

/// Request model for creating a genre.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewGenre {
    #[validate(required, length(min = 1))]
    pub name: Option<String>,
}

impl NewGenre {
    pub fn into_genre(self, now: OffsetDateTime) -> Result<Genre, AppError> {
        self.validate()?;
        let name = self.name.unwrap_or_default();
        Ok(Genre::new(name, now))
    }
}

/// Request model for renaming a genre.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct GenrePatch {
    #[validate(length(min = 1))]
    pub name: Option<String>,
}

/// Validated genre changes, applied field by field.
#[derive(Debug, Clone)]
pub struct GenreUpdate {
    name: Option<String>,
    at: OffsetDateTime,
}

impl GenrePatch {
    pub fn resolve(self, now: OffsetDateTime) -> Result<GenreUpdate, AppError> {
        self.validate()?;
        Ok(GenreUpdate {
            name: self.name,
            at: now,
        })
    }
}

impl Update<Genre> for GenreUpdate {
    fn apply(&self, genre: &mut Genre) {
        if let Some(name) = &self.name {
            genre.name = name.clone();
        }
        genre.updated_at = self.at;
    }
}
