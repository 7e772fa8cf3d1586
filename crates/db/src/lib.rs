//! Document store abstraction for SHELF.
//!
//! Modules talk to persistence through the [`Collection`] trait, one collection
//! per [`Document`] type. The bundled engine keeps every collection in memory;
//! it enforces unique keys but nothing else, so validation stays with callers.

use std::{
    any::Any,
    collections::HashMap,
    fmt,
    hash::Hash,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

pub mod error;
pub mod memory;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryCollection;

/// A top-level record stored in a collection.
pub trait Document: Clone + Send + Sync + 'static {
    type Id: Copy + Eq + Hash + fmt::Display + Send + Sync + 'static;

    /// Name of the collection holding documents of this type
    const COLLECTION: &'static str;

    fn id(&self) -> Self::Id;

    /// `(field, value)` pairs that must be unique across the collection
    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

/// Predicate used by [`Collection::find`].
pub trait Query<D>: Send + Sync {
    fn matches(&self, doc: &D) -> bool;
}

/// Matches every document.
#[derive(Debug, Clone, Copy, Default)]
pub struct All;

impl<D> Query<D> for All {
    fn matches(&self, _doc: &D) -> bool {
        true
    }
}

/// In-place modification applied by [`Collection::update_by_id`].
pub trait Update<D>: Send + Sync {
    fn apply(&self, doc: &mut D);
}

/// CRUD primitives over a single collection.
#[async_trait]
pub trait Collection<D: Document>: Send + Sync {
    /// All documents matching `query`, in storage order
    async fn find(&self, query: &dyn Query<D>) -> StoreResult<Vec<D>>;

    async fn insert(&self, doc: D) -> StoreResult<D>;

    async fn find_by_id(&self, id: D::Id) -> StoreResult<Option<D>>;

    /// Apply `update` to the stored document and return the new version
    async fn update_by_id(&self, id: D::Id, update: &dyn Update<D>) -> StoreResult<Option<D>>;

    /// Replace the stored document that has the same id. Returns `None` when
    /// the document has been removed in the meantime.
    async fn save(&self, doc: D) -> StoreResult<Option<D>>;

    async fn delete_by_id(&self, id: D::Id) -> StoreResult<Option<D>>;

    /// Remove every document, returning how many were deleted
    async fn delete_all(&self) -> StoreResult<u64>;
}

/// Handle over a named set of collections.
#[derive(Clone)]
pub struct Database {
    name: String,
    collections: Arc<Mutex<HashMap<&'static str, Arc<dyn Any + Send + Sync>>>>,
}

impl Database {
    /// Open an empty in-memory database
    pub fn in_memory(name: impl Into<String>) -> Self {
        let name = name.into();
        tracing::info!(target: "shelf-db", database = %name, "opened in-memory database");
        Self {
            name,
            collections: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the collection for `D`, creating it on first use.
    pub fn collection<D: Document>(&self) -> StoreResult<Arc<dyn Collection<D>>> {
        let mut collections = self
            .collections
            .lock()
            .map_err(|_| StoreError::Unavailable("collection registry lock poisoned".into()))?;

        let entry = collections
            .entry(D::COLLECTION)
            .or_insert_with(|| Arc::new(MemoryCollection::<D>::new()) as Arc<dyn Any + Send + Sync>);

        let collection = Arc::clone(entry)
            .downcast::<MemoryCollection<D>>()
            .map_err(|_| {
                StoreError::Unavailable(format!(
                    "collection '{}' is registered with a different document type",
                    D::COLLECTION
                ))
            })?;

        Ok(collection as Arc<dyn Collection<D>>)
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database").field("name", &self.name).finish()
    }
}
