//! In-memory collection engine.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{Collection, Document, Query, StoreError, StoreResult, Update};

/// Collection that keeps documents in insertion order behind a lock.
///
/// Every call takes the lock once, so single operations are atomic but a
/// read followed by [`Collection::save`] is not.
pub struct MemoryCollection<D> {
    docs: RwLock<Vec<D>>,
}

impl<D: Document> MemoryCollection<D> {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(Vec::new()),
        }
    }
}

impl<D: Document> Default for MemoryCollection<D> {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject `candidate` if another document already owns one of its unique keys.
fn check_unique<D: Document>(docs: &[D], candidate: &D) -> StoreResult<()> {
    let keys = candidate.unique_keys();
    if keys.is_empty() {
        return Ok(());
    }

    for other in docs.iter().filter(|doc| doc.id() != candidate.id()) {
        for (field, value) in other.unique_keys() {
            if keys.iter().any(|(f, v)| *f == field && *v == value) {
                return Err(StoreError::DuplicateKey {
                    collection: D::COLLECTION,
                    field,
                    value,
                });
            }
        }
    }

    Ok(())
}

#[async_trait]
impl<D: Document> Collection<D> for MemoryCollection<D> {
    async fn find(&self, query: &dyn Query<D>) -> StoreResult<Vec<D>> {
        let docs = self.docs.read().await;
        Ok(docs.iter().filter(|doc| query.matches(doc)).cloned().collect())
    }

    async fn insert(&self, doc: D) -> StoreResult<D> {
        let mut docs = self.docs.write().await;
        if docs.iter().any(|existing| existing.id() == doc.id()) {
            return Err(StoreError::DuplicateKey {
                collection: D::COLLECTION,
                field: "id",
                value: doc.id().to_string(),
            });
        }
        check_unique(&docs, &doc)?;

        tracing::debug!(target: "shelf-db", collection = D::COLLECTION, id = %doc.id(), "insert");
        docs.push(doc.clone());
        Ok(doc)
    }

    async fn find_by_id(&self, id: D::Id) -> StoreResult<Option<D>> {
        let docs = self.docs.read().await;
        Ok(docs.iter().find(|doc| doc.id() == id).cloned())
    }

    async fn update_by_id(&self, id: D::Id, update: &dyn Update<D>) -> StoreResult<Option<D>> {
        let mut docs = self.docs.write().await;
        let Some(position) = docs.iter().position(|doc| doc.id() == id) else {
            return Ok(None);
        };

        let mut updated = docs[position].clone();
        update.apply(&mut updated);
        check_unique(&docs, &updated)?;

        tracing::debug!(target: "shelf-db", collection = D::COLLECTION, %id, "update");
        docs[position] = updated.clone();
        Ok(Some(updated))
    }

    async fn save(&self, doc: D) -> StoreResult<Option<D>> {
        let mut docs = self.docs.write().await;
        let Some(position) = docs.iter().position(|existing| existing.id() == doc.id()) else {
            return Ok(None);
        };
        check_unique(&docs, &doc)?;

        tracing::debug!(target: "shelf-db", collection = D::COLLECTION, id = %doc.id(), "save");
        docs[position] = doc.clone();
        Ok(Some(doc))
    }

    async fn delete_by_id(&self, id: D::Id) -> StoreResult<Option<D>> {
        let mut docs = self.docs.write().await;
        let removed = docs
            .iter()
            .position(|doc| doc.id() == id)
            .map(|position| docs.remove(position));
        Ok(removed)
    }

    async fn delete_all(&self) -> StoreResult<u64> {
        let mut docs = self.docs.write().await;
        let count = docs.len() as u64;
        docs.clear();
        tracing::debug!(target: "shelf-db", collection = D::COLLECTION, count, "delete all");
        Ok(count)
    }
}
