pub mod books;
pub mod genres;

use serde::{Deserialize, Serialize};
use shelf_db::{Database, StoreResult};
use shelf_kernel::ModuleRegistry;

/// Register all catalog modules with the registry.
///
/// Genres come first so they are seeded before books are served.
pub fn register_all(registry: &mut ModuleRegistry, db: &Database) -> StoreResult<()> {
    registry.register(genres::create_module(db)?);
    registry.register(books::create_module(db)?);
    Ok(())
}

/// Response body of the bulk delete endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSummary {
    pub acknowledged: bool,
    #[serde(rename = "deletedCount")]
    pub deleted_count: u64,
}

impl DeleteSummary {
    pub fn new(deleted_count: u64) -> Self {
        Self {
            acknowledged: true,
            deleted_count,
        }
    }
}
