use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures raised by a document store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("duplicate key in {collection}: {field} '{value}' already exists")]
    DuplicateKey {
        collection: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}
