use thiserror::Error;

/// Failure raised by a variable store while resolving or listing.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Fault(String),
    #[error("storage backend error: {0}")]
    Backend(#[from] sled::Error),
    #[error("corrupt store record: {0}")]
    Codec(#[from] bincode::Error),
}

/// Failure of the document provider; aborts the whole run.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("selected node `{0}` is not part of the current page")]
    MissingNode(String),
}
