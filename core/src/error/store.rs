use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// The encoded record would exceed the backend's per-item limit.
    #[error("record too large: {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: usize, limit: usize },
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("record codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl StoreError {
    pub fn backend(e: impl std::fmt::Display) -> Self {
        StoreError::Backend(e.to_string())
    }

    pub fn is_too_large(&self) -> bool {
        matches!(self, StoreError::TooLarge { .. })
    }
}
