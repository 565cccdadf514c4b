/// Errors that can occur within the storage layer.
///
/// # Examples
///
/// ```rust
/// use termsense_storage::error::StorageError;
///
/// let err = StorageError::NotFound {
///     entity: "ticket",
///     id: "t-99".to_string(),
/// };
/// assert!(err.to_string().contains("ticket"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Rejected input. Nothing was written.
    #[error("Storage: validation failed: {0}")]
    Validation(String),

    /// A required document was not found.
    #[error("Storage: {entity} not found (id={id})")]
    NotFound { entity: &'static str, id: String },

    /// The backing document collaborator is unreachable. Callers degrade to
    /// last-known or default values; this is never fatal to reconciliation.
    #[error("Storage: document store unavailable: {0}")]
    Unavailable(String),

    /// JSON serialization or deserialization failure.
    #[error("Storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
