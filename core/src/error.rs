use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Resource ID already exists: {id}")]
    DuplicateId { id: String },

    #[error("Resource '{id}' not found")]
    NotFound { id: String },

    #[error("File does not exist: {path}")]
    SnapshotNotFound { path: String },

    #[error("Snapshot could not be decoded: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("Resource '{id}' is not a {expected}")]
    WrongVariant { id: String, expected: &'static str },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RegistryError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput { field, reason: reason.into() }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;
