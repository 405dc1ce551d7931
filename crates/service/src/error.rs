use profile_database::file_storage::StorageError;
use thiserror::Error;

use crate::field::FieldError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("user profile {0} not found")]
    NotFound(u64),

    #[error("{matches} user profiles match {id}")]
    AmbiguousMatch { id: u64, matches: usize },

    #[error("user profile {0} already exists")]
    AlreadyExists(u64),

    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("database error: {0}")]
    Database(#[from] libmdbx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ServiceError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ServiceError::Validation { field, message: message.into() }
    }
}

pub type Result<T, E = ServiceError> = std::result::Result<T, E>;
