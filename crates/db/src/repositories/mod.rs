use thiserror::Error;

pub mod memory;
pub mod question;
pub mod quotation;

pub use memory::{InMemoryQuestionRepository, InMemoryQuotationStore};
pub use question::SqlQuestionRepository;
pub use quotation::SqlQuotationStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("invalid entity: {0}")]
    Invalid(String),
}

impl From<RepositoryError> for cotiza_core::StoreError {
    fn from(error: RepositoryError) -> Self {
        cotiza_core::StoreError::Unavailable(error.to_string())
    }
}
