//! Domain-level error types.

use std::fmt;

use thiserror::Error;

/// Domain errors - business rule failures returned to callers.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entity not found: {entity_type} {key}")]
    NotFound {
        entity_type: &'static str,
        key: String,
    },

    #[error("Duplicate slug: {0}")]
    DuplicateSlug(String),

    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    #[error("Access denied")]
    Forbidden,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Consistency failure: {0}")]
    ConsistencyFailure(String),

    #[error("Concurrent modification: {0}")]
    Conflict(String),

    #[error("Category {0} still has posts")]
    CategoryInUse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity_type: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            key: key.to_string(),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Unique constraints enforced by the storage layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueKey {
    PostSlug,
    CategorySlug,
    CategoryName,
}

impl fmt::Display for UniqueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniqueKey::PostSlug => write!(f, "posts.slug"),
            UniqueKey::CategorySlug => write!(f, "categories.slug"),
            UniqueKey::CategoryName => write!(f, "categories.name"),
        }
    }
}

/// Repository-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Unique constraint violated on {key}: {value}")]
    Duplicate { key: UniqueKey, value: String },

    #[error("Stale write rejected")]
    Conflict,

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

impl From<RepoError> for DomainError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate {
                key: UniqueKey::CategoryName,
                value,
            } => DomainError::DuplicateName(value),
            RepoError::Duplicate { value, .. } => DomainError::DuplicateSlug(value),
            RepoError::NotFound => DomainError::NotFound {
                entity_type: "Entity",
                key: String::new(),
            },
            RepoError::Conflict => {
                DomainError::Conflict("entity was modified by another writer".to_string())
            }
            RepoError::Constraint(msg) => DomainError::ConsistencyFailure(msg),
            RepoError::Connection(msg) | RepoError::Query(msg) => DomainError::Internal(msg),
        }
    }
}
