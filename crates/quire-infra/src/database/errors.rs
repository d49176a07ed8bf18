//! Translation of SeaORM errors into store errors.

use sea_orm::{DbErr, SqlErr};

use quire_core::error::{RepoError, UniqueKey};

/// Unique index names created by the content migration.
const UNIQUE_INDEXES: [(&str, UniqueKey); 3] = [
    ("idx_categories_name", UniqueKey::CategoryName),
    ("idx_categories_slug", UniqueKey::CategorySlug),
    ("idx_posts_slug", UniqueKey::PostSlug),
];

/// Map a read error.
pub(crate) fn read_err(err: DbErr) -> RepoError {
    match err {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => RepoError::Connection(err.to_string()),
        DbErr::RecordNotFound(_) | DbErr::RecordNotUpdated => RepoError::NotFound,
        other => RepoError::Query(other.to_string()),
    }
}

/// Map a write error. `value_of` supplies the offending value when a unique
/// index rejects the write.
pub(crate) fn write_err(err: DbErr, value_of: impl Fn(UniqueKey) -> String) -> RepoError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(message)) => {
            match UNIQUE_INDEXES
                .iter()
                .find(|(index, _)| message.contains(index))
            {
                Some((_, key)) => RepoError::Duplicate {
                    key: *key,
                    value: value_of(*key),
                },
                None => RepoError::Constraint(message),
            }
        }
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => RepoError::NotFound,
        _ => read_err(err),
    }
}
