//! Application services coordinating domain rules with the storage ports.

mod ledger;
mod posts;

pub use ledger::{CategoryDeletePolicy, CategoryLedger};
pub use posts::{PostPage, PostRepository};

use crate::error::{DomainError, RepoError};

/// Map a storage `NotFound` onto a domain `NotFound` naming the entity;
/// other storage errors convert as usual.
fn not_found_as(
    entity_type: &'static str,
    key: impl ToString,
) -> impl FnOnce(RepoError) -> DomainError {
    move |err| match err {
        RepoError::NotFound => DomainError::not_found(entity_type, key),
        other => other.into(),
    }
}
