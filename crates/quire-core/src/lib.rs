//! # Quire Core
//!
//! The content-consistency and query layer of the Quire blogging platform.
//! This crate contains the domain rules (slug and excerpt derivation, post
//! lifecycle, counter bookkeeping) and the listing query builder. Storage is
//! reached only through the traits in [`ports`].

pub mod domain;
pub mod error;
pub mod ports;
pub mod query;
pub mod services;
pub mod slug;

pub use error::{DomainError, RepoError, UniqueKey};
pub use query::{ListPostsParams, ListingLimits, Pagination, PostQuery, QueryBuilder};
pub use services::{CategoryDeletePolicy, CategoryLedger, PostPage, PostRepository};
