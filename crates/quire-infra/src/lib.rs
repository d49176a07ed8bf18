//! # Quire Infrastructure
//!
//! Concrete implementations of the ports defined in `quire-core`.
//! This crate contains the in-memory and PostgreSQL stores, configuration
//! loading and the wiring that assembles the content services.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory only
//! - `postgres` - PostgreSQL storage via SeaORM

pub mod config;
pub mod database;
pub mod memory;
mod stores;

pub use config::{ConfigError, ContentConfig};
pub use database::DatabaseConfig;
pub use memory::{InMemoryCategoryStore, InMemoryPostStore, InMemoryUserDirectory};
pub use stores::{ContentServices, ContentStores};

#[cfg(feature = "postgres")]
pub use database::{PostgresCategoryStore, PostgresPostStore, PostgresUserDirectory};
