//! Ports - trait definitions for storage and external collaborators.
//! These are the "interfaces" that infrastructure must implement.

mod directory;
mod repository;

pub use directory::UserDirectory;
pub use repository::{BaseRepository, CategoryStore, PostStore};
