//! In-memory stores - used when no database is configured and in tests.
//!
//! Every write runs inside one write-lock critical section, which is what
//! makes counter deltas and unique-key checks atomic here.

mod categories;
mod posts;
mod users;

pub use categories::InMemoryCategoryStore;
pub use posts::InMemoryPostStore;
pub use users::InMemoryUserDirectory;
