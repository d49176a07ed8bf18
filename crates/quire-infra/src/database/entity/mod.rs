//! SeaORM entities for the content schema.

pub mod category;
pub mod comment;
pub mod post;
pub mod user;
