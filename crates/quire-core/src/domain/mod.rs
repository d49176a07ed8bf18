//! Domain entities - the core business objects.

mod category;
mod post;
mod user;

pub use category::{Category, CategoryPatch, CategorySummary, NewCategory, DEFAULT_CATEGORY_COLOR};
pub use post::{
    derive_excerpt, Comment, CommentView, NewPost, Post, PostChanges, PostPatch, PostStatus,
    PostView,
};
pub use user::{AuthorSummary, Requester, Role};
