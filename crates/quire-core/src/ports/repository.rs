use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Category, Comment, Post};
use crate::error::RepoError;
use crate::query::PostQuery;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Insert a new entity. Unique keys are enforced here, not by callers.
    async fn insert(&self, entity: T) -> Result<T, RepoError>;

    /// Write the editable fields of an existing entity. Counters are never
    /// written through this path.
    async fn update(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID, returning what was removed.
    async fn delete(&self, id: ID) -> Result<T, RepoError>;
}

/// Category storage with the atomic `post_count` primitive.
#[async_trait]
pub trait CategoryStore: BaseRepository<Category, Uuid> {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError>;

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Category>, RepoError>;

    /// All categories ordered by name.
    async fn list(&self) -> Result<Vec<Category>, RepoError>;

    /// Atomically add `delta` to the post count and return the new value.
    ///
    /// Fails with `NotFound` when the category is absent and with
    /// `Constraint` when the count would become negative; in both cases
    /// nothing is written.
    async fn adjust_post_count(&self, id: Uuid, delta: i64) -> Result<i64, RepoError>;
}

/// Post storage. `update` is conditional on `Post::revision` and fails with
/// `Conflict` when the stored revision moved on.
#[async_trait]
pub trait PostStore: BaseRepository<Post, Uuid> {
    /// Atomically add one view to the post with this slug and return it.
    async fn increment_views(&self, slug: &str) -> Result<Option<Post>, RepoError>;

    /// Atomically append a comment. Fails with `NotFound` if the post is gone.
    async fn append_comment(&self, post_id: Uuid, comment: Comment) -> Result<Comment, RepoError>;

    /// Execute a listing query, returning the page and the total match count.
    async fn find_page(&self, query: &PostQuery) -> Result<(Vec<Post>, u64), RepoError>;
}
