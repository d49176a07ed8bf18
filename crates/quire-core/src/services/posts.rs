use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::ledger::CategoryLedger;
use super::not_found_as;
use crate::domain::{
    AuthorSummary, CategorySummary, Comment, CommentView, NewPost, Post, PostPatch, PostView,
    Requester,
};
use crate::error::DomainError;
use crate::ports::{PostStore, UserDirectory};
use crate::query::{ListPostsParams, Pagination, QueryBuilder};

/// One page of a post listing.
#[derive(Debug, Clone, Serialize)]
pub struct PostPage {
    pub posts: Vec<PostView>,
    pub pagination: Pagination,
}

/// Owns posts and their lifecycle, keeping category post counts in step
/// with every write that creates, removes or re-categorizes a post.
pub struct PostRepository {
    posts: Arc<dyn PostStore>,
    ledger: Arc<CategoryLedger>,
    users: Arc<dyn UserDirectory>,
    query_builder: QueryBuilder,
}

impl PostRepository {
    pub fn new(
        posts: Arc<dyn PostStore>,
        ledger: Arc<CategoryLedger>,
        users: Arc<dyn UserDirectory>,
        query_builder: QueryBuilder,
    ) -> Self {
        Self {
            posts,
            ledger,
            users,
            query_builder,
        }
    }

    /// Create a post and count it in its category. If the count cannot be
    /// applied the post is removed again.
    pub async fn create_post(&self, new: NewPost, author_id: Uuid) -> Result<PostView, DomainError> {
        let post = Post::create(new, author_id, Utc::now())?;
        self.ledger.get_category(post.category_id).await?;

        let post = self.posts.insert(post).await?;

        if let Err(err) = self.ledger.adjust_post_count(post.category_id, 1).await {
            tracing::error!(
                post_id = %post.id,
                category_id = %post.category_id,
                error = %err,
                "Post count increment failed, removing created post"
            );
            if let Err(undo) = self.posts.delete(post.id).await {
                tracing::error!(post_id = %post.id, error = %undo, "Failed to remove created post");
            }
            return Err(consistency_failure("create post", err));
        }

        tracing::info!(
            post_id = %post.id,
            category_id = %post.category_id,
            slug = %post.slug,
            "Post created"
        );
        Ok(self.resolve_one(post).await)
    }

    pub async fn update_post(
        &self,
        id: Uuid,
        patch: PostPatch,
        requester: Requester,
    ) -> Result<PostView, DomainError> {
        let existing = self.find_post(id).await?;
        if !requester.may_modify(existing.author_id) {
            return Err(DomainError::Forbidden);
        }

        let mut updated = existing.clone();
        let changes = updated.apply_patch(patch, Utc::now())?;
        if !changes.any() {
            return Ok(self.resolve_one(existing).await);
        }
        if let Some((_, new_category)) = changes.category {
            self.ledger.get_category(new_category).await?;
        }

        let stored = self
            .posts
            .update(updated)
            .await
            .map_err(not_found_as("Post", id))?;

        if let Some((old_category, new_category)) = changes.category
            && let Err(err) = self.move_post_count(old_category, new_category).await
        {
            let mut restore = existing;
            restore.revision = stored.revision;
            if let Err(undo) = self.posts.update(restore).await {
                tracing::error!(post_id = %id, error = %undo, "Failed to restore post after category move");
            }
            return Err(err);
        }

        tracing::info!(
            post_id = %id,
            slug = %stored.slug,
            title_changed = changes.title,
            first_publish = changes.first_publish,
            recategorized = changes.category.is_some(),
            "Post updated"
        );
        Ok(self.resolve_one(stored).await)
    }

    pub async fn delete_post(&self, id: Uuid, requester: Requester) -> Result<(), DomainError> {
        let existing = self.find_post(id).await?;
        if !requester.may_modify(existing.author_id) {
            return Err(DomainError::Forbidden);
        }

        let removed = self
            .posts
            .delete(id)
            .await
            .map_err(not_found_as("Post", id))?;

        match self.ledger.adjust_post_count(removed.category_id, -1).await {
            Ok(_) => {}
            Err(DomainError::NotFound { .. }) => {
                tracing::warn!(
                    post_id = %id,
                    category_id = %removed.category_id,
                    "Deleted post referenced a category that no longer exists"
                );
            }
            Err(err) => {
                tracing::error!(
                    post_id = %id,
                    category_id = %removed.category_id,
                    error = %err,
                    "Post count decrement failed, restoring deleted post"
                );
                if let Err(undo) = self.posts.insert(removed).await {
                    tracing::error!(post_id = %id, error = %undo, "Failed to restore deleted post");
                }
                return Err(consistency_failure("delete post", err));
            }
        }

        tracing::info!(post_id = %id, "Post deleted");
        Ok(())
    }

    /// Fetch a post by slug. Every successful fetch counts one view.
    pub async fn get_by_slug(&self, slug: &str) -> Result<PostView, DomainError> {
        let post = self
            .posts
            .increment_views(slug)
            .await?
            .ok_or_else(|| DomainError::not_found("Post", slug))?;

        tracing::debug!(post_id = %post.id, views = post.views, "Post viewed");
        Ok(self.resolve_one(post).await)
    }

    /// Fetch a post by id without counting a view.
    pub async fn get_post(&self, id: Uuid) -> Result<PostView, DomainError> {
        let post = self.find_post(id).await?;
        Ok(self.resolve_one(post).await)
    }

    pub async fn add_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        content: &str,
    ) -> Result<CommentView, DomainError> {
        let comment = Comment::new(author_id, content, Utc::now())?;
        let comment = self
            .posts
            .append_comment(post_id, comment)
            .await
            .map_err(not_found_as("Post", post_id))?;

        tracing::info!(post_id = %post_id, comment_id = %comment.id, "Comment added");
        let authors = self.author_summaries([author_id].into_iter().collect()).await;
        Ok(CommentView::resolve(comment, &authors))
    }

    pub async fn list_posts(&self, params: &ListPostsParams) -> Result<PostPage, DomainError> {
        let query = self.query_builder.build(params)?;
        let (posts, total) = self.posts.find_page(&query).await?;

        Ok(PostPage {
            posts: self.resolve_many(posts).await,
            pagination: query.pagination(total),
        })
    }

    async fn find_post(&self, id: Uuid) -> Result<Post, DomainError> {
        self.posts
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Post", id))
    }

    /// Move one unit of post count from `old` to `new`. A vanished `old`
    /// category has nothing left to decrement and is tolerated.
    async fn move_post_count(&self, old: Uuid, new: Uuid) -> Result<(), DomainError> {
        if let Err(err) = self.ledger.adjust_post_count(new, 1).await {
            tracing::error!(category_id = %new, error = %err, "Post count increment failed");
            return Err(consistency_failure("re-categorize post", err));
        }

        match self.ledger.adjust_post_count(old, -1).await {
            Ok(_) => Ok(()),
            Err(DomainError::NotFound { .. }) => {
                tracing::warn!(category_id = %old, "Previous category no longer exists");
                Ok(())
            }
            Err(err) => {
                tracing::error!(category_id = %old, error = %err, "Post count decrement failed");
                if let Err(undo) = self.ledger.adjust_post_count(new, -1).await {
                    tracing::error!(category_id = %new, error = %undo, "Failed to revert post count increment");
                }
                Err(consistency_failure("re-categorize post", err))
            }
        }
    }

    async fn resolve_one(&self, post: Post) -> PostView {
        let (authors, categories) = self.lookups(std::slice::from_ref(&post)).await;
        let category = categories.get(&post.category_id).cloned();
        PostView::resolve(post, &authors, category)
    }

    async fn resolve_many(&self, posts: Vec<Post>) -> Vec<PostView> {
        let (authors, categories) = self.lookups(&posts).await;
        posts
            .into_iter()
            .map(|post| {
                let category = categories.get(&post.category_id).cloned();
                PostView::resolve(post, &authors, category)
            })
            .collect()
    }

    /// Resolve author, category and comment-author summaries for a batch.
    /// Lookup failures degrade to unresolved references.
    async fn lookups(
        &self,
        posts: &[Post],
    ) -> (HashMap<Uuid, AuthorSummary>, HashMap<Uuid, CategorySummary>) {
        let user_ids: HashSet<Uuid> = posts
            .iter()
            .flat_map(|p| std::iter::once(p.author_id).chain(p.comments.iter().map(|c| c.author_id)))
            .collect();
        let category_ids: Vec<Uuid> = posts
            .iter()
            .map(|p| p.category_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let authors = self.author_summaries(user_ids).await;
        let categories = match self.ledger.summaries(&category_ids).await {
            Ok(categories) => categories,
            Err(err) => {
                tracing::warn!(error = %err, "Category lookup failed");
                HashMap::new()
            }
        };
        (authors, categories)
    }

    async fn author_summaries(&self, ids: HashSet<Uuid>) -> HashMap<Uuid, AuthorSummary> {
        let ids: Vec<Uuid> = ids.into_iter().collect();
        match self.users.find_summaries(&ids).await {
            Ok(authors) => authors,
            Err(err) => {
                tracing::warn!(error = %err, "User directory lookup failed");
                HashMap::new()
            }
        }
    }
}

fn consistency_failure(operation: &str, cause: DomainError) -> DomainError {
    match cause {
        DomainError::ConsistencyFailure(msg) => {
            DomainError::ConsistencyFailure(format!("{operation}: {msg}"))
        }
        other => DomainError::ConsistencyFailure(format!("{operation}: {other}")),
    }
}
