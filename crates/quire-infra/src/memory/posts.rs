use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use quire_core::domain::{Comment, Post};
use quire_core::error::{RepoError, UniqueKey};
use quire_core::ports::{BaseRepository, PostStore};
use quire_core::query::PostQuery;

#[derive(Default)]
struct State {
    by_id: HashMap<Uuid, Post>,
    slugs: HashMap<String, Uuid>,
}

impl State {
    fn check_slug(&self, post: &Post) -> Result<(), RepoError> {
        if self.slugs.get(&post.slug).is_some_and(|id| *id != post.id) {
            return Err(RepoError::Duplicate {
                key: UniqueKey::PostSlug,
                value: post.slug.clone(),
            });
        }
        Ok(())
    }
}

/// In-memory post store. Comments live inside the post aggregate.
pub struct InMemoryPostStore {
    state: RwLock<State>,
}

impl InMemoryPostStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
        }
    }
}

impl Default for InMemoryPostStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryPostStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.state.read().await.by_id.get(&id).cloned())
    }

    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        let mut state = self.state.write().await;
        if state.by_id.contains_key(&post.id) {
            return Err(RepoError::Constraint(format!("post {} already exists", post.id)));
        }
        state.check_slug(&post)?;

        state.slugs.insert(post.slug.clone(), post.id);
        state.by_id.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        let mut state = self.state.write().await;
        let current = state.by_id.get(&post.id).ok_or(RepoError::NotFound)?;
        if current.revision != post.revision {
            return Err(RepoError::Conflict);
        }
        let old_slug = current.slug.clone();
        state.check_slug(&post)?;

        state.slugs.remove(&old_slug);
        state.slugs.insert(post.slug.clone(), post.id);

        // Counters and comments are owned by their own atomic paths.
        let stored = state.by_id.get_mut(&post.id).ok_or(RepoError::NotFound)?;
        stored.title = post.title;
        stored.slug = post.slug;
        stored.content = post.content;
        stored.excerpt = post.excerpt;
        stored.featured_image = post.featured_image;
        stored.category_id = post.category_id;
        stored.tags = post.tags;
        stored.status = post.status;
        stored.published_at = post.published_at;
        stored.updated_at = post.updated_at;
        stored.revision += 1;
        Ok(stored.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<Post, RepoError> {
        let mut state = self.state.write().await;
        let removed = state.by_id.remove(&id).ok_or(RepoError::NotFound)?;
        state.slugs.remove(&removed.slug);
        Ok(removed)
    }
}

#[async_trait]
impl PostStore for InMemoryPostStore {
    async fn increment_views(&self, slug: &str) -> Result<Option<Post>, RepoError> {
        let mut state = self.state.write().await;
        let Some(id) = state.slugs.get(slug).copied() else {
            return Ok(None);
        };
        Ok(state.by_id.get_mut(&id).map(|post| {
            post.views += 1;
            post.clone()
        }))
    }

    async fn append_comment(&self, post_id: Uuid, comment: Comment) -> Result<Comment, RepoError> {
        let mut state = self.state.write().await;
        let post = state.by_id.get_mut(&post_id).ok_or(RepoError::NotFound)?;
        post.comments.push(comment.clone());
        Ok(comment)
    }

    async fn find_page(&self, query: &PostQuery) -> Result<(Vec<Post>, u64), RepoError> {
        let state = self.state.read().await;

        let mut matches: Vec<(&Post, u32)> = state
            .by_id
            .values()
            .filter_map(|post| query.filter.matches(post).map(|score| (post, score)))
            .collect();

        matches.sort_by(|(a, a_score), (b, b_score)| {
            query
                .sort
                .iter()
                .map(|key| key.compare(a, b, *a_score, *b_score))
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| a.id.cmp(&b.id))
        });

        let total = matches.len() as u64;
        let page = matches
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit as usize)
            .map(|(post, _)| post.clone())
            .collect();

        Ok((page, total))
    }
}
