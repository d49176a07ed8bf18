use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use quire_core::domain::Category;
use quire_core::error::{RepoError, UniqueKey};
use quire_core::ports::{BaseRepository, CategoryStore};

#[derive(Default)]
struct State {
    by_id: HashMap<Uuid, Category>,
    slugs: HashMap<String, Uuid>,
    names: HashMap<String, Uuid>,
}

impl State {
    /// Check the unique indexes for `category`, ignoring its own entries.
    fn check_unique(&self, category: &Category) -> Result<(), RepoError> {
        if self.names.get(&category.name).is_some_and(|id| *id != category.id) {
            return Err(RepoError::Duplicate {
                key: UniqueKey::CategoryName,
                value: category.name.clone(),
            });
        }
        if self.slugs.get(&category.slug).is_some_and(|id| *id != category.id) {
            return Err(RepoError::Duplicate {
                key: UniqueKey::CategorySlug,
                value: category.slug.clone(),
            });
        }
        Ok(())
    }
}

/// In-memory category store.
pub struct InMemoryCategoryStore {
    state: RwLock<State>,
}

impl InMemoryCategoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
        }
    }
}

impl Default for InMemoryCategoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseRepository<Category, Uuid> for InMemoryCategoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, RepoError> {
        Ok(self.state.read().await.by_id.get(&id).cloned())
    }

    async fn insert(&self, category: Category) -> Result<Category, RepoError> {
        let mut state = self.state.write().await;
        if state.by_id.contains_key(&category.id) {
            return Err(RepoError::Constraint(format!(
                "category {} already exists",
                category.id
            )));
        }
        state.check_unique(&category)?;

        state.names.insert(category.name.clone(), category.id);
        state.slugs.insert(category.slug.clone(), category.id);
        state.by_id.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update(&self, category: Category) -> Result<Category, RepoError> {
        let mut state = self.state.write().await;
        let current = state.by_id.get(&category.id).ok_or(RepoError::NotFound)?;
        let (old_name, old_slug) = (current.name.clone(), current.slug.clone());
        state.check_unique(&category)?;

        state.names.remove(&old_name);
        state.slugs.remove(&old_slug);
        state.names.insert(category.name.clone(), category.id);
        state.slugs.insert(category.slug.clone(), category.id);

        let stored = state.by_id.get_mut(&category.id).ok_or(RepoError::NotFound)?;
        stored.name = category.name;
        stored.slug = category.slug;
        stored.description = category.description;
        stored.color = category.color;
        stored.updated_at = category.updated_at;
        Ok(stored.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<Category, RepoError> {
        let mut state = self.state.write().await;
        let removed = state.by_id.remove(&id).ok_or(RepoError::NotFound)?;
        state.names.remove(&removed.name);
        state.slugs.remove(&removed.slug);
        Ok(removed)
    }
}

#[async_trait]
impl CategoryStore for InMemoryCategoryStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .slugs
            .get(slug)
            .and_then(|id| state.by_id.get(id))
            .cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Category>, RepoError> {
        let state = self.state.read().await;
        Ok(ids.iter().filter_map(|id| state.by_id.get(id)).cloned().collect())
    }

    async fn list(&self) -> Result<Vec<Category>, RepoError> {
        let state = self.state.read().await;
        let mut categories: Vec<Category> = state.by_id.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn adjust_post_count(&self, id: Uuid, delta: i64) -> Result<i64, RepoError> {
        let mut state = self.state.write().await;
        let category = state.by_id.get_mut(&id).ok_or(RepoError::NotFound)?;
        let count = category.post_count + delta;
        if count < 0 {
            return Err(RepoError::Constraint(format!(
                "post count of category {id} cannot drop below zero"
            )));
        }
        category.post_count = count;
        Ok(count)
    }
}
