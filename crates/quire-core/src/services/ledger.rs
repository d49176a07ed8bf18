use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::not_found_as;
use crate::domain::{Category, CategoryPatch, CategorySummary, NewCategory};
use crate::error::{DomainError, RepoError};
use crate::ports::CategoryStore;

/// What happens to a category that posts still reference when it is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CategoryDeletePolicy {
    /// Delete unconditionally; referencing posts keep a dangling id.
    #[default]
    Orphan,
    /// Refuse to delete while the post count is non-zero.
    Restrict,
}

impl FromStr for CategoryDeletePolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "orphan" => Ok(Self::Orphan),
            "restrict" => Ok(Self::Restrict),
            other => Err(DomainError::invalid(format!(
                "unknown category delete policy {other:?}"
            ))),
        }
    }
}

/// Owns categories and their denormalized post counts.
pub struct CategoryLedger {
    store: Arc<dyn CategoryStore>,
    delete_policy: CategoryDeletePolicy,
}

impl CategoryLedger {
    pub fn new(store: Arc<dyn CategoryStore>, delete_policy: CategoryDeletePolicy) -> Self {
        Self {
            store,
            delete_policy,
        }
    }

    pub async fn create_category(&self, new: NewCategory) -> Result<Category, DomainError> {
        let category = Category::create(new, Utc::now())?;
        let category = self.store.insert(category).await?;

        tracing::info!(
            category_id = %category.id,
            slug = %category.slug,
            "Category created"
        );
        Ok(category)
    }

    pub async fn update_category(
        &self,
        id: Uuid,
        patch: CategoryPatch,
    ) -> Result<Category, DomainError> {
        let mut category = self.get_category(id).await?;
        if patch.is_empty() {
            return Ok(category);
        }

        let renamed = category.apply_patch(patch, Utc::now())?;
        let category = self
            .store
            .update(category)
            .await
            .map_err(not_found_as("Category", id))?;

        tracing::info!(category_id = %id, renamed, slug = %category.slug, "Category updated");
        Ok(category)
    }

    pub async fn delete_category(&self, id: Uuid) -> Result<Category, DomainError> {
        if self.delete_policy == CategoryDeletePolicy::Restrict {
            let category = self.get_category(id).await?;
            if category.post_count > 0 {
                return Err(DomainError::CategoryInUse(category.slug));
            }
        }

        let removed = self
            .store
            .delete(id)
            .await
            .map_err(not_found_as("Category", id))?;

        if removed.post_count > 0 {
            tracing::warn!(
                category_id = %id,
                post_count = removed.post_count,
                "Deleted category is still referenced by posts"
            );
        } else {
            tracing::info!(category_id = %id, "Category deleted");
        }
        Ok(removed)
    }

    /// Atomically add `delta` to a category's post count.
    pub async fn adjust_post_count(&self, id: Uuid, delta: i64) -> Result<i64, DomainError> {
        let count = self
            .store
            .adjust_post_count(id, delta)
            .await
            .map_err(|err| match err {
                RepoError::NotFound => DomainError::not_found("Category", id),
                RepoError::Constraint(msg) => DomainError::ConsistencyFailure(msg),
                other => other.into(),
            })?;

        tracing::debug!(category_id = %id, delta, post_count = count, "Post count adjusted");
        Ok(count)
    }

    pub async fn get_category(&self, id: Uuid) -> Result<Category, DomainError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Category", id))
    }

    pub async fn get_category_by_slug(&self, slug: &str) -> Result<Category, DomainError> {
        self.store
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::not_found("Category", slug))
    }

    /// All categories ordered by name.
    pub async fn list_categories(&self) -> Result<Vec<Category>, DomainError> {
        Ok(self.store.list().await?)
    }

    pub(crate) async fn summaries(
        &self,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, CategorySummary>, DomainError> {
        let categories = self.store.find_by_ids(ids).await?;
        Ok(categories
            .into_iter()
            .map(|c| (c.id, c.summary()))
            .collect())
    }
}
