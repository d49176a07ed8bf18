use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use quire_core::domain::AuthorSummary;
use quire_core::error::RepoError;
use quire_core::ports::UserDirectory;

/// In-memory user directory.
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<Uuid, AuthorSummary>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
        }
    }

    /// Register or replace a user's display fields.
    pub async fn upsert(&self, user: AuthorSummary) {
        self.users.write().await.insert(user.id, user);
    }
}

impl Default for InMemoryUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_summaries(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, AuthorSummary>, RepoError> {
        let users = self.users.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| users.get(id).map(|u| (*id, u.clone())))
            .collect())
    }
}
