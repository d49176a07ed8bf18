use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::AuthorSummary;
use crate::error::RepoError;

/// Read access to the user store owned by the identity service.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve display summaries for the given users. Unknown ids are
    /// simply absent from the result.
    async fn find_summaries(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, AuthorSummary>, RepoError>;
}
