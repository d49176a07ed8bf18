use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of the user issuing a write, as supplied by the identity layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// Elevated roles may mutate content they did not author.
    pub fn is_elevated(self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// The identity behind a write operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    pub id: Uuid,
    pub role: Role,
}

impl Requester {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    /// Only the original author or an elevated role may mutate a post.
    pub fn may_modify(&self, author_id: Uuid) -> bool {
        self.id == author_id || self.role.is_elevated()
    }
}

/// Display fields of a user, resolved from the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}
