//! Post entity for SeaORM. Comments live in their own table.

use sea_orm::entity::prelude::*;
use sea_orm::{NotSet, Set};

use quire_core::domain::{Comment, Post};
use quire_core::error::RepoError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    #[sea_orm(unique)]
    pub slug: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    #[sea_orm(column_type = "Text")]
    pub excerpt: String,
    pub featured_image: String,
    pub author_id: Uuid,
    pub category_id: Uuid,
    #[sea_orm(column_type = "JsonBinary")]
    pub tags: Json,
    pub status: String,
    pub views: i64,
    pub likes: i64,
    pub published_at: Option<DateTimeWithTimeZone>,
    pub revision: i64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Rebuild the domain post from its row and its comment rows.
    pub fn into_domain(self, comments: Vec<super::comment::Model>) -> Result<Post, RepoError> {
        let status = self
            .status
            .parse()
            .map_err(|_| RepoError::Query(format!("unknown post status {:?}", self.status)))?;
        let tags: Vec<String> = serde_json::from_value(self.tags)
            .map_err(|e| RepoError::Query(format!("malformed tags on post {}: {e}", self.id)))?;

        Ok(Post {
            id: self.id,
            title: self.title,
            slug: self.slug,
            content: self.content,
            excerpt: self.excerpt,
            featured_image: self.featured_image,
            author_id: self.author_id,
            category_id: self.category_id,
            tags,
            status,
            views: self.views,
            likes: self.likes,
            comments: comments.into_iter().map(Comment::from).collect(),
            published_at: self.published_at.map(Into::into),
            revision: self.revision,
            created_at: self.created_at.into(),
            updated_at: self.updated_at.into(),
        })
    }
}

/// Conversion from Domain Post to SeaORM ActiveModel. Comments are not part
/// of the row.
impl From<Post> for ActiveModel {
    fn from(post: Post) -> Self {
        Self {
            id: Set(post.id),
            title: Set(post.title),
            slug: Set(post.slug),
            content: Set(post.content),
            excerpt: Set(post.excerpt),
            featured_image: Set(post.featured_image),
            author_id: Set(post.author_id),
            category_id: Set(post.category_id),
            tags: Set(Json::from(post.tags)),
            status: Set(post.status.as_str().to_string()),
            views: Set(post.views),
            likes: Set(post.likes),
            published_at: Set(post.published_at.map(Into::into)),
            revision: Set(post.revision),
            created_at: Set(post.created_at.into()),
            updated_at: Set(post.updated_at.into()),
        }
    }
}

/// ActiveModel carrying the editable columns and the next revision.
/// Counters, author and creation time stay untouched.
pub fn editable_columns(post: Post) -> ActiveModel {
    ActiveModel {
        title: Set(post.title),
        slug: Set(post.slug),
        content: Set(post.content),
        excerpt: Set(post.excerpt),
        featured_image: Set(post.featured_image),
        category_id: Set(post.category_id),
        tags: Set(Json::from(post.tags)),
        status: Set(post.status.as_str().to_string()),
        published_at: Set(post.published_at.map(Into::into)),
        revision: Set(post.revision + 1),
        updated_at: Set(post.updated_at.into()),
        id: NotSet,
        author_id: NotSet,
        views: NotSet,
        likes: NotSet,
        created_at: NotSet,
    }
}
