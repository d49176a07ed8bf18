//! PostgreSQL store implementations.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, NullOrdering};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbConn, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use quire_core::domain::{AuthorSummary, Category, Comment, Post};
use quire_core::error::{RepoError, UniqueKey};
use quire_core::ports::{BaseRepository, CategoryStore, PostStore, UserDirectory};
use quire_core::query::{PostQuery, SortDirection, SortField};

use super::entity::category::{self, Entity as CategoryEntity};
use super::entity::comment::{self, Entity as CommentEntity};
use super::entity::post::{self, Entity as PostEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::errors::{read_err, write_err};

/// Searchable document of a post. Must match the full-text index created by
/// the migration.
const POST_DOCUMENT: &str = "to_tsvector('simple', title || ' ' || content || ' ' || excerpt)";

/// PostgreSQL category store.
pub struct PostgresCategoryStore {
    db: Arc<DbConn>,
}

impl PostgresCategoryStore {
    pub fn new(db: Arc<DbConn>) -> Self {
        Self { db }
    }
}

fn category_value(category: &Category) -> impl Fn(UniqueKey) -> String + '_ {
    move |key| match key {
        UniqueKey::CategoryName => category.name.clone(),
        _ => category.slug.clone(),
    }
}

#[async_trait]
impl BaseRepository<Category, Uuid> for PostgresCategoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, RepoError> {
        let result = CategoryEntity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(read_err)?;

        Ok(result.map(Into::into))
    }

    async fn insert(&self, category: Category) -> Result<Category, RepoError> {
        let model = category::ActiveModel::from(category.clone())
            .insert(self.db.as_ref())
            .await
            .map_err(|e| write_err(e, category_value(&category)))?;

        Ok(model.into())
    }

    async fn update(&self, category: Category) -> Result<Category, RepoError> {
        tracing::debug!(category_id = %category.id, "Updating category");

        let updated = CategoryEntity::update_many()
            .set(category::editable_columns(category.clone()))
            .filter(category::Column::Id.eq(category.id))
            .exec_with_returning(self.db.as_ref())
            .await
            .map_err(|e| write_err(e, category_value(&category)))?;

        updated
            .into_iter()
            .next()
            .map(Into::into)
            .ok_or(RepoError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<Category, RepoError> {
        let txn = self.db.begin().await.map_err(read_err)?;

        let existing = CategoryEntity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(read_err)?
            .ok_or(RepoError::NotFound)?;

        CategoryEntity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(read_err)?;
        txn.commit().await.map_err(read_err)?;

        Ok(existing.into())
    }
}

#[async_trait]
impl CategoryStore for PostgresCategoryStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError> {
        let result = CategoryEntity::find()
            .filter(category::Column::Slug.eq(slug))
            .one(self.db.as_ref())
            .await
            .map_err(read_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Category>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let result = CategoryEntity::find()
            .filter(category::Column::Id.is_in(ids.iter().copied()))
            .all(self.db.as_ref())
            .await
            .map_err(read_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn list(&self) -> Result<Vec<Category>, RepoError> {
        let result = CategoryEntity::find()
            .order_by_asc(category::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(read_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn adjust_post_count(&self, id: Uuid, delta: i64) -> Result<i64, RepoError> {
        // Single guarded statement: the row is only touched when the result
        // stays non-negative.
        let updated = CategoryEntity::update_many()
            .col_expr(
                category::Column::PostCount,
                Expr::col(category::Column::PostCount).add(delta),
            )
            .filter(category::Column::Id.eq(id))
            .filter(category::Column::PostCount.gte(-delta))
            .exec_with_returning(self.db.as_ref())
            .await
            .map_err(read_err)?;

        if let Some(model) = updated.into_iter().next() {
            return Ok(model.post_count);
        }

        match self.find_by_id(id).await? {
            Some(_) => Err(RepoError::Constraint(format!(
                "post count of category {id} cannot drop below zero"
            ))),
            None => Err(RepoError::NotFound),
        }
    }
}

/// PostgreSQL post store. Comments are kept in `post_comments`.
pub struct PostgresPostStore {
    db: Arc<DbConn>,
}

impl PostgresPostStore {
    pub fn new(db: Arc<DbConn>) -> Self {
        Self { db }
    }

    async fn exists(&self, id: Uuid) -> Result<bool, RepoError> {
        let found = PostEntity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(read_err)?;
        Ok(found.is_some())
    }
}

fn post_value(post: &Post) -> impl Fn(UniqueKey) -> String + '_ {
    move |_| post.slug.clone()
}

/// Load the comments of `post_ids`, oldest first, grouped by post.
async fn load_comments<C>(
    conn: &C,
    post_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<comment::Model>>, RepoError>
where
    C: ConnectionTrait,
{
    let mut grouped: HashMap<Uuid, Vec<comment::Model>> = HashMap::new();
    if post_ids.is_empty() {
        return Ok(grouped);
    }

    let rows = CommentEntity::find()
        .filter(comment::Column::PostId.is_in(post_ids.iter().copied()))
        .order_by_asc(comment::Column::CreatedAt)
        .order_by_asc(comment::Column::Id)
        .all(conn)
        .await
        .map_err(read_err)?;

    for row in rows {
        grouped.entry(row.post_id).or_default().push(row);
    }
    Ok(grouped)
}

/// Attach comments to post rows, keeping the row order.
async fn hydrate<C>(conn: &C, models: Vec<post::Model>) -> Result<Vec<Post>, RepoError>
where
    C: ConnectionTrait,
{
    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
    let mut comments = load_comments(conn, &ids).await?;

    models
        .into_iter()
        .map(|model| {
            let own = comments.remove(&model.id).unwrap_or_default();
            model.into_domain(own)
        })
        .collect()
}

async fn hydrate_one<C>(conn: &C, model: post::Model) -> Result<Post, RepoError>
where
    C: ConnectionTrait,
{
    let comments = load_comments(conn, &[model.id]).await?;
    let own = comments.into_values().next().unwrap_or_default();
    model.into_domain(own)
}

#[async_trait]
impl BaseRepository<Post, Uuid> for PostgresPostStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let result = PostEntity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(read_err)?;

        match result {
            Some(model) => Ok(Some(hydrate_one(self.db.as_ref(), model).await?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        let txn = self.db.begin().await.map_err(read_err)?;

        let model = post::ActiveModel::from(post.clone())
            .insert(&txn)
            .await
            .map_err(|e| write_err(e, post_value(&post)))?;

        if !post.comments.is_empty() {
            let rows = post
                .comments
                .iter()
                .cloned()
                .map(|c| comment::active_model(post.id, c));
            CommentEntity::insert_many(rows)
                .exec(&txn)
                .await
                .map_err(read_err)?;
        }

        let stored = hydrate_one(&txn, model).await?;
        txn.commit().await.map_err(read_err)?;
        Ok(stored)
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        tracing::debug!(post_id = %post.id, revision = post.revision, "Updating post");

        let updated = PostEntity::update_many()
            .set(post::editable_columns(post.clone()))
            .filter(post::Column::Id.eq(post.id))
            .filter(post::Column::Revision.eq(post.revision))
            .exec_with_returning(self.db.as_ref())
            .await
            .map_err(|e| write_err(e, post_value(&post)))?;

        if let Some(model) = updated.into_iter().next() {
            return hydrate_one(self.db.as_ref(), model).await;
        }
        if self.exists(post.id).await? {
            Err(RepoError::Conflict)
        } else {
            Err(RepoError::NotFound)
        }
    }

    async fn delete(&self, id: Uuid) -> Result<Post, RepoError> {
        let txn = self.db.begin().await.map_err(read_err)?;

        let model = PostEntity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(read_err)?
            .ok_or(RepoError::NotFound)?;
        let removed = hydrate_one(&txn, model).await?;

        // Comments go with the post through the cascading foreign key.
        PostEntity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(read_err)?;
        txn.commit().await.map_err(read_err)?;

        Ok(removed)
    }
}

#[async_trait]
impl PostStore for PostgresPostStore {
    async fn increment_views(&self, slug: &str) -> Result<Option<Post>, RepoError> {
        let updated = PostEntity::update_many()
            .col_expr(post::Column::Views, Expr::col(post::Column::Views).add(1))
            .filter(post::Column::Slug.eq(slug))
            .exec_with_returning(self.db.as_ref())
            .await
            .map_err(read_err)?;

        match updated.into_iter().next() {
            Some(model) => Ok(Some(hydrate_one(self.db.as_ref(), model).await?)),
            None => Ok(None),
        }
    }

    async fn append_comment(&self, post_id: Uuid, comment: Comment) -> Result<Comment, RepoError> {
        let model = comment::active_model(post_id, comment)
            .insert(self.db.as_ref())
            .await
            .map_err(|e| write_err(e, |_| post_id.to_string()))?;

        Ok(model.into())
    }

    async fn find_page(&self, query: &PostQuery) -> Result<(Vec<Post>, u64), RepoError> {
        let mut select = PostEntity::find()
            .filter(post::Column::Status.eq(query.filter.status.as_str()));

        if let Some(category_id) = query.filter.category {
            select = select.filter(post::Column::CategoryId.eq(category_id));
        }

        let tsquery = match &query.filter.search {
            Some(search) => match search.to_tsquery() {
                Some(tsquery) => Some(tsquery),
                // Exclusions alone match nothing.
                None => return Ok((Vec::new(), 0)),
            },
            None => None,
        };
        if let Some(tsquery) = &tsquery {
            select = select.filter(Expr::cust_with_values(
                format!("{POST_DOCUMENT} @@ to_tsquery('simple', ?)"),
                [tsquery.clone()],
            ));
        }

        let total = select.clone().count(self.db.as_ref()).await.map_err(read_err)?;
        if total == 0 {
            return Ok((Vec::new(), 0));
        }

        for key in &query.sort {
            let order = match key.direction {
                SortDirection::Asc => Order::Asc,
                SortDirection::Desc => Order::Desc,
            };
            select = match key.field {
                // Unpublished posts sort as earlier than any instant.
                SortField::PublishedAt => {
                    let nulls = match key.direction {
                        SortDirection::Asc => NullOrdering::First,
                        SortDirection::Desc => NullOrdering::Last,
                    };
                    select.order_by_with_nulls(post::Column::PublishedAt, order, nulls)
                }
                SortField::CreatedAt => select.order_by(post::Column::CreatedAt, order),
                SortField::UpdatedAt => select.order_by(post::Column::UpdatedAt, order),
                SortField::Title => select.order_by(post::Column::Title, order),
                SortField::Views => select.order_by(post::Column::Views, order),
                SortField::Likes => select.order_by(post::Column::Likes, order),
                SortField::Relevance => match &tsquery {
                    Some(tsquery) => select.order_by(
                        Expr::cust_with_values(
                            format!("ts_rank({POST_DOCUMENT}, to_tsquery('simple', ?))"),
                            [tsquery.clone()],
                        ),
                        order,
                    ),
                    None => select,
                },
            };
        }

        let models = select
            .order_by_asc(post::Column::Id)
            .offset(query.offset())
            .limit(query.limit)
            .all(self.db.as_ref())
            .await
            .map_err(read_err)?;

        let posts = hydrate(self.db.as_ref(), models).await?;
        Ok((posts, total))
    }
}

/// Author lookups against the shared `users` table.
pub struct PostgresUserDirectory {
    db: Arc<DbConn>,
}

impl PostgresUserDirectory {
    pub fn new(db: Arc<DbConn>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn find_summaries(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, AuthorSummary>, RepoError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let users = UserEntity::find()
            .filter(user::Column::Id.is_in(ids.iter().copied()))
            .all(self.db.as_ref())
            .await
            .map_err(read_err)?;

        Ok(users
            .into_iter()
            .map(|model| (model.id, AuthorSummary::from(model)))
            .collect())
    }
}
