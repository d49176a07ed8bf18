use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::ConnectionTrait;

/// Tables, unique indexes and the full-text index used by the content
/// stores. The unique index names are matched when classifying
/// duplicate-key errors.
const UP: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        username VARCHAR(50) NOT NULL,
        avatar TEXT,
        bio TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_username ON users(username)",
    r#"
    CREATE TABLE categories (
        id UUID PRIMARY KEY,
        name VARCHAR(50) NOT NULL,
        slug VARCHAR(64) NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        color VARCHAR(32) NOT NULL DEFAULT '#3B82F6',
        post_count BIGINT NOT NULL DEFAULT 0 CHECK (post_count >= 0),
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE UNIQUE INDEX idx_categories_name ON categories(name)",
    "CREATE UNIQUE INDEX idx_categories_slug ON categories(slug)",
    r#"
    CREATE TABLE posts (
        id UUID PRIMARY KEY,
        title VARCHAR(200) NOT NULL,
        slug VARCHAR(256) NOT NULL,
        content TEXT NOT NULL,
        excerpt TEXT NOT NULL,
        featured_image TEXT NOT NULL DEFAULT '',
        author_id UUID NOT NULL,
        category_id UUID NOT NULL,
        tags JSONB NOT NULL DEFAULT '[]'::jsonb,
        status VARCHAR(16) NOT NULL DEFAULT 'draft',
        views BIGINT NOT NULL DEFAULT 0,
        likes BIGINT NOT NULL DEFAULT 0,
        published_at TIMESTAMPTZ,
        revision BIGINT NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE UNIQUE INDEX idx_posts_slug ON posts(slug)",
    "CREATE INDEX idx_posts_status_published_at ON posts(status, published_at DESC)",
    "CREATE INDEX idx_posts_category_id ON posts(category_id)",
    "CREATE INDEX idx_posts_author_id ON posts(author_id)",
    r#"
    CREATE INDEX idx_posts_search ON posts
    USING GIN (to_tsvector('simple', title || ' ' || content || ' ' || excerpt))
    "#,
    r#"
    CREATE TABLE post_comments (
        id UUID PRIMARY KEY,
        post_id UUID NOT NULL REFERENCES posts(id) ON UPDATE CASCADE ON DELETE CASCADE,
        author_id UUID NOT NULL,
        content TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX idx_post_comments_post_id ON post_comments(post_id, created_at)",
];

// The users table belongs to the identity service and is left in place.
const DOWN: &[&str] = &[
    "DROP TABLE IF EXISTS post_comments",
    "DROP TABLE IF EXISTS posts",
    "DROP TABLE IF EXISTS categories",
];

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        for statement in UP {
            db.execute_unprepared(statement).await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        for statement in DOWN {
            db.execute_unprepared(statement).await?;
        }
        Ok(())
    }
}
