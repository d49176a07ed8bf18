use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::category::CategorySummary;
use super::user::AuthorSummary;
use crate::error::DomainError;
use crate::slug::post_slug;

const MAX_TITLE_CHARS: usize = 200;
const MAX_EXCERPT_CHARS: usize = 300;
const MAX_COMMENT_CHARS: usize = 1000;
const EXCERPT_SOURCE_CHARS: usize = 200;

static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Publication state of a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl PostStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
            PostStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            "archived" => Ok(PostStatus::Archived),
            other => Err(DomainError::invalid(format!(
                "status must be one of draft, published, archived (got {other:?})"
            ))),
        }
    }
}

/// A comment embedded in a post. Comments are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Validate and build a comment. Content is stored trimmed.
    pub fn new(author_id: Uuid, content: &str, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(DomainError::invalid("comment content is required"));
        }
        if content.chars().count() > MAX_COMMENT_CHARS {
            return Err(DomainError::invalid(format!(
                "comment must be at most {MAX_COMMENT_CHARS} characters"
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            author_id,
            content: content.to_string(),
            created_at: now,
        })
    }
}

/// Post entity - a blog post with its embedded comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub featured_image: String,
    pub author_id: Uuid,
    pub category_id: Uuid,
    pub tags: Vec<String>,
    pub status: PostStatus,
    pub views: i64,
    pub likes: i64,
    pub comments: Vec<Comment>,
    pub published_at: Option<DateTime<Utc>>,
    /// Write version, bumped by the store on every edit.
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating a post.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub featured_image: Option<String>,
    pub category_id: Uuid,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: Option<PostStatus>,
}

/// Partial update of a post. `None` leaves the field untouched; the author
/// is not patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub featured_image: Option<String>,
    pub category_id: Option<Uuid>,
    pub tags: Option<Vec<String>>,
    pub status: Option<PostStatus>,
}

impl PostPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Which fields a patch actually changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostChanges {
    pub title: bool,
    pub content: bool,
    pub excerpt: bool,
    pub status: bool,
    pub first_publish: bool,
    /// `(old, new)` when the post moved to another category.
    pub category: Option<(Uuid, Uuid)>,
    pub other: bool,
}

impl PostChanges {
    pub fn any(&self) -> bool {
        self.title
            || self.content
            || self.excerpt
            || self.status
            || self.category.is_some()
            || self.other
    }
}

impl Post {
    /// Validate the fields of a new post and run the derivation steps:
    /// slug from title, excerpt from content, `published_at` on publish.
    pub fn create(new: NewPost, author_id: Uuid, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let title = validate_title(&new.title)?;
        let slug = derive_slug(&title)?;
        validate_content(&new.content)?;

        let excerpt = match new.excerpt.filter(|e| !e.trim().is_empty()) {
            Some(excerpt) => validate_excerpt(excerpt)?,
            None => derive_excerpt(&new.content),
        };
        let status = new.status.unwrap_or_default();
        let published_at = (status == PostStatus::Published).then_some(now);

        Ok(Self {
            id: Uuid::new_v4(),
            title,
            slug,
            content: new.content,
            excerpt,
            featured_image: new.featured_image.unwrap_or_default(),
            author_id,
            category_id: new.category_id,
            tags: normalize_tags(new.tags),
            status,
            views: 0,
            likes: 0,
            comments: Vec::new(),
            published_at,
            revision: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a patch in place and report which fields changed. Derived fields
    /// are recomputed only from fields this patch changed.
    pub fn apply_patch(
        &mut self,
        patch: PostPatch,
        now: DateTime<Utc>,
    ) -> Result<PostChanges, DomainError> {
        let mut changes = PostChanges::default();

        if let Some(title) = patch.title {
            let title = validate_title(&title)?;
            if title != self.title {
                self.slug = derive_slug(&title)?;
                self.title = title;
                changes.title = true;
            }
        }

        if let Some(content) = patch.content {
            validate_content(&content)?;
            if content != self.content {
                self.content = content;
                changes.content = true;
            }
        }

        // An explicitly blank excerpt asks for a derived one.
        let mut rederive_excerpt = changes.content;
        if let Some(excerpt) = patch.excerpt {
            if excerpt.trim().is_empty() {
                rederive_excerpt = true;
            } else {
                let excerpt = validate_excerpt(excerpt)?;
                rederive_excerpt = false;
                if excerpt != self.excerpt {
                    self.excerpt = excerpt;
                    changes.excerpt = true;
                }
            }
        }
        if rederive_excerpt {
            let derived = derive_excerpt(&self.content);
            if derived != self.excerpt {
                self.excerpt = derived;
                changes.excerpt = true;
            }
        }

        if let Some(featured_image) = patch.featured_image
            && featured_image != self.featured_image
        {
            self.featured_image = featured_image;
            changes.other = true;
        }

        if let Some(tags) = patch.tags {
            let tags = normalize_tags(tags);
            if tags != self.tags {
                self.tags = tags;
                changes.other = true;
            }
        }

        if let Some(category_id) = patch.category_id
            && category_id != self.category_id
        {
            changes.category = Some((self.category_id, category_id));
            self.category_id = category_id;
        }

        if let Some(status) = patch.status
            && status != self.status
        {
            self.status = status;
            changes.status = true;
            if status == PostStatus::Published && self.published_at.is_none() {
                self.published_at = Some(now);
                changes.first_publish = true;
            }
        }

        if changes.any() {
            self.updated_at = now;
        }
        Ok(changes)
    }
}

/// Excerpt derived from content: the first 200 characters with markup tags
/// removed, followed by an ellipsis.
pub fn derive_excerpt(content: &str) -> String {
    let head: String = content.chars().take(EXCERPT_SOURCE_CHARS).collect();
    let mut excerpt = MARKUP_TAG.replace_all(&head, "").into_owned();
    excerpt.push_str("...");
    excerpt
}

fn validate_title(title: &str) -> Result<String, DomainError> {
    let title = title.trim();
    let len = title.chars().count();
    if len == 0 {
        return Err(DomainError::invalid("title is required"));
    }
    if len > MAX_TITLE_CHARS {
        return Err(DomainError::invalid(format!(
            "title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(title.to_string())
}

fn validate_content(content: &str) -> Result<(), DomainError> {
    if content.trim().is_empty() {
        return Err(DomainError::invalid("content is required"));
    }
    Ok(())
}

fn validate_excerpt(excerpt: String) -> Result<String, DomainError> {
    if excerpt.chars().count() > MAX_EXCERPT_CHARS {
        return Err(DomainError::invalid(format!(
            "excerpt must be at most {MAX_EXCERPT_CHARS} characters"
        )));
    }
    Ok(excerpt)
}

fn derive_slug(title: &str) -> Result<String, DomainError> {
    let slug = post_slug(title);
    if slug.is_empty() {
        return Err(DomainError::invalid(format!(
            "title {title:?} does not produce a usable slug"
        )));
    }
    Ok(slug)
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// A comment with its author resolved for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author: Option<AuthorSummary>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl CommentView {
    pub fn resolve(comment: Comment, authors: &HashMap<Uuid, AuthorSummary>) -> Self {
        Self {
            id: comment.id,
            author: authors.get(&comment.author_id).cloned(),
            author_id: comment.author_id,
            content: comment.content,
            created_at: comment.created_at,
        }
    }
}

/// A post with author, category and comment authors resolved to summaries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub featured_image: String,
    pub author_id: Uuid,
    pub author: Option<AuthorSummary>,
    pub category_id: Uuid,
    pub category: Option<CategorySummary>,
    pub tags: Vec<String>,
    pub status: PostStatus,
    pub views: i64,
    pub likes: i64,
    pub comments: Vec<CommentView>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostView {
    pub fn resolve(
        post: Post,
        authors: &HashMap<Uuid, AuthorSummary>,
        category: Option<CategorySummary>,
    ) -> Self {
        Self {
            id: post.id,
            title: post.title,
            slug: post.slug,
            content: post.content,
            excerpt: post.excerpt,
            featured_image: post.featured_image,
            author: authors.get(&post.author_id).cloned(),
            author_id: post.author_id,
            category_id: post.category_id,
            category,
            tags: post.tags,
            status: post.status,
            views: post.views,
            likes: post.likes,
            comments: post
                .comments
                .into_iter()
                .map(|c| CommentView::resolve(c, authors))
                .collect(),
            published_at: post.published_at,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_post(title: &str, content: &str) -> NewPost {
        NewPost {
            title: title.to_string(),
            content: content.to_string(),
            excerpt: None,
            featured_image: None,
            category_id: Uuid::new_v4(),
            tags: vec![],
            status: None,
        }
    }

    #[test]
    fn create_defaults_to_draft_without_publish_stamp() {
        let post = Post::create(new_post("Hello World", "Body"), Uuid::new_v4(), Utc::now()).unwrap();
        assert_eq!(post.status, PostStatus::Draft);
        assert_eq!(post.slug, "hello-world");
        assert!(post.published_at.is_none());
        assert_eq!(post.excerpt, "Body...");
    }

    #[test]
    fn create_published_stamps_published_at() {
        let now = Utc::now();
        let mut new = new_post("Launch", "Body");
        new.status = Some(PostStatus::Published);
        let post = Post::create(new, Uuid::new_v4(), now).unwrap();
        assert_eq!(post.published_at, Some(now));
    }

    #[test]
    fn create_keeps_explicit_excerpt() {
        let mut new = new_post("Title", "Body");
        new.excerpt = Some("Hand written".to_string());
        let post = Post::create(new, Uuid::new_v4(), Utc::now()).unwrap();
        assert_eq!(post.excerpt, "Hand written");
    }

    #[test]
    fn create_rejects_blank_content() {
        let err = Post::create(new_post("Title", "   "), Uuid::new_v4(), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn excerpt_strips_tags_after_truncation() {
        let content = format!("<p>{}</p>", "a".repeat(300));
        let excerpt = derive_excerpt(&content);
        assert_eq!(excerpt, format!("{}...", "a".repeat(197)));
    }

    #[test]
    fn title_change_updates_slug_only() {
        let mut post =
            Post::create(new_post("Old Title", "Body"), Uuid::new_v4(), Utc::now()).unwrap();
        let excerpt = post.excerpt.clone();
        let changes = post
            .apply_patch(
                PostPatch {
                    title: Some("New Title".to_string()),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();
        assert!(changes.title);
        assert!(!changes.excerpt);
        assert_eq!(post.slug, "new-title");
        assert_eq!(post.excerpt, excerpt);
        assert!(post.published_at.is_none());
    }

    #[test]
    fn publishing_twice_stamps_once() {
        let mut post = Post::create(new_post("Title", "Body"), Uuid::new_v4(), Utc::now()).unwrap();
        let publish = PostPatch {
            status: Some(PostStatus::Published),
            ..Default::default()
        };
        let first = post.apply_patch(publish.clone(), Utc::now()).unwrap();
        assert!(first.first_publish);
        let stamped = post.published_at;

        post.apply_patch(
            PostPatch {
                status: Some(PostStatus::Archived),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        let second = post.apply_patch(publish, Utc::now()).unwrap();
        assert!(!second.first_publish);
        assert_eq!(post.published_at, stamped);
    }

    #[test]
    fn content_change_rederives_excerpt_unless_supplied() {
        let mut post = Post::create(new_post("Title", "First"), Uuid::new_v4(), Utc::now()).unwrap();
        post.apply_patch(
            PostPatch {
                content: Some("Second".to_string()),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(post.excerpt, "Second...");

        post.apply_patch(
            PostPatch {
                content: Some("Third".to_string()),
                excerpt: Some("Custom".to_string()),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(post.excerpt, "Custom");
    }

    #[test]
    fn category_change_is_reported() {
        let mut post = Post::create(new_post("Title", "Body"), Uuid::new_v4(), Utc::now()).unwrap();
        let old = post.category_id;
        let new = Uuid::new_v4();
        let changes = post
            .apply_patch(
                PostPatch {
                    category_id: Some(new),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(changes.category, Some((old, new)));
    }

    #[test]
    fn whitespace_comment_is_rejected() {
        let err = Comment::new(Uuid::new_v4(), "   ", Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn comment_is_trimmed_and_bounded() {
        let comment = Comment::new(Uuid::new_v4(), "  nice post  ", Utc::now()).unwrap();
        assert_eq!(comment.content, "nice post");
        assert!(Comment::new(Uuid::new_v4(), &"x".repeat(1001), Utc::now()).is_err());
    }

    #[test]
    fn unresolved_references_serialize_as_null() {
        let mut post = Post::create(new_post("Hello", "World"), Uuid::new_v4(), Utc::now()).unwrap();
        post.comments
            .push(Comment::new(Uuid::new_v4(), "first", Utc::now()).unwrap());

        let view = PostView::resolve(post, &HashMap::new(), None);
        let json = serde_json::to_value(&view).unwrap();

        assert!(json["author"].is_null());
        assert!(json["category"].is_null());
        assert!(json["comments"][0]["author"].is_null());
        assert_eq!(json["status"], "draft");
        assert!(json.get("featuredImage").is_some());
        assert!(json["publishedAt"].is_null());
    }
}
