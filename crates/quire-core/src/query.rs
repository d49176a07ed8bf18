//! Listing query construction.
//!
//! [`QueryBuilder`] turns raw listing parameters into a [`PostQuery`]: one
//! filter (status, optional category, optional text search), an ordered list
//! of sort keys and an offset/limit window. Stores execute the same
//! description twice, once for the page and once for the total count.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Post, PostStatus};
use crate::error::DomainError;

pub const DEFAULT_SORT: &str = "-publishedAt";

const MAX_OFFSET: u64 = i64::MAX as u64;

/// Page size bounds for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingLimits {
    pub default_page_size: u64,
    pub max_page_size: u64,
}

impl Default for ListingLimits {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

/// Raw listing parameters as received from any transport.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPostsParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    PublishedAt,
    CreatedAt,
    UpdatedAt,
    Title,
    Views,
    Likes,
    /// Text relevance; only meaningful together with a search.
    Relevance,
}

impl SortField {
    fn parse(name: &str) -> Option<Self> {
        let field = match name {
            "publishedAt" | "published_at" => SortField::PublishedAt,
            "createdAt" | "created_at" => SortField::CreatedAt,
            "updatedAt" | "updated_at" => SortField::UpdatedAt,
            "title" => SortField::Title,
            "views" => SortField::Views,
            "likes" => SortField::Likes,
            "score" | "relevance" => SortField::Relevance,
            _ => return None,
        };
        Some(field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortKey {
    /// Compare two posts on this key. Relevance is compared on the scores
    /// supplied by the caller. A missing `published_at` sorts before any
    /// instant, so it lands first ascending and last descending.
    pub fn compare(&self, a: &Post, b: &Post, a_score: u32, b_score: u32) -> Ordering {
        let ordering = match self.field {
            SortField::PublishedAt => a.published_at.cmp(&b.published_at),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortField::Title => a.title.cmp(&b.title),
            SortField::Views => a.views.cmp(&b.views),
            SortField::Likes => a.likes.cmp(&b.likes),
            SortField::Relevance => a_score.cmp(&b_score),
        };
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Parse a sort string such as `"-publishedAt title"`.
pub fn parse_sort(raw: &str, has_search: bool) -> Result<Vec<SortKey>, DomainError> {
    let mut keys: Vec<SortKey> = Vec::new();

    for token in raw
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
    {
        let (direction, name) = match token.strip_prefix('-') {
            Some(name) => (SortDirection::Desc, name),
            None => (SortDirection::Asc, token.strip_prefix('+').unwrap_or(token)),
        };
        let field = SortField::parse(name)
            .ok_or_else(|| DomainError::invalid(format!("unknown sort field {name:?}")))?;

        if keys.iter().any(|k| k.field == field) {
            continue;
        }
        match field {
            SortField::Relevance if !has_search => continue,
            SortField::Relevance => keys.push(SortKey {
                field,
                direction: SortDirection::Desc,
            }),
            _ => keys.push(SortKey { field, direction }),
        }
    }

    Ok(keys)
}

/// Free-text search: OR-matched terms plus excluded terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSearch {
    pub terms: Vec<String>,
    pub excluded: Vec<String>,
}

impl TextSearch {
    /// Tokenize a search string. Words prefixed with `-` are exclusions.
    /// Returns `None` when the input holds no searchable words.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut terms = Vec::new();
        let mut excluded = Vec::new();

        for word in raw.split_whitespace() {
            let (target, word) = match word.strip_prefix('-') {
                Some(rest) => (&mut excluded, rest),
                None => (&mut terms, word),
            };
            for token in tokenize(word) {
                if !target.contains(&token) {
                    target.push(token);
                }
            }
        }

        if terms.is_empty() && excluded.is_empty() {
            None
        } else {
            Some(Self { terms, excluded })
        }
    }

    /// Relevance of a post: number of term occurrences across title,
    /// content and excerpt. `None` when the post does not match.
    pub fn score(&self, post: &Post) -> Option<u32> {
        let mut score = 0u32;
        for field in [&post.title, &post.content, &post.excerpt] {
            for token in tokenize(field) {
                if self.excluded.contains(&token) {
                    return None;
                }
                if self.terms.contains(&token) {
                    score += 1;
                }
            }
        }
        (score > 0).then_some(score)
    }

    /// Render as a PostgreSQL `tsquery`. Tokens are alphanumeric only, so no
    /// escaping is needed. `None` when there is nothing to OR-match.
    pub fn to_tsquery(&self) -> Option<String> {
        if self.terms.is_empty() {
            return None;
        }
        let mut query = format!("({})", self.terms.join(" | "));
        for token in &self.excluded {
            query.push_str(" & !");
            query.push_str(token);
        }
        Some(query)
    }
}

/// Split on every non-alphanumeric character and lowercase. PostgreSQL's
/// `simple` parser differs for compound tokens: it keeps hosts, emails and
/// paths such as `example.com` whole, so `example` matches them here but not
/// in the PostgreSQL store.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Filter part of a listing query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostFilter {
    pub status: PostStatus,
    pub category: Option<Uuid>,
    pub search: Option<TextSearch>,
}

impl PostFilter {
    /// Evaluate the filter against a post, returning its relevance score
    /// (zero without a search) when it matches.
    pub fn matches(&self, post: &Post) -> Option<u32> {
        if post.status != self.status {
            return None;
        }
        if self.category.is_some_and(|c| c != post.category_id) {
            return None;
        }
        match &self.search {
            Some(search) => search.score(post),
            None => Some(0),
        }
    }
}

/// A fully resolved listing query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    pub filter: PostFilter,
    pub sort: Vec<SortKey>,
    pub page: u64,
    pub limit: u64,
}

impl PostQuery {
    /// Rows to skip. Saturates at the largest offset PostgreSQL accepts, so
    /// an absurd page number reads past the end instead of overflowing.
    pub fn offset(&self) -> u64 {
        (self.page - 1)
            .saturating_mul(self.limit)
            .min(MAX_OFFSET)
    }

    pub fn pagination(&self, total: u64) -> Pagination {
        Pagination::new(self.page, self.limit, total)
    }
}

/// Builds [`PostQuery`] values from raw parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryBuilder {
    limits: ListingLimits,
}

impl QueryBuilder {
    pub fn new(limits: ListingLimits) -> Self {
        Self { limits }
    }

    pub fn build(&self, params: &ListPostsParams) -> Result<PostQuery, DomainError> {
        let page = params
            .page
            .as_deref()
            .and_then(parse_leading_int)
            .unwrap_or(1)
            .max(1) as u64;

        let limit = params
            .limit
            .as_deref()
            .and_then(parse_leading_int)
            .map(|l| l.clamp(1, self.limits.max_page_size as i64) as u64)
            .unwrap_or(self.limits.default_page_size);

        let status = match non_blank(&params.status) {
            Some(status) => status.parse()?,
            None => PostStatus::Published,
        };

        let category = non_blank(&params.category)
            .map(|c| {
                Uuid::parse_str(c)
                    .map_err(|_| DomainError::invalid(format!("invalid category id {c:?}")))
            })
            .transpose()?;

        let search = non_blank(&params.search).and_then(TextSearch::parse);
        let sort = parse_sort(
            non_blank(&params.sort).unwrap_or(DEFAULT_SORT),
            search.is_some(),
        )?;

        tracing::debug!(
            page,
            limit,
            status = %status,
            category = ?category,
            search = ?search,
            "Built post listing query"
        );

        Ok(PostQuery {
            filter: PostFilter {
                status,
                category,
                search,
            },
            sort,
            page,
            limit,
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Leading-integer parse: `"2"`, `" 3 "`, `"4abc"` all parse; `"abc"` does not.
fn parse_leading_int(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let digits_start = usize::from(raw.starts_with(['-', '+']));
    let digits_end = raw[digits_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(raw.len(), |i| i + digits_start);
    if digits_end == digits_start {
        return None;
    }
    raw[..digits_end].parse().ok()
}

/// Pagination metadata returned with every listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_posts: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(current_page: u64, limit: u64, total_posts: u64) -> Self {
        let total_pages = total_posts.div_ceil(limit);
        Self {
            current_page,
            total_pages,
            total_posts,
            has_next: current_page < total_pages,
            has_prev: current_page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ListPostsParams {
        ListPostsParams::default()
    }

    #[test]
    fn defaults_to_published_first_page_newest_first() {
        let query = QueryBuilder::default().build(&params()).unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 10);
        assert_eq!(query.offset(), 0);
        assert_eq!(query.filter.status, PostStatus::Published);
        assert!(query.filter.category.is_none());
        assert!(query.filter.search.is_none());
        assert_eq!(
            query.sort,
            vec![SortKey {
                field: SortField::PublishedAt,
                direction: SortDirection::Desc
            }]
        );
    }

    #[test]
    fn page_and_limit_are_coerced() {
        let builder = QueryBuilder::default();
        let query = builder
            .build(&ListPostsParams {
                page: Some("0".into()),
                limit: Some("abc".into()),
                ..params()
            })
            .unwrap();
        assert_eq!((query.page, query.limit), (1, 10));

        let query = builder
            .build(&ListPostsParams {
                page: Some("-4".into()),
                limit: Some("5000".into()),
                ..params()
            })
            .unwrap();
        assert_eq!((query.page, query.limit), (1, 100));

        let query = builder
            .build(&ListPostsParams {
                page: Some("3rd".into()),
                limit: Some("5".into()),
                ..params()
            })
            .unwrap();
        assert_eq!((query.page, query.limit, query.offset()), (3, 5, 10));
    }

    #[test]
    fn huge_page_saturates_offset() {
        let query = QueryBuilder::default()
            .build(&ListPostsParams {
                page: Some("9223372036854775807".into()),
                limit: Some("10".into()),
                ..params()
            })
            .unwrap();

        assert_eq!(query.page, 9_223_372_036_854_775_807);
        assert_eq!(query.offset(), i64::MAX as u64);

        let pagination = query.pagination(3);
        assert_eq!(pagination.current_page, 9_223_372_036_854_775_807);
        assert_eq!(pagination.total_pages, 1);
        assert!(!pagination.has_next);
        assert!(pagination.has_prev);
    }

    #[test]
    fn rejects_unknown_status_and_category() {
        let builder = QueryBuilder::default();
        let err = builder
            .build(&ListPostsParams {
                status: Some("deleted".into()),
                ..params()
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));

        let err = builder
            .build(&ListPostsParams {
                category: Some("not-a-uuid".into()),
                ..params()
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn parses_multi_key_sort() {
        let keys = parse_sort("-views, title", false).unwrap();
        assert_eq!(
            keys,
            vec![
                SortKey {
                    field: SortField::Views,
                    direction: SortDirection::Desc
                },
                SortKey {
                    field: SortField::Title,
                    direction: SortDirection::Asc
                },
            ]
        );
        assert!(parse_sort("-popularity", false).is_err());
    }

    #[test]
    fn relevance_requires_search() {
        assert!(parse_sort("score", false).unwrap().is_empty());
        let keys = parse_sort("score", true).unwrap();
        assert_eq!(keys[0].direction, SortDirection::Desc);
    }

    #[test]
    fn search_tokens_and_exclusions() {
        let search = TextSearch::parse("Database  -MongoDB tuning!").unwrap();
        assert_eq!(search.terms, vec!["database", "tuning"]);
        assert_eq!(search.excluded, vec!["mongodb"]);
        assert_eq!(
            search.to_tsquery().as_deref(),
            Some("(database | tuning) & !mongodb")
        );
        assert!(TextSearch::parse(" !!! ").is_none());
    }

    #[test]
    fn compound_tokens_are_split_in_memory() {
        let post = Post::create(
            crate::domain::NewPost {
                title: "Hosting notes".to_string(),
                content: "Mail admin@example.com or visit example.com/docs".to_string(),
                excerpt: None,
                featured_image: None,
                category_id: Uuid::new_v4(),
                tags: vec![],
                status: None,
            },
            Uuid::new_v4(),
            chrono::Utc::now(),
        )
        .unwrap();

        let search = TextSearch::parse("example.com").unwrap();
        assert_eq!(search.terms, vec!["example", "com"]);
        assert!(TextSearch::parse("example").unwrap().score(&post).is_some());
        assert!(TextSearch::parse("docs -admin").unwrap().score(&post).is_none());
    }

    #[test]
    fn pagination_metadata() {
        let p = Pagination::new(2, 5, 12);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next);
        assert!(p.has_prev);

        let empty = Pagination::new(1, 10, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
        assert!(!empty.has_prev);
    }
}
