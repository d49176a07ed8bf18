//! Slug derivation for categories and posts.
//!
//! Categories and posts use slightly different rules and the difference is
//! observable in the generated slugs: a category keeps hyphens typed into its
//! name (`"Rust-Lang"` becomes `rust-lang`), while a post title drops them
//! before spaces are joined (`"Rust-Lang Tips"` becomes `rustlang-tips`).
//! Word characters are ASCII only.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static NON_CATEGORY_SLUG_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]+").unwrap());
static NON_TITLE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_ ]+").unwrap());
static SPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r" +").unwrap());

/// Derive a category slug: lowercase, whitespace runs to `-`, then drop
/// everything outside `[a-z0-9_-]`.
pub fn category_slug(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let hyphenated = WHITESPACE_RUN.replace_all(&lowered, "-");
    NON_CATEGORY_SLUG_CHARS
        .replace_all(&hyphenated, "")
        .into_owned()
}

/// Derive a post slug: lowercase, drop everything that is not a word
/// character or a space, then join space runs with `-`.
pub fn post_slug(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    let stripped = NON_TITLE_CHARS.replace_all(&lowered, "");
    SPACE_RUN.replace_all(&stripped, "-").into_owned()
}
