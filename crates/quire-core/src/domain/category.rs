use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::slug::category_slug;

pub const DEFAULT_CATEGORY_COLOR: &str = "#3B82F6";

const MAX_NAME_CHARS: usize = 50;
const MAX_DESCRIPTION_CHARS: usize = 200;
/// Matches the width of the `categories.color` column.
const MAX_COLOR_CHARS: usize = 32;

/// Category entity - groups posts and carries their denormalized count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub color: String,
    pub post_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating a category.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
}

/// Partial update of a category. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

impl CategoryPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Display fields of a category embedded in post views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub color: String,
}

impl Category {
    /// Build a new category with a zero post count and a derived slug.
    pub fn create(new: NewCategory, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let name = validate_name(&new.name)?;
        let slug = derive_slug(&name)?;
        let description = new.description.unwrap_or_default();
        validate_description(&description)?;
        let color = validate_color(new.color.as_deref().unwrap_or_default())?;

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            slug,
            description,
            color,
            post_count: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a patch in place. The slug is re-derived only when the name
    /// actually changed. Returns whether the name changed.
    pub fn apply_patch(
        &mut self,
        patch: CategoryPatch,
        now: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let mut name_changed = false;

        if let Some(name) = patch.name {
            let name = validate_name(&name)?;
            if name != self.name {
                self.slug = derive_slug(&name)?;
                self.name = name;
                name_changed = true;
            }
        }
        if let Some(description) = patch.description {
            validate_description(&description)?;
            self.description = description;
        }
        if let Some(color) = patch.color {
            self.color = validate_color(&color)?;
        }
        self.updated_at = now;

        Ok(name_changed)
    }

    pub fn summary(&self) -> CategorySummary {
        CategorySummary {
            id: self.id,
            name: self.name.clone(),
            slug: self.slug.clone(),
            color: self.color.clone(),
        }
    }
}

fn validate_name(name: &str) -> Result<String, DomainError> {
    let name = name.trim();
    let len = name.chars().count();
    if len == 0 {
        return Err(DomainError::invalid("category name is required"));
    }
    if len > MAX_NAME_CHARS {
        return Err(DomainError::invalid(format!(
            "category name must be at most {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_string())
}

fn validate_description(description: &str) -> Result<(), DomainError> {
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(DomainError::invalid(format!(
            "category description must be at most {MAX_DESCRIPTION_CHARS} characters"
        )));
    }
    Ok(())
}

/// Blank means the default color.
fn validate_color(color: &str) -> Result<String, DomainError> {
    let color = color.trim();
    if color.is_empty() {
        return Ok(DEFAULT_CATEGORY_COLOR.to_string());
    }
    if color.chars().count() > MAX_COLOR_CHARS {
        return Err(DomainError::invalid(format!(
            "category color must be at most {MAX_COLOR_CHARS} characters"
        )));
    }
    Ok(color.to_string())
}

fn derive_slug(name: &str) -> Result<String, DomainError> {
    let slug = category_slug(name);
    if slug.is_empty() {
        return Err(DomainError::invalid(format!(
            "category name {name:?} does not produce a usable slug"
        )));
    }
    Ok(slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_category(name: &str) -> NewCategory {
        NewCategory {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn create_derives_slug_and_defaults() {
        let category = Category::create(new_category("  Web Development "), Utc::now()).unwrap();
        assert_eq!(category.name, "Web Development");
        assert_eq!(category.slug, "web-development");
        assert_eq!(category.color, DEFAULT_CATEGORY_COLOR);
        assert_eq!(category.post_count, 0);
        assert!(category.description.is_empty());
    }

    #[test]
    fn create_rejects_long_name() {
        let err = Category::create(new_category(&"x".repeat(51)), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn color_is_bounded() {
        let category = Category::create(
            NewCategory {
                color: Some("rgba(59, 130, 246, 0.5)".to_string()),
                ..new_category("Design")
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(category.color, "rgba(59, 130, 246, 0.5)");

        let err = Category::create(
            NewCategory {
                color: Some("x".repeat(33)),
                ..new_category("Design")
            },
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));

        let mut category = category;
        let err = category
            .apply_patch(
                CategoryPatch {
                    color: Some("x".repeat(33)),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
        assert_eq!(category.color, "rgba(59, 130, 246, 0.5)");
    }

    #[test]
    fn create_rejects_name_without_slug_characters() {
        let err = Category::create(new_category("!!!"), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn patch_without_name_keeps_slug() {
        let mut category = Category::create(new_category("Rust"), Utc::now()).unwrap();
        let changed = category
            .apply_patch(
                CategoryPatch {
                    description: Some("Systems programming".to_string()),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();
        assert!(!changed);
        assert_eq!(category.slug, "rust");
        assert_eq!(category.description, "Systems programming");
    }

    #[test]
    fn patch_with_name_rederives_slug() {
        let mut category = Category::create(new_category("Rust"), Utc::now()).unwrap();
        let changed = category
            .apply_patch(
                CategoryPatch {
                    name: Some("Rust Lang".to_string()),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();
        assert!(changed);
        assert_eq!(category.slug, "rust-lang");
    }
}
