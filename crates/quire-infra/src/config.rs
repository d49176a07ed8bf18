//! Content repository configuration loaded from environment variables.

use std::env;

use quire_core::{CategoryDeletePolicy, ListingLimits};

use crate::database::DatabaseConfig;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Content repository configuration.
#[derive(Debug, Clone, Default)]
pub struct ContentConfig {
    /// `None` runs on the in-memory stores.
    pub database: Option<DatabaseConfig>,
    pub listing: ListingLimits,
    pub category_delete_policy: CategoryDeletePolicy,
}

impl ContentConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_or = |key: &str, default: u64| {
            lookup(key)
                .and_then(|s| s.trim().parse::<u64>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(default)
        };

        let database = match lookup("DATABASE_URL") {
            Some(url) => {
                let max_connections = parse_connections(&lookup, "DB_MAX_CONNECTIONS").unwrap_or(20);
                let min_connections = parse_connections(&lookup, "DB_MIN_CONNECTIONS")
                    .unwrap_or_else(|| max_connections.min(2));
                if min_connections > max_connections {
                    return Err(ConfigError::Invalid {
                        key: "DB_MIN_CONNECTIONS",
                        value: min_connections.to_string(),
                    });
                }
                Some(DatabaseConfig {
                    url,
                    max_connections,
                    min_connections,
                })
            }
            None => None,
        };

        let defaults = ListingLimits::default();
        let max_page_size = parse_or("POSTS_MAX_PAGE_SIZE", defaults.max_page_size);
        let default_page_size =
            parse_or("POSTS_DEFAULT_PAGE_SIZE", defaults.default_page_size).min(max_page_size);

        let category_delete_policy = match lookup("CATEGORY_DELETE_POLICY") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                key: "CATEGORY_DELETE_POLICY",
                value,
            })?,
            None => CategoryDeletePolicy::default(),
        };

        Ok(Self {
            database,
            listing: ListingLimits {
                default_page_size,
                max_page_size,
            },
            category_delete_policy,
        })
    }
}

/// Pool sizes are `u32`; out-of-range or non-positive values count as unset.
fn parse_connections<F>(lookup: &F, key: &str) -> Option<u32>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = ContentConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.database.is_none());
        assert_eq!(config.listing, ListingLimits::default());
        assert_eq!(config.category_delete_policy, CategoryDeletePolicy::Orphan);
    }

    #[test]
    fn reads_database_and_listing_settings() {
        let config = ContentConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/quire"),
            ("DB_MAX_CONNECTIONS", "50"),
            ("POSTS_DEFAULT_PAGE_SIZE", "25"),
            ("POSTS_MAX_PAGE_SIZE", "not-a-number"),
            ("CATEGORY_DELETE_POLICY", "restrict"),
        ]))
        .unwrap();

        let database = config.database.unwrap();
        assert_eq!(database.url, "postgres://localhost/quire");
        assert_eq!(database.max_connections, 50);
        assert_eq!(database.min_connections, 2);
        assert_eq!(config.listing.default_page_size, 25);
        assert_eq!(config.listing.max_page_size, 100);
        assert_eq!(config.category_delete_policy, CategoryDeletePolicy::Restrict);
    }

    #[test]
    fn default_page_size_is_capped_by_max() {
        let config = ContentConfig::from_lookup(lookup(&[
            ("POSTS_DEFAULT_PAGE_SIZE", "40"),
            ("POSTS_MAX_PAGE_SIZE", "30"),
        ]))
        .unwrap();
        assert_eq!(config.listing.default_page_size, 30);
    }

    #[test]
    fn oversized_pool_size_takes_default() {
        let config = ContentConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/quire"),
            ("DB_MAX_CONNECTIONS", "4294967297"),
        ]))
        .unwrap();
        assert_eq!(config.database.unwrap().max_connections, 20);
    }

    #[test]
    fn default_min_connections_follows_small_max() {
        let config = ContentConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/quire"),
            ("DB_MAX_CONNECTIONS", "1"),
        ]))
        .unwrap();
        let database = config.database.unwrap();
        assert_eq!((database.max_connections, database.min_connections), (1, 1));
    }

    #[test]
    fn rejects_min_connections_above_max() {
        let err = ContentConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/quire"),
            ("DB_MAX_CONNECTIONS", "4"),
            ("DB_MIN_CONNECTIONS", "8"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "DB_MIN_CONNECTIONS", .. }));
    }

    #[test]
    fn rejects_unknown_delete_policy() {
        let err = ContentConfig::from_lookup(lookup(&[("CATEGORY_DELETE_POLICY", "cascade")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "CATEGORY_DELETE_POLICY", .. }));
    }
}
