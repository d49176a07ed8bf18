//! Store wiring - picks the storage backend and assembles the services.

use std::sync::Arc;

use quire_core::ports::{CategoryStore, PostStore, UserDirectory};
use quire_core::{CategoryLedger, PostRepository, QueryBuilder};

use crate::config::ContentConfig;
use crate::memory::{InMemoryCategoryStore, InMemoryPostStore, InMemoryUserDirectory};

#[cfg(feature = "postgres")]
use crate::database::{
    connect, PostgresCategoryStore, PostgresPostStore, PostgresUserDirectory,
};

/// The storage adapters backing the content services.
#[derive(Clone)]
pub struct ContentStores {
    pub categories: Arc<dyn CategoryStore>,
    pub posts: Arc<dyn PostStore>,
    pub users: Arc<dyn UserDirectory>,
}

/// The content services built on top of a set of stores.
#[derive(Clone)]
pub struct ContentServices {
    pub categories: Arc<CategoryLedger>,
    pub posts: Arc<PostRepository>,
}

impl ContentStores {
    /// Stores that keep everything in process memory.
    pub fn in_memory() -> Self {
        Self {
            categories: Arc::new(InMemoryCategoryStore::new()),
            posts: Arc::new(InMemoryPostStore::new()),
            users: Arc::new(InMemoryUserDirectory::new()),
        }
    }

    /// Build the stores for a configuration: PostgreSQL when a database is
    /// configured and reachable, in-memory otherwise.
    pub async fn init(config: &ContentConfig) -> Self {
        #[cfg(feature = "postgres")]
        {
            if let Some(db_config) = &config.database {
                match connect(db_config).await {
                    Ok(db) => {
                        let db = Arc::new(db);
                        return Self {
                            categories: Arc::new(PostgresCategoryStore::new(db.clone())),
                            posts: Arc::new(PostgresPostStore::new(db.clone())),
                            users: Arc::new(PostgresUserDirectory::new(db)),
                        };
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to connect to database: {}. Using in-memory fallback.",
                            e
                        );
                        return Self::in_memory();
                    }
                }
            }
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
        }

        #[cfg(not(feature = "postgres"))]
        {
            if config.database.is_some() {
                tracing::warn!("Database configured but postgres feature is disabled");
            }
            tracing::info!("Running without postgres feature - using in-memory stores");
        }

        Self::in_memory()
    }

    /// Assemble the category ledger and post repository.
    pub fn services(&self, config: &ContentConfig) -> ContentServices {
        let categories = Arc::new(CategoryLedger::new(
            self.categories.clone(),
            config.category_delete_policy,
        ));
        let posts = Arc::new(PostRepository::new(
            self.posts.clone(),
            categories.clone(),
            self.users.clone(),
            QueryBuilder::new(config.listing),
        ));

        tracing::info!("Content services initialized");
        ContentServices { categories, posts }
    }
}
