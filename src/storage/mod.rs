//! Storage implementations.
//!
//! Every backend implements the full [`Store`] capability set; which one
//! serves requests is decided once at startup by [`init_storage`].

use std::sync::Arc;

use tracing::{error, info};

use crate::config::{StorageConfig, StorageType};
use crate::interfaces::Store;
use crate::model::Stage;

pub mod file;
pub mod helpers;
pub mod mock;
pub mod schema;
pub mod sql;

pub use file::FileStore;
pub use mock::MemoryStore;
pub use sql::SqlStore;

#[cfg(feature = "postgres")]
pub use sql::postgres::PostgresStore;
#[cfg(feature = "sqlite")]
pub use sql::sqlite::SqliteStore;

/// Workflow stages seeded by the migrations, used by the in-memory store.
pub fn default_stages() -> Vec<Stage> {
    [
        (1, "pending", 10),
        (2, "queued", 20),
        (3, "processing", 30),
        (4, "completed", 40),
        (5, "cancelled", 50),
    ]
    .into_iter()
    .map(|(id, name, workflow)| Stage {
        id,
        name: name.to_string(),
        workflow,
    })
    .collect()
}

/// Initialize storage based on configuration.
///
/// Relational backends are migrated before they are handed out.
pub async fn init_storage(
    config: &StorageConfig,
) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    match config.storage_type {
        #[cfg(feature = "sqlite")]
        StorageType::Sqlite => {
            info!(path = %config.sqlite.path, "Storage: sqlite");
            if let Some(parent) = std::path::Path::new(&config.sqlite.path).parent() {
                std::fs::create_dir_all(parent)?;
            }

            let pool =
                sqlx::SqlitePool::connect(&format!("sqlite:{}?mode=rwc", config.sqlite.path))
                    .await?;

            let store = SqliteStore::new(pool);
            store.migrate().await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "sqlite"))]
        StorageType::Sqlite => {
            error!("SQLite storage requested but 'sqlite' feature is not enabled");
            Err("SQLite feature not enabled".into())
        }
        #[cfg(feature = "postgres")]
        StorageType::Postgres => {
            info!(max_connections = config.postgres.max_connections, "Storage: postgres");
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.postgres.max_connections)
                .connect_with(sql::postgres::connect_options(&config.postgres.uri)?)
                .await?;

            let store = PostgresStore::new(pool);
            store.migrate().await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "postgres"))]
        StorageType::Postgres => {
            error!("PostgreSQL storage requested but 'postgres' feature is not enabled");
            Err("PostgreSQL feature not enabled".into())
        }
        StorageType::File => {
            info!(dir = %config.file.dir, "Storage: file");
            let store = FileStore::open(&config.file.dir).map_err(|e| {
                error!(dir = %config.file.dir, error = %e, "cannot open file storage");
                e
            })?;
            Ok(Arc::new(store))
        }
        StorageType::Memory => {
            info!("Storage: memory");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
