//! # kinship-db
//!
//! Profile stores for kinship.
//!
//! This crate provides:
//! - [`PgProfileStore`]: PostgreSQL, JSONB document columns
//! - [`MemoryProfileStore`]: in-process, for development and tests
//! - Connection pool management
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kinship_db::{connect, ProfileRepository};
//!
//! let repo: Arc<dyn ProfileRepository> = connect(std::env::var("DATABASE_URL").ok()).await?;
//! let profile = repo.get_by_id(id).await?;
//! ```

pub mod memory;
pub mod pool;
pub mod profiles;

use std::sync::Arc;

use tracing::info;

// Re-export core types
pub use kinship_core::*;

pub use memory::MemoryProfileStore;
pub use pool::{create_pool, PoolConfig};
pub use profiles::PgProfileStore;

/// Build the profile store for this process.
///
/// With a database URL the PostgreSQL store is used; without one the
/// in-memory store is, and its contents last only as long as the process.
pub async fn connect(database_url: Option<String>) -> Result<Arc<dyn ProfileRepository>> {
    match database_url.filter(|u| !u.trim().is_empty()) {
        Some(url) => {
            let pool = create_pool(&url, &PoolConfig::from_env()).await?;
            #[cfg(feature = "migrations")]
            pool::migrate(&pool).await?;
            Ok(Arc::new(PgProfileStore::new(pool)))
        }
        None => {
            info!(
                subsystem = "database",
                component = "store",
                "DATABASE_URL not set, profiles are kept in memory"
            );
            Ok(Arc::new(MemoryProfileStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_without_url_uses_memory() {
        let repo = connect(None).await.unwrap();
        let missing = uuid::Uuid::now_v7();
        assert!(matches!(
            repo.get_by_id(missing).await,
            Err(Error::ProfileNotFound(_))
        ));
        let blank = connect(Some("  ".to_string())).await.unwrap();
        assert!(blank
            .query_by_flags(ProfileQuery::default())
            .await
            .unwrap()
            .is_empty());
    }
}
