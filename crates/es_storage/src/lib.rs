use async_trait::async_trait;
use es_core::{CatalogStorage, Error, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

pub mod backends;

pub use backends::*;

#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn get_error_message() -> &'static str;
    async fn open(config: &StorageConfig) -> Result<Self> where Self: Sized;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    Sqlite,
}

impl Default for StorageKind {
    fn default() -> Self {
        Self::Memory
    }
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(Error::Config(format!("Unknown storage backend: {}", other))),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Sqlite => f.write_str("sqlite"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub kind: StorageKind,
    pub database_path: PathBuf,
}

impl StorageConfig {
    pub const DATABASE_ENV: &'static str = "EPISCOUT_DB";

    /// `path`, else `$EPISCOUT_DB`, else `episcout.db`.
    pub fn new(kind: StorageKind, path: Option<PathBuf>) -> Self {
        let database_path = path
            .or_else(|| std::env::var(Self::DATABASE_ENV).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("episcout.db"));
        Self { kind, database_path }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(StorageKind::default(), None)
    }
}

async fn open_backend<T>(config: &StorageConfig) -> Result<Arc<dyn CatalogStorage>>
where
    T: StorageBackend + CatalogStorage + 'static,
{
    let storage = T::open(config)
        .await
        .map_err(|e| Error::Storage(format!("{} ({})", T::get_error_message(), e)))?;
    info!("🏦 Storage backend initialized successfully (using {})", config.kind);
    Ok(Arc::new(storage))
}

pub async fn create_storage(config: &StorageConfig) -> Result<Arc<dyn CatalogStorage>> {
    match config.kind {
        StorageKind::Memory => open_backend::<InMemoryStorage>(config).await,
        #[cfg(feature = "sqlite")]
        StorageKind::Sqlite => open_backend::<SQLiteStorage>(config).await,
        #[cfg(not(feature = "sqlite"))]
        StorageKind::Sqlite => Err(Error::Config(
            "SQLite support not compiled in (enable the `sqlite` feature)".to_string(),
        )),
    }
}

/// Adds each keyword that is not stored yet; returns how many were added.
pub async fn seed_keywords(storage: &dyn CatalogStorage, keywords: &[&str]) -> Result<usize> {
    let mut added = 0;
    for keyword in keywords {
        match storage.create_keyword(keyword).await {
            Ok(_) => added += 1,
            Err(Error::AlreadyExists(_)) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(added)
}

pub mod prelude {
    pub use super::{create_storage, StorageConfig, StorageKind};
    pub use super::backends::*;
}

#[cfg(test)]
mod tests {
    use super::*;
    use es_core::ArticleStorage;

    #[test]
    fn test_storage_kind_from_str() {
        assert_eq!("memory".parse::<StorageKind>().unwrap(), StorageKind::Memory);
        assert_eq!("SQLite".parse::<StorageKind>().unwrap(), StorageKind::Sqlite);
        assert!(matches!("postgres".parse::<StorageKind>(), Err(Error::Config(_))));
    }

    #[test]
    fn test_explicit_path_wins() {
        let config = StorageConfig::new(StorageKind::Sqlite, Some(PathBuf::from("/tmp/x.db")));
        assert_eq!(config.database_path, PathBuf::from("/tmp/x.db"));
    }

    #[tokio::test]
    async fn test_create_memory_storage_and_seed() {
        let storage = create_storage(&StorageConfig::new(StorageKind::Memory, None)).await.unwrap();
        let added = seed_keywords(storage.as_ref(), &["sởi", "cúm A", "sởi"]).await.unwrap();
        assert_eq!(added, 2);
        assert_eq!(storage.list_keywords().await.unwrap(), vec!["cúm A".to_string(), "sởi".to_string()]);
    }
}
