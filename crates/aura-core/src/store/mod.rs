mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::config::AuraConfig;
use crate::error::{AuraError, Result};

/// Key under which the session gate persists its authentication flag.
pub const AUTH_FLAG_KEY: &str = "aura_auth";

/// Scoped, durable string key-value store (the `localStorage` of the app).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> impl std::future::Future<Output = Result<Option<String>>> + Send;

    fn set(&self, key: &str, value: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    fn remove(&self, key: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Enum wrapper over the concrete stores.
/// Using an enum instead of `Box<dyn KeyValueStore>` because the trait uses RPITIT.
pub enum Store {
    Sqlite(SqliteStore),
    Memory(MemoryStore),
}

impl KeyValueStore for Store {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self {
            Store::Sqlite(s) => s.get(key).await,
            Store::Memory(s) => s.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        match self {
            Store::Sqlite(s) => s.set(key, value).await,
            Store::Memory(s) => s.set(key, value).await,
        }
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match self {
            Store::Sqlite(s) => s.remove(key).await,
            Store::Memory(s) => s.remove(key).await,
        }
    }
}

impl Store {
    pub fn backend_name(&self) -> &'static str {
        match self {
            Store::Sqlite(_) => "sqlite",
            Store::Memory(_) => "memory",
        }
    }
}

/// Create a store from the given configuration.
pub fn create_store(config: &AuraConfig) -> Result<Store> {
    match config.storage.backend.as_str() {
        "sqlite" => {
            let path = match &config.storage.path {
                Some(p) => std::path::PathBuf::from(p),
                None => default_sqlite_path()?,
            };
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AuraError::Storage(format!(
                        "failed to create {}: {e}",
                        parent.display()
                    ))
                })?;
            }
            Ok(Store::Sqlite(SqliteStore::open(&path)?))
        }
        "memory" => Ok(Store::Memory(MemoryStore::new())),
        other => Err(AuraError::Config(format!(
            "unknown storage backend: {other}"
        ))),
    }
}

/// Default SQLite path: `~/.config/aura/aura.db`
fn default_sqlite_path() -> Result<std::path::PathBuf> {
    dirs::config_dir()
        .map(|p| p.join("aura").join("aura.db"))
        .ok_or_else(|| AuraError::Config("cannot determine config directory".to_string()))
}
