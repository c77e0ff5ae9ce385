//! Storage backends
//!
//! The service keeps two pieces of shared state:
//! - a timestamp-scored set of sends (quota tracking)
//! - a hash of counters (send statistics)
//!
//! Every mutation is a single store-side atomic operation; callers never do
//! read-modify-write across round trips.
//!
//! Backends:
//! - [`memory`]: in-process store, the default
//! - [`sqlite`]: SQLite via `sqlx`, survives restarts

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;

/// Ordered set of members scored by an integer (sorted-set semantics)
#[async_trait]
pub trait ScoredSetStore: Send + Sync {
    /// Insert `member` with `score`, replacing the score if it already exists
    async fn add(&self, key: &str, score: i64, member: &str) -> Result<()>;

    /// Number of members with `min <= score <= max`
    async fn count_between(&self, key: &str, min: i64, max: i64) -> Result<u64>;

    /// Remove members with `score < floor`, returning how many were removed
    async fn remove_below(&self, key: &str, floor: i64) -> Result<u64>;
}

/// Hash of integer counters
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment every field by one as a single atomic unit
    async fn increment(&self, key: &str, fields: &[&str]) -> Result<()>;

    /// All fields of the hash; empty when the key was never written
    async fn get_all(&self, key: &str) -> Result<HashMap<String, i64>>;
}

/// Store handles shared by the quota tracker and the stats aggregator
#[derive(Clone)]
pub struct Stores {
    pub sends: Arc<dyn ScoredSetStore>,
    pub counters: Arc<dyn CounterStore>,
}

impl Stores {
    /// Both handles backed by the same store
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: ScoredSetStore + CounterStore + 'static,
    {
        Self {
            sends: store.clone(),
            counters: store,
        }
    }

    /// Open the backend selected in configuration
    pub async fn open(config: &StorageConfig) -> Result<Self> {
        match config.backend {
            StorageBackend::Memory => Ok(Self::shared(Arc::new(MemoryStore::new()))),
            StorageBackend::Sqlite => {
                let store = SqliteStore::connect(&config.database_url).await?;
                Ok(Self::shared(Arc::new(store)))
            }
        }
    }
}
