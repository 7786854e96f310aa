//! Changelog storage.
//!
//! The runner talks to storage only through the traits in this module:
//! - [`Connector`] opens a store for one run
//! - [`ChangelogStore`] performs exact-match lookup by name, append-only
//!   insert and unique index setup, and is closed when the run ends
//!
//! Two implementations are provided: [`RedisConnector`] for Redis with the
//! RedisJSON module and [`MemoryConnector`] for tests and embedding.

pub mod memory;
pub mod redis;

pub use self::memory::{MemoryConnector, MemoryStore};
pub use self::redis::{RedisConnector, RedisStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ConnectionOptions;
use crate::errors::StoreError;

/// Default name of the changelog collection.
pub const CHANGELOG_COLLECTION: &str = "databasechangelog";

/// Field the changelog collection is uniquely indexed on.
pub const NAME_FIELD: &str = "name";

/// Persisted record of an applied task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangelogEntry {
    pub name: String,
    pub author: String,
    pub date_executed: DateTime<Utc>,
    pub fingerprint: String,
}

impl ChangelogEntry {
    /// String form of a field, used for unique index checks.
    pub fn field_value(&self, field: &str) -> Option<String> {
        match field {
            NAME_FIELD => Some(self.name.clone()),
            "author" => Some(self.author.clone()),
            "dateExecuted" => Some(self.date_executed.to_rfc3339()),
            "fingerprint" => Some(self.fingerprint.clone()),
            _ => None,
        }
    }
}

/// Opens a [`ChangelogStore`] for one run.
#[allow(async_fn_in_trait)]
pub trait Connector {
    type Store: ChangelogStore;

    async fn connect(
        &self,
        uri: &str,
        database_name: &str,
        options: &ConnectionOptions,
    ) -> Result<Self::Store, StoreError>;
}

/// Changelog operations used by the runner.
#[allow(async_fn_in_trait)]
pub trait ChangelogStore {
    /// Ensure `field` is uniquely indexed in `collection`. Must be idempotent.
    async fn ensure_unique_index(&mut self, collection: &str, field: &str) -> Result<(), StoreError>;

    /// Look up the entry recorded under `name`.
    async fn find_by_name(&mut self, collection: &str, name: &str) -> Result<Option<ChangelogEntry>, StoreError>;

    /// Append an entry. Fails with [`StoreError::DuplicateKey`] when a unique index rejects it.
    async fn insert(&mut self, collection: &str, entry: &ChangelogEntry) -> Result<(), StoreError>;

    /// Release the connection.
    async fn close(self) -> Result<(), StoreError>;
}
