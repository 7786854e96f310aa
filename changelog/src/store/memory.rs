//! In-process changelog store.
//!
//! Databases live behind a shared handle, so every store opened from the same
//! [`MemoryConnector`] sees the same data, the way separate connections to one
//! server would. Unique index semantics match the Redis store.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{ChangelogEntry, ChangelogStore, Connector};
use crate::config::ConnectionOptions;
use crate::errors::StoreError;

#[derive(Debug, Default)]
struct Collection {
    unique_fields: BTreeSet<String>,
    documents: Vec<ChangelogEntry>,
}

#[derive(Debug, Default)]
struct Shared {
    databases: HashMap<String, HashMap<String, Collection>>,
    open_connections: usize,
    connects: usize,
}

/// Opens [`MemoryStore`]s over shared in-process state.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store directly, without going through [`Connector::connect`].
    pub fn open(&self, database_name: &str) -> MemoryStore {
        let mut shared = lock(&self.shared);
        shared.open_connections += 1;
        shared.connects += 1;
        shared.databases.entry(database_name.to_string()).or_default();
        MemoryStore {
            shared: Arc::clone(&self.shared),
            database: database_name.to_string(),
        }
    }

    /// Snapshot of every entry in `collection`, in insertion order.
    pub fn entries(&self, database_name: &str, collection: &str) -> Vec<ChangelogEntry> {
        let shared = lock(&self.shared);
        shared
            .databases
            .get(database_name)
            .and_then(|db| db.get(collection))
            .map(|c| c.documents.clone())
            .unwrap_or_default()
    }

    /// Unique fields registered on `collection`.
    pub fn unique_fields(&self, database_name: &str, collection: &str) -> Vec<String> {
        let shared = lock(&self.shared);
        shared
            .databases
            .get(database_name)
            .and_then(|db| db.get(collection))
            .map(|c| c.unique_fields.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Stores opened and not yet closed.
    pub fn open_connections(&self) -> usize {
        lock(&self.shared).open_connections
    }

    /// Total number of stores ever opened.
    pub fn connects(&self) -> usize {
        lock(&self.shared).connects
    }
}

impl Connector for MemoryConnector {
    type Store = MemoryStore;

    async fn connect(
        &self,
        _uri: &str,
        database_name: &str,
        _options: &ConnectionOptions,
    ) -> Result<MemoryStore, StoreError> {
        Ok(self.open(database_name))
    }
}

/// One open connection to a [`MemoryConnector`]'s state.
#[derive(Debug)]
pub struct MemoryStore {
    shared: Arc<Mutex<Shared>>,
    database: String,
}

impl MemoryStore {
    fn with_collection<T>(&self, collection: &str, f: impl FnOnce(&mut Collection) -> T) -> T {
        let mut shared = lock(&self.shared);
        let db = shared.databases.entry(self.database.clone()).or_default();
        f(db.entry(collection.to_string()).or_default())
    }
}

impl ChangelogStore for MemoryStore {
    async fn ensure_unique_index(&mut self, collection: &str, field: &str) -> Result<(), StoreError> {
        self.with_collection(collection, |c| {
            c.unique_fields.insert(field.to_string());
        });
        Ok(())
    }

    async fn find_by_name(&mut self, collection: &str, name: &str) -> Result<Option<ChangelogEntry>, StoreError> {
        Ok(self.with_collection(collection, |c| c.documents.iter().find(|e| e.name == name).cloned()))
    }

    async fn insert(&mut self, collection: &str, entry: &ChangelogEntry) -> Result<(), StoreError> {
        self.with_collection(collection, |c| {
            for field in &c.unique_fields {
                let Some(value) = entry.field_value(field) else {
                    continue;
                };
                let taken = c
                    .documents
                    .iter()
                    .any(|existing| existing.field_value(field).as_deref() == Some(value.as_str()));
                if taken {
                    return Err(StoreError::DuplicateKey {
                        collection: collection.to_string(),
                        field: field.clone(),
                        value,
                    });
                }
            }
            c.documents.push(entry.clone());
            Ok(())
        })
    }

    async fn close(self) -> Result<(), StoreError> {
        let mut shared = lock(&self.shared);
        shared.open_connections = shared.open_connections.saturating_sub(1);
        Ok(())
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    // A panic while holding the lock cannot leave `Shared` half-updated.
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(name: &str) -> ChangelogEntry {
        ChangelogEntry {
            name: name.to_string(),
            author: "John".to_string(),
            date_executed: Utc::now(),
            fingerprint: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_then_find() {
        let connector = MemoryConnector::new();
        let mut store = connector.open("app");

        store.insert("changelog", &entry("initDB")).await.unwrap();

        let found = store.find_by_name("changelog", "initDB").await.unwrap();
        assert_eq!(found.map(|e| e.name), Some("initDB".to_string()));
        assert!(store.find_by_name("changelog", "missing").await.unwrap().is_none());
        assert!(store.find_by_name("other", "initDB").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unique_index_rejects_duplicates() {
        let connector = MemoryConnector::new();
        let mut store = connector.open("app");
        store.ensure_unique_index("changelog", "name").await.unwrap();
        store.ensure_unique_index("changelog", "name").await.unwrap();
        assert_eq!(connector.unique_fields("app", "changelog"), ["name"]);

        store.insert("changelog", &entry("initDB")).await.unwrap();
        let err = store.insert("changelog", &entry("initDB")).await.unwrap_err();

        assert!(matches!(err, StoreError::DuplicateKey { ref field, .. } if field == "name"));
        assert_eq!(connector.entries("app", "changelog").len(), 1);
    }

    #[tokio::test]
    async fn duplicates_allowed_without_index() {
        let connector = MemoryConnector::new();
        let mut store = connector.open("app");
        store.insert("changelog", &entry("initDB")).await.unwrap();
        store.insert("changelog", &entry("initDB")).await.unwrap();
        assert_eq!(connector.entries("app", "changelog").len(), 2);
    }

    #[tokio::test]
    async fn stores_share_state_and_track_connections() {
        let connector = MemoryConnector::new();
        let mut first = connector.open("app");
        let mut second = connector.open("app");
        assert_eq!(connector.open_connections(), 2);

        first.insert("changelog", &entry("initDB")).await.unwrap();
        assert!(second.find_by_name("changelog", "initDB").await.unwrap().is_some());

        first.close().await.unwrap();
        second.close().await.unwrap();
        assert_eq!(connector.open_connections(), 0);
        assert_eq!(connector.connects(), 2);
    }

    #[tokio::test]
    async fn databases_are_isolated() {
        let connector = MemoryConnector::new();
        let mut app = connector.open("app");
        let mut other = connector.open("other");
        app.insert("changelog", &entry("initDB")).await.unwrap();
        assert!(other.find_by_name("changelog", "initDB").await.unwrap().is_none());
    }
}
