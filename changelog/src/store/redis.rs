//! Changelog store backed by Redis with the RedisJSON module.

use ::redis::aio::{ConnectionManager, ConnectionManagerConfig};
use log::debug;

use super::{ChangelogEntry, ChangelogStore, Connector, NAME_FIELD};
use crate::config::ConnectionOptions;
use crate::errors::StoreError;
use crate::id::generate_document_id;
use crate::keys::KeyContext;
use crate::runtime::{build_insert_command, execute_insert};

/// Number of keys requested per SCAN round trip.
const SCAN_COUNT: usize = 100;

/// Opens [`RedisStore`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisConnector;

impl Connector for RedisConnector {
    type Store = RedisStore;

    async fn connect(
        &self,
        uri: &str,
        database_name: &str,
        options: &ConnectionOptions,
    ) -> Result<RedisStore, StoreError> {
        RedisStore::connect(uri, database_name, options).await
    }
}

/// Changelog collections stored as JSON documents under a database prefix.
pub struct RedisStore {
    conn: ConnectionManager,
    database: String,
}

impl RedisStore {
    /// Connect to `uri`, applying the recognised connection options.
    pub async fn connect(uri: &str, database_name: &str, options: &ConnectionOptions) -> Result<Self, StoreError> {
        let client = ::redis::Client::open(uri)?;
        let conn = ConnectionManager::new_with_config(client, manager_config(options)).await?;
        debug!("connected to changelog database `{database_name}`");
        Ok(Self::new(conn, database_name))
    }

    /// Wrap an existing connection.
    pub fn new(conn: ConnectionManager, database_name: impl Into<String>) -> Self {
        Self {
            conn,
            database: database_name.into(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Get the Redis connection manager.
    pub fn conn(&mut self) -> &mut ConnectionManager {
        &mut self.conn
    }

    /// Every entry of `collection`, oldest first.
    pub async fn list_entries(&mut self, collection: &str) -> Result<Vec<ChangelogEntry>, StoreError> {
        let mut entries = Vec::new();
        for key in self.document_keys(collection).await? {
            if let Some(entry) = self.read_document(&key).await? {
                entries.push(entry);
            }
        }
        entries.sort_by(|a, b| a.date_executed.cmp(&b.date_executed).then_with(|| a.name.cmp(&b.name)));
        Ok(entries)
    }

    async fn unique_fields(&mut self, collection: &str) -> Result<Vec<String>, StoreError> {
        let keys = KeyContext::new(&self.database, collection);
        let fields: Vec<String> = ::redis::cmd("SMEMBERS")
            .arg(keys.indexes())
            .query_async(&mut self.conn)
            .await?;
        Ok(fields)
    }

    async fn document_keys(&mut self, collection: &str) -> Result<Vec<String>, StoreError> {
        let keys = KeyContext::new(&self.database, collection);
        let pattern = keys.scan_pattern();
        let mut documents = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next_cursor, batch): (u64, Vec<String>) = ::redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut self.conn)
                .await?;

            documents.extend(batch.into_iter().filter(|key| keys.is_document_key(key)));

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        Ok(documents)
    }

    async fn read_document(&mut self, key: &str) -> Result<Option<ChangelogEntry>, StoreError> {
        let raw: Option<String> = ::redis::cmd("JSON.GET")
            .arg(key)
            .arg("$")
            .query_async(&mut self.conn)
            .await?;

        match raw {
            // JSON.GET with a `$` path returns an array of matches
            Some(json) => {
                let matches: Vec<ChangelogEntry> = serde_json::from_str(&json)?;
                Ok(matches.into_iter().next())
            }
            None => Ok(None),
        }
    }
}

impl ChangelogStore for RedisStore {
    async fn ensure_unique_index(&mut self, collection: &str, field: &str) -> Result<(), StoreError> {
        let keys = KeyContext::new(&self.database, collection);
        let added: u64 = ::redis::cmd("SADD")
            .arg(keys.indexes())
            .arg(field)
            .query_async(&mut self.conn)
            .await?;
        if added > 0 {
            debug!("created unique index on `{collection}.{field}`");
        }
        Ok(())
    }

    async fn find_by_name(&mut self, collection: &str, name: &str) -> Result<Option<ChangelogEntry>, StoreError> {
        let unique_fields = self.unique_fields(collection).await?;

        if unique_fields.iter().any(|field| field == NAME_FIELD) {
            let keys = KeyContext::new(&self.database, collection);
            let guard = keys.unique_guard(NAME_FIELD, name);
            let owner: Option<String> = ::redis::cmd("GET").arg(&guard).query_async(&mut self.conn).await?;
            return match owner {
                Some(document_id) => {
                    let document = self.read_document(&keys.document(&document_id)).await?;
                    guarded_document(&guard, &document_id, document).map(Some)
                }
                None => Ok(None),
            };
        }

        for key in self.document_keys(collection).await? {
            if let Some(entry) = self.read_document(&key).await?
                && entry.name == name
            {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    async fn insert(&mut self, collection: &str, entry: &ChangelogEntry) -> Result<(), StoreError> {
        let unique_fields = self.unique_fields(collection).await?;
        let keys = KeyContext::new(&self.database, collection);
        let document_id = generate_document_id();
        let command = build_insert_command(&keys, &document_id, entry, &unique_fields)?;
        execute_insert(&mut self.conn, collection, &command).await
    }

    async fn close(self) -> Result<(), StoreError> {
        // ConnectionManager has no explicit shutdown; dropping the last handle closes it.
        drop(self.conn);
        debug!("closed changelog database `{}`", self.database);
        Ok(())
    }
}

fn manager_config(options: &ConnectionOptions) -> ConnectionManagerConfig {
    let mut config = ConnectionManagerConfig::new();
    if let Some(timeout) = options.connection_timeout() {
        config = config.set_connection_timeout(timeout);
    }
    if let Some(timeout) = options.response_timeout() {
        config = config.set_response_timeout(timeout);
    }
    if let Some(retries) = options.number_of_retries {
        config = config.set_number_of_retries(retries);
    }
    config
}

/// Entry behind a claimed name guard. A guard without its document is reported, not read as absent.
fn guarded_document(
    guard: &str,
    document_id: &str,
    document: Option<ChangelogEntry>,
) -> Result<ChangelogEntry, StoreError> {
    document.ok_or_else(|| StoreError::Script(format!("unique guard `{guard}` points at missing document `{document_id}`")))
}
