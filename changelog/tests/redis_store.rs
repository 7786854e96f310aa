//! Runs against a live Redis Stack server (RedisJSON required).
//!
//! Ignored by default: `cargo test -- --ignored` with Redis on 127.0.0.1:6379.

use changelog::{
    ChangelogEntry, ChangelogError, ChangelogStore, Configuration, ConnectionOptions, MigrationRunner, RedisConnector,
    RedisStore, Status, StoreError, Task, operation,
};
use chrono::Utc;
use redis::aio::ConnectionManager;
use serial_test::serial;

const REDIS_URL: &str = "redis://127.0.0.1/";

async fn redis_connection() -> ConnectionManager {
    let client = redis::Client::open(REDIS_URL).expect("redis client");
    client.get_connection_manager().await.expect("connection manager")
}

async fn flush_database(database: &str) {
    let mut conn = redis_connection().await;
    let keys: Vec<String> = redis::cmd("KEYS")
        .arg(format!("{database}:*"))
        .query_async(&mut conn)
        .await
        .expect("list keys");
    if !keys.is_empty() {
        let _: () = redis::cmd("DEL").arg(&keys).query_async(&mut conn).await.expect("delete keys");
    }
}

async fn open_store(database: &str) -> RedisStore {
    flush_database(database).await;
    RedisStore::connect(REDIS_URL, database, &ConnectionOptions::default())
        .await
        .expect("connect")
}

fn entry(name: &str) -> ChangelogEntry {
    ChangelogEntry {
        name: name.to_string(),
        author: "John".to_string(),
        date_executed: Utc::now(),
        fingerprint: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
    }
}

#[tokio::test]
#[ignore = "requires Redis Stack on 127.0.0.1:6379"]
#[serial]
async fn insert_and_find_by_name() {
    let mut store = open_store("changelog_it_find").await;
    store.ensure_unique_index("databasechangelog", "name").await.unwrap();

    store.insert("databasechangelog", &entry("initDB")).await.unwrap();

    let found = store.find_by_name("databasechangelog", "initDB").await.unwrap().expect("entry");
    assert_eq!(found.author, "John");
    assert_eq!(found.fingerprint, "d41d8cd98f00b204e9800998ecf8427e");
    assert!(store.find_by_name("databasechangelog", "missing").await.unwrap().is_none());

    let listed = store.list_entries("databasechangelog").await.unwrap();
    assert_eq!(listed.len(), 1);
    store.close().await.unwrap();
}

#[tokio::test]
#[ignore = "requires Redis Stack on 127.0.0.1:6379"]
#[serial]
async fn unique_index_rejects_duplicate_names() {
    let mut store = open_store("changelog_it_unique").await;
    store.ensure_unique_index("databasechangelog", "name").await.unwrap();
    store.ensure_unique_index("databasechangelog", "name").await.unwrap();

    store.insert("databasechangelog", &entry("initDB")).await.unwrap();
    let err = store.insert("databasechangelog", &entry("initDB")).await.unwrap_err();

    assert!(matches!(err, StoreError::DuplicateKey { ref field, ref value, .. } if field == "name" && value == "initDB"));
    assert_eq!(store.list_entries("databasechangelog").await.unwrap().len(), 1);
    store.close().await.unwrap();
}

#[tokio::test]
#[ignore = "requires Redis Stack on 127.0.0.1:6379"]
#[serial]
async fn find_without_index_scans_documents() {
    let mut store = open_store("changelog_it_scan").await;

    store.insert("databasechangelog", &entry("initDB")).await.unwrap();
    store.insert("databasechangelog", &entry("addAppAdminUsers")).await.unwrap();

    let found = store.find_by_name("databasechangelog", "addAppAdminUsers").await.unwrap();
    assert_eq!(found.map(|e| e.name).as_deref(), Some("addAppAdminUsers"));
    store.close().await.unwrap();
}

#[tokio::test]
#[ignore = "requires Redis Stack on 127.0.0.1:6379"]
#[serial]
async fn runner_applies_then_skips() {
    flush_database("changelog_it_runner").await;
    let config = Configuration::new(REDIS_URL, "changelog_it_runner");
    let tasks = vec![
        Some(Task::new("initDB", "John", operation!(|| async { Ok(()) }))),
        Some(Task::new("addAppAdminUsers", "Jane", operation!(|| async { Ok(()) }))),
    ];
    let runner = MigrationRunner::new(RedisConnector);

    let first = runner.run(Some(&config), Some(&tasks[..])).await.unwrap();
    let second = runner.run(Some(&config), Some(&tasks[..])).await.unwrap();

    assert!(first.values().all(|s| *s == Status::SuccessfullyApplied));
    assert!(second.values().all(|s| *s == Status::AlreadyApplied));

    let drifted = vec![Some(Task::new("initDB", "John", operation!(|| async { anyhow::bail!("edited") })))];
    let err = runner.run(Some(&config), Some(&drifted[..])).await.unwrap_err();
    assert!(matches!(err, ChangelogError::Hash { .. }));
}

#[tokio::test]
#[ignore = "requires Redis Stack on 127.0.0.1:6379"]
#[serial]
async fn unreachable_server_is_a_store_error() {
    let config = Configuration::new("redis://127.0.0.1:1/", "changelog_it_down").with_connection_options(
        ConnectionOptions {
            connection_timeout_ms: Some(200),
            number_of_retries: Some(0),
            ..Default::default()
        },
    );

    let err = changelog::run(&config, &[]).await.unwrap_err();

    assert!(matches!(err, ChangelogError::Store(StoreError::Redis(_))));
}

#[tokio::test]
#[ignore = "requires Redis Stack on 127.0.0.1:6379"]
#[serial]
async fn dangling_name_guard_is_reported() {
    let mut store = open_store("changelog_it_dangling").await;
    store.ensure_unique_index("databasechangelog", "name").await.unwrap();
    let mut conn = redis_connection().await;
    let _: () = redis::cmd("SET")
        .arg("changelog_it_dangling:databasechangelog:_unique:name:initDB")
        .arg("vanished")
        .query_async(&mut conn)
        .await
        .unwrap();

    let err = store.find_by_name("databasechangelog", "initDB").await.unwrap_err();

    assert!(matches!(err, StoreError::Script(ref message) if message.contains("vanished")));
    store.close().await.unwrap();
}
