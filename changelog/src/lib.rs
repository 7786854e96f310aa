//! Ordered, idempotent changelog runner for document stores.
//!
//! A run takes an ordered list of named tasks and applies each one at most
//! once per database. Applied tasks are recorded in a changelog collection
//! together with a fingerprint of their operation source; a later run skips
//! them, or fails with [`ChangelogError::Hash`] if the source has changed.
//!
//! ```ignore
//! use changelog::{Configuration, Task, operation};
//!
//! let config = Configuration::new("redis://127.0.0.1/", "app");
//! let tasks = vec![
//!     Some(Task::new("initDB", "John", operation!(|| async { Ok(()) }))),
//!     Some(Task::new("addAppAdminUsers", "Jane", operation!(|| async { Ok(()) }))),
//! ];
//! let statuses = changelog::run(&config, &tasks).await?;
//! ```

extern crate self as changelog;

pub mod config;
pub mod errors;
pub mod filters;
pub mod fingerprint;
pub mod id;
pub mod keys;
pub mod processor;
pub mod registry;
pub mod runner;
pub mod runtime;
pub mod store;
pub mod task;
pub mod validators;

pub use changelog_macros::changeset;
pub use config::{ChangesetRef, Configuration, ConnectionOptions, Manifest};
pub use errors::{ChangelogError, ChangelogResult, StoreError};
pub use filters::filter_present;
pub use fingerprint::compute_fingerprint;
pub use processor::process_task;
pub use registry::{ChangesetRegistration, find_changeset, registered_changesets, resolve_manifest};
pub use runner::{MigrationRunner, deploy, run};
pub use store::{
    CHANGELOG_COLLECTION, ChangelogEntry, ChangelogStore, Connector, MemoryConnector, MemoryStore, RedisConnector,
    RedisStore,
};
pub use task::{Operation, OperationFuture, Status, StatusMap, Task};
pub use validators::{is_configuration_valid, is_task_list_valid, is_task_valid};

// Re-export redis types so users don't need to depend on a specific redis version
pub use redis;
pub use redis::aio::ConnectionManager;

// Re-export inventory for changeset registration
pub use inventory;
