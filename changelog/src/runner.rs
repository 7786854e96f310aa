//! Top-level orchestration of a changelog run.

use log::{debug, info, warn};

use crate::config::{Configuration, Manifest};
use crate::errors::ChangelogError;
use crate::filters::filter_present;
use crate::processor::process_task;
use crate::registry::resolve_manifest;
use crate::store::{CHANGELOG_COLLECTION, ChangelogStore, Connector, NAME_FIELD, RedisConnector};
use crate::task::{StatusMap, Task};
use crate::validators::{is_configuration_valid, is_task_list_valid};

/// Applies task lists through a [`Connector`].
///
/// Each call to [`run`](Self::run) opens its own store and closes it before
/// returning, whichever way the run ends.
#[derive(Debug, Clone)]
pub struct MigrationRunner<C> {
    connector: C,
    collection: String,
}

impl<C: Connector> MigrationRunner<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            collection: CHANGELOG_COLLECTION.to_string(),
        }
    }

    /// Use a changelog collection other than `databasechangelog`.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Apply `tasks` in order and report a status per task name.
    ///
    /// Absent entries of `tasks` are skipped. The first failing task aborts the
    /// run; tasks after it are not attempted and statuses gathered so far are
    /// discarded. Entries written before the failure stay in the changelog.
    pub async fn run(
        &self,
        configuration: Option<&Configuration>,
        tasks: Option<&[Option<Task>]>,
    ) -> Result<StatusMap, ChangelogError> {
        self.run_in(&self.collection, configuration, tasks).await
    }

    /// Resolve the manifest's changesets through the registry and run them.
    ///
    /// A `collection` set in the manifest overrides the runner's collection.
    pub async fn deploy(&self, manifest: &Manifest) -> Result<StatusMap, ChangelogError> {
        if !is_configuration_valid(manifest.database.as_ref()) {
            return Err(ChangelogError::IllegalConfiguration);
        }
        let tasks = match manifest.changesets.as_deref() {
            Some(refs) => Some(resolve_manifest(refs)?),
            None => None,
        };
        let collection = manifest.collection.as_deref().unwrap_or(&self.collection);

        self.run_in(collection, manifest.database.as_ref(), tasks.as_deref()).await
    }

    async fn run_in(
        &self,
        collection: &str,
        configuration: Option<&Configuration>,
        tasks: Option<&[Option<Task>]>,
    ) -> Result<StatusMap, ChangelogError> {
        let configuration = match configuration {
            Some(cfg) if is_configuration_valid(Some(cfg)) => cfg,
            _ => return Err(ChangelogError::IllegalConfiguration),
        };
        let tasks = match tasks {
            Some(list) if is_task_list_valid(Some(list)) => list,
            _ => return Err(ChangelogError::IllegalTaskListFormat),
        };
        let tasks = filter_present(tasks);

        let options = configuration.connection_options.clone().unwrap_or_default();
        let mut store = self
            .connector
            .connect(&configuration.connection_uri, &configuration.database_name, &options)
            .await?;

        let outcome = apply(&mut store, collection, &tasks).await;
        let closed = store.close().await;

        match (outcome, closed) {
            (Ok(result), Ok(())) => {
                info!(
                    "changelog run on `{}` finished: {} changeset(s)",
                    configuration.database_name,
                    result.len()
                );
                Ok(result)
            }
            (Ok(_), Err(err)) => Err(err.into()),
            (Err(err), closed) => {
                if let Err(close_err) = closed {
                    warn!("failed to close changelog store after error: {close_err}");
                }
                Err(err)
            }
        }
    }
}

async fn apply<S>(store: &mut S, collection: &str, tasks: &[&Task]) -> Result<StatusMap, ChangelogError>
where
    S: ChangelogStore,
{
    store.ensure_unique_index(collection, NAME_FIELD).await?;
    debug!("processing {} changeset(s) against `{collection}`", tasks.len());

    let mut result = StatusMap::new();
    for task in tasks {
        let status = process_task(task, store, collection).await?;
        result.insert(task.name.clone(), status);
    }
    Ok(result)
}

impl Default for MigrationRunner<RedisConnector> {
    fn default() -> Self {
        Self::new(RedisConnector)
    }
}

/// Apply `tasks` against the Redis database described by `configuration`.
pub async fn run(configuration: &Configuration, tasks: &[Option<Task>]) -> Result<StatusMap, ChangelogError> {
    MigrationRunner::default().run(Some(configuration), Some(tasks)).await
}

/// Run a manifest against Redis.
pub async fn deploy(manifest: &Manifest) -> Result<StatusMap, ChangelogError> {
    MigrationRunner::default().deploy(manifest).await
}
