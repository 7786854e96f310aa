//! Apply/skip/drift decision for a single task.

use chrono::Utc;
use log::{debug, info};

use crate::errors::ChangelogError;
use crate::fingerprint::compute_fingerprint;
use crate::store::{ChangelogEntry, ChangelogStore};
use crate::task::{Status, Task};
use crate::validators::is_task_valid;

/// Process one task against the changelog `collection`.
///
/// - invalid task: [`ChangelogError::IllegalTaskFormat`]
/// - recorded with the same fingerprint: [`Status::AlreadyApplied`], the operation is not run
/// - recorded with a different fingerprint: [`ChangelogError::Hash`], the store is left untouched
/// - not recorded: the operation runs; on success an entry is written and
///   [`Status::SuccessfullyApplied`] is returned, on failure the operation's
///   error is returned as [`ChangelogError::Operation`] and nothing is written
pub async fn process_task<S>(task: &Task, store: &mut S, collection: &str) -> Result<Status, ChangelogError>
where
    S: ChangelogStore,
{
    if !is_task_valid(task) {
        return Err(ChangelogError::IllegalTaskFormat {
            name: task.name.clone(),
        });
    }

    let fingerprint = compute_fingerprint(task);

    if let Some(stored) = store.find_by_name(collection, &task.name).await? {
        if stored.fingerprint != fingerprint {
            return Err(ChangelogError::Hash {
                name: task.name.clone(),
                stored: stored.fingerprint,
                fingerprint,
            });
        }
        debug!("changeset `{}` already applied", task.name);
        return Ok(Status::AlreadyApplied);
    }

    task.operation.invoke().await.map_err(ChangelogError::Operation)?;

    let entry = ChangelogEntry {
        name: task.name.clone(),
        author: task.author.clone(),
        date_executed: Utc::now(),
        fingerprint,
    };
    store.insert(collection, &entry).await?;
    info!("applied changeset `{}` by {}", task.name, task.author);

    Ok(Status::SuccessfullyApplied)
}
