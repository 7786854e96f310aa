//! Changeset auto-registration via the inventory crate.
//!
//! Every `#[changeset(name = "...", author = "...")]` function submits a
//! [`ChangesetRegistration`] at link time. A manifest then lists changesets by
//! name, in the order they must be applied, and [`resolve_manifest`] turns that
//! list into tasks.

use crate::config::ChangesetRef;
use crate::errors::ChangelogError;
use crate::task::Task;

/// Metadata for a changeset discovered at link time.
pub struct ChangesetRegistration {
    /// Changeset name, the changelog identity key
    pub name: &'static str,
    /// Changeset author
    pub author: &'static str,
    /// Path of the function that declared it
    pub function: &'static str,
    /// Builds the task
    pub task_fn: fn() -> Task,
}

impl ChangesetRegistration {
    pub fn task(&self) -> Task {
        (self.task_fn)()
    }
}

inventory::collect!(ChangesetRegistration);

/// All registered changesets, in no particular order.
pub fn registered_changesets() -> impl Iterator<Item = &'static ChangesetRegistration> {
    inventory::iter::<ChangesetRegistration>()
}

/// Get a registered changeset by name.
pub fn find_changeset(name: &str) -> Option<&'static ChangesetRegistration> {
    registered_changesets().find(|c| c.name == name)
}

/// Build the task list for a manifest.
///
/// Disabled entries stay in the list as absent tasks so positions are kept;
/// the runner drops them. Names without a registration are an error.
pub fn resolve_manifest(refs: &[ChangesetRef]) -> Result<Vec<Option<Task>>, ChangelogError> {
    refs.iter()
        .map(|changeset| {
            let registration =
                find_changeset(&changeset.name).ok_or_else(|| ChangelogError::UnknownChangeset(changeset.name.clone()))?;
            Ok(changeset.enabled.then(|| registration.task()))
        })
        .collect()
}
