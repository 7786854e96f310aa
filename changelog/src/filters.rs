//! Task list filtering.
//!
//! Callers may leave placeholders in a task list, for example a changeset
//! that is conditionally disabled. Absent entries are dropped before the run.

use crate::task::Task;

/// Returns the present tasks in their original order.
pub fn filter_present(tasks: &[Option<Task>]) -> Vec<&Task> {
    tasks.iter().flatten().collect()
}
