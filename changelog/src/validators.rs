use crate::config::Configuration;
use crate::task::Task;

/// Returns `true` if the configuration is present and every field is filled in.
pub fn is_configuration_valid(configuration: Option<&Configuration>) -> bool {
    match configuration {
        Some(cfg) => {
            !cfg.connection_uri.is_empty() && !cfg.database_name.is_empty() && cfg.connection_options.is_some()
        }
        None => false,
    }
}

/// Returns `true` if the task list is present. An empty list is valid.
pub fn is_task_list_valid(tasks: Option<&[Option<Task>]>) -> bool {
    tasks.is_some()
}

/// Returns `true` if the task has a name, an author and an operation.
pub fn is_task_valid(task: &Task) -> bool {
    !task.name.is_empty() && !task.author.is_empty() && !task.operation.source().is_empty()
}
