//! Server-side scripts used by the Redis store.

pub mod commands;
pub mod executor;
pub mod scripts;

pub use commands::{InsertCommand, UniqueGuard, build_insert_command};
pub use executor::execute_insert;
