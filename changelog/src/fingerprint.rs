//! Content fingerprints for drift detection.

use md5::{Digest, Md5};

use crate::task::Task;

/// Length of a fingerprint in hex characters (128 bits).
pub const FINGERPRINT_LEN: usize = 32;

/// Fingerprint of a task's operation source.
///
/// Only the operation's source text is hashed, so two tasks with identical
/// operation source share a fingerprint regardless of name or author.
pub fn compute_fingerprint(task: &Task) -> String {
    fingerprint_source(task.operation.source())
}

/// MD5 of `source` as lower-case hex.
pub fn fingerprint_source(source: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(source.as_bytes());
    hex::encode(hasher.finalize())
}
