use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Boxed future returned by an [`Operation`].
pub type OperationFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

type OperationFn = dyn Fn() -> OperationFuture + Send + Sync;

/// Outcome recorded for one task of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// The changelog already held a matching entry; the operation was skipped.
    AlreadyApplied,
    /// The operation ran and its changelog entry was written.
    SuccessfullyApplied,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::AlreadyApplied => "ALREADY_APPLIED",
            Status::SuccessfullyApplied => "SUCCESSFULLY_APPLIED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful run: task name to status.
pub type StatusMap = BTreeMap<String, Status>;

/// A zero-argument async action together with the source text it was built from.
///
/// The source text is what gets fingerprinted, so it must be captured at
/// compile time: use [`operation!`](crate::operation), the
/// [`changeset`](crate::changeset) attribute, or pass it explicitly to
/// [`Operation::new`].
#[derive(Clone)]
pub struct Operation {
    source: Cow<'static, str>,
    action: Arc<OperationFn>,
}

impl Operation {
    pub fn new<F, Fut>(source: impl Into<Cow<'static, str>>, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            source: source.into(),
            action: Arc::new(move || Box::pin(action()) as OperationFuture),
        }
    }

    /// Source text the fingerprint is computed over.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Start the action.
    pub fn invoke(&self) -> OperationFuture {
        (self.action)()
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation").field("source", &self.source).finish_non_exhaustive()
    }
}

/// One named, idempotently applicable unit of work.
#[derive(Debug, Clone)]
pub struct Task {
    pub name: String,
    pub author: String,
    pub operation: Operation,
}

impl Task {
    pub fn new(name: impl Into<String>, author: impl Into<String>, operation: Operation) -> Self {
        Self {
            name: name.into(),
            author: author.into(),
            operation,
        }
    }
}

/// Build an [`Operation`] from a closure, capturing the closure's source text.
///
/// ```ignore
/// let op = operation!(|| async { Ok(()) });
/// ```
#[macro_export]
macro_rules! operation {
    ($($body:tt)+) => {
        $crate::Operation::new(stringify!($($body)+), $($body)+)
    };
}
