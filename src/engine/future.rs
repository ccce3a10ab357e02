//! Future types
//!
//! A future is a named, queued action with exactly one terminal outcome.
//! [`Done`] is the completion handle given to the action; it is consumed on
//! use so an action cannot report twice.

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;

/// Terminal outcome of a future
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "lowercase")]
pub enum Outcome {
    Resolved(Value),
    Failed(String),
}

impl Outcome {
    pub fn status(&self) -> FutureStatus {
        match self {
            Outcome::Resolved(_) => FutureStatus::Resolved,
            Outcome::Failed(_) => FutureStatus::Failed,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Outcome::Resolved(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Outcome::Resolved(value) => Some(value),
            Outcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Outcome::Resolved(_) => None,
            Outcome::Failed(message) => Some(message),
        }
    }
}

impl From<Result<Value, String>> for Outcome {
    fn from(result: Result<Value, String>) -> Self {
        match result {
            Ok(value) => Outcome::Resolved(value),
            Err(message) => Outcome::Failed(message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FutureStatus {
    Pending,
    Resolved,
    Failed,
}

/// Point-in-time view of a future, for reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FutureRecord {
    pub name: String,
    pub status: FutureStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug)]
struct FutureCell {
    name: String,
    outcome: OnceLock<Outcome>,
}

/// Shared handle to a queued future
///
/// Returned by every DSL call. The outcome is written once by the queue and
/// can then be read by assertions and the harness.
#[derive(Debug, Clone)]
pub struct FutureHandle {
    cell: Arc<FutureCell>,
}

impl FutureHandle {
    pub(crate) fn pending(name: impl Into<String>) -> Self {
        Self {
            cell: Arc::new(FutureCell {
                name: name.into(),
                outcome: OnceLock::new(),
            }),
        }
    }

    /// Build a handle that is already resolved with `value`
    pub fn resolved(name: impl Into<String>, value: impl Into<Value>) -> Self {
        let handle = Self::pending(name);
        handle.settle(Outcome::Resolved(value.into()));
        handle
    }

    pub fn name(&self) -> &str {
        &self.cell.name
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.cell.outcome.get()
    }

    pub fn status(&self) -> FutureStatus {
        self.outcome()
            .map(Outcome::status)
            .unwrap_or(FutureStatus::Pending)
    }

    pub fn is_settled(&self) -> bool {
        self.outcome().is_some()
    }

    /// Resolved value, if the future resolved
    pub fn value(&self) -> Option<&Value> {
        self.outcome().and_then(Outcome::value)
    }

    /// Error message, if the future failed
    pub fn error(&self) -> Option<&str> {
        self.outcome().and_then(Outcome::error)
    }

    pub fn record(&self) -> FutureRecord {
        FutureRecord {
            name: self.name().to_string(),
            status: self.status(),
            result: self.value().cloned(),
            error: self.error().map(str::to_string),
        }
    }

    /// Returns false if the future had already settled
    pub(crate) fn settle(&self, outcome: Outcome) -> bool {
        self.cell.outcome.set(outcome).is_ok()
    }
}

/// Completion handle for one future
pub struct Done {
    tx: oneshot::Sender<Outcome>,
}

impl Done {
    pub(crate) fn channel() -> (Done, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        (Done { tx }, rx)
    }

    pub fn resolve(self, value: impl Into<Value>) {
        self.settle(Outcome::Resolved(value.into()));
    }

    pub fn fail(self, message: impl Into<String>) {
        self.settle(Outcome::Failed(message.into()));
    }

    pub fn complete(self, result: Result<Value, String>) {
        self.settle(result.into());
    }

    pub fn settle(self, outcome: Outcome) {
        // Receiver is gone only when the run was abandoned.
        let _ = self.tx.send(outcome);
    }
}

impl fmt::Debug for Done {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Done")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_handle_settles_once() {
        let handle = FutureHandle::pending("first");
        assert_eq!(handle.status(), FutureStatus::Pending);

        assert!(handle.settle(Outcome::Resolved(json!(1))));
        assert!(!handle.settle(Outcome::Failed("late".to_string())));

        assert_eq!(handle.status(), FutureStatus::Resolved);
        assert_eq!(handle.value(), Some(&json!(1)));
        assert_eq!(handle.error(), None);
    }

    #[test]
    fn test_resolved_handle() {
        let handle = FutureHandle::resolved("ten", 10);
        assert_eq!(handle.name(), "ten");
        assert_eq!(handle.value(), Some(&json!(10)));
    }

    #[test]
    fn test_record_of_failed_future() {
        let handle = FutureHandle::pending("broken");
        handle.settle(Outcome::Failed("did not match".to_string()));

        let record = handle.record();
        assert_eq!(record.status, FutureStatus::Failed);
        assert_eq!(record.result, None);
        assert_eq!(record.error.as_deref(), Some("did not match"));
    }

    #[tokio::test]
    async fn test_done_delivers_outcome() {
        let (done, rx) = Done::channel();
        done.complete(Err("nope".to_string()));
        assert_eq!(rx.await.unwrap(), Outcome::Failed("nope".to_string()));
    }

    #[tokio::test]
    async fn test_dropped_done_closes_channel() {
        let (done, rx) = Done::channel();
        drop(done);
        assert!(rx.await.is_err());
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(Outcome::Resolved(json!("x"))).unwrap();
        assert_eq!(json, json!({"status": "resolved", "value": "x"}));
    }
}
