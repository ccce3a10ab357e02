//! Engine error types
//!
//! Only failures that must halt a run are errors here. Locator misses and
//! assertion mismatches are recorded on the future as `Outcome::Failed`.

use crate::bridge::BridgeError;
use crate::dom::DomError;

/// Errors raised by a future's action code
///
/// Returning one of these from an action propagates out of
/// [`ExecutionContext::run`](crate::engine::ExecutionContext::run) instead of
/// being recorded on the future.
#[derive(Debug, thiserror::Error)]
pub enum DslError {
    #[error("Document error: {0}")]
    Dom(#[from] DomError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Action '{future}' failed: {message}")]
    Action { future: String, message: String },
}

impl DslError {
    pub fn action(future: &str, message: impl Into<String>) -> Self {
        DslError::Action {
            future: future.to_string(),
            message: message.into(),
        }
    }
}

/// Message for a locator that found nothing usable
///
/// Callers may pattern-match on the "did not match" substring.
pub fn did_not_match(what: &str) -> String {
    format!("{} did not match any elements", what)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_did_not_match_message() {
        let msg = did_not_match("Binding selector 'foo.bar'");
        assert_eq!(msg, "Binding selector 'foo.bar' did not match any elements");
        assert!(msg.contains("did not match"));
    }

    #[test]
    fn test_action_error_display() {
        let err = DslError::action("element 'a' click", "boom");
        assert_eq!(err.to_string(), "Action 'element 'a' click' failed: boom");
    }
}
