//! Document provider boundary
//!
//! The DSL only ever talks to a page through the [`Document`] trait:
//! selector queries, attribute/property/CSS access, text and markup, form
//! values and event dispatch. [`MemoryDocument`] is the in-process
//! implementation backed by an HTML parse.

pub mod memory;
pub mod selector;

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;

pub use memory::{Listener, MemoryDocument};
pub use selector::SelectorList;

/// Identifier of a node inside one document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

/// A document shared between the application and running futures
pub type SharedDocument = Arc<RwLock<dyn Document>>;

/// Wrap a document for sharing
pub fn share<D: Document + 'static>(doc: D) -> SharedDocument {
    Arc::new(RwLock::new(doc))
}

#[derive(Debug, thiserror::Error)]
pub enum DomError {
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Unknown node {0:?}")]
    UnknownNode(NodeId),
}

/// Event passed to listeners during dispatch
#[derive(Debug, Clone)]
pub struct DomEvent {
    pub kind: String,
    pub target: NodeId,
    /// Node whose listeners are currently running
    pub current: NodeId,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl DomEvent {
    pub fn new(kind: impl Into<String>, target: NodeId) -> Self {
        Self {
            kind: kind.into(),
            target,
            current: target,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchOutcome {
    pub default_prevented: bool,
}

/// DOM capability the DSL depends on
///
/// Accessors on unknown nodes return empty values and mutators are no-ops;
/// only [`query`](Document::query) can fail, on a malformed selector.
pub trait Document: Send + Sync {
    fn root(&self) -> NodeId;

    /// Elements strictly below `scope` matching `selector`, in document order
    fn query(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>, DomError>;

    /// Lowercase tag name; `None` for the root and text nodes
    fn tag_name(&self, node: NodeId) -> Option<String>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Element children, in order
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    fn attr(&self, node: NodeId, name: &str) -> Option<String>;
    fn set_attr(&mut self, node: NodeId, name: &str, value: &str);
    fn remove_attr(&mut self, node: NodeId, name: &str);

    /// Live property; falls back to the attribute of the same name
    fn prop(&self, node: NodeId, name: &str) -> Value;
    fn set_prop(&mut self, node: NodeId, name: &str, value: Value);

    /// Inline style declaration
    fn css(&self, node: NodeId, name: &str) -> Option<String>;
    fn set_css(&mut self, node: NodeId, name: &str, value: &str);

    fn text(&self, node: NodeId) -> String;
    fn set_text(&mut self, node: NodeId, text: &str);

    fn inner_html(&self, node: NodeId) -> String;
    fn set_inner_html(&mut self, node: NodeId, html: &str);

    /// Form value of an input, textarea, select or option
    fn value(&self, node: NodeId) -> String;
    fn set_value(&mut self, node: NodeId, value: &str);

    /// Dispatch a bubbling event at `node`
    fn dispatch(&mut self, node: NodeId, kind: &str) -> DispatchOutcome;
}
