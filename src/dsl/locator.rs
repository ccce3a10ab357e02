//! Selector plus display label shared by every resolver

use crate::dom::NodeId;
use crate::engine::{did_not_match, join_selector, ActionEnv, DslError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    scope: Vec<String>,
    selector: String,
    label: String,
}

impl Locator {
    /// Locator labelled with its raw selector
    pub fn new(scope: Vec<String>, selector: impl Into<String>) -> Self {
        let selector = selector.into();
        Self {
            label: selector.clone(),
            scope,
            selector,
        }
    }

    /// Locator whose default label is `name` rather than the selector
    pub fn named(scope: Vec<String>, selector: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scope,
            selector: selector.into(),
            label: name.into(),
        }
    }

    /// Replace the label with `"<label> ( <full selector> )"`
    pub fn labeled(mut self, label: &str) -> Self {
        self.label = format!("{} ( {} )", label, self.full_selector());
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn scope(&self) -> &[String] {
        &self.scope
    }

    pub fn full_selector(&self) -> String {
        join_selector(&self.scope, &self.selector)
    }

    /// Matching elements in document order; may be empty
    pub fn find(&self, env: &ActionEnv) -> Result<Vec<NodeId>, DslError> {
        let doc = env.document.read();
        Ok(doc.query(doc.root(), &self.full_selector())?)
    }

    /// Error message for a lookup that matched nothing
    pub fn miss(&self) -> String {
        did_not_match(&format!("Selector '{}'", self.full_selector()))
    }
}
