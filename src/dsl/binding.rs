//! `binding(name)` and the binding scan shared with repeaters

use regex::Regex;
use serde_json::Value;

use super::{BindingConventions, Dsl};
use crate::dom::selector::escape_ident;
use crate::dom::{Document, DomError, NodeId};
use crate::engine::{did_not_match, join_selector, FutureHandle, Outcome};

/// What a binding expression is matched against
#[derive(Debug, Clone)]
pub enum BindingMatcher {
    /// Matches expressions containing the name
    Name(String),
    Pattern(Regex),
}

impl BindingMatcher {
    pub fn matches(&self, expression: &str) -> bool {
        match self {
            BindingMatcher::Name(name) => expression.contains(name.as_str()),
            BindingMatcher::Pattern(pattern) => pattern.is_match(expression),
        }
    }
}

impl std::fmt::Display for BindingMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindingMatcher::Name(name) => f.write_str(name),
            BindingMatcher::Pattern(pattern) => write!(f, "/{}/", pattern.as_str()),
        }
    }
}

impl From<&str> for BindingMatcher {
    fn from(name: &str) -> Self {
        BindingMatcher::Name(name.to_string())
    }
}

impl From<String> for BindingMatcher {
    fn from(name: String) -> Self {
        BindingMatcher::Name(name)
    }
}

impl From<Regex> for BindingMatcher {
    fn from(pattern: Regex) -> Self {
        BindingMatcher::Pattern(pattern)
    }
}

impl Dsl {
    /// Value of the first binding in scope whose expression matches
    pub fn binding(&self, matcher: impl Into<BindingMatcher>) -> FutureHandle {
        let matcher = matcher.into();
        let name = format!("select binding '{}'", matcher);
        let conventions = self.conventions.clone();
        let scope = self.scope.clone();

        self.context().add_future_action(name, move |env| async move {
            let doc = env.document.read();
            let scope_root = if scope.is_empty() {
                vec![doc.root()]
            } else {
                doc.query(doc.root(), &join_selector(&scope, ""))?
            };

            let mut values = Vec::new();
            for root in scope_root {
                values.extend(binding_values(&*doc, root, &conventions, Some(&matcher))?);
            }

            Ok(match values.into_iter().next() {
                Some(value) => Outcome::Resolved(value),
                None => Outcome::Failed(did_not_match(&format!("Binding selector '{}'", matcher))),
            })
        })
    }
}

/// Values of the binding-annotated elements below `root`, in document order
///
/// With no matcher every binding is returned.
pub(crate) fn binding_values(
    doc: &dyn Document,
    root: NodeId,
    conventions: &BindingConventions,
    matcher: Option<&BindingMatcher>,
) -> Result<Vec<Value>, DomError> {
    let selector = format!(".{}", escape_ident(&conventions.binding_class));
    let values = doc
        .query(root, &selector)?
        .into_iter()
        .filter(|node| match matcher {
            None => true,
            Some(matcher) => [&conventions.bind_attr, &conventions.template_attr]
                .into_iter()
                .filter_map(|attr| doc.attr(*node, attr))
                .any(|expression| matcher.matches(&expression)),
        })
        .map(|node| Value::String(binding_value(doc, node, conventions)))
        .collect();
    Ok(values)
}

/// Rendered value of one binding element
///
/// Form fields report their value, templates their text, everything else
/// its markup.
fn binding_value(doc: &dyn Document, node: NodeId, conventions: &BindingConventions) -> String {
    match doc.tag_name(node).as_deref() {
        Some("input") | Some("textarea") => doc.value(node),
        _ if doc.attr(node, &conventions.bind_attr).is_none()
            && doc.attr(node, &conventions.template_attr).is_some() =>
        {
            doc.text(node)
        }
        _ => doc.inner_html(node),
    }
}
