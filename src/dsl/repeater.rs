//! `repeater(selector)` chains
//!
//! The selector matches one element per repeated row; row and column values
//! come from the binding-annotated elements inside each row.

use std::sync::Arc;

use serde_json::Value;

use super::binding::{binding_values, BindingMatcher};
use super::locator::Locator;
use super::BindingConventions;
use crate::engine::{ExecutionContext, FutureHandle, Outcome};

#[derive(Debug, Clone)]
pub struct Repeater {
    ctx: ExecutionContext,
    locator: Locator,
    conventions: Arc<BindingConventions>,
}

impl Repeater {
    pub(crate) fn new(
        ctx: ExecutionContext,
        locator: Locator,
        conventions: Arc<BindingConventions>,
    ) -> Self {
        Self {
            ctx,
            locator,
            conventions,
        }
    }

    pub fn labeled(mut self, label: &str) -> Self {
        self.locator = self.locator.labeled(label);
        self
    }

    pub fn label(&self) -> &str {
        self.locator.label()
    }

    /// Number of rows; zero when nothing matches
    pub fn count(&self) -> FutureHandle {
        let name = format!("repeater '{}' count", self.label());
        let locator = self.locator.clone();
        self.ctx.add_future_action(name, move |env| async move {
            let rows = locator.find(&env)?;
            Ok(Outcome::Resolved(Value::from(rows.len())))
        })
    }

    /// Binding values of row `index`; empty when out of range
    pub fn row(&self, index: usize) -> FutureHandle {
        let name = format!("repeater '{}' row '{}'", self.label(), index);
        let locator = self.locator.clone();
        let conventions = self.conventions.clone();
        self.ctx.add_future_action(name, move |env| async move {
            let rows = locator.find(&env)?;
            let doc = env.document.read();
            let values = match rows.get(index) {
                Some(row) => binding_values(&*doc, *row, &conventions, None)?,
                None => Vec::new(),
            };
            Ok(Outcome::Resolved(Value::Array(values)))
        })
    }

    /// First value of `binding` in each row, in row order
    pub fn column(&self, binding: &str) -> FutureHandle {
        let name = format!("repeater '{}' column '{}'", self.label(), binding);
        let locator = self.locator.clone();
        let conventions = self.conventions.clone();
        let matcher = BindingMatcher::from(binding);
        self.ctx.add_future_action(name, move |env| async move {
            let rows = locator.find(&env)?;
            let doc = env.document.read();
            let mut column = Vec::with_capacity(rows.len());
            for row in rows {
                let values = binding_values(&*doc, row, &conventions, Some(&matcher))?;
                column.extend(values.into_iter().next());
            }
            Ok(Outcome::Resolved(Value::Array(column)))
        })
    }
}
