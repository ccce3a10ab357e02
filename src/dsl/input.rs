//! `input(model)` chains over form controls bound to a model

use std::sync::Arc;

use serde_json::Value;

use super::locator::Locator;
use super::{notify, BindingConventions};
use crate::dom::selector::{escape_ident, quote};
use crate::engine::{ActionEnv, DslError, ExecutionContext, FutureHandle, Outcome};

#[derive(Debug, Clone)]
pub struct Input {
    ctx: ExecutionContext,
    scope: Vec<String>,
    model: String,
    label: String,
    conventions: Arc<BindingConventions>,
}

impl Input {
    pub(crate) fn new(
        ctx: ExecutionContext,
        scope: Vec<String>,
        model: &str,
        conventions: Arc<BindingConventions>,
    ) -> Self {
        Self {
            ctx,
            scope,
            model: model.to_string(),
            label: model.to_string(),
            conventions,
        }
    }

    pub fn labeled(mut self, label: &str) -> Self {
        self.label = Locator::new(self.scope.clone(), self.model.as_str())
            .labeled(label)
            .label()
            .to_string();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Type `value` into every matching text control
    pub fn enter(&self, value: &str) -> FutureHandle {
        let name = format!("input '{}' enter '{}'", self.label, value);
        let locator = self.locator(":input");
        let value = value.to_string();
        self.ctx
            .add_future_action(name, move |env| enter(env, locator, value))
    }

    /// Flip the checked state of the matching checkbox
    pub fn check(&self) -> FutureHandle {
        let name = format!("input '{}' toggle", self.label);
        let locator = self.locator(":checkbox");
        self.ctx
            .add_future_action(name, move |env| toggle(env, locator))
    }

    /// Check the radio button of the group whose value is `value`
    pub fn select(&self, value: &str) -> FutureHandle {
        let name = format!("input '{}' select '{}'", self.label, value);
        let group = self.locator(":radio");
        let target = Locator::named(
            self.scope.clone(),
            format!("{}[value={}]", group.selector(), quote(value)),
            self.model.clone(),
        );
        self.ctx
            .add_future_action(name, move |env| select_radio(env, group, target))
    }

    /// Current value of the first matching control
    pub fn val(&self) -> FutureHandle {
        let name = format!("input '{}' val", self.label);
        let locator = self.locator(":input");
        self.ctx.add_future_action(name, move |env| async move {
            let nodes = locator.find(&env)?;
            let Some(&first) = nodes.first() else {
                return Ok(Outcome::Failed(locator.miss()));
            };
            let value = env.document.read().value(first);
            Ok(Outcome::Resolved(Value::String(value)))
        })
    }

    /// `<kind>[<model attr>="<model>"]` under this chain's scope
    fn locator(&self, kind: &str) -> Locator {
        let selector = format!(
            "{}[{}={}]",
            kind,
            escape_ident(&self.conventions.model_attr),
            quote(&self.model)
        );
        Locator::named(self.scope.clone(), selector, self.model.clone())
    }
}

async fn enter(env: ActionEnv, locator: Locator, value: String) -> Result<Outcome, DslError> {
    let nodes = locator.find(&env)?;
    if nodes.is_empty() {
        return Ok(Outcome::Failed(locator.miss()));
    }
    {
        let mut doc = env.document.write();
        for node in &nodes {
            doc.set_value(*node, &value);
            doc.dispatch(*node, "input");
            doc.dispatch(*node, "change");
        }
    }
    notify(env.app.as_ref());
    Ok(Outcome::Resolved(Value::Null))
}

async fn toggle(env: ActionEnv, locator: Locator) -> Result<Outcome, DslError> {
    let nodes = locator.find(&env)?;
    if nodes.is_empty() {
        return Ok(Outcome::Failed(locator.miss()));
    }
    {
        let mut doc = env.document.write();
        for node in &nodes {
            let checked = doc.prop(*node, "checked").as_bool().unwrap_or(false);
            doc.set_prop(*node, "checked", Value::Bool(!checked));
            doc.dispatch(*node, "click");
            doc.dispatch(*node, "change");
        }
    }
    notify(env.app.as_ref());
    Ok(Outcome::Resolved(Value::Null))
}

async fn select_radio(
    env: ActionEnv,
    group: Locator,
    target: Locator,
) -> Result<Outcome, DslError> {
    let chosen = target.find(&env)?;
    if chosen.is_empty() {
        return Ok(Outcome::Failed(target.miss()));
    }
    let radios = group.find(&env)?;
    {
        let mut doc = env.document.write();
        for radio in radios.iter().filter(|radio| !chosen.contains(radio)) {
            doc.set_prop(*radio, "checked", Value::Bool(false));
        }
        for radio in &chosen {
            doc.set_prop(*radio, "checked", Value::Bool(true));
            doc.dispatch(*radio, "click");
            doc.dispatch(*radio, "change");
        }
    }
    notify(env.app.as_ref());
    Ok(Outcome::Resolved(Value::Null))
}
