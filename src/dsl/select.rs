//! `select(model)` chains over `<select>` elements bound to a model

use std::sync::Arc;

use serde_json::Value;

use super::locator::Locator;
use super::{notify, BindingConventions};
use crate::dom::selector::{escape_ident, quote};
use crate::engine::{did_not_match, ActionEnv, DslError, ExecutionContext, FutureHandle, Outcome};

#[derive(Debug, Clone)]
pub struct Select {
    ctx: ExecutionContext,
    scope: Vec<String>,
    model: String,
    label: String,
    conventions: Arc<BindingConventions>,
}

impl Select {
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

    /// Select the option whose value, or failing that visible text, is `value`
    pub fn option(&self, value: &str) -> FutureHandle {
        let name = format!("select '{}' option '{}'", self.label, value);
        let locator = self.locator("select");
        let value = value.to_string();
        self.ctx
            .add_future_action(name, move |env| select_option(env, locator, value))
    }

    /// Select exactly `values` on a multi-select
    pub fn options(&self, values: &[&str]) -> FutureHandle {
        let name = format!("select '{}' options '{}'", self.label, values.join(","));
        let locator = self.locator("select[multiple]");
        let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        self.ctx
            .add_future_action(name, move |env| select_options(env, locator, values))
    }

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

async fn select_option(env: ActionEnv, locator: Locator, value: String) -> Result<Outcome, DslError> {
    let selects = locator.find(&env)?;
    let Some(&select) = selects.first() else {
        return Ok(Outcome::Failed(locator.miss()));
    };

    {
        let mut doc = env.document.write();
        let options = doc.query(select, "option")?;
        let by_value = options.iter().find(|option| doc.value(**option) == value);
        let by_text = || {
            options
                .iter()
                .find(|option| doc.text(**option).trim() == value)
        };
        let Some(chosen) = by_value.or_else(by_text).map(|option| doc.value(*option)) else {
            return Ok(Outcome::Failed(did_not_match(&format!(
                "Option '{}' of '{}'",
                value,
                locator.full_selector()
            ))));
        };

        doc.set_value(select, &chosen);
        doc.dispatch(select, "change");
    }
    notify(env.app.as_ref());
    Ok(Outcome::Resolved(Value::Null))
}

async fn select_options(
    env: ActionEnv,
    locator: Locator,
    values: Vec<String>,
) -> Result<Outcome, DslError> {
    let selects = locator.find(&env)?;
    if selects.is_empty() {
        return Ok(Outcome::Failed(locator.miss()));
    }

    {
        let mut doc = env.document.write();
        for select in &selects {
            for option in doc.query(*select, "option")? {
                let selected = values.contains(&doc.value(option));
                doc.set_prop(option, "selected", Value::Bool(selected));
            }
            doc.dispatch(*select, "change");
        }
    }
    notify(env.app.as_ref());
    Ok(Outcome::Resolved(Value::Null))
}
