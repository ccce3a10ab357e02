//! Scenario DSL
//!
//! Each call on [`Dsl`] (or on a chain it returns) enqueues exactly one named
//! future on the [`ExecutionContext`] and hands back its [`FutureHandle`].
//! Nothing touches the document until the context is run.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use scenario_dsl::prelude::*;
//! # async fn demo() -> Result<(), DslError> {
//! let app = Arc::new(MemoryApplication::from_html(r#"<input ng:model="name">"#));
//! let ctx = ExecutionContext::new(app);
//! let dsl = Dsl::new(ctx.clone());
//!
//! dsl.input("name").enter("misko");
//! let value = dsl.input("name").val();
//! dsl.expect(&value).to_equal("misko");
//!
//! let summary = ctx.run().await?;
//! assert!(summary.success);
//! # Ok(())
//! # }
//! ```

pub mod binding;
pub mod browser;
pub mod control;
pub mod element;
pub mod expect;
pub mod input;
pub mod locator;
pub mod repeater;
pub mod select;

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bridge::Application;
use crate::engine::{ActionEnv, DslError, ExecutionContext, FutureHandle, Outcome};

pub use binding::BindingMatcher;
pub use browser::{AppLocation, Browser, BrowserWindow};
pub use control::PAUSE_FUTURE;
pub use element::{Element, KeyValue, Property};
pub use expect::{Expectation, Matcher};
pub use input::Input;
pub use locator::Locator;
pub use repeater::Repeater;
pub use select::Select;

/// Attribute and class names the application uses to annotate its DOM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingConventions {
    /// Class carried by every element that renders a binding
    pub binding_class: String,
    /// Attribute holding a single binding expression
    pub bind_attr: String,
    /// Attribute holding an interpolated template
    pub template_attr: String,
    /// Attribute tying a form control to a model
    pub model_attr: String,
}

impl Default for BindingConventions {
    fn default() -> Self {
        Self {
            binding_class: "ng-binding".to_string(),
            bind_attr: "ng:bind".to_string(),
            template_attr: "ng:bind-template".to_string(),
            model_attr: "ng:model".to_string(),
        }
    }
}

/// Entry point of the DSL
#[derive(Debug, Clone)]
pub struct Dsl {
    ctx: ExecutionContext,
    scope: Vec<String>,
    label: String,
    conventions: Arc<BindingConventions>,
}

impl Dsl {
    pub fn new(ctx: ExecutionContext) -> Self {
        Self {
            ctx,
            scope: Vec::new(),
            label: String::new(),
            conventions: Arc::new(BindingConventions::default()),
        }
    }

    pub fn with_conventions(mut self, conventions: BindingConventions) -> Self {
        self.conventions = Arc::new(conventions);
        self
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    pub fn conventions(&self) -> &BindingConventions {
        &self.conventions
    }

    /// Selectors every lookup made through this value is nested under
    pub fn scope(&self) -> &[String] {
        &self.scope
    }

    /// Label of the innermost `using` scope
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Narrow later lookups to descendants of `selector`
    ///
    /// Enqueues nothing.
    pub fn using(&self, selector: &str) -> Dsl {
        let mut scoped = self.clone();
        scoped.scope.push(selector.to_string());
        scoped.label = selector.to_string();
        scoped
    }

    /// Give the innermost `using` scope a display label
    pub fn labeled(mut self, label: &str) -> Dsl {
        self.label = format!("{} ( {} )", label, self.scope.join(" "));
        self
    }

    pub fn element(&self, selector: &str) -> Element {
        Element::new(self.ctx.clone(), self.locator(selector))
    }

    pub fn repeater(&self, selector: &str) -> Repeater {
        Repeater::new(
            self.ctx.clone(),
            self.locator(selector),
            self.conventions.clone(),
        )
    }

    pub fn input(&self, model: &str) -> Input {
        Input::new(
            self.ctx.clone(),
            self.scope.clone(),
            model,
            self.conventions.clone(),
        )
    }

    pub fn select(&self, model: &str) -> Select {
        Select::new(
            self.ctx.clone(),
            self.scope.clone(),
            model,
            self.conventions.clone(),
        )
    }

    pub fn browser(&self) -> Browser {
        Browser::new(self.ctx.clone())
    }

    pub fn expect(&self, future: &FutureHandle) -> Expectation {
        Expectation::new(self.ctx.clone(), future.clone())
    }

    /// Enqueue a custom action that sees this value's `using` scope
    pub fn add_future_action<F, Fut>(&self, name: impl Into<String>, f: F) -> FutureHandle
    where
        F: FnOnce(ActionEnv) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Outcome, DslError>> + Send + 'static,
    {
        let scope = self.scope.clone();
        self.ctx
            .add_future_action(name, move |env| f(env.scoped(scope)))
    }

    fn locator(&self, selector: &str) -> Locator {
        Locator::new(self.scope.clone(), selector)
    }
}

/// JSON number, integral when possible
pub(crate) fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

/// Text form of a value as it would be written into the DOM
pub(crate) fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Tell the application its DOM changed, when it is instrumented
pub(crate) fn notify(app: &dyn Application) {
    if let Some(hook) = app.hook() {
        hook.notify();
    }
}
