//! Compile scenario steps into DSL calls
//!
//! Each step becomes exactly one DSL call, plus one assertion when the step
//! carries an `expect:` block. Nothing runs here; the calls only enqueue
//! futures on the DSL's context.

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::step::{ExpectSpec, ParsedUses, Scenario, Step, StepCategory};
use crate::dsl::{BindingMatcher, Dsl, KeyValue, Matcher, Property};
use crate::engine::{parse_duration, FutureHandle};

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Step '{step}': {reason}")]
    InvalidUses { step: String, reason: String },

    #[error("Step '{step}': unknown action '{uses}'")]
    UnknownAction { step: String, uses: String },

    #[error("Step '{step}': missing parameter '{param}'")]
    MissingParam { step: String, param: String },

    #[error("Step '{step}': invalid parameter '{param}': {reason}")]
    InvalidParam {
        step: String,
        param: String,
        reason: String,
    },
}

/// Enqueue every step of `scenario` on `dsl`'s context, in order
///
/// Returns the handles of all enqueued futures, assertions included. On
/// error the futures of earlier steps stay enqueued.
pub fn compile(scenario: &Scenario, dsl: &Dsl) -> Result<Vec<FutureHandle>, CompileError> {
    let mut futures = Vec::with_capacity(scenario.steps.len());
    for step in &scenario.steps {
        let future = compile_step(step, dsl)?;
        let assertion = match &step.expect {
            Some(spec) => Some(compile_expect(step, spec, dsl, &future)?),
            None => None,
        };
        futures.push(future);
        futures.extend(assertion);
    }
    debug!(scenario = %scenario.name, futures = futures.len(), "Compiled scenario");
    Ok(futures)
}

fn compile_step(step: &Step, dsl: &Dsl) -> Result<FutureHandle, CompileError> {
    let parsed = ParsedUses::parse(&step.uses).map_err(|reason| CompileError::InvalidUses {
        step: step.display_name().to_string(),
        reason,
    })?;
    let dsl = step
        .using
        .iter()
        .fold(dsl.clone(), |scoped, selector| scoped.using(selector));
    let params = Params { step };

    match parsed.category {
        StepCategory::Browser => browser_step(&dsl, &parsed.action, &params),
        StepCategory::Element => element_step(&dsl, &parsed.action, &params),
        StepCategory::Repeater => repeater_step(&dsl, &parsed.action, &params),
        StepCategory::Binding => binding_step(&dsl, &parsed.action, &params),
        StepCategory::Input => input_step(&dsl, &parsed.action, &params),
        StepCategory::Select => select_step(&dsl, &parsed.action, &params),
        StepCategory::Control => control_step(&dsl, &parsed.action, &params),
    }
}

fn compile_expect(
    step: &Step,
    spec: &ExpectSpec,
    dsl: &Dsl,
    future: &FutureHandle,
) -> Result<FutureHandle, CompileError> {
    let matcher: Matcher = spec
        .matcher
        .parse()
        .map_err(|reason| CompileError::InvalidParam {
            step: step.display_name().to_string(),
            param: "expect.matcher".to_string(),
            reason,
        })?;

    let expected = match (&spec.value, matcher.takes_value()) {
        (Some(value), _) => value.clone(),
        (None, false) => Value::Null,
        (None, true) => {
            return Err(CompileError::MissingParam {
                step: step.display_name().to_string(),
                param: "expect.value".to_string(),
            })
        }
    };

    let mut expectation = dsl.expect(future);
    if spec.not {
        expectation = expectation.not();
    }
    Ok(expectation.check(matcher, expected))
}

fn browser_step(dsl: &Dsl, action: &str, params: &Params<'_>) -> Result<FutureHandle, CompileError> {
    let browser = dsl.browser();
    let from_app = match params.opt_string("source")?.as_deref() {
        None | Some("window") => false,
        Some("app") => true,
        Some(other) => {
            return Err(params.invalid("source", format!("expected 'window' or 'app', got '{}'", other)))
        }
    };

    let future = match action {
        "navigate" => browser.navigate_to(&params.string("url")?),
        "reload" => browser.reload(),
        "url" => browser.location().url(),
        "href" => browser.window().href(),
        "path" if from_app => browser.location().path(),
        "path" => browser.window().path(),
        "search" if from_app => browser.location().search(),
        "search" => browser.window().search(),
        "hash" if from_app => browser.location().hash(),
        "hash" => browser.window().hash(),
        _ => return Err(params.unknown()),
    };
    Ok(future)
}

fn element_step(dsl: &Dsl, action: &str, params: &Params<'_>) -> Result<FutureHandle, CompileError> {
    let mut element = dsl.element(&params.string("selector")?);
    if let Some(label) = params.opt_string("label")? {
        element = element.labeled(&label);
    }
    let value = params.get("value").cloned();

    let future = match action {
        "count" => element.count(),
        "click" => element.click(),
        "attr" | "css" | "prop" => {
            let method: KeyValue = action.parse().map_err(|_| params.unknown())?;
            let key = params.string("key")?;
            match value {
                Some(value) => element.set_key(method, &key, value),
                None => element.get_key(method, &key),
            }
        }
        other => {
            let property: Property = other.parse().map_err(|_| params.unknown())?;
            match value {
                Some(value) => element.set(property, value),
                None => element.get(property),
            }
        }
    };
    Ok(future)
}

fn repeater_step(dsl: &Dsl, action: &str, params: &Params<'_>) -> Result<FutureHandle, CompileError> {
    let mut repeater = dsl.repeater(&params.string("selector")?);
    if let Some(label) = params.opt_string("label")? {
        repeater = repeater.labeled(&label);
    }

    let future = match action {
        "count" => repeater.count(),
        "row" => repeater.row(params.index("index")?),
        "column" => repeater.column(&params.string("binding")?),
        _ => return Err(params.unknown()),
    };
    Ok(future)
}

fn binding_step(dsl: &Dsl, action: &str, params: &Params<'_>) -> Result<FutureHandle, CompileError> {
    if action != "value" {
        return Err(params.unknown());
    }
    let matcher = match params.opt_string("pattern")? {
        Some(pattern) => {
            let regex = Regex::new(&pattern).map_err(|e| params.invalid("pattern", e.to_string()))?;
            BindingMatcher::Pattern(regex)
        }
        None => BindingMatcher::Name(params.string("name")?),
    };
    Ok(dsl.binding(matcher))
}

fn input_step(dsl: &Dsl, action: &str, params: &Params<'_>) -> Result<FutureHandle, CompileError> {
    let mut input = dsl.input(&params.string("model")?);
    if let Some(label) = params.opt_string("label")? {
        input = input.labeled(&label);
    }

    let future = match action {
        "enter" => input.enter(&params.string("value")?),
        "check" => input.check(),
        "select" => input.select(&params.string("value")?),
        "val" => input.val(),
        _ => return Err(params.unknown()),
    };
    Ok(future)
}

fn select_step(dsl: &Dsl, action: &str, params: &Params<'_>) -> Result<FutureHandle, CompileError> {
    let mut select = dsl.select(&params.string("model")?);
    if let Some(label) = params.opt_string("label")? {
        select = select.labeled(&label);
    }

    let future = match action {
        "option" => select.option(&params.string("value")?),
        "options" => {
            let values = params.strings("values")?;
            let values: Vec<&str> = values.iter().map(String::as_str).collect();
            select.options(&values)
        }
        _ => return Err(params.unknown()),
    };
    Ok(future)
}

fn control_step(dsl: &Dsl, action: &str, params: &Params<'_>) -> Result<FutureHandle, CompileError> {
    match action {
        "pause" => Ok(dsl.pause()),
        "sleep" => {
            let seconds = match (params.get("seconds"), params.opt_string("duration")?) {
                (Some(seconds), _) => seconds
                    .as_f64()
                    .ok_or_else(|| params.invalid("seconds", "expected a number".to_string()))?,
                (None, Some(duration)) => parse_duration(&duration)
                    .map_err(|e| params.invalid("duration", e.to_string()))?
                    .as_secs_f64(),
                (None, None) => return Err(params.missing("seconds")),
            };
            Ok(dsl.sleep(seconds))
        }
        _ => Err(params.unknown()),
    }
}

/// Typed access to a step's `with:` map
struct Params<'a> {
    step: &'a Step,
}

impl Params<'_> {
    fn get(&self, key: &str) -> Option<&Value> {
        self.step.with.get(key).filter(|value| !value.is_null())
    }

    fn string(&self, key: &str) -> Result<String, CompileError> {
        self.opt_string(key)?.ok_or_else(|| self.missing(key))
    }

    /// Strings as given; numbers and booleans in their text form
    fn opt_string(&self, key: &str) -> Result<Option<String>, CompileError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(value @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(value.to_string())),
            Some(_) => Err(self.invalid(key, "expected a string".to_string())),
        }
    }

    fn strings(&self, key: &str) -> Result<Vec<String>, CompileError> {
        let Some(value) = self.get(key) else {
            return Err(self.missing(key));
        };
        let items = value
            .as_array()
            .ok_or_else(|| self.invalid(key, "expected a list".to_string()))?;
        items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                Value::Number(_) | Value::Bool(_) => Ok(item.to_string()),
                _ => Err(self.invalid(key, "expected a list of strings".to_string())),
            })
            .collect()
    }

    fn index(&self, key: &str) -> Result<usize, CompileError> {
        let value = self.get(key).ok_or_else(|| self.missing(key))?;
        value
            .as_u64()
            .and_then(|index| usize::try_from(index).ok())
            .ok_or_else(|| self.invalid(key, "expected a non-negative integer".to_string()))
    }

    fn missing(&self, key: &str) -> CompileError {
        CompileError::MissingParam {
            step: self.step.display_name().to_string(),
            param: key.to_string(),
        }
    }

    fn invalid(&self, key: &str, reason: String) -> CompileError {
        CompileError::InvalidParam {
            step: self.step.display_name().to_string(),
            param: key.to_string(),
            reason,
        }
    }

    fn unknown(&self) -> CompileError {
        CompileError::UnknownAction {
            step: self.step.display_name().to_string(),
            uses: self.step.uses.clone(),
        }
    }
}
