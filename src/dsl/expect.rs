//! Assertion bridge
//!
//! `expect(future)` reads the value of an earlier future when its own turn
//! in the queue comes. A mismatch fails the assertion's future; the source
//! future is left untouched.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::{DslError, ExecutionContext, FutureHandle, Outcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Matcher {
    ToEqual,
    ToBe,
    ToBeDefined,
    ToBeNull,
    ToBeTruthy,
    ToBeFalsy,
    ToMatch,
    ToContain,
    ToBeLessThan,
    ToBeGreaterThan,
}

impl Matcher {
    pub const ALL: [Matcher; 10] = [
        Matcher::ToEqual,
        Matcher::ToBe,
        Matcher::ToBeDefined,
        Matcher::ToBeNull,
        Matcher::ToBeTruthy,
        Matcher::ToBeFalsy,
        Matcher::ToMatch,
        Matcher::ToContain,
        Matcher::ToBeLessThan,
        Matcher::ToBeGreaterThan,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Matcher::ToEqual => "to_equal",
            Matcher::ToBe => "to_be",
            Matcher::ToBeDefined => "to_be_defined",
            Matcher::ToBeNull => "to_be_null",
            Matcher::ToBeTruthy => "to_be_truthy",
            Matcher::ToBeFalsy => "to_be_falsy",
            Matcher::ToMatch => "to_match",
            Matcher::ToContain => "to_contain",
            Matcher::ToBeLessThan => "to_be_less_than",
            Matcher::ToBeGreaterThan => "to_be_greater_than",
        }
    }

    /// Whether the matcher compares against an expected value
    pub fn takes_value(&self) -> bool {
        !matches!(
            self,
            Matcher::ToBeDefined | Matcher::ToBeNull | Matcher::ToBeTruthy | Matcher::ToBeFalsy
        )
    }

    pub fn evaluate(&self, actual: &Value, expected: &Value) -> Result<bool, DslError> {
        let passed = match self {
            Matcher::ToEqual | Matcher::ToBe => json_eq(actual, expected),
            Matcher::ToBeDefined => !actual.is_null(),
            Matcher::ToBeNull => actual.is_null(),
            Matcher::ToBeTruthy => truthy(actual),
            Matcher::ToBeFalsy => !truthy(actual),
            Matcher::ToMatch => {
                let Value::String(pattern) = expected else {
                    return Err(DslError::action(
                        self.name(),
                        format!("pattern must be a string, got {}", expected),
                    ));
                };
                let text = match actual {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Regex::new(pattern)?.is_match(&text)
            }
            Matcher::ToContain => match (actual, expected) {
                (Value::Array(items), _) => items.iter().any(|item| json_eq(item, expected)),
                (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
                (Value::Object(map), Value::String(key)) => map.contains_key(key),
                _ => false,
            },
            Matcher::ToBeLessThan => compare(actual, expected, |a, b| a < b),
            Matcher::ToBeGreaterThan => compare(actual, expected, |a, b| a > b),
        };
        Ok(passed)
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Matcher {
    type Err = String;

    /// Accepts snake_case and camelCase spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .flat_map(|c| {
                if c.is_ascii_uppercase() {
                    vec!['_', c.to_ascii_lowercase()]
                } else {
                    vec![c]
                }
            })
            .collect();
        Matcher::ALL
            .into_iter()
            .find(|matcher| matcher.name() == normalized)
            .ok_or_else(|| format!("unknown matcher '{}'", s))
    }
}

/// Pending assertion on one future
#[derive(Debug, Clone)]
pub struct Expectation {
    ctx: ExecutionContext,
    source: FutureHandle,
    inverse: bool,
}

impl Expectation {
    pub(crate) fn new(ctx: ExecutionContext, source: FutureHandle) -> Self {
        Self {
            ctx,
            source,
            inverse: false,
        }
    }

    /// Invert the next matcher
    pub fn not(mut self) -> Self {
        self.inverse = !self.inverse;
        self
    }

    pub fn to_equal(&self, expected: impl Into<Value>) -> FutureHandle {
        self.check(Matcher::ToEqual, expected.into())
    }

    pub fn to_be(&self, expected: impl Into<Value>) -> FutureHandle {
        self.check(Matcher::ToBe, expected.into())
    }

    pub fn to_be_defined(&self) -> FutureHandle {
        self.check(Matcher::ToBeDefined, Value::Null)
    }

    pub fn to_be_null(&self) -> FutureHandle {
        self.check(Matcher::ToBeNull, Value::Null)
    }

    pub fn to_be_truthy(&self) -> FutureHandle {
        self.check(Matcher::ToBeTruthy, Value::Null)
    }

    pub fn to_be_falsy(&self) -> FutureHandle {
        self.check(Matcher::ToBeFalsy, Value::Null)
    }

    /// Regex match against the actual value's text
    pub fn to_match(&self, pattern: &str) -> FutureHandle {
        self.check(Matcher::ToMatch, Value::String(pattern.to_string()))
    }

    pub fn to_contain(&self, expected: impl Into<Value>) -> FutureHandle {
        self.check(Matcher::ToContain, expected.into())
    }

    pub fn to_be_less_than(&self, expected: impl Into<Value>) -> FutureHandle {
        self.check(Matcher::ToBeLessThan, expected.into())
    }

    pub fn to_be_greater_than(&self, expected: impl Into<Value>) -> FutureHandle {
        self.check(Matcher::ToBeGreaterThan, expected.into())
    }

    /// Enqueue `matcher` against `expected`
    pub fn check(&self, matcher: Matcher, expected: Value) -> FutureHandle {
        let negation = if self.inverse { "not " } else { "" };
        let name = if matcher.takes_value() {
            format!("expect {} {}{} {}", self.source.name(), negation, matcher, expected)
        } else {
            format!("expect {} {}{}", self.source.name(), negation, matcher)
        };

        let source = self.source.clone();
        let inverse = self.inverse;
        self.ctx.add_future_action(name, move |_| async move {
            let actual = source.value().cloned().unwrap_or(Value::Null);
            let passed = matcher.evaluate(&actual, &expected)?;
            if passed != inverse {
                return Ok(Outcome::Resolved(Value::Null));
            }

            let described = if matcher.takes_value() {
                expected.to_string()
            } else {
                matcher.to_string()
            };
            Ok(Outcome::Failed(format!(
                "expected {}{} but was {}",
                negation, described, actual
            )))
        })
    }
}

/// Structural equality that treats `10` and `10.0` as equal
fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_eq(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| json_eq(x, y)))
        }
        _ => a == b,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn compare(actual: &Value, expected: &Value, op: fn(f64, f64) -> bool) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => op(a, b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_matchers() {
        let eval = |m: Matcher, actual: Value, expected: Value| m.evaluate(&actual, &expected).unwrap();

        assert!(eval(Matcher::ToEqual, json!(10), json!(10.0)));
        assert!(eval(Matcher::ToEqual, json!(["a", 1]), json!(["a", 1])));
        assert!(!eval(Matcher::ToEqual, json!(10), json!(20)));
        assert!(eval(Matcher::ToBeDefined, json!(0), Value::Null));
        assert!(eval(Matcher::ToBeNull, Value::Null, Value::Null));
        assert!(eval(Matcher::ToBeTruthy, json!("x"), Value::Null));
        assert!(eval(Matcher::ToBeFalsy, json!(""), Value::Null));
        assert!(eval(Matcher::ToMatch, json!("30px"), json!("30px")));
        assert!(eval(Matcher::ToMatch, json!("about:blank#foo"), json!("#foo$")));
        assert!(eval(Matcher::ToContain, json!(["male", "female"]), json!("female")));
        assert!(eval(Matcher::ToContain, json!("some value"), json!("value")));
        assert!(eval(Matcher::ToBeLessThan, json!(1), json!(2)));
        assert!(eval(Matcher::ToBeGreaterThan, json!(3), json!(2)));
        assert!(!eval(Matcher::ToBeGreaterThan, json!("3"), json!(2)));
    }

    #[test]
    fn test_bad_pattern_is_an_error() {
        assert!(matches!(
            Matcher::ToMatch.evaluate(&json!("x"), &json!("(")),
            Err(DslError::Pattern(_))
        ));
        assert!(Matcher::ToMatch.evaluate(&json!("x"), &json!(1)).is_err());
    }

    #[test]
    fn test_matcher_from_str() {
        assert_eq!("toEqual".parse::<Matcher>().unwrap(), Matcher::ToEqual);
        assert_eq!("to_be_less_than".parse::<Matcher>().unwrap(), Matcher::ToBeLessThan);
        assert!("toFly".parse::<Matcher>().is_err());
    }
}
