//! Scenario, Step and ExpectSpec definitions

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::LoadError;

/// One scenario file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name (required)
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// HTML file loaded as the starting document, relative to the scenario file
    #[serde(default)]
    pub page: Option<PathBuf>,

    /// Inline starting document; wins over `page`
    #[serde(default)]
    pub html: Option<String>,

    /// Starting location of the application frame
    #[serde(default)]
    pub url: Option<String>,

    pub steps: Vec<Step>,

    /// File the scenario was read from
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Scenario {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Markup of the starting document; empty when none is given
    pub fn document_html(&self) -> Result<String, LoadError> {
        if let Some(html) = &self.html {
            return Ok(html.clone());
        }
        match &self.page {
            Some(page) => Ok(std::fs::read_to_string(self.resolve(page))?),
            None => Ok(String::new()),
        }
    }

    /// Resolve `path` against the directory of the scenario file
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match self.source.as_deref().and_then(Path::parent) {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

/// One DSL call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// ID for referencing from logs
    #[serde(default)]
    pub id: Option<String>,

    /// Step name (for logging)
    #[serde(default)]
    pub name: Option<String>,

    /// DSL call to make, as `category/action` (e.g. "input/enter", "element/click")
    pub uses: String,

    /// `using` scopes applied before the call, outermost first
    #[serde(default)]
    pub using: Vec<String>,

    /// Call parameters
    #[serde(default)]
    pub with: HashMap<String, Value>,

    /// Assertion on the call's result
    #[serde(default)]
    pub expect: Option<ExpectSpec>,
}

impl Step {
    /// Name used in error messages: the id, the name, or the `uses` string
    pub fn display_name(&self) -> &str {
        self.id
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(&self.uses)
    }
}

/// Assertion attached to a step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectSpec {
    /// Matcher name, snake_case or camelCase (`to_equal`, `toEqual`)
    pub matcher: String,

    #[serde(default)]
    pub value: Option<Value>,

    #[serde(default)]
    pub not: bool,
}

/// Categories of steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepCategory {
    Browser,
    Element,
    Repeater,
    Binding,
    Input,
    Select,
    Control,
}

/// Parsed `uses` field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUses {
    pub category: StepCategory,
    pub action: String,
}

impl ParsedUses {
    /// Parse an action string like "input/enter" into category and action
    pub fn parse(uses: &str) -> Result<Self, String> {
        let Some((category, action)) = uses.split_once('/') else {
            return Err(format!(
                "Invalid action format '{}'. Expected 'category/action'",
                uses
            ));
        };
        if action.is_empty() || action.contains('/') {
            return Err(format!(
                "Invalid action format '{}'. Expected 'category/action'",
                uses
            ));
        }

        let category = match category {
            "browser" => StepCategory::Browser,
            "element" => StepCategory::Element,
            "repeater" => StepCategory::Repeater,
            "binding" => StepCategory::Binding,
            "input" => StepCategory::Input,
            "select" => StepCategory::Select,
            "control" => StepCategory::Control,
            other => return Err(format!("Unknown action category: {}", other)),
        };

        Ok(Self {
            category,
            action: action.to_string(),
        })
    }
}
