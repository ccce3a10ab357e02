//! Runner configuration
//!
//! Loaded from `scenario.yaml` next to the scenarios, or from `--config`:
//!
//! ```yaml
//! clock: virtual
//! base_url: http://app.local/
//!
//! conventions:
//!   binding_class: ng-binding
//!   model_attr: ng:model
//!
//! pages:
//!   /login: pages/login.html
//!   http://app.local/home: pages/home.html
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{LoadError, Scenario, CONFIG_FILES};
use crate::bridge::{Location, MemoryApplication, MemoryHook, StaticLocationService};
use crate::dsl::BindingConventions;
use crate::engine::ClockMode;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Attribute and class names the application under test uses
    #[serde(default)]
    pub conventions: BindingConventions,

    #[serde(default)]
    pub clock: ClockMode,

    /// Base against which scenario urls and page urls are resolved
    #[serde(default)]
    pub base_url: Option<String>,

    /// Pages navigation can load: url → HTML file relative to the config file
    #[serde(default)]
    pub pages: HashMap<String, PathBuf>,

    /// Route reported by the application's location service; defaults to
    /// the starting location
    #[serde(default)]
    pub app_location: Option<String>,

    /// Directory the config was read from
    #[serde(skip)]
    pub root: Option<PathBuf>,
}

impl ScenarioConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config: ScenarioConfig =
            serde_yaml::from_str(&content).map_err(|e| LoadError::Yaml {
                file: path.display().to_string(),
                error: e,
            })?;
        config.root = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Config file in `dir`, or the defaults when there is none
    pub fn discover(dir: &Path) -> Result<Self, LoadError> {
        for name in CONFIG_FILES {
            let path = dir.join(name);
            if path.is_file() {
                debug!("Using config {}", path.display());
                return Self::load(path);
            }
        }
        Ok(Self::default())
    }

    /// Starting location for `scenario`
    pub fn start_location(&self, scenario: &Scenario) -> Result<Location, LoadError> {
        match &scenario.url {
            Some(url) => self.absolute(url),
            None => Ok(self.base_location()),
        }
    }

    /// In-memory application frame showing `scenario`'s starting document
    ///
    /// The frame carries a [`MemoryHook`] whose location service reports
    /// `app_location`, or the starting location when unset.
    pub fn application(&self, scenario: &Scenario) -> Result<MemoryApplication, LoadError> {
        let location = self.start_location(scenario)?;
        let app_location = self
            .app_location
            .clone()
            .unwrap_or_else(|| location.href().to_string());
        let hook = MemoryHook::new()
            .with_location_service(Arc::new(StaticLocationService::from_href(&app_location)));

        let mut app = MemoryApplication::from_html(&scenario.document_html()?)
            .with_location(location.href())
            .with_hook(Arc::new(hook));

        for (url, file) in &self.pages {
            let url = self.absolute(url)?;
            let html = std::fs::read_to_string(self.resolve(file))?;
            app = app.with_page(url.href(), html);
        }
        Ok(app)
    }

    /// `url` resolved against `base_url`; kept as given without a base
    fn absolute(&self, url: &str) -> Result<Location, LoadError> {
        match &self.base_url {
            Some(base) => Ok(Location::new(base.as_str()).resolve(url)?),
            None => Ok(Location::new(url)),
        }
    }

    fn base_location(&self) -> Location {
        self.base_url
            .as_deref()
            .map(Location::new)
            .unwrap_or_default()
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}
