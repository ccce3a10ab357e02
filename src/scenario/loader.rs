//! Scenario file loader
//!
//! Load one scenario file or every scenario in a directory.

use std::path::Path;

use tracing::debug;

use super::{Scenario, CONFIG_FILES};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error in {file}: {error}")]
    Yaml {
        file: String,
        error: serde_yaml::Error,
    },

    #[error("Invalid location: {0}")]
    Location(#[from] crate::bridge::BridgeError),
}

pub struct ScenarioLoader;

impl ScenarioLoader {
    /// Every `.yaml`/`.yml` scenario in `dir`, ordered by file name
    pub fn load_directory(dir: &Path) -> Result<Vec<Scenario>, LoadError> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }

            let ext = path.extension().and_then(|e| e.to_str());
            let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

            // scenario.yaml configures the run, it is not a scenario
            if CONFIG_FILES.contains(&filename) {
                continue;
            }
            if ext == Some("yaml") || ext == Some("yml") {
                paths.push(path);
            }
        }
        paths.sort();

        paths.iter().map(|path| Self::load_file(path)).collect()
    }

    pub fn load_file(path: &Path) -> Result<Scenario, LoadError> {
        debug!("Loading scenario {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let mut scenario = Scenario::from_yaml(&content).map_err(|e| LoadError::Yaml {
            file: path.display().to_string(),
            error: e,
        })?;
        scenario.source = Some(path.to_path_buf());
        Ok(scenario)
    }
}
