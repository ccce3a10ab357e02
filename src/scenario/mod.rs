//! Scenario files
//!
//! This module contains the YAML frontend of the DSL:
//! - `step` - Scenario, Step and ExpectSpec, and parsing of `uses` fields
//! - `compiler` - compile a scenario into DSL calls
//! - `loader` - load scenarios from files and directories
//! - `config` - runner configuration (`scenario.yaml`)

pub mod compiler;
pub mod config;
pub mod loader;
pub mod step;

pub use compiler::{compile, CompileError};
pub use config::ScenarioConfig;
pub use loader::{LoadError, ScenarioLoader};
pub use step::{ExpectSpec, ParsedUses, Scenario, Step, StepCategory};

/// File names that hold runner configuration rather than a scenario
pub const CONFIG_FILES: [&str; 2] = ["scenario.yaml", "scenario.yml"];
