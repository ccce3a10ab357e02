//! Bridge to the application under test
//!
//! This module provides the seams the DSL calls into:
//! - `Application`: navigation, the current location and document
//! - `AppHook`: the optional in-page automation hook
//! - `ServiceLocator` / `LocationService`: in-page services reached through the hook
//! - `location`: parsing of raw location hrefs
//! - `memory`: in-process implementations of all of the above

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::dom::SharedDocument;

pub mod location;
pub mod memory;

pub use location::Location;
pub use memory::{MemoryApplication, MemoryHook, StaticLocationService};

/// Service id of the in-page location service
pub const LOCATION_SERVICE: &str = "$location";

/// Common error type for bridge operations
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Automation hook is missing: {0}")]
    MissingHook(String),

    #[error("Unknown service id {0}")]
    UnknownService(String),

    #[error("Navigation error: {0}")]
    Navigation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The application frame the DSL drives
#[async_trait]
pub trait Application: Send + Sync {
    /// Navigate to `url`, resolved against the current location
    async fn navigate_to(&self, url: &str) -> Result<Location, BridgeError>;

    fn location(&self) -> Location;

    /// Document currently loaded in the frame
    fn document(&self) -> SharedDocument;

    /// In-page automation hook; `None` when the page is not instrumented
    fn hook(&self) -> Option<Arc<dyn AppHook>>;
}

/// In-page automation hook
pub trait AppHook: Send + Sync {
    fn scope(&self) -> Arc<dyn ServiceLocator>;

    /// Re-synchronize the application after the DOM was mutated
    fn notify(&self);
}

pub trait ServiceLocator: Send + Sync {
    fn service(&self, id: &str) -> Result<Service, BridgeError>;
}

/// Services the DSL knows how to use
#[derive(Clone)]
pub enum Service {
    Location(Arc<dyn LocationService>),
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Service::Location(_) => f.write_str("Service::Location"),
        }
    }
}

/// Application-side view of the current route
pub trait LocationService: Send + Sync {
    fn url(&self) -> String;
    fn path(&self) -> String;
    /// Query parameters as a JSON object
    fn search(&self) -> Value;
    /// Fragment without the leading `#`
    fn hash(&self) -> String;
}

/// Look up the location service through an application's hook
pub fn location_service(app: &dyn Application) -> Result<Arc<dyn LocationService>, BridgeError> {
    let hook = app
        .hook()
        .ok_or_else(|| BridgeError::MissingHook(LOCATION_SERVICE.to_string()))?;
    match hook.scope().service(LOCATION_SERVICE)? {
        Service::Location(service) => Ok(service),
    }
}
