//! In-process application frame
//!
//! `MemoryApplication` keeps a location, a [`MemoryDocument`] and a registry
//! of pages that navigation can load. Together with [`MemoryHook`] it stands
//! in for a real browser frame in tests and in the command line runner.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use super::{
    AppHook, Application, BridgeError, Location, LocationService, Service, ServiceLocator,
    LOCATION_SERVICE,
};
use crate::dom::{share, MemoryDocument, SharedDocument};

struct FrameState {
    location: Location,
    document: SharedDocument,
    history: Vec<String>,
}

pub struct MemoryApplication {
    state: RwLock<FrameState>,
    pages: HashMap<String, String>,
    hook: Option<Arc<dyn AppHook>>,
}

impl MemoryApplication {
    /// Frame showing `document` at `about:blank`, with no hook installed
    pub fn new(document: MemoryDocument) -> Self {
        Self {
            state: RwLock::new(FrameState {
                location: Location::default(),
                document: share(document),
                history: Vec::new(),
            }),
            pages: HashMap::new(),
            hook: None,
        }
    }

    pub fn from_html(html: &str) -> Self {
        Self::new(MemoryDocument::parse(html))
    }

    pub fn with_location(mut self, href: impl Into<String>) -> Self {
        self.state.get_mut().location = Location::new(href);
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn AppHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Register markup served when navigating to `url`
    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    /// Every href navigated to, in order
    pub fn history(&self) -> Vec<String> {
        self.state.read().history.clone()
    }

    fn page(&self, location: &Location) -> Option<&String> {
        self.pages
            .get(location.href())
            .or_else(|| self.pages.get(location.without_fragment()))
    }
}

#[async_trait]
impl Application for MemoryApplication {
    async fn navigate_to(&self, url: &str) -> Result<Location, BridgeError> {
        let mut state = self.state.write();
        let target = state.location.resolve(url)?;

        let hash_change = target.without_fragment() == state.location.without_fragment()
            && target.href() != state.location.href();
        if !hash_change {
            if let Some(html) = self.page(&target) {
                debug!("Loading page for {}", target);
                state.document = share(MemoryDocument::parse(html));
            }
        }

        debug!("Navigated to {}", target);
        state.history.push(target.href().to_string());
        state.location = target.clone();
        Ok(target)
    }

    fn location(&self) -> Location {
        self.state.read().location.clone()
    }

    fn document(&self) -> SharedDocument {
        self.state.read().document.clone()
    }

    fn hook(&self) -> Option<Arc<dyn AppHook>> {
        self.hook.clone()
    }
}

/// Service registry handed out by [`MemoryHook::scope`]
#[derive(Debug, Default, Clone)]
pub struct ServiceRegistry {
    services: HashMap<String, Service>,
}

impl ServiceLocator for ServiceRegistry {
    fn service(&self, id: &str) -> Result<Service, BridgeError> {
        self.services
            .get(id)
            .cloned()
            .ok_or_else(|| BridgeError::UnknownService(id.to_string()))
    }
}

/// In-process automation hook that counts notifications
#[derive(Default)]
pub struct MemoryHook {
    registry: Arc<ServiceRegistry>,
    notifications: AtomicUsize,
}

impl MemoryHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(mut self, id: impl Into<String>, service: Service) -> Self {
        Arc::make_mut(&mut self.registry)
            .services
            .insert(id.into(), service);
        self
    }

    pub fn with_location_service(self, service: Arc<dyn LocationService>) -> Self {
        self.with_service(LOCATION_SERVICE, Service::Location(service))
    }

    /// How many times the application was asked to re-synchronize
    pub fn notifications(&self) -> usize {
        self.notifications.load(Ordering::SeqCst)
    }
}

impl AppHook for MemoryHook {
    fn scope(&self) -> Arc<dyn ServiceLocator> {
        self.registry.clone()
    }

    fn notify(&self) {
        self.notifications.fetch_add(1, Ordering::SeqCst);
    }
}

/// Location service with fixed values
#[derive(Debug, Clone, PartialEq)]
pub struct StaticLocationService {
    pub url: String,
    pub path: String,
    pub search: Value,
    pub hash: String,
}

impl StaticLocationService {
    /// Derive every part from one href such as `/path?search=a#hhh`
    pub fn from_href(href: &str) -> Self {
        let location = Location::new(href);
        Self {
            url: href.to_string(),
            path: location.pathname(),
            search: location.query_object(),
            hash: location.hash(),
        }
    }
}

impl LocationService for StaticLocationService {
    fn url(&self) -> String {
        self.url.clone()
    }

    fn path(&self) -> String {
        self.path.clone()
    }

    fn search(&self) -> Value {
        self.search.clone()
    }

    fn hash(&self) -> String {
        self.hash.clone()
    }
}
