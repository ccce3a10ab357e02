//! Browser façade: navigation plus the raw and application-side location

use serde_json::Value;

use crate::bridge::{location_service, LocationService};
use crate::engine::{ActionEnv, ExecutionContext, FutureHandle, Outcome};

#[derive(Debug, Clone)]
pub struct Browser {
    ctx: ExecutionContext,
}

impl Browser {
    pub(crate) fn new(ctx: ExecutionContext) -> Self {
        Self { ctx }
    }

    /// Navigate the application frame to `url`; resolves with the new href
    ///
    /// Works whether or not the page carries an automation hook.
    pub fn navigate_to(&self, url: &str) -> FutureHandle {
        self.navigate_to_with(url, |url| url.to_string())
    }

    /// Like [`navigate_to`](Self::navigate_to), but the actual target is
    /// computed from `url` when the future runs
    pub fn navigate_to_with<F>(&self, url: &str, target: F) -> FutureHandle
    where
        F: FnOnce(&str) -> String + Send + 'static,
    {
        let name = format!("browser navigate to '{}'", url);
        let url = url.to_string();
        self.ctx.add_future_action(name, move |env| async move {
            let target = target(&url);
            Ok(navigate(&env, &target).await)
        })
    }

    /// Navigate to the current href again
    pub fn reload(&self) -> FutureHandle {
        self.ctx.add_future_action("browser reload", |env| async move {
            let href = env.app.location().href().to_string();
            Ok(navigate(&env, &href).await)
        })
    }

    pub fn window(&self) -> BrowserWindow {
        BrowserWindow {
            ctx: self.ctx.clone(),
        }
    }

    pub fn location(&self) -> AppLocation {
        AppLocation {
            ctx: self.ctx.clone(),
        }
    }
}

async fn navigate(env: &ActionEnv, target: &str) -> Outcome {
    match env.app.navigate_to(target).await {
        Ok(location) => Outcome::Resolved(Value::String(location.href().to_string())),
        Err(e) => Outcome::Failed(e.to_string()),
    }
}

/// Raw location of the application frame
#[derive(Debug, Clone)]
pub struct BrowserWindow {
    ctx: ExecutionContext,
}

impl BrowserWindow {
    pub fn href(&self) -> FutureHandle {
        self.ctx
            .add_future_action("window.location.href", |env| async move {
                Ok(Outcome::Resolved(Value::String(
                    env.app.location().href().to_string(),
                )))
            })
    }

    pub fn path(&self) -> FutureHandle {
        self.ctx
            .add_future_action("window.location.path", |env| async move {
                Ok(Outcome::Resolved(Value::String(env.app.location().pathname())))
            })
    }

    /// Query string including its leading `?`
    pub fn search(&self) -> FutureHandle {
        self.ctx
            .add_future_action("window.location.search", |env| async move {
                Ok(Outcome::Resolved(Value::String(env.app.location().search())))
            })
    }

    /// Fragment without the leading `#`
    pub fn hash(&self) -> FutureHandle {
        self.ctx
            .add_future_action("window.location.hash", |env| async move {
                Ok(Outcome::Resolved(Value::String(env.app.location().hash())))
            })
    }
}

/// Location as the application's own routing service reports it
#[derive(Debug, Clone)]
pub struct AppLocation {
    ctx: ExecutionContext,
}

impl AppLocation {
    pub fn url(&self) -> FutureHandle {
        self.read("$location.url()", |service| Value::String(service.url()))
    }

    pub fn path(&self) -> FutureHandle {
        self.read("$location.path()", |service| Value::String(service.path()))
    }

    /// Query parameters as an object
    pub fn search(&self) -> FutureHandle {
        self.read("$location.search()", |service| service.search())
    }

    pub fn hash(&self) -> FutureHandle {
        self.read("$location.hash()", |service| Value::String(service.hash()))
    }

    fn read<F>(&self, name: &str, f: F) -> FutureHandle
    where
        F: FnOnce(&dyn LocationService) -> Value + Send + 'static,
    {
        self.ctx.add_future_action(name, move |env| async move {
            Ok(match location_service(env.app.as_ref()) {
                Ok(service) => Outcome::Resolved(f(service.as_ref())),
                Err(e) => Outcome::Failed(e.to_string()),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{MemoryApplication, MemoryHook, StaticLocationService};
    use crate::dsl::Dsl;
    use serde_json::json;
    use std::sync::Arc;

    fn dsl_at(href: &str) -> Dsl {
        let app = MemoryApplication::from_html("").with_location(href);
        Dsl::new(ExecutionContext::new(Arc::new(app)))
    }

    #[tokio::test]
    async fn test_window_accessors() {
        let dsl = dsl_at("http://myurl/some/path?foo=10#bar?x=2");
        let window = dsl.browser().window();
        let href = window.href();
        let path = window.path();
        let search = window.search();
        let hash = window.hash();
        dsl.context().run().await.unwrap();

        assert_eq!(href.value(), Some(&json!("http://myurl/some/path?foo=10#bar?x=2")));
        assert_eq!(path.value(), Some(&json!("/some/path")));
        assert_eq!(search.value(), Some(&json!("?foo=10")));
        assert_eq!(hash.value(), Some(&json!("bar?x=2")));
    }

    #[tokio::test]
    async fn test_app_location_without_hook_fails() {
        let dsl = dsl_at("about:blank");
        let url = dsl.browser().location().url();
        dsl.context().run().await.unwrap();
        assert!(url.error().is_some());
    }

    #[tokio::test]
    async fn test_app_location_through_hook() {
        let hook = MemoryHook::new()
            .with_location_service(Arc::new(StaticLocationService::from_href("/path?search=a#hhh")));
        let app = MemoryApplication::from_html("").with_hook(Arc::new(hook));
        let dsl = Dsl::new(ExecutionContext::new(Arc::new(app)));

        let location = dsl.browser().location();
        let search = location.search();
        let hash = location.hash();
        dsl.context().run().await.unwrap();

        assert_eq!(search.value(), Some(&json!({"search": "a"})));
        assert_eq!(hash.value(), Some(&json!("hhh")));
    }
}
