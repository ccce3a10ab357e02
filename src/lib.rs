//! # Scenario DSL
//!
//! A browser-automation DSL for end-to-end tests of web applications. Every
//! DSL call enqueues one named future; futures run strictly one after the
//! other against the application's document and report either a value or
//! an error message.
//!
//! ## Modules
//!
//! - **engine**: the future queue, completion handles, timers and errors
//! - **dsl**: `pause`, `sleep`, `expect`, `browser`, `element`, `repeater`,
//!   `binding`, `input`, `select` and `using`
//! - **dom**: the `Document` boundary, a CSS selector engine and an
//!   in-memory document parsed from HTML
//! - **bridge**: the application under test (navigation, location, in-page
//!   automation hook)
//! - **scenario**: YAML scenario files compiled into DSL calls
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use scenario_dsl::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let app = Arc::new(MemoryApplication::from_html(
//!         r#"<ul><li><span class="ng-binding" ng:bind="name">misko</span></li></ul>"#,
//!     ));
//!     let ctx = ExecutionContext::new(app);
//!     let dsl = Dsl::new(ctx.clone());
//!
//!     let names = dsl.repeater("ul li").column("name");
//!     dsl.expect(&names).to_equal(vec!["misko"]);
//!
//!     let summary = ctx.run().await?;
//!     println!("Scenario completed: success={}", summary.success);
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod dom;
pub mod dsl;
pub mod engine;
pub mod scenario;

// Re-export main types
pub use bridge::{Application, BridgeError, Location, MemoryApplication, MemoryHook};
pub use dom::{Document, DomError, MemoryDocument, NodeId};
pub use dsl::{BindingConventions, Dsl};
pub use engine::{
    ControlEvent, Done, DslError, ExecutionContext, FutureHandle, FutureRecord, FutureStatus,
    MockClock, Outcome, RunSummary,
};
pub use scenario::{compile, CompileError, LoadError, Scenario, ScenarioConfig, ScenarioLoader};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::bridge::{
        Application, BridgeError, MemoryApplication, MemoryHook, StaticLocationService,
    };
    pub use crate::dom::{Document, MemoryDocument, NodeId};
    pub use crate::dsl::{BindingConventions, BindingMatcher, Dsl, KeyValue, Matcher, Property};
    pub use crate::engine::{
        ControlEvent, Done, DslError, ExecutionContext, FutureHandle, FutureStatus, MockClock,
        Outcome, RunSummary,
    };
    pub use crate::scenario::{
        compile, CompileError, LoadError, Scenario, ScenarioConfig, ScenarioLoader,
    };
}
