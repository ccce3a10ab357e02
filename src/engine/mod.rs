//! Future queue engine
//!
//! This module contains:
//! - `context` - The execution context: future queue, registrar, control events
//! - `future` - Future handles, outcomes and the completion handle
//! - `clock` - Timers backing `sleep`, including a virtual clock
//! - `error` - Engine error types

pub mod clock;
pub mod context;
pub mod error;
pub mod future;

pub use clock::{parse_duration, ClockError, ClockMode, MockClock, Timer, TokioTimer};
pub use context::{
    join_selector, ActionEnv, BoxAction, ContextBuilder, ControlEvent, ExecutionContext,
    RunSummary,
};
pub use error::{did_not_match, DslError};
pub use future::{Done, FutureHandle, FutureRecord, FutureStatus, Outcome};
