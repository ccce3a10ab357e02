//! `pause` and `sleep`

use std::time::Duration;

use futures::FutureExt;

use super::{number, Dsl};
use crate::engine::{ControlEvent, DslError, FutureHandle};

pub const PAUSE_FUTURE: &str = "pausing for you to resume";

impl Dsl {
    /// Suspend the queue until [`ExecutionContext::resume`] is called
    ///
    /// Emits [`ControlEvent::InteractivePause`] when the future starts.
    ///
    /// [`ExecutionContext::resume`]: crate::engine::ExecutionContext::resume
    pub fn pause(&self) -> FutureHandle {
        self.context().add_future(PAUSE_FUTURE, |ctx, done| {
            async move {
                ctx.emit(ControlEvent::InteractivePause {
                    future: PAUSE_FUTURE.to_string(),
                });
                ctx.park(PAUSE_FUTURE, done);
                Ok(())
            }
            .boxed()
        })
    }

    /// Wait `seconds`, resolving with the delay in milliseconds
    ///
    /// A zero delay still goes through the timer.
    pub fn sleep(&self, seconds: f64) -> FutureHandle {
        let name = format!("sleep for {} seconds", seconds);
        let millis = seconds * 1000.0;

        self.context().add_future(name.clone(), move |ctx, done| {
            async move {
                let delay = Duration::try_from_secs_f64(seconds)
                    .map_err(|e| DslError::action(&name, e.to_string()))?;
                ctx.timer().delay(delay).await;
                done.resolve(number(millis));
                Ok(())
            }
            .boxed()
        })
    }
}
