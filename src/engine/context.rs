//! Execution context - the future queue and its registrar
//!
//! Every DSL call appends a named future to the queue held here. [`run`]
//! drains the queue strictly in order: the next action is not started until
//! the current one has reported through its [`Done`] handle.
//!
//! [`run`]: ExecutionContext::run

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::bridge::Application;
use crate::dom::{NodeId, SharedDocument};
use crate::engine::clock::{Timer, TokioTimer};
use crate::engine::error::DslError;
use crate::engine::future::{Done, FutureHandle, FutureRecord, FutureStatus, Outcome};

/// Action run by a queued future
pub type BoxAction =
    Box<dyn FnOnce(ExecutionContext, Done) -> BoxFuture<'static, Result<(), DslError>> + Send>;

const EVENT_CAPACITY: usize = 64;

/// Out-of-band signals for tooling watching a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum ControlEvent {
    InteractivePause { future: String },
    Resumed { future: String },
    RunCompleted { success: bool },
}

impl ControlEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ControlEvent::InteractivePause { .. } => "InteractivePause",
            ControlEvent::Resumed { .. } => "Resumed",
            ControlEvent::RunCompleted { .. } => "RunCompleted",
        }
    }
}

/// Result of draining the queue
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub records: Vec<FutureRecord>,
    pub success: bool,
}

impl RunSummary {
    pub fn failed(&self) -> impl Iterator<Item = &FutureRecord> {
        self.records
            .iter()
            .filter(|record| record.status == FutureStatus::Failed)
    }
}

struct PendingFuture {
    handle: FutureHandle,
    action: BoxAction,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<PendingFuture>,
    /// Every future ever enqueued, in order
    futures: Vec<FutureHandle>,
    /// Names of completed futures, append-only
    log: Vec<String>,
    last_result: Option<Value>,
    last_error: Option<String>,
}

struct ContextInner {
    run_id: Uuid,
    queue: Mutex<QueueState>,
    app: Arc<dyn Application>,
    timer: Arc<dyn Timer>,
    events: broadcast::Sender<ControlEvent>,
    history: Mutex<Vec<ControlEvent>>,
    /// Completion handle of the paused future, if any
    resume: Mutex<Option<(String, Done)>>,
}

/// Per-run context shared by the DSL and every running action
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<ContextInner>,
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("run_id", &self.inner.run_id)
            .field("timer", &self.inner.timer)
            .finish()
    }
}

pub struct ContextBuilder {
    app: Arc<dyn Application>,
    timer: Option<Arc<dyn Timer>>,
}

impl ContextBuilder {
    pub fn timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = Some(timer);
        self
    }

    pub fn build(self) -> ExecutionContext {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        ExecutionContext {
            inner: Arc::new(ContextInner {
                run_id: Uuid::new_v4(),
                queue: Mutex::new(QueueState::default()),
                app: self.app,
                timer: self.timer.unwrap_or_else(|| Arc::new(TokioTimer)),
                events,
                history: Mutex::new(Vec::new()),
                resume: Mutex::new(None),
            }),
        }
    }
}

impl ExecutionContext {
    /// Context with a real-time timer
    pub fn new(app: Arc<dyn Application>) -> Self {
        Self::builder(app).build()
    }

    pub fn builder(app: Arc<dyn Application>) -> ContextBuilder {
        ContextBuilder { app, timer: None }
    }

    pub fn run_id(&self) -> Uuid {
        self.inner.run_id
    }

    pub fn application(&self) -> Arc<dyn Application> {
        self.inner.app.clone()
    }

    pub fn timer(&self) -> Arc<dyn Timer> {
        self.inner.timer.clone()
    }

    /// Append a future; `action` runs when the queue reaches it
    pub fn add_future<F>(&self, name: impl Into<String>, action: F) -> FutureHandle
    where
        F: FnOnce(ExecutionContext, Done) -> BoxFuture<'static, Result<(), DslError>>
            + Send
            + 'static,
    {
        let handle = FutureHandle::pending(name);
        debug!("Enqueued future: {}", handle.name());

        let mut queue = self.inner.queue.lock();
        queue.futures.push(handle.clone());
        queue.pending.push_back(PendingFuture {
            handle: handle.clone(),
            action: Box::new(action),
        });
        handle
    }

    /// Append a future whose action works against the application and document
    ///
    /// The action's returned [`Outcome`] becomes the future's outcome; an
    /// `Err` halts the run.
    pub fn add_future_action<F, Fut>(&self, name: impl Into<String>, f: F) -> FutureHandle
    where
        F: FnOnce(ActionEnv) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Outcome, DslError>> + Send + 'static,
    {
        self.add_future(name, move |ctx, done| {
            async move {
                let outcome = f(ActionEnv::new(ctx)).await?;
                done.settle(outcome);
                Ok(())
            }
            .boxed()
        })
    }

    /// Drain the queue in order
    ///
    /// An error returned by an action stops the run and is passed to the
    /// caller; the future that raised it stays pending.
    #[instrument(skip(self), fields(run_id = %self.inner.run_id))]
    pub async fn run(&self) -> Result<RunSummary, DslError> {
        info!("Starting run with {} pending futures", self.pending());

        while self.run_next().await?.is_some() {}

        let records = self.records();
        let success = records
            .iter()
            .all(|record| record.status == FutureStatus::Resolved);
        self.emit(ControlEvent::RunCompleted { success });
        info!(success, futures = records.len(), "Run finished");

        Ok(RunSummary {
            run_id: self.inner.run_id.to_string(),
            records,
            success,
        })
    }

    /// Execute exactly one pending future; `None` once the queue is empty
    pub async fn run_next(&self) -> Result<Option<FutureHandle>, DslError> {
        let next = self.inner.queue.lock().pending.pop_front();
        let Some(PendingFuture { handle, action }) = next else {
            return Ok(None);
        };

        debug!("Running future: {}", handle.name());
        let (done, rx) = Done::channel();
        if let Err(e) = action(self.clone(), done).await {
            error!("Future '{}' raised an error: {}", handle.name(), e);
            return Err(e);
        }

        let outcome = rx.await.unwrap_or_else(|_| {
            Outcome::Failed(format!(
                "future '{}' finished without reporting an outcome",
                handle.name()
            ))
        });
        self.record(&handle, outcome);
        Ok(Some(handle))
    }

    fn record(&self, handle: &FutureHandle, outcome: Outcome) {
        {
            let mut queue = self.inner.queue.lock();
            match &outcome {
                Outcome::Resolved(value) => {
                    queue.last_result = Some(value.clone());
                    queue.last_error = None;
                }
                Outcome::Failed(message) => {
                    queue.last_result = None;
                    queue.last_error = Some(message.clone());
                }
            }
            queue.log.push(handle.name().to_string());
        }

        match &outcome {
            Outcome::Resolved(value) => debug!("Future '{}' resolved: {}", handle.name(), value),
            Outcome::Failed(message) => warn!("Future '{}' failed: {}", handle.name(), message),
        }
        handle.settle(outcome);
    }

    pub fn pending(&self) -> usize {
        self.inner.queue.lock().pending.len()
    }

    /// Result of the most recently completed future
    pub fn future_result(&self) -> Option<Value> {
        self.inner.queue.lock().last_result.clone()
    }

    /// Error of the most recently completed future
    pub fn future_error(&self) -> Option<String> {
        self.inner.queue.lock().last_error.clone()
    }

    /// Names of completed futures, in completion order
    pub fn future_log(&self) -> Vec<String> {
        self.inner.queue.lock().log.clone()
    }

    /// Names of every enqueued future, in enqueue order
    pub fn futures(&self) -> Vec<String> {
        self.inner
            .queue
            .lock()
            .futures
            .iter()
            .map(|handle| handle.name().to_string())
            .collect()
    }

    pub fn records(&self) -> Vec<FutureRecord> {
        self.inner
            .queue
            .lock()
            .futures
            .iter()
            .map(FutureHandle::record)
            .collect()
    }

    pub fn emit(&self, event: ControlEvent) {
        debug!("Control event: {}", event.name());
        self.inner.history.lock().push(event.clone());
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControlEvent> {
        self.inner.events.subscribe()
    }

    /// Every event emitted so far
    pub fn events(&self) -> Vec<ControlEvent> {
        self.inner.history.lock().clone()
    }

    /// Hold a future's completion handle until [`resume`](Self::resume)
    pub(crate) fn park(&self, future: &str, done: Done) {
        let previous = self
            .inner
            .resume
            .lock()
            .replace((future.to_string(), done));
        if let Some((name, _)) = previous {
            warn!("Dropping resume token of '{}'", name);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.inner.resume.lock().is_some()
    }

    /// Complete the paused future
    ///
    /// Returns false when nothing is paused.
    pub fn resume(&self) -> bool {
        let token = self.inner.resume.lock().take();
        match token {
            Some((future, done)) => {
                info!("Resuming '{}'", future);
                done.resolve(Value::Null);
                self.emit(ControlEvent::Resumed { future });
                true
            }
            None => false,
        }
    }
}

/// What an action sees while it runs
#[derive(Clone)]
pub struct ActionEnv {
    pub ctx: ExecutionContext,
    pub app: Arc<dyn Application>,
    pub document: SharedDocument,
    scope: Vec<String>,
}

impl ActionEnv {
    pub fn new(ctx: ExecutionContext) -> Self {
        let app = ctx.application();
        let document = app.document();
        Self {
            ctx,
            app,
            document,
            scope: Vec::new(),
        }
    }

    /// Restrict element lookups to descendants of `scope`
    pub fn scoped(mut self, scope: Vec<String>) -> Self {
        self.scope = scope;
        self
    }

    /// Scope selectors and `selector` joined into one descendant selector
    pub fn full_selector(&self, selector: &str) -> String {
        join_selector(&self.scope, selector)
    }

    /// Elements in scope matching `selector`, in document order
    pub fn elements(&self, selector: &str) -> Result<Vec<NodeId>, DslError> {
        let selector = self.full_selector(selector);
        let doc = self.document.read();
        Ok(doc.query(doc.root(), &selector)?)
    }
}

/// Join a scope chain and a selector; empty becomes `*`
pub fn join_selector(scope: &[String], selector: &str) -> String {
    let joined = scope
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(selector))
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if joined.is_empty() {
        "*".to_string()
    } else {
        joined
    }
}
