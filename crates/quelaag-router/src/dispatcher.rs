//! The dispatcher.
//!
//! One dispatch cycle runs through these states:
//!
//! ```text
//! Idle -> InventoryBuilt -> ObserversFired -> EndpointScanning
//!      -> { EndpointSelected | FallbackSelected | NoneSelected }
//!      -> HandlerInvoked -> Done
//! ```
//!
//! Observers never block the cycle: their synchronous predicates run in
//! registration order, and anything asynchronous continues on a spawned
//! task. Endpoint predicates are evaluated strictly in order; a pending
//! predicate is awaited before the next one is evaluated, and the first
//! match wins. The selected handler is called once. If it returns a
//! pending completion, the completion continues on a spawned task and
//! `dispatch` returns without waiting for it.

use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use quelaag_core::{panic_message, BoxError, Quelaag, SharedError};
use quelaag_telemetry::metrics::{record_dispatch, record_dispatch_error};
use tokio::task::JoinHandle;
use tracing::{Instrument, Span};
use uuid::Uuid;

use crate::entry::{
    Endpoint, Fallback, GlobalCatchFn, HandlerFn, Observer, SharedInventory, SubRoute,
};
use crate::error::{DispatchError, PanicError, Phase, Target};
use crate::outcome::{Check, Completion, IntoCaught, IntoCompletion};

/// A unique identifier for each dispatch cycle, using UUID v7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatchId(Uuid);

impl DispatchId {
    /// Creates a new time-ordered identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DispatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DispatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What endpoint scanning selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// The endpoint at the given registration index.
    Endpoint(usize),
    /// The sub-route at the given registration index.
    SubRoute(usize),
    /// The fallback handler.
    Fallback,
    /// No handler; a valid terminal outcome.
    None,
}

impl Route {
    /// Returns the route kind as a metric label.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Endpoint(_) => "endpoint",
            Self::SubRoute(_) => "sub_route",
            Self::Fallback => "fallback",
            Self::None => "none",
        }
    }

    /// Returns `true` if a handler was selected.
    pub const fn is_handled(&self) -> bool {
        !matches!(self, Self::None)
    }

    fn target(self) -> Option<Target> {
        match self {
            Self::Endpoint(index) => Some(Target::Endpoint(index)),
            Self::SubRoute(index) => Some(Target::SubRoute(index)),
            Self::Fallback => Some(Target::Fallback),
            Self::None => None,
        }
    }
}

/// How endpoint scanning continues after a predicate fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PredicateFailure {
    /// Report the failure and select nothing.
    #[default]
    Stop,
    /// Report the failure and evaluate the next endpoint.
    Continue,
}

/// Dispatcher behavior switches.
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Convert panics in callbacks into [`DispatchError::Panicked`].
    pub catch_panics: bool,
    /// Log failures that no error handler accepted.
    pub log_unhandled: bool,
    /// Scanning policy after a failed endpoint predicate.
    pub on_predicate_failure: PredicateFailure,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            catch_panics: true,
            log_unhandled: true,
            on_predicate_failure: PredicateFailure::Stop,
        }
    }
}

/// Outcome of one dispatch cycle.
///
/// Holds the tasks still finishing asynchronous observers and handlers.
/// Dropping it detaches them; they run to completion regardless.
pub struct Dispatched {
    id: DispatchId,
    route: Route,
    tasks: Vec<(Target, JoinHandle<Result<(), DispatchError>>)>,
    failures: Vec<DispatchError>,
}

impl Dispatched {
    fn new(id: DispatchId) -> Self {
        Self {
            id,
            route: Route::None,
            tasks: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Returns the cycle identifier.
    pub fn id(&self) -> DispatchId {
        self.id
    }

    /// Returns what endpoint scanning selected.
    pub fn route(&self) -> Route {
        self.route
    }

    /// Returns the number of background tasks not yet finished.
    pub fn pending(&self) -> usize {
        self.tasks.iter().filter(|(_, task)| !task.is_finished()).count()
    }

    /// Waits for the selected handler's background completion, if it has one.
    ///
    /// Observer tasks stay in place for [`failures`](Self::failures) and
    /// [`settled`](Self::settled).
    pub async fn handler_settled(&mut self) -> Result<(), DispatchError> {
        let Some(target) = self.route.target() else {
            return Ok(());
        };
        let Some(position) = self.tasks.iter().position(|(owner, _)| *owner == target) else {
            return Ok(());
        };
        let (target, task) = self.tasks.remove(position);
        match task.await {
            Ok(outcome) => outcome,
            Err(join) => Err(DispatchError::Join {
                target,
                message: join.to_string(),
            }),
        }
    }

    /// Waits for every background task and returns all unhandled failures.
    ///
    /// Failures raised synchronously by observers come first, followed by
    /// task failures in spawn order.
    pub async fn failures(self) -> Vec<DispatchError> {
        let mut failures = self.failures;
        for (target, task) in self.tasks {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => failures.push(err),
                Err(join) => failures.push(DispatchError::Join {
                    target,
                    message: join.to_string(),
                }),
            }
        }
        failures
    }

    /// Waits for every background task, returning the first unhandled failure.
    pub async fn settled(self) -> Result<(), DispatchError> {
        self.failures().await.into_iter().next().map_or(Ok(()), Err)
    }
}

impl fmt::Debug for Dispatched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatched")
            .field("id", &self.id)
            .field("route", &self.route)
            .field("tasks", &self.tasks.len())
            .field("failures", &self.failures)
            .finish()
    }
}

/// The error-routing half of a dispatcher, cloned into background tasks.
#[derive(Clone)]
struct Escalation {
    catcher: Option<GlobalCatchFn>,
    options: DispatchOptions,
}

impl Escalation {
    fn call<T>(&self, f: impl FnOnce() -> T) -> Result<T, String> {
        if self.options.catch_panics {
            panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(payload.as_ref()))
        } else {
            Ok(f())
        }
    }

    fn guard<T>(
        &self,
        target: Target,
        phase: Phase,
        f: impl FnOnce() -> Result<T, BoxError>,
    ) -> Result<T, DispatchError> {
        match self.call(f) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(DispatchError::raised(target, phase, err)),
            Err(message) => Err(DispatchError::panicked(target, phase, message)),
        }
    }

    async fn settle<T>(
        &self,
        target: Target,
        phase: Phase,
        future: BoxFuture<'static, Result<T, BoxError>>,
    ) -> Result<T, DispatchError> {
        let outcome = if self.options.catch_panics {
            AssertUnwindSafe(future)
                .catch_unwind()
                .await
                .map_err(|payload| panic_message(payload.as_ref()))
        } else {
            Ok(future.await)
        };
        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(DispatchError::raised(target, phase, err)),
            Err(message) => Err(DispatchError::panicked(target, phase, message)),
        }
    }

    fn run_catch(&self, f: impl FnOnce() -> Result<(), BoxError>) -> Result<(), SharedError> {
        match self.call(f) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(Arc::from(err)),
            Err(message) => {
                let source: SharedError = Arc::new(PanicError(message));
                Err(source)
            }
        }
    }

    /// Offers `err` to the local handler, then to the global catcher.
    ///
    /// Returns the failure when neither accepts it.
    fn route<L>(&self, target: Target, err: DispatchError, local: Option<L>) -> Result<(), DispatchError>
    where
        L: FnOnce(&DispatchError) -> Result<(), BoxError>,
    {
        let err = match local {
            Some(catch) => match self.run_catch(|| catch(&err)) {
                Ok(()) => {
                    tracing::debug!(entry = %target, error = %err, "failure handled by entry");
                    record_dispatch_error(target.kind(), err.phase().as_str(), "entry");
                    return Ok(());
                }
                Err(source) => DispatchError::Catch {
                    target,
                    source,
                    original: Box::new(err),
                },
            },
            None => err,
        };

        match &self.catcher {
            Some(catcher) => match self.run_catch(|| catcher(&err)) {
                Ok(()) => {
                    tracing::debug!(entry = %target, error = %err, "failure handled by catcher");
                    record_dispatch_error(target.kind(), err.phase().as_str(), "global");
                    Ok(())
                }
                Err(source) => Err(DispatchError::GlobalCatch {
                    source,
                    original: Box::new(err),
                }),
            },
            None => Err(err),
        }
    }

    fn report(&self, err: &DispatchError) {
        let kind = err.target().map_or("dispatcher", |target| target.kind());
        record_dispatch_error(kind, err.phase().as_str(), "unhandled");
        if self.options.log_unhandled {
            tracing::error!(error = %err, entry = kind, "unhandled dispatch failure");
        }
    }
}

struct EndpointEntry<Req, Res, Ctx> {
    endpoint: Endpoint<Req, Res, Ctx>,
    delegates: bool,
}

impl<Req, Res, Ctx> EndpointEntry<Req, Res, Ctx> {
    fn route(&self, index: usize) -> Route {
        if self.delegates {
            Route::SubRoute(index)
        } else {
            Route::Endpoint(index)
        }
    }
}

/// Dispatches requests to the first matching endpoint.
///
/// # Example
///
/// ```
/// use quelaag_core::{MiddlewareSpec, Quelaag};
/// use quelaag_router::{Dispatcher, Endpoint, Route};
///
/// # tokio_test::block_on(async {
/// let quelaag = Quelaag::new(
///     MiddlewareSpec::<String>::new().value("is_root", |inv| inv.request() == "/"),
/// );
///
/// let mut dispatcher = Dispatcher::<String, ()>::new(quelaag);
/// dispatcher.add_endpoint(Endpoint::new(
///     |_req, inv| inv.get::<bool>("is_root").map(|root| *root),
///     |_req, _res, _inv| (),
/// ));
///
/// let dispatched = dispatcher.dispatch("/".to_string(), ()).await.unwrap();
/// assert_eq!(dispatched.route(), Route::Endpoint(0));
/// # });
/// ```
pub struct Dispatcher<Req, Res, Ctx = ()> {
    quelaag: Quelaag<Req, Ctx>,
    endpoints: Vec<EndpointEntry<Req, Res, Ctx>>,
    observers: Vec<Observer<Req, Ctx>>,
    fallback: Option<Fallback<Req, Res, Ctx>>,
    escalation: Escalation,
}

impl<Req, Res, Ctx> Dispatcher<Req, Res, Ctx>
where
    Req: Send + Sync + 'static,
    Res: Clone + Send + Sync + 'static,
    Ctx: Send + Sync + 'static,
{
    /// Creates a dispatcher without a global catcher.
    pub fn new(quelaag: impl Into<Quelaag<Req, Ctx>>) -> Self {
        Self {
            quelaag: quelaag.into(),
            endpoints: Vec::new(),
            observers: Vec::new(),
            fallback: None,
            escalation: Escalation {
                catcher: None,
                options: DispatchOptions::default(),
            },
        }
    }

    /// Creates a dispatcher whose catcher receives every failure that no
    /// entry handles.
    pub fn with_catcher<F, R>(quelaag: impl Into<Quelaag<Req, Ctx>>, catcher: F) -> Self
    where
        F: Fn(&DispatchError) -> R + Send + Sync + 'static,
        R: IntoCaught,
    {
        let mut dispatcher = Self::new(quelaag);
        dispatcher.escalation.catcher = Some(catcher_fn(catcher));
        dispatcher
    }

    /// Starts a builder.
    pub fn builder(quelaag: impl Into<Quelaag<Req, Ctx>>) -> DispatcherBuilder<Req, Res, Ctx> {
        DispatcherBuilder {
            dispatcher: Self::new(quelaag),
        }
    }

    /// Appends an endpoint.
    pub fn add_endpoint(&mut self, endpoint: Endpoint<Req, Res, Ctx>) -> &mut Self {
        self.endpoints.push(EndpointEntry {
            endpoint,
            delegates: false,
        });
        self
    }

    /// Appends an observer.
    pub fn add_observer(&mut self, observer: Observer<Req, Ctx>) -> &mut Self {
        self.observers.push(observer);
        self
    }

    /// Replaces the fallback.
    pub fn set_fallback(&mut self, fallback: Fallback<Req, Res, Ctx>) -> &mut Self {
        self.fallback = Some(fallback);
        self
    }

    /// Replaces the fallback with a bare handler.
    pub fn set_fallback_handler<H, O>(&mut self, run: H) -> &mut Self
    where
        H: Fn(&Req, Res, &SharedInventory<Req, Ctx>) -> O + Send + Sync + 'static,
        O: IntoCompletion,
    {
        self.set_fallback(Fallback::new(run))
    }

    /// Removes the fallback.
    pub fn clear_fallback(&mut self) -> &mut Self {
        self.fallback = None;
        self
    }

    /// Appends a sub-route endpoint.
    ///
    /// When its predicate matches, the request is dispatched again by the
    /// delegate with this cycle's inventory as context. The hand-off is
    /// complete once the delegate's selected handler settles; anything that
    /// handler leaves unhandled fails the sub-route. The delegate's observers
    /// run detached and never fail it.
    pub fn add_sub_router(&mut self, sub_route: SubRoute<Req, Res, Ctx>) -> &mut Self {
        let SubRoute { when, router, catch } = sub_route;
        let run: HandlerFn<Req, Res, Ctx> =
            Arc::new(move |_req: &Req, res: Res, inventory: &SharedInventory<Req, Ctx>| {
                let delegate = router();
                let request = inventory.shared_request();
                let parent = Arc::clone(inventory);
                Ok(Completion::pending(async move {
                    match delegate.dispatch_with(request, res, parent).await {
                        Ok(mut dispatched) => dispatched.handler_settled().await,
                        Err(err) => Err(err),
                    }
                }))
            });
        self.endpoints.push(EndpointEntry {
            endpoint: Endpoint { when, run, catch },
            delegates: true,
        });
        self
    }

    /// Replaces the behavior switches.
    pub fn set_options(&mut self, options: DispatchOptions) -> &mut Self {
        self.escalation.options = options;
        self
    }

    /// Returns the behavior switches.
    pub fn options(&self) -> &DispatchOptions {
        &self.escalation.options
    }

    /// Returns the inventory factory.
    pub fn quelaag(&self) -> &Quelaag<Req, Ctx> {
        &self.quelaag
    }

    /// Returns the number of endpoints, sub-routes included.
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    /// Returns the number of observers.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Returns `true` if a fallback is set.
    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Runs one dispatch cycle with a default context.
    pub async fn dispatch(
        &self,
        request: impl Into<Arc<Req>>,
        response: Res,
    ) -> Result<Dispatched, DispatchError>
    where
        Ctx: Default,
    {
        self.dispatch_with(request, response, Ctx::default()).await
    }

    /// Runs one dispatch cycle.
    ///
    /// Resolves once a handler has been selected and called. Failures that
    /// no error handler accepts during scanning or a synchronous handler
    /// call are returned as `Err`; background failures are reported through
    /// the returned [`Dispatched`] and logged.
    pub async fn dispatch_with(
        &self,
        request: impl Into<Arc<Req>>,
        response: Res,
        context: Ctx,
    ) -> Result<Dispatched, DispatchError> {
        let request = request.into();
        let mut dispatched = Dispatched::new(DispatchId::new());
        let span = tracing::debug_span!("dispatch", dispatch_id = %dispatched.id);

        let inventory = self.quelaag.build(Arc::clone(&request), context);
        span.in_scope(|| self.fire_observers(&request, &inventory, &mut dispatched, &span));

        let route = match self
            .select(&request, &inventory, &response)
            .instrument(span.clone())
            .await
        {
            Ok(route) => route,
            Err(err) => {
                record_dispatch("error");
                return Err(err);
            }
        };
        dispatched.route = route;
        record_dispatch(route.kind());

        span.in_scope(|| {
            tracing::debug!(route = route.kind(), "route selected");
            self.invoke(route, &request, response, &inventory, &mut dispatched, &span)
        })?;
        Ok(dispatched)
    }

    fn fire_observers(
        &self,
        request: &Arc<Req>,
        inventory: &SharedInventory<Req, Ctx>,
        dispatched: &mut Dispatched,
        span: &Span,
    ) {
        let req: &Req = request;
        for (index, observer) in self.observers.iter().enumerate() {
            let target = Target::Observer(index);
            let checked = self
                .escalation
                .guard(target, Phase::Predicate, || (observer.when)(req, inventory));
            let outcome = match checked {
                Ok(Check::Ready(false)) => Ok(()),
                Ok(Check::Ready(true)) => {
                    self.run_observer(target, observer, request, inventory, dispatched, span)
                }
                Ok(Check::Pending(check)) => {
                    let escalation = self.escalation.clone();
                    let observer = observer.clone();
                    let request = Arc::clone(request);
                    let inventory = Arc::clone(inventory);
                    let task = async move {
                        let outcome = match escalation.settle(target, Phase::Predicate, check).await {
                            Ok(false) => Ok(()),
                            Ok(true) => {
                                match escalation.guard(target, Phase::Action, || {
                                    (observer.run)(&*request, &inventory)
                                }) {
                                    Ok(Completion::Done) => Ok(()),
                                    Ok(Completion::Pending(action)) => {
                                        escalation.settle(target, Phase::Action, action).await
                                    }
                                    Err(err) => Err(err),
                                }
                            }
                            Err(err) => Err(err),
                        };
                        match outcome {
                            Ok(()) => Ok(()),
                            Err(err) => escalation.route(
                                target,
                                err,
                                observer
                                    .catch
                                    .as_ref()
                                    .map(|catch| |err: &DispatchError| catch(err, &*request)),
                            ),
                        }
                    };
                    self.spawn(dispatched, target, span, task);
                    Ok(())
                }
                Err(err) => Err(err),
            };

            if let Err(err) = outcome {
                let local = observer
                    .catch
                    .as_ref()
                    .map(|catch| |err: &DispatchError| catch(err, req));
                if let Err(unhandled) = self.escalation.route(target, err, local) {
                    self.escalation.report(&unhandled);
                    dispatched.failures.push(unhandled);
                }
            }
        }
    }

    fn run_observer(
        &self,
        target: Target,
        observer: &Observer<Req, Ctx>,
        request: &Arc<Req>,
        inventory: &SharedInventory<Req, Ctx>,
        dispatched: &mut Dispatched,
        span: &Span,
    ) -> Result<(), DispatchError> {
        let req: &Req = request;
        match self
            .escalation
            .guard(target, Phase::Action, || (observer.run)(req, inventory))?
        {
            Completion::Done => {}
            Completion::Pending(action) => {
                let escalation = self.escalation.clone();
                let catch = observer.catch.clone();
                let request = Arc::clone(request);
                let task = async move {
                    match escalation.settle(target, Phase::Action, action).await {
                        Ok(()) => Ok(()),
                        Err(err) => escalation.route(
                            target,
                            err,
                            catch
                                .as_ref()
                                .map(|catch| |err: &DispatchError| catch(err, &*request)),
                        ),
                    }
                };
                self.spawn(dispatched, target, span, task);
            }
        }
        Ok(())
    }

    async fn select(
        &self,
        request: &Arc<Req>,
        inventory: &SharedInventory<Req, Ctx>,
        response: &Res,
    ) -> Result<Route, DispatchError> {
        let req: &Req = request;
        for (index, entry) in self.endpoints.iter().enumerate() {
            let route = entry.route(index);
            let target = match route.target() {
                Some(target) => target,
                None => continue,
            };

            let checked = self
                .escalation
                .guard(target, Phase::Predicate, || (entry.endpoint.when)(req, inventory));
            let matched = match checked {
                Ok(Check::Ready(matched)) => Ok(matched),
                Ok(Check::Pending(check)) => {
                    self.escalation.settle(target, Phase::Predicate, check).await
                }
                Err(err) => Err(err),
            };

            match matched {
                Ok(true) => return Ok(route),
                Ok(false) => {}
                Err(err) => {
                    let local = entry
                        .endpoint
                        .catch
                        .as_ref()
                        .map(|catch| |err: &DispatchError| catch(err, req, response));
                    self.escalation.route(target, err, local)?;
                    if self.escalation.options.on_predicate_failure == PredicateFailure::Stop {
                        return Ok(Route::None);
                    }
                }
            }
        }

        Ok(if self.fallback.is_some() {
            Route::Fallback
        } else {
            Route::None
        })
    }

    fn invoke(
        &self,
        route: Route,
        request: &Arc<Req>,
        response: Res,
        inventory: &SharedInventory<Req, Ctx>,
        dispatched: &mut Dispatched,
        span: &Span,
    ) -> Result<(), DispatchError> {
        let (target, run, catch) = match route {
            Route::Endpoint(index) | Route::SubRoute(index) => match self.endpoints.get(index) {
                Some(entry) => (
                    entry.route(index).target(),
                    &entry.endpoint.run,
                    &entry.endpoint.catch,
                ),
                None => return Ok(()),
            },
            Route::Fallback => match &self.fallback {
                Some(fallback) => (Some(Target::Fallback), &fallback.run, &fallback.catch),
                None => return Ok(()),
            },
            Route::None => return Ok(()),
        };
        let Some(target) = target else {
            return Ok(());
        };

        let req: &Req = request;
        let reply = response.clone();
        match self
            .escalation
            .guard(target, Phase::Action, || run(req, response, inventory))
        {
            Ok(Completion::Done) => Ok(()),
            Ok(Completion::Pending(completion)) => {
                let escalation = self.escalation.clone();
                let catch = catch.clone();
                let request = Arc::clone(request);
                let task = async move {
                    match escalation.settle(target, Phase::Action, completion).await {
                        Ok(()) => Ok(()),
                        Err(err) => escalation.route(
                            target,
                            err,
                            catch
                                .as_ref()
                                .map(|catch| |err: &DispatchError| catch(err, &*request, &reply)),
                        ),
                    }
                };
                self.spawn(dispatched, target, span, task);
                Ok(())
            }
            Err(err) => {
                let local = catch
                    .as_ref()
                    .map(|catch| |err: &DispatchError| catch(err, req, &reply));
                self.escalation.route(target, err, local)
            }
        }
    }

    fn spawn<F>(&self, dispatched: &mut Dispatched, target: Target, span: &Span, task: F)
    where
        F: Future<Output = Result<(), DispatchError>> + Send + 'static,
    {
        let escalation = self.escalation.clone();
        let handle = tokio::spawn(
            async move {
                let outcome = task.await;
                if let Err(err) = &outcome {
                    escalation.report(err);
                }
                outcome
            }
            .instrument(span.clone()),
        );
        dispatched.tasks.push((target, handle));
    }
}

impl<Req, Res, Ctx> fmt::Debug for Dispatcher<Req, Res, Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("quelaag", &self.quelaag)
            .field("endpoints", &self.endpoints.len())
            .field("observers", &self.observers.len())
            .field("fallback", &self.fallback.is_some())
            .field("catcher", &self.escalation.catcher.is_some())
            .field("options", &self.escalation.options)
            .finish()
    }
}

fn catcher_fn<F, R>(catcher: F) -> GlobalCatchFn
where
    F: Fn(&DispatchError) -> R + Send + Sync + 'static,
    R: IntoCaught,
{
    Arc::new(move |err: &DispatchError| catcher(err).into_caught())
}

/// Builder for [`Dispatcher`].
#[must_use]
pub struct DispatcherBuilder<Req, Res, Ctx = ()> {
    dispatcher: Dispatcher<Req, Res, Ctx>,
}

impl<Req, Res, Ctx> DispatcherBuilder<Req, Res, Ctx>
where
    Req: Send + Sync + 'static,
    Res: Clone + Send + Sync + 'static,
    Ctx: Send + Sync + 'static,
{
    /// Sets the global catcher.
    pub fn catcher<F, R>(mut self, catcher: F) -> Self
    where
        F: Fn(&DispatchError) -> R + Send + Sync + 'static,
        R: IntoCaught,
    {
        self.dispatcher.escalation.catcher = Some(catcher_fn(catcher));
        self
    }

    /// Appends an endpoint.
    pub fn endpoint(mut self, endpoint: Endpoint<Req, Res, Ctx>) -> Self {
        self.dispatcher.add_endpoint(endpoint);
        self
    }

    /// Appends an observer.
    pub fn observer(mut self, observer: Observer<Req, Ctx>) -> Self {
        self.dispatcher.add_observer(observer);
        self
    }

    /// Sets the fallback.
    pub fn fallback(mut self, fallback: Fallback<Req, Res, Ctx>) -> Self {
        self.dispatcher.set_fallback(fallback);
        self
    }

    /// Appends a sub-route.
    pub fn sub_router(mut self, sub_route: SubRoute<Req, Res, Ctx>) -> Self {
        self.dispatcher.add_sub_router(sub_route);
        self
    }

    /// Sets the behavior switches.
    pub fn options(mut self, options: DispatchOptions) -> Self {
        self.dispatcher.set_options(options);
        self
    }

    /// Sets the scanning policy after a failed predicate.
    pub fn on_predicate_failure(mut self, policy: PredicateFailure) -> Self {
        self.dispatcher.escalation.options.on_predicate_failure = policy;
        self
    }

    /// Builds the dispatcher.
    pub fn build(self) -> Dispatcher<Req, Res, Ctx> {
        self.dispatcher
    }
}
