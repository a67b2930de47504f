//! Registered dispatch entries.
//!
//! Entries store their callbacks type-erased behind `Arc`, so registration
//! accepts plain closures and every entry is cheap to clone into the tasks
//! that finish asynchronous work.

use std::sync::Arc;

use quelaag_core::{BoxError, Inventory};

use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;
use crate::outcome::{Check, Completion, IntoCaught, IntoCheck, IntoCompletion};

/// The inventory handed to predicates and handlers.
pub type SharedInventory<Req, Ctx> = Arc<Inventory<Req, Ctx>>;

pub(crate) type PredicateFn<Req, Ctx> =
    Arc<dyn Fn(&Req, &SharedInventory<Req, Ctx>) -> Result<Check, BoxError> + Send + Sync>;

pub(crate) type HandlerFn<Req, Res, Ctx> =
    Arc<dyn Fn(&Req, Res, &SharedInventory<Req, Ctx>) -> Result<Completion, BoxError> + Send + Sync>;

pub(crate) type ActionFn<Req, Ctx> =
    Arc<dyn Fn(&Req, &SharedInventory<Req, Ctx>) -> Result<Completion, BoxError> + Send + Sync>;

pub(crate) type ResponseCatchFn<Req, Res> =
    Arc<dyn Fn(&DispatchError, &Req, &Res) -> Result<(), BoxError> + Send + Sync>;

pub(crate) type RequestCatchFn<Req> =
    Arc<dyn Fn(&DispatchError, &Req) -> Result<(), BoxError> + Send + Sync>;

pub(crate) type GlobalCatchFn = Arc<dyn Fn(&DispatchError) -> Result<(), BoxError> + Send + Sync>;

/// Provides the dispatcher a sub-route delegates to.
pub(crate) type RouterProvider<Req, Res, Ctx> =
    Arc<dyn Fn() -> Arc<Dispatcher<Req, Res, SharedInventory<Req, Ctx>>> + Send + Sync>;

pub(crate) fn predicate<Req, Ctx, W, C>(when: W) -> PredicateFn<Req, Ctx>
where
    W: Fn(&Req, &SharedInventory<Req, Ctx>) -> C + Send + Sync + 'static,
    C: IntoCheck,
{
    Arc::new(move |req: &Req, inv: &SharedInventory<Req, Ctx>| {
        when(req, inv).into_check()
    })
}

pub(crate) fn response_catch<Req, Res, F, R>(catch: F) -> ResponseCatchFn<Req, Res>
where
    F: Fn(&DispatchError, &Req, &Res) -> R + Send + Sync + 'static,
    R: IntoCaught,
{
    Arc::new(move |err: &DispatchError, req: &Req, res: &Res| {
        catch(err, req, res).into_caught()
    })
}

/// A request handler guarded by a predicate.
pub struct Endpoint<Req, Res, Ctx = ()> {
    pub(crate) when: PredicateFn<Req, Ctx>,
    pub(crate) run: HandlerFn<Req, Res, Ctx>,
    pub(crate) catch: Option<ResponseCatchFn<Req, Res>>,
}

impl<Req: 'static, Res: 'static, Ctx: 'static> Endpoint<Req, Res, Ctx> {
    /// Creates an endpoint that runs `run` when `when` matches.
    pub fn new<W, C, H, O>(when: W, run: H) -> Self
    where
        W: Fn(&Req, &SharedInventory<Req, Ctx>) -> C + Send + Sync + 'static,
        C: IntoCheck,
        H: Fn(&Req, Res, &SharedInventory<Req, Ctx>) -> O + Send + Sync + 'static,
        O: IntoCompletion,
    {
        Self {
            when: predicate(when),
            run: Arc::new(move |req: &Req, res: Res, inv: &SharedInventory<Req, Ctx>| {
                run(req, res, inv).into_completion()
            }),
            catch: None,
        }
    }

    /// Attaches an error handler for this endpoint's failures.
    #[must_use]
    pub fn catch<F, R>(mut self, catch: F) -> Self
    where
        F: Fn(&DispatchError, &Req, &Res) -> R + Send + Sync + 'static,
        R: IntoCaught,
    {
        self.catch = Some(response_catch(catch));
        self
    }
}

impl<Req, Res, Ctx> Clone for Endpoint<Req, Res, Ctx> {
    fn clone(&self) -> Self {
        Self {
            when: Arc::clone(&self.when),
            run: Arc::clone(&self.run),
            catch: self.catch.clone(),
        }
    }
}

/// A passive action run for every request its predicate matches.
///
/// Observers cannot respond; they receive the request and inventory only.
pub struct Observer<Req, Ctx = ()> {
    pub(crate) when: PredicateFn<Req, Ctx>,
    pub(crate) run: ActionFn<Req, Ctx>,
    pub(crate) catch: Option<RequestCatchFn<Req>>,
}

impl<Req: 'static, Ctx: 'static> Observer<Req, Ctx> {
    /// Creates an observer that runs `run` when `when` matches.
    pub fn new<W, C, A, O>(when: W, run: A) -> Self
    where
        W: Fn(&Req, &SharedInventory<Req, Ctx>) -> C + Send + Sync + 'static,
        C: IntoCheck,
        A: Fn(&Req, &SharedInventory<Req, Ctx>) -> O + Send + Sync + 'static,
        O: IntoCompletion,
    {
        Self {
            when: predicate(when),
            run: Arc::new(move |req: &Req, inv: &SharedInventory<Req, Ctx>| {
                run(req, inv).into_completion()
            }),
            catch: None,
        }
    }

    /// Attaches an error handler for this observer's failures.
    #[must_use]
    pub fn catch<F, R>(mut self, catch: F) -> Self
    where
        F: Fn(&DispatchError, &Req) -> R + Send + Sync + 'static,
        R: IntoCaught,
    {
        self.catch = Some(Arc::new(move |err: &DispatchError, req: &Req| {
            catch(err, req).into_caught()
        }));
        self
    }
}

impl<Req, Ctx> Clone for Observer<Req, Ctx> {
    fn clone(&self) -> Self {
        Self {
            when: Arc::clone(&self.when),
            run: Arc::clone(&self.run),
            catch: self.catch.clone(),
        }
    }
}

/// The handler selected when no endpoint matches.
pub struct Fallback<Req, Res, Ctx = ()> {
    pub(crate) run: HandlerFn<Req, Res, Ctx>,
    pub(crate) catch: Option<ResponseCatchFn<Req, Res>>,
}

impl<Req: 'static, Res: 'static, Ctx: 'static> Fallback<Req, Res, Ctx> {
    /// Creates a fallback handler.
    pub fn new<H, O>(run: H) -> Self
    where
        H: Fn(&Req, Res, &SharedInventory<Req, Ctx>) -> O + Send + Sync + 'static,
        O: IntoCompletion,
    {
        Self {
            run: Arc::new(move |req: &Req, res: Res, inv: &SharedInventory<Req, Ctx>| {
                run(req, res, inv).into_completion()
            }),
            catch: None,
        }
    }

    /// Attaches an error handler for the fallback's failures.
    #[must_use]
    pub fn catch<F, R>(mut self, catch: F) -> Self
    where
        F: Fn(&DispatchError, &Req, &Res) -> R + Send + Sync + 'static,
        R: IntoCaught,
    {
        self.catch = Some(response_catch(catch));
        self
    }
}

impl<Req, Res, Ctx> Clone for Fallback<Req, Res, Ctx> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
            catch: self.catch.clone(),
        }
    }
}

/// Delegates matching requests to another dispatcher.
///
/// The delegate receives the same request and builds its own inventory, with
/// this dispatcher's inventory as its context. The dispatcher is obtained
/// through a provider on every hand-off, so two routers may refer to each
/// other.
pub struct SubRoute<Req, Res, Ctx = ()> {
    pub(crate) when: PredicateFn<Req, Ctx>,
    pub(crate) router: RouterProvider<Req, Res, Ctx>,
    pub(crate) catch: Option<ResponseCatchFn<Req, Res>>,
}

impl<Req: 'static, Res: 'static, Ctx: 'static> SubRoute<Req, Res, Ctx> {
    /// Creates a sub-route to the dispatcher returned by `router`.
    pub fn new<W, C, P>(when: W, router: P) -> Self
    where
        W: Fn(&Req, &SharedInventory<Req, Ctx>) -> C + Send + Sync + 'static,
        C: IntoCheck,
        P: Fn() -> Arc<Dispatcher<Req, Res, SharedInventory<Req, Ctx>>> + Send + Sync + 'static,
    {
        Self {
            when: predicate(when),
            router: Arc::new(router),
            catch: None,
        }
    }

    /// Creates a sub-route to a fixed dispatcher.
    pub fn to<W, C>(when: W, router: Arc<Dispatcher<Req, Res, SharedInventory<Req, Ctx>>>) -> Self
    where
        W: Fn(&Req, &SharedInventory<Req, Ctx>) -> C + Send + Sync + 'static,
        C: IntoCheck,
    {
        Self::new(when, move || Arc::clone(&router))
    }

    /// Attaches an error handler for failures of the hand-off.
    #[must_use]
    pub fn catch<F, R>(mut self, catch: F) -> Self
    where
        F: Fn(&DispatchError, &Req, &Res) -> R + Send + Sync + 'static,
        R: IntoCaught,
    {
        self.catch = Some(response_catch(catch));
        self
    }
}
