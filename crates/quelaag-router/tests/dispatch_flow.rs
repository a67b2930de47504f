//! Dispatch cycles exercised through the public API.

use std::sync::{Arc, Mutex};

use quelaag_core::{BoxError, MiddlewareError, MiddlewareSpec, ParentInventory, Quelaag};
use quelaag_router::{
    Check, Completion, DispatchError, DispatchOptions, Dispatcher, Endpoint, Fallback, Observer,
    PredicateFailure, Route, SharedInventory, SubRoute, Target,
};
use quelaag_test::{defer, flush, CallCounter, Deferred, Recorder};

fn numbered() -> Quelaag<u32> {
    Quelaag::new(MiddlewareSpec::<u32>::new().value("double", |inv| *inv.request() * 2))
}

/// Hands a deferred predicate outcome to the first evaluation only.
fn once(deferred: Deferred<bool>) -> impl Fn() -> Check + Send + Sync {
    let slot = Mutex::new(Some(deferred));
    move || {
        let deferred = slot.lock().unwrap().take();
        Check::pending(async move {
            match deferred {
                Some(deferred) => deferred.await.map_err(BoxError::from),
                None => Err("evaluated twice".into()),
            }
        })
    }
}

#[tokio::test]
async fn test_pending_predicate_holds_back_later_endpoints() {
    let (resolver, pending) = defer::<bool>();
    let later = CallCounter::new();
    let tally = later.clone();
    let first = once(pending);

    let dispatcher = Arc::new(
        Dispatcher::<u32, Recorder>::builder(numbered())
            .endpoint(Endpoint::new(move |_, _| first(), |_, res: Recorder, _| res.record("first")))
            .endpoint(Endpoint::new(
                move |_, _| {
                    tally.hit();
                    true
                },
                |_, res: Recorder, _| res.record("second"),
            ))
            .build(),
    );

    let recorder = Recorder::new();
    let task = tokio::spawn({
        let dispatcher = Arc::clone(&dispatcher);
        let recorder = recorder.clone();
        async move { dispatcher.dispatch(1_u32, recorder).await }
    });

    flush().await;
    assert_eq!(later.count(), 0);
    assert!(recorder.is_empty());

    resolver.resolve(false);
    let dispatched = task.await.unwrap().unwrap();
    assert_eq!(dispatched.route(), Route::Endpoint(1));
    assert_eq!(later.count(), 1);
    assert_eq!(recorder.events(), vec!["second"]);
}

#[tokio::test]
async fn test_pending_predicate_match_selects_it() {
    let (resolver, pending) = defer::<bool>();
    let first = once(pending);
    let later = CallCounter::new();
    let tally = later.clone();
    let dispatcher = Dispatcher::<u32, Recorder>::builder(numbered())
        .endpoint(Endpoint::new(move |_, _| first(), |_, res: Recorder, _| res.record("first")))
        .endpoint(Endpoint::new(
            move |_, _| {
                tally.hit();
                true
            },
            |_, res: Recorder, _| res.record("second"),
        ))
        .build();

    let recorder = Recorder::new();
    let task = tokio::spawn({
        let recorder = recorder.clone();
        async move { dispatcher.dispatch(1_u32, recorder).await }
    });

    flush().await;
    assert_eq!(later.count(), 0);
    assert!(recorder.is_empty());

    resolver.resolve(true);
    let dispatched = task.await.unwrap().unwrap();
    assert_eq!(dispatched.route(), Route::Endpoint(0));
    assert_eq!(recorder.events(), vec!["first"]);
    assert_eq!(later.count(), 0);
}

#[tokio::test]
async fn test_predicates_and_handlers_share_one_inventory() {
    let calls = CallCounter::new();
    let tally = calls.clone();
    let quelaag = Quelaag::new(MiddlewareSpec::<u32>::new().value("double", move |inv| {
        tally.hit();
        *inv.request() * 2
    }));
    let mut dispatcher = Dispatcher::<u32, Recorder>::new(quelaag);
    dispatcher
        .add_observer(Observer::new(
            |_, inv| inv.get::<u32>("double").map(|d| *d > 0),
            |_, _| (),
        ))
        .add_endpoint(Endpoint::new(
            |_, inv| inv.get::<u32>("double").map(|d| *d == 100),
            |_, _res: Recorder, _| (),
        ))
        .add_endpoint(Endpoint::new(
            |_, inv| inv.get::<u32>("double").map(|d| *d == 42),
            |_, res: Recorder, inv| {
                let double = inv.get::<u32>("double")?;
                res.record(double.to_string());
                Ok::<_, MiddlewareError>(())
            },
        ));

    let recorder = Recorder::new();
    let dispatched = dispatcher.dispatch(21_u32, recorder.clone()).await.unwrap();
    assert_eq!(dispatched.route(), Route::Endpoint(1));
    assert_eq!(recorder.events(), vec!["42"]);
    assert_eq!(calls.count(), 1);
}

#[tokio::test]
async fn test_fallback_when_nothing_matches() {
    let mut dispatcher = Dispatcher::<u32, Recorder>::new(numbered());
    dispatcher.add_endpoint(Endpoint::new(|_, _| false, |_, res: Recorder, _| res.record("endpoint")));
    dispatcher.set_fallback(Fallback::new(|req: &u32, res: Recorder, _| res.record(format!("fallback {req}"))));

    let recorder = Recorder::new();
    let dispatched = dispatcher.dispatch(7_u32, recorder.clone()).await.unwrap();
    assert_eq!(dispatched.route(), Route::Fallback);
    assert_eq!(recorder.events(), vec!["fallback 7"]);

    dispatcher.add_endpoint(Endpoint::new(|_, _| true, |_, res: Recorder, _| res.record("matched")));
    let recorder = Recorder::new();
    let dispatched = dispatcher.dispatch(7_u32, recorder.clone()).await.unwrap();
    assert_eq!(dispatched.route(), Route::Endpoint(1));
    assert_eq!(recorder.events(), vec!["matched"]);

    let mut dispatcher = Dispatcher::<u32, Recorder>::new(numbered());
    dispatcher.set_fallback_handler(|_, res: Recorder, _| res.record("fallback"));
    dispatcher.clear_fallback();
    assert!(!dispatcher.has_fallback());
    let recorder = Recorder::new();
    let dispatched = dispatcher.dispatch(7_u32, recorder.clone()).await.unwrap();
    assert_eq!(dispatched.route(), Route::None);
    assert!(recorder.is_empty());
}

fn failing_first(options: DispatchOptions, log: &Recorder) -> Dispatcher<u32, Recorder> {
    let caught = log.clone();
    Dispatcher::<u32, Recorder>::builder(numbered())
        .endpoint(
            Endpoint::new(|_, _| Err::<bool, _>("lookup failed"), |_, res: Recorder, _| res.record("first"))
                .catch(move |err, _, _| {
                    assert_eq!(err.target(), Some(Target::Endpoint(0)));
                    caught.record("caught");
                }),
        )
        .endpoint(Endpoint::new(|_, _| true, |_, res: Recorder, _| res.record("second")))
        .options(options)
        .build()
}

#[tokio::test]
async fn test_handled_predicate_failure_stops_scanning_by_default() {
    let log = Recorder::new();
    let dispatcher = failing_first(DispatchOptions::default(), &log);

    let recorder = Recorder::new();
    let dispatched = dispatcher.dispatch(1_u32, recorder.clone()).await.unwrap();
    assert_eq!(dispatched.route(), Route::None);
    assert!(recorder.is_empty());
    assert_eq!(log.events(), vec!["caught"]);
}

#[tokio::test]
async fn test_handled_predicate_failure_can_continue() {
    let log = Recorder::new();
    let options = DispatchOptions {
        on_predicate_failure: PredicateFailure::Continue,
        ..DispatchOptions::default()
    };
    let dispatcher = failing_first(options, &log);

    let recorder = Recorder::new();
    let dispatched = dispatcher.dispatch(1_u32, recorder.clone()).await.unwrap();
    assert_eq!(dispatched.route(), Route::Endpoint(1));
    assert_eq!(recorder.events(), vec!["second"]);
    assert_eq!(log.events(), vec!["caught"]);
}

#[tokio::test]
async fn test_each_failing_predicate_reaches_its_own_catch() {
    let log = Recorder::new();
    let (first, second) = (log.clone(), log.clone());
    let dispatcher = Dispatcher::<u32, ()>::builder(numbered())
        .endpoint(
            Endpoint::new(|_, _| Err::<bool, _>("first broke"), |_, _, _| ())
                .catch(move |err, _, _| first.record(format!("one: {}", err.root()))),
        )
        .endpoint(
            Endpoint::new(|_, _| Err::<bool, _>("second broke"), |_, _, _| ())
                .catch(move |err, _, _| second.record(format!("two: {}", err.root()))),
        )
        .on_predicate_failure(PredicateFailure::Continue)
        .build();

    let dispatched = dispatcher.dispatch(1_u32, ()).await.unwrap();
    assert_eq!(dispatched.route(), Route::None);
    let events = log.events();
    assert_eq!(events.len(), 2);
    assert!(events[0].starts_with("one: ") && events[0].ends_with("first broke"));
    assert!(events[1].starts_with("two: ") && events[1].ends_with("second broke"));
}

#[tokio::test]
async fn test_unhandled_predicate_failure_is_returned() {
    let mut dispatcher = Dispatcher::<u32, ()>::new(numbered());
    dispatcher.add_endpoint(Endpoint::new(|_, _| Err::<bool, _>("no database"), |_, _, _| ()));

    let err = dispatcher.dispatch(1_u32, ()).await.unwrap_err();
    assert!(matches!(err, DispatchError::Predicate { target: Target::Endpoint(0), .. }));
    assert_eq!(err.user_error().map(ToString::to_string).as_deref(), Some("no database"));
}

#[tokio::test]
async fn test_global_catcher_absorbs_unhandled_failures() {
    let seen = Recorder::new();
    let log = seen.clone();
    let mut dispatcher = Dispatcher::<u32, ()>::with_catcher(numbered(), move |err: &DispatchError| {
        log.record(err.phase().as_str());
    });
    dispatcher.add_endpoint(Endpoint::new(|_, _| true, |_, _, _| Err::<(), _>("handler broke")));

    let dispatched = dispatcher.dispatch(1_u32, ()).await.unwrap();
    assert_eq!(dispatched.route(), Route::Endpoint(0));
    assert_eq!(seen.events(), vec!["action"]);
}

#[tokio::test]
async fn test_observers_run_independently() {
    let mut dispatcher = Dispatcher::<u32, Recorder>::new(numbered());
    let log = Recorder::new();
    let (first, second) = (log.clone(), log.clone());
    dispatcher
        .add_observer(Observer::new(|_, _| true, |_, _| Err::<(), _>("observer broke")))
        .add_observer(Observer::new(|_, _| false, move |_, _| first.record("skipped")))
        .add_observer(Observer::new(|_, _| true, move |_, _| second.record("observed")))
        .add_endpoint(Endpoint::new(|_, _| true, |_, res: Recorder, _| res.record("handled")));

    let recorder = Recorder::new();
    let dispatched = dispatcher.dispatch(1_u32, recorder.clone()).await.unwrap();
    assert_eq!(dispatched.route(), Route::Endpoint(0));
    assert_eq!(recorder.events(), vec!["handled"]);
    assert_eq!(log.events(), vec!["observed"]);

    let failures = dispatched.failures().await;
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].target(), Some(Target::Observer(0)));
}

#[tokio::test]
async fn test_async_observer_predicate_runs_in_background() {
    let (resolver, pending) = defer::<bool>();
    let when = once(pending);
    let log = Recorder::new();
    let seen = log.clone();
    let mut dispatcher = Dispatcher::<u32, ()>::new(numbered());
    dispatcher.add_observer(Observer::new(move |_, _| when(), move |_, _| seen.record("observed")));

    let dispatched = dispatcher.dispatch(1_u32, ()).await.unwrap();
    assert_eq!(dispatched.route(), Route::None);
    assert!(log.is_empty());

    resolver.resolve(true);
    dispatched.settled().await.unwrap();
    assert_eq!(log.events(), vec!["observed"]);
}

#[tokio::test]
async fn test_background_handler_failure_surfaces_when_settled() {
    let mut dispatcher = Dispatcher::<u32, ()>::new(numbered());
    dispatcher.add_endpoint(Endpoint::new(
        |_, _| true,
        |_, _, _| Completion::pending(async { Err::<(), _>("late failure") }),
    ));

    let dispatched = dispatcher.dispatch(1_u32, ()).await.unwrap();
    let err = dispatched.settled().await.unwrap_err();
    assert!(matches!(err, DispatchError::Action { target: Target::Endpoint(0), .. }));
}

#[tokio::test]
async fn test_handler_settled_leaves_observer_tasks() {
    let (resolver, pending) = defer::<()>();
    let slot = Mutex::new(Some(pending));
    let mut dispatcher = Dispatcher::<u32, Recorder>::new(numbered());
    dispatcher
        .add_observer(Observer::new(
            |_, _| true,
            move |_, _| {
                let deferred = slot.lock().unwrap().take();
                Completion::pending(async move {
                    match deferred {
                        Some(deferred) => deferred.await.map_err(BoxError::from),
                        None => Ok(()),
                    }
                })
            },
        ))
        .add_endpoint(Endpoint::new(
            |_, _| true,
            |_, res: Recorder, _| {
                Completion::pending(async move {
                    tokio::task::yield_now().await;
                    res.record("done");
                    Ok::<(), BoxError>(())
                })
            },
        ));

    let recorder = Recorder::new();
    let mut dispatched = dispatcher.dispatch(1_u32, recorder.clone()).await.unwrap();
    dispatched.handler_settled().await.unwrap();
    assert_eq!(recorder.events(), vec!["done"]);
    assert_eq!(dispatched.pending(), 1);

    resolver.resolve(());
    dispatched.settled().await.unwrap();
}

#[tokio::test]
async fn test_sub_router_reads_parent_inventory() {
    let parent = numbered();
    let child = quelaag_core::subquelaag(
        &parent,
        MiddlewareSpec::<u32, ParentInventory<u32, ()>>::new()
            .try_value("quadruple", |inv| inv.context().get::<u32>("double").map(|d| *d * 2)),
    );
    let mut nested: Dispatcher<u32, Recorder, ParentInventory<u32, ()>> = Dispatcher::new(child);
    nested.add_endpoint(Endpoint::new(
        |_, inv| inv.get::<u32>("quadruple").map(|q| *q == 12),
        |_, res: Recorder, inv: &SharedInventory<u32, ParentInventory<u32, ()>>| {
            let double = inv.context().get::<u32>("double")?;
            res.record(format!("nested {double}"));
            Ok::<_, MiddlewareError>(())
        },
    ));

    let mut dispatcher = Dispatcher::<u32, Recorder>::new(parent);
    dispatcher
        .add_endpoint(Endpoint::new(|req: &u32, _| *req > 100, |_, res: Recorder, _| res.record("big")))
        .add_sub_router(SubRoute::to(|_, _| true, Arc::new(nested)));

    let recorder = Recorder::new();
    let dispatched = dispatcher.dispatch(3_u32, recorder.clone()).await.unwrap();
    assert_eq!(dispatched.route(), Route::SubRoute(1));
    dispatched.settled().await.unwrap();
    assert_eq!(recorder.events(), vec!["nested 6"]);
}

#[tokio::test]
async fn test_sub_router_failure_fails_the_sub_route() {
    let parent = numbered();
    let child = quelaag_core::subquelaag(&parent, MiddlewareSpec::<u32, ParentInventory<u32, ()>>::new());
    let mut nested: Dispatcher<u32, (), ParentInventory<u32, ()>> = Dispatcher::new(child);
    nested.add_endpoint(Endpoint::new(|_, _| Err::<bool, _>("nested predicate"), |_, _, _| ()));

    let caught = Recorder::new();
    let log = caught.clone();
    let mut dispatcher = Dispatcher::<u32, ()>::new(parent);
    dispatcher.add_sub_router(
        SubRoute::to(|_, _| true, Arc::new(nested)).catch(move |err, _, _| {
            log.record(err.root().to_string());
        }),
    );

    let dispatched = dispatcher.dispatch(1_u32, ()).await.unwrap();
    dispatched.settled().await.unwrap();
    assert_eq!(caught.len(), 1);
    assert!(caught.events()[0].contains("nested predicate"));
}

#[tokio::test]
async fn test_sub_router_ignores_nested_observer_failures() {
    let parent = numbered();
    let child = quelaag_core::subquelaag(&parent, MiddlewareSpec::<u32, ParentInventory<u32, ()>>::new());
    let mut nested: Dispatcher<u32, Recorder, ParentInventory<u32, ()>> = Dispatcher::new(child);
    nested
        .add_observer(Observer::new(|_, _| true, |_, _| Err::<(), _>("audit log down")))
        .add_endpoint(Endpoint::new(|_, _| true, |_, res: Recorder, _| res.record("handled")));

    let caught = Recorder::new();
    let log = caught.clone();
    let mut dispatcher = Dispatcher::<u32, Recorder>::new(parent);
    dispatcher.add_sub_router(
        SubRoute::to(|_, _| true, Arc::new(nested)).catch(move |err, _, _| {
            log.record(err.to_string());
        }),
    );

    let recorder = Recorder::new();
    let dispatched = dispatcher.dispatch(1_u32, recorder.clone()).await.unwrap();
    assert_eq!(dispatched.route(), Route::SubRoute(0));
    dispatched.settled().await.unwrap();
    assert_eq!(recorder.events(), vec!["handled"]);
    assert!(caught.is_empty());
}

#[tokio::test]
async fn test_sub_router_bound_after_registration() {
    type Nested = Dispatcher<u32, Recorder, ParentInventory<u32, ()>>;

    let parent = numbered();
    let slot: Arc<Mutex<Option<Arc<Nested>>>> = Arc::new(Mutex::new(None));
    let provider = Arc::clone(&slot);

    let mut dispatcher = Dispatcher::<u32, Recorder>::new(parent.clone());
    dispatcher.add_sub_router(SubRoute::new(
        |_, _| true,
        move || provider.lock().unwrap().clone().expect("router registered"),
    ));

    let child = quelaag_core::subquelaag(&parent, MiddlewareSpec::<u32, ParentInventory<u32, ()>>::new());
    let mut nested: Nested = Dispatcher::new(child);
    nested.add_endpoint(Endpoint::new(|_, _| true, |_, res: Recorder, _| res.record("late bound")));
    *slot.lock().unwrap() = Some(Arc::new(nested));

    let recorder = Recorder::new();
    dispatcher.dispatch(1_u32, recorder.clone()).await.unwrap().settled().await.unwrap();
    assert_eq!(recorder.events(), vec!["late bound"]);
}
