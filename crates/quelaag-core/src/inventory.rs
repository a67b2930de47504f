//! Per-request inventories.
//!
//! An [`Inventory`] is created for every request and owns one cache slot per
//! registered middleware. Accessors evaluate their deriver on first call and
//! return the cached [`Memo`] afterwards.
//!
//! # Slot states
//!
//! ```text
//! Uncomputed --call--> Computing { owner } --ok--> Computed(memo)
//!      ^                      |
//!      +------ err / panic ---+
//! ```
//!
//! Failures are never cached, so a later call runs the deriver again. A call
//! made by the owning thread while the slot is `Computing` (a deriver that
//! reads itself) evaluates the deriver again without touching the cache; the
//! outermost evaluation writes the slot. A thread that holds no claim waits
//! for the owner to finish; a thread that already owns another `Computing`
//! slot evaluates without caching instead, so derivers recursing into each
//! other from two threads cannot deadlock.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use indexmap::IndexMap;
use parking_lot::{Condvar, Mutex};

use crate::error::{MiddlewareError, MiddlewareResult};
use crate::spec::Deriver;
use crate::value::{downcast, Memo};

enum Slot {
    Uncomputed,
    Computing { owner: ThreadId },
    Computed(Memo),
}

enum Step {
    Hit(Memo),
    Reenter,
    Wait,
    Claim,
}

/// The lazily evaluated middleware values of one request.
pub struct Inventory<Req, Ctx = ()> {
    derivers: Arc<IndexMap<String, Deriver<Req, Ctx>>>,
    request: Arc<Req>,
    context: Ctx,
    slots: Mutex<Vec<Slot>>,
    settled: Condvar,
}

impl<Req, Ctx> Inventory<Req, Ctx> {
    pub(crate) fn new(
        derivers: Arc<IndexMap<String, Deriver<Req, Ctx>>>,
        request: Arc<Req>,
        context: Ctx,
    ) -> Self {
        let slots = derivers.keys().map(|_| Slot::Uncomputed).collect();
        Self {
            derivers,
            request,
            context,
            slots: Mutex::new(slots),
            settled: Condvar::new(),
        }
    }

    /// Returns the request this inventory was built for.
    pub fn request(&self) -> &Req {
        &self.request
    }

    /// Returns a shared handle to the request.
    pub fn shared_request(&self) -> Arc<Req> {
        Arc::clone(&self.request)
    }

    /// Returns the context this inventory was built with.
    pub fn context(&self) -> &Ctx {
        &self.context
    }

    /// Returns `true` if a middleware is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.derivers.contains_key(name)
    }

    /// Iterates over the accessor names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.derivers.keys().map(String::as_str)
    }

    /// Returns `true` once `name` holds a cached value.
    pub fn is_cached(&self, name: &str) -> bool {
        self.derivers
            .get_index_of(name)
            .is_some_and(|index| matches!(self.slots.lock()[index], Slot::Computed(_)))
    }

    /// Calls the accessor for `name`.
    ///
    /// The first successful call runs the deriver and caches its result;
    /// every later call returns the cached memo without running it again.
    pub fn call(&self, name: &str) -> MiddlewareResult<Memo> {
        let (index, name, deriver) = self
            .derivers
            .get_full(name)
            .ok_or_else(|| MiddlewareError::unknown(name))?;
        let me = thread::current().id();

        let mut slots = self.slots.lock();
        loop {
            let step = match &slots[index] {
                Slot::Computed(memo) => Step::Hit(memo.clone()),
                Slot::Computing { owner } if *owner == me => Step::Reenter,
                Slot::Computing { .. } if holds_claim(&slots, me) => Step::Reenter,
                Slot::Computing { .. } => Step::Wait,
                Slot::Uncomputed => Step::Claim,
            };
            match step {
                Step::Hit(memo) => return Ok(memo),
                Step::Reenter => {
                    drop(slots);
                    tracing::trace!(middleware = %name, "re-entrant evaluation");
                    return self.evaluate(name, deriver);
                }
                Step::Wait => self.settled.wait(&mut slots),
                Step::Claim => {
                    slots[index] = Slot::Computing { owner: me };
                    break;
                }
            }
        }
        drop(slots);

        let claim = Claim {
            inventory: self,
            index,
            released: false,
        };
        let result = self.evaluate(name, deriver);
        claim.release(result.as_ref().ok().cloned());
        result
    }

    /// Returns the ready value of `name` as `T`.
    ///
    /// Fails with [`MiddlewareError::Pending`] if the value is asynchronous
    /// and has not settled yet.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> MiddlewareResult<Arc<T>> {
        match self.call(name)?.peek() {
            Some(result) => downcast(name, result?),
            None => Err(MiddlewareError::pending(name)),
        }
    }

    /// Waits for the value of `name` as `T`.
    pub async fn resolve<T: Any + Send + Sync>(&self, name: &str) -> MiddlewareResult<Arc<T>> {
        let memo = self.call(name)?;
        memo.settle_as::<T>(name).await
    }

    fn evaluate(&self, name: &str, deriver: &Deriver<Req, Ctx>) -> MiddlewareResult<Memo> {
        tracing::trace!(middleware = %name, "evaluating deriver");
        deriver(self)
            .map(|derived| derived.into_memo(name))
            .map_err(|err| MiddlewareError::failed(name, err))
    }
}

impl<Req, Ctx> fmt::Debug for Inventory<Req, Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cached: Vec<&str> = {
            let slots = self.slots.lock();
            self.derivers
                .keys()
                .zip(slots.iter())
                .filter(|(_, slot)| matches!(slot, Slot::Computed(_)))
                .map(|(name, _)| name.as_str())
                .collect()
        };
        f.debug_struct("Inventory")
            .field("names", &self.derivers.keys().collect::<Vec<_>>())
            .field("cached", &cached)
            .finish_non_exhaustive()
    }
}

fn holds_claim(slots: &[Slot], me: ThreadId) -> bool {
    slots
        .iter()
        .any(|slot| matches!(slot, Slot::Computing { owner } if *owner == me))
}

/// Ownership of a `Computing` slot.
///
/// Dropping without [`Claim::release`] (a panicking deriver) resets the slot.
struct Claim<'a, Req, Ctx> {
    inventory: &'a Inventory<Req, Ctx>,
    index: usize,
    released: bool,
}

impl<Req, Ctx> Claim<'_, Req, Ctx> {
    fn release(mut self, memo: Option<Memo>) {
        self.set(memo.map_or(Slot::Uncomputed, Slot::Computed));
        self.released = true;
    }

    fn set(&self, slot: Slot) {
        self.inventory.slots.lock()[self.index] = slot;
        self.inventory.settled.notify_all();
    }
}

impl<Req, Ctx> Drop for Claim<'_, Req, Ctx> {
    fn drop(&mut self) {
        if !self.released {
            self.set(Slot::Uncomputed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MiddlewareSpec, Quelaag};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counted(counter: &Arc<AtomicUsize>) -> MiddlewareSpec<()> {
        let counter = Arc::clone(counter);
        MiddlewareSpec::new().value("n", move |_| counter.fetch_add(1, Ordering::SeqCst))
    }

    #[test]
    fn test_deriver_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let inventory = Quelaag::new(counted(&calls)).build((), ());

        assert!(!inventory.is_cached("n"));
        assert_eq!(*inventory.get::<usize>("n").unwrap(), 0);
        assert_eq!(*inventory.get::<usize>("n").unwrap(), 0);
        assert!(inventory.is_cached("n"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cached_memo_is_identical() {
        let calls = Arc::new(AtomicUsize::new(0));
        let inventory = Quelaag::new(counted(&calls)).build((), ());
        let first = inventory.call("n").unwrap();
        let second = inventory.call("n").unwrap();
        assert!(first.same_as(&second));
    }

    #[test]
    fn test_unknown_name() {
        let inventory = Quelaag::new(MiddlewareSpec::<()>::new()).build((), ());
        let err = inventory.call("missing").unwrap_err();
        assert!(matches!(err, MiddlewareError::Unknown { .. }));
    }

    #[test]
    fn test_failure_is_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let spec = MiddlewareSpec::<()>::new().try_value("flaky", move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err("first call fails")
            } else {
                Ok(42_u32)
            }
        });
        let inventory = Quelaag::new(spec).build((), ());

        assert!(matches!(
            inventory.get::<u32>("flaky"),
            Err(MiddlewareError::Failed { .. })
        ));
        assert!(!inventory.is_cached("flaky"));
        assert_eq!(*inventory.get::<u32>("flaky").unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_panicking_deriver_resets_slot() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let spec = MiddlewareSpec::<()>::new().value("once-broken", move |_| {
            assert!(counter.fetch_add(1, Ordering::SeqCst) > 0, "first call panics");
            "ok"
        });
        let inventory = Quelaag::new(spec).build((), ());

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            inventory.get::<&str>("once-broken")
        }));
        assert!(outcome.is_err());
        assert_eq!(*inventory.get::<&str>("once-broken").unwrap(), "ok");
    }

    #[test]
    fn test_self_recursion_terminates() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let spec = MiddlewareSpec::<()>::new().try_value("rec", move |inv| {
            if counter.fetch_add(1, Ordering::SeqCst) + 1 < 3 {
                inv.call("rec")?;
            }
            Ok::<_, MiddlewareError>(())
        });
        let inventory = Quelaag::new(spec).build((), ());

        inventory.call("rec").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        inventory.call("rec").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_cross_thread_mutual_recursion_completes() {
        let depth = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));
        let step = |next: &'static str| {
            let depth = Arc::clone(&depth);
            let calls = Arc::clone(&calls);
            move |inv: &Inventory<()>| {
                calls.fetch_add(1, Ordering::SeqCst);
                thread::sleep(std::time::Duration::from_millis(50));
                if depth.fetch_add(1, Ordering::SeqCst) < 4 {
                    inv.call(next)?;
                }
                Ok::<_, MiddlewareError>(())
            }
        };
        let spec = MiddlewareSpec::<()>::new()
            .try_value("x", step("y"))
            .try_value("y", step("x"));
        let inventory = Quelaag::new(spec).build((), ());

        let (done, finished) = std::sync::mpsc::channel();
        for name in ["x", "y"] {
            let inventory = Arc::clone(&inventory);
            let done = done.clone();
            thread::spawn(move || done.send(inventory.call(name).is_ok()));
        }
        for _ in 0..2 {
            let outcome = finished.recv_timeout(std::time::Duration::from_secs(5));
            assert_eq!(outcome, Ok(true), "accessors did not return");
        }

        assert!(inventory.is_cached("x"));
        assert!(inventory.is_cached("y"));
        let total = calls.load(Ordering::SeqCst);
        inventory.call("x").unwrap();
        inventory.call("y").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), total);
    }

    #[test]
    fn test_concurrent_callers_share_one_evaluation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let spec = MiddlewareSpec::<()>::new().value("slow", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(std::time::Duration::from_millis(20));
            7_u64
        });
        let inventory = Quelaag::new(spec).build((), ());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let inventory = Arc::clone(&inventory);
                thread::spawn(move || *inventory.get::<u64>("slow").unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_inventories_do_not_share_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let factory = Quelaag::new(counted(&calls));
        let first = factory.build((), ());
        let second = factory.build((), ());

        assert_eq!(*first.get::<usize>("n").unwrap(), 0);
        assert_eq!(*second.get::<usize>("n").unwrap(), 1);
        assert_eq!(*first.get::<usize>("n").unwrap(), 0);
    }
}
