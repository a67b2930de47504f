//! Shared counters and recorders for observing callbacks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// A cloneable call counter.
#[derive(Debug, Clone, Default)]
pub struct CallCounter {
    hits: Arc<AtomicUsize>,
}

impl CallCounter {
    /// Creates a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one call and returns the count before it.
    pub fn hit(&self) -> usize {
        self.hits.fetch_add(1, Ordering::SeqCst)
    }

    /// Returns the number of recorded calls.
    pub fn count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// A cloneable, ordered event log.
///
/// Clones share the log, so a recorder can double as a test response type:
/// handlers record into it and the test reads it back.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }

    /// Returns a snapshot of recorded events.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    /// Returns `true` if `event` was recorded.
    pub fn contains(&self, event: &str) -> bool {
        self.events.lock().iter().any(|e| e == event)
    }

    /// Returns the number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_clones_share_state() {
        let counter = CallCounter::new();
        let copy = counter.clone();
        assert_eq!(copy.hit(), 0);
        assert_eq!(counter.hit(), 1);
        assert_eq!(counter.count(), 2);
    }

    #[test]
    fn test_recorder_keeps_order() {
        let recorder = Recorder::new();
        recorder.clone().record("first");
        recorder.record("second");
        assert_eq!(recorder.events(), vec!["first", "second"]);
        assert!(recorder.contains("first"));
        assert_eq!(recorder.len(), 2);
    }
}
