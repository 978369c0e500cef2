use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Minimal counters for operational visibility.
#[derive(Clone, Default)]
pub struct Counters {
    pub batches_accepted: Arc<AtomicU64>,
    pub batches_rejected: Arc<AtomicU64>,

    pub slot_successes: Arc<AtomicU64>,
    pub slot_failures: Arc<AtomicU64>,

    // subset of slot_failures
    pub slot_timeouts: Arc<AtomicU64>,
    pub slot_panics: Arc<AtomicU64>,
}

impl Counters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}
