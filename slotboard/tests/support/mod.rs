#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

use slotboard::batch::executor::BatchConfig;
use slotboard::metrics::counters::Counters;
use slotboard::slot::model::{SLOT_COUNT, Slot, SlotId, SlotPatch};
use slotboard::slot::repository::SlotRepository;
use slotboard::slot::store::SlotStore;
use slotboard::time::ManualClock;
use slotboard::SlotService;

/// In-memory slot table with failure injection.
#[derive(Default)]
pub struct MockSlotStore {
    rows: Mutex<HashMap<SlotId, Slot>>,
    offline: AtomicBool,
    failing: Mutex<HashSet<SlotId>>,
    stalled: Mutex<HashSet<SlotId>>,
    write_delay: Mutex<Option<Duration>>,
    pub writes: AtomicUsize,
}

impl MockSlotStore {
    pub fn seeded() -> Arc<Self> {
        let store = Self::default();
        store
            .rows
            .lock()
            .extend((1..=SLOT_COUNT).map(|id| (id, Slot::empty(id))));
        Arc::new(store)
    }

    pub fn put(&self, slot: Slot) {
        self.rows.lock().insert(slot.id, slot);
    }

    pub fn row(&self, id: SlotId) -> Slot {
        self.rows.lock()[&id].clone()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Every read and write of `id` errors.
    pub fn fail_slot(&self, id: SlotId) {
        self.failing.lock().insert(id);
    }

    /// Every read of `id` hangs.
    pub fn stall_slot(&self, id: SlotId) {
        self.stalled.lock().insert(id);
    }

    /// Every write sleeps for `delay` before it lands.
    pub fn delay_writes(&self, delay: Duration) {
        *self.write_delay.lock() = Some(delay);
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check(&self, id: SlotId) -> anyhow::Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(anyhow!("connection refused"));
        }
        if self.failing.lock().contains(&id) {
            return Err(anyhow!("disk I/O error on slot {id}"));
        }
        Ok(())
    }
}

#[async_trait]
impl SlotRepository for MockSlotStore {
    async fn fetch_by_id(&self, id: SlotId) -> anyhow::Result<Option<Slot>> {
        let stalled = self.stalled.lock().contains(&id);
        if stalled {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.check(id)?;
        Ok(self.rows.lock().get(&id).cloned())
    }

    async fn fetch_many(&self, ids: &[SlotId]) -> anyhow::Result<Vec<Slot>> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(anyhow!("connection refused"));
        }
        let rows = self.rows.lock();
        let mut out: Vec<Slot> = ids.iter().filter_map(|id| rows.get(id).cloned()).collect();
        out.sort_by_key(|s| s.id);
        Ok(out)
    }

    async fn update(&self, id: SlotId, patch: &SlotPatch) -> anyhow::Result<Option<Slot>> {
        let delay = *self.write_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check(id)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock();
        Ok(rows.get_mut(&id).map(|s| {
            patch.apply(s);
            s.clone()
        }))
    }

    async fn ping(&self) -> anyhow::Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(anyhow!("connection refused"));
        }
        Ok(())
    }
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap()
}

pub struct Harness {
    pub store: Arc<MockSlotStore>,
    pub clock: Arc<ManualClock>,
    pub service: SlotService,
}

pub fn harness() -> Harness {
    harness_with(BatchConfig {
        max_concurrency: 4,
        per_slot_timeout: Duration::from_millis(500),
        max_batch_size: 25,
    })
}

pub fn harness_with(config: BatchConfig) -> Harness {
    let store = MockSlotStore::seeded();
    let clock = Arc::new(ManualClock::new(t0()));
    let slot_store = Arc::new(SlotStore::new(store.clone()).with_call_timeout(Duration::from_millis(200)));
    let service = SlotService::new(slot_store, config, clock.clone(), Counters::default());

    Harness {
        store,
        clock,
        service,
    }
}
