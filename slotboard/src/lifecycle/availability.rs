use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::batch::executor::BatchExecutor;
use crate::batch::types::BatchOperationResult;
use crate::slot::model::{SlotId, SlotStatus};
use crate::slot::store::SlotStore;
use crate::time::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub available: bool,
    pub status: SlotStatus,
}

/// Read-only availability check. Never writes.
#[derive(Clone)]
pub struct AvailabilityVerifier {
    store: Arc<SlotStore>,
    executor: BatchExecutor,
    clock: Arc<dyn Clock>,
}

impl AvailabilityVerifier {
    pub fn new(store: Arc<SlotStore>, executor: BatchExecutor, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            executor,
            clock,
        }
    }

    /// A slot is available iff it is `empty` and holds no unexpired reservation.
    pub async fn verify(&self, slot_ids: &[SlotId]) -> BatchOperationResult<Availability> {
        let now = self.clock.now();
        self.executor
            .execute("verify_availability", slot_ids, |slot_id| {
                let store = self.store.clone();
                async move {
                    store.get(slot_id).await.map(|slot| Availability {
                        available: slot.status == SlotStatus::Empty && !slot.is_reserved(now),
                        status: slot.status,
                    })
                }
            })
            .await
    }
}
