use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::batch::executor::BatchExecutor;
use crate::batch::types::BatchOperationResult;
use crate::error::SlotError;
use crate::lifecycle::{apply_action, apply_to_each};
use crate::lifecycle::state_machine::Action;
use crate::slot::model::{Slot, SlotId, is_valid_slot_id};
use crate::slot::store::SlotStore;
use crate::time::Clock;

/// Time-bounded advisory holds. Expiry is evaluated against the clock on every
/// decision; nothing sweeps expired holds in the background.
#[derive(Clone)]
pub struct ReservationManager {
    store: Arc<SlotStore>,
    executor: BatchExecutor,
    clock: Arc<dyn Clock>,
}

impl ReservationManager {
    pub fn new(store: Arc<SlotStore>, executor: BatchExecutor, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            executor,
            clock,
        }
    }

    pub async fn reserve(
        &self,
        slot_ids: &[SlotId],
        until: DateTime<Utc>,
        reserved_by: &str,
    ) -> BatchOperationResult<Slot> {
        let now = self.clock.now();
        let action = Action::Reserve {
            by: reserved_by.to_string(),
            until,
        };

        self.executor
            .execute("reserve", slot_ids, |slot_id| {
                let store = self.store.clone();
                let action = action.clone();
                async move {
                    // Unknown IDs report NOT_FOUND ahead of any request-wide
                    // rejection; neither case needs a storage round-trip.
                    if !is_valid_slot_id(slot_id) {
                        return Err(SlotError::not_found(slot_id));
                    }
                    if until <= now {
                        return Err(SlotError::invalid_transition(
                            "reservation end time must be in the future",
                        ));
                    }
                    apply_action(&store, slot_id, &action, now).await
                }
            })
            .await
    }

    /// Cancelling a slot that holds no reservation is a successful no-op.
    pub async fn cancel(&self, slot_ids: &[SlotId]) -> BatchOperationResult<Slot> {
        let now = self.clock.now();
        apply_to_each(
            &self.executor,
            &self.store,
            "cancel_reservation",
            slot_ids,
            Action::CancelReservation,
            now,
        )
        .await
    }
}
