use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::batch::executor::BatchExecutor;
use crate::batch::types::BatchOperationResult;
use crate::lifecycle::apply_to_each;
use crate::lifecycle::state_machine::Action;
use crate::slot::model::{DraftStatus, ProductId, Slot, SlotId};
use crate::slot::store::SlotStore;
use crate::time::Clock;

/// Optional listing window for a product placement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingWindow {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Product placement, removal and the draft workflow.
#[derive(Clone)]
pub struct OccupancyManager {
    store: Arc<SlotStore>,
    executor: BatchExecutor,
    clock: Arc<dyn Clock>,
}

impl OccupancyManager {
    pub fn new(store: Arc<SlotStore>, executor: BatchExecutor, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            executor,
            clock,
        }
    }

    /// Place `product_id` in one slot. `actor` may consume its own reservation.
    pub async fn assign(
        &self,
        slot_id: SlotId,
        product_id: ProductId,
        actor: &str,
        window: ListingWindow,
    ) -> BatchOperationResult<Slot> {
        let now = self.clock.now();
        let action = Action::AssignProduct {
            product_id,
            actor: actor.to_string(),
            start_time: window.start_time,
            end_time: window.end_time,
        };

        apply_to_each(
            &self.executor,
            &self.store,
            "assign_product",
            &[slot_id],
            action,
            now,
        )
        .await
    }

    /// Remove the product from each slot. Reservations and draft status survive.
    pub async fn clear(&self, slot_ids: &[SlotId]) -> BatchOperationResult<Slot> {
        let now = self.clock.now();
        apply_to_each(&self.executor, &self.store, "clear", slot_ids, Action::Clear, now).await
    }

    pub async fn set_draft_status(
        &self,
        slot_ids: &[SlotId],
        target: DraftStatus,
    ) -> BatchOperationResult<Slot> {
        let now = self.clock.now();
        let action = Action::SetDraftStatus(target);

        apply_to_each(
            &self.executor,
            &self.store,
            "set_draft_status",
            slot_ids,
            action,
            now,
        )
        .await
    }
}
