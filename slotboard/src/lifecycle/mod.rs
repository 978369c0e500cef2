//! Slot lifecycle components. Each one turns a caller intent into per-slot
//! actions, runs them through the batch executor and lets the state machine
//! decide legality.

pub mod availability;
pub mod maintenance;
pub mod occupancy;
pub mod reservation;
pub mod state_machine;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::batch::executor::BatchExecutor;
use crate::batch::types::BatchOperationResult;
use crate::error::{SlotError, SlotErrorType};
use crate::slot::model::{Slot, SlotId, SlotPatch};
use crate::slot::store::SlotStore;
use state_machine::{Action, transition};

/// Read, validate, write. The single path every mutating slot operation takes.
///
/// A legal no-op (empty patch) skips the write and still succeeds. A next
/// snapshot that breaks a row invariant is refused before anything is written.
/// The returned snapshot has expired reservations masked.
pub(crate) async fn apply_action(
    store: &SlotStore,
    slot_id: SlotId,
    action: &Action,
    now: DateTime<Utc>,
) -> Result<Slot, SlotError> {
    let current = store.get(slot_id).await?;
    let next = transition(&current, action, now)?;

    if let Err(violation) = next.check_invariants() {
        tracing::error!(
            slot_id,
            action = action.name(),
            %violation,
            "refusing to write inconsistent slot"
        );
        return Err(SlotError::new(SlotErrorType::Unknown, violation.to_string()));
    }

    let patch = SlotPatch::between(&current, &next);
    if patch.is_empty() {
        tracing::debug!(slot_id, action = action.name(), "no change; skipping write");
        return Ok(current.with_lazy_expiry(now));
    }

    let stored = store.update(slot_id, &patch).await?;
    Ok(stored.with_lazy_expiry(now))
}

/// Fan `action` out over `slot_ids`. Each unit owns its store handle and action
/// so it can outlive the caller's await.
pub(crate) async fn apply_to_each(
    executor: &BatchExecutor,
    store: &Arc<SlotStore>,
    op_name: &'static str,
    slot_ids: &[SlotId],
    action: Action,
    now: DateTime<Utc>,
) -> BatchOperationResult<Slot> {
    executor
        .execute(op_name, slot_ids, |slot_id| {
            let store = store.clone();
            let action = action.clone();
            async move { apply_action(&store, slot_id, &action, now).await }
        })
        .await
}
