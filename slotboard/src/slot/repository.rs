use anyhow::Result;
use async_trait::async_trait;

use crate::slot::model::{Slot, SlotId, SlotPatch};

/// Persistence boundary for slot rows.
///
/// Implementations guarantee single-row atomic updates and nothing more:
/// there are no multi-row transactions.
#[async_trait]
pub trait SlotRepository: Send + Sync {
    async fn fetch_by_id(&self, slot_id: SlotId) -> Result<Option<Slot>>;

    /// Rows for `slot_ids`, in any order. Missing IDs are omitted, never an error.
    async fn fetch_many(&self, slot_ids: &[SlotId]) -> Result<Vec<Slot>>;

    /// Apply `patch` to one row and return the row as stored afterwards.
    /// `Ok(None)` when the row does not exist.
    async fn update(&self, slot_id: SlotId, patch: &SlotPatch) -> Result<Option<Slot>>;

    /// Cheap reachability check used before a batch fans out.
    async fn ping(&self) -> Result<()>;
}
