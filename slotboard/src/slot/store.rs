use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use common::logger::warn_if_slow;
use tracing::{debug, instrument, warn};

use crate::error::SlotError;
use crate::slot::model::{Slot, SlotId, SlotPatch, is_valid_slot_id};
use crate::slot::repository::SlotRepository;

/// Service-facing slot store: range checks, per-call timeouts and error normalisation
/// over a `SlotRepository`.
pub struct SlotStore {
    repo: Arc<dyn SlotRepository>,
    call_timeout: Duration,
}

impl SlotStore {
    pub fn new(repo: Arc<dyn SlotRepository>) -> Self {
        Self {
            repo,
            call_timeout: Duration::from_secs(2),
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Load one slot. IDs outside the fixed range are `NOT_FOUND` without a storage round-trip.
    #[instrument(skip(self), target = "store")]
    pub async fn get(&self, slot_id: SlotId) -> Result<Slot, SlotError> {
        if !is_valid_slot_id(slot_id) {
            debug!("slot id outside fixed range");
            return Err(SlotError::not_found(slot_id));
        }

        let row = self
            .bounded("db_fetch_slot", self.repo.fetch_by_id(slot_id))
            .await
            .with_context(|| format!("fetch slot {slot_id}"))
            .map_err(|e| SlotError::unknown(&e))?;

        match row {
            Some(s) => Ok(s),
            None => {
                warn!("slot lookup returned no row");
                Err(SlotError::not_found(slot_id))
            }
        }
    }

    /// Load the in-range subset of `slot_ids`. Missing rows are omitted.
    ///
    /// Storage errors propagate: a failed multi-row read is not attributable to one slot.
    #[instrument(skip(self, slot_ids), target = "store", fields(requested = slot_ids.len()))]
    pub async fn get_many(&self, slot_ids: &[SlotId]) -> Result<Vec<Slot>> {
        let in_range: Vec<SlotId> = slot_ids
            .iter()
            .copied()
            .filter(|id| is_valid_slot_id(*id))
            .collect();

        if in_range.is_empty() {
            return Ok(Vec::new());
        }

        self.bounded("db_fetch_slots", self.repo.fetch_many(&in_range))
            .await
            .context("fetch slots")
    }

    /// Persist `patch` for one slot and return the stored row.
    #[instrument(skip(self, patch), target = "store")]
    pub async fn update(&self, slot_id: SlotId, patch: &SlotPatch) -> Result<Slot, SlotError> {
        if !is_valid_slot_id(slot_id) {
            return Err(SlotError::not_found(slot_id));
        }

        debug!(?patch, "writing slot patch");

        let row = self
            .bounded("db_update_slot", self.repo.update(slot_id, patch))
            .await
            .with_context(|| format!("update slot {slot_id}"))
            .map_err(|e| SlotError::unknown(&e))?;

        row.ok_or_else(|| SlotError::not_found(slot_id))
    }

    /// Reachability check; an error here is a whole-request failure.
    pub async fn ping(&self) -> Result<()> {
        self.bounded("db_ping", self.repo.ping())
            .await
            .context("slot store ping failed")
    }

    async fn bounded<T, F>(&self, label: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let budget = self.call_timeout;
        match tokio::time::timeout(budget, warn_if_slow(label, budget / 4, fut)).await {
            Ok(res) => res,
            Err(_) => Err(anyhow!("{label} timed out after {}ms", budget.as_millis())),
        }
    }
}
