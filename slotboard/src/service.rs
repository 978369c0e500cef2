//! Caller-facing facade over the lifecycle components.
//!
//! Every call is admitted first: actor present, ID list well-formed, store
//! reachable. Only admission failures surface as `BatchError`; once admitted,
//! per-slot failures are folded into the returned `BatchOperationResult`.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{Instrument, Span, field, info, instrument, warn};

use common::logger::{TraceId, root_span};

use crate::batch::executor::{BatchConfig, BatchExecutor};
use crate::batch::types::BatchOperationResult;
use crate::error::BatchError;
use crate::lifecycle::availability::{Availability, AvailabilityVerifier};
use crate::lifecycle::maintenance::{MaintenanceController, MaintenanceOperation};
use crate::lifecycle::occupancy::{ListingWindow, OccupancyManager};
use crate::lifecycle::reservation::ReservationManager;
use crate::metrics::counters::Counters;
use crate::slot::model::{DraftStatus, ProductId, Slot, SlotId};
use crate::slot::store::SlotStore;
use crate::time::Clock;

/// Who is asking, and the id that ties their request's logs together.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub actor: String,
    pub trace_id: TraceId,
}

impl RequestContext {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            trace_id: TraceId::default(),
        }
    }

    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = trace_id;
        self
    }
}

pub struct SlotService {
    store: Arc<SlotStore>,
    clock: Arc<dyn Clock>,
    max_batch_size: usize,
    counters: Counters,

    availability: AvailabilityVerifier,
    reservations: ReservationManager,
    maintenance: MaintenanceController,
    occupancy: OccupancyManager,
}

impl SlotService {
    pub fn new(
        store: Arc<SlotStore>,
        config: BatchConfig,
        clock: Arc<dyn Clock>,
        counters: Counters,
    ) -> Self {
        let max_batch_size = config.max_batch_size;
        let executor = BatchExecutor::new(config, counters.clone());

        Self {
            availability: AvailabilityVerifier::new(store.clone(), executor.clone(), clock.clone()),
            reservations: ReservationManager::new(store.clone(), executor.clone(), clock.clone()),
            maintenance: MaintenanceController::new(store.clone(), executor.clone(), clock.clone()),
            occupancy: OccupancyManager::new(store.clone(), executor, clock.clone()),
            store,
            clock,
            max_batch_size,
            counters,
        }
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub async fn set_maintenance_status(
        &self,
        ctx: &RequestContext,
        slot_ids: &[SlotId],
        operation: MaintenanceOperation,
    ) -> Result<BatchOperationResult<Slot>, BatchError> {
        let span = request_span("set_maintenance_status", ctx, slot_ids);
        async {
            self.admit(ctx, slot_ids).await?;
            Ok::<_, BatchError>(self.maintenance.set(slot_ids, operation).await)
        }
        .instrument(span)
        .await
    }

    pub async fn clear_multiple_slots(
        &self,
        ctx: &RequestContext,
        slot_ids: &[SlotId],
    ) -> Result<BatchOperationResult<Slot>, BatchError> {
        let span = request_span("clear_multiple_slots", ctx, slot_ids);
        async {
            self.admit(ctx, slot_ids).await?;
            Ok::<_, BatchError>(self.occupancy.clear(slot_ids).await)
        }
        .instrument(span)
        .await
    }

    pub async fn reserve_multiple_slots(
        &self,
        ctx: &RequestContext,
        slot_ids: &[SlotId],
        end_time: DateTime<Utc>,
        reserved_by: &str,
    ) -> Result<BatchOperationResult<Slot>, BatchError> {
        let span = request_span("reserve_multiple_slots", ctx, slot_ids);
        async {
            if reserved_by.trim().is_empty() {
                return Err(self.reject(BatchError::InvalidRequest(
                    "reservedBy must not be blank".to_string(),
                )));
            }
            self.admit(ctx, slot_ids).await?;
            Ok::<_, BatchError>(self.reservations.reserve(slot_ids, end_time, reserved_by).await)
        }
        .instrument(span)
        .await
    }

    pub async fn cancel_multiple_reservations(
        &self,
        ctx: &RequestContext,
        slot_ids: &[SlotId],
    ) -> Result<BatchOperationResult<Slot>, BatchError> {
        let span = request_span("cancel_multiple_reservations", ctx, slot_ids);
        async {
            self.admit(ctx, slot_ids).await?;
            Ok::<_, BatchError>(self.reservations.cancel(slot_ids).await)
        }
        .instrument(span)
        .await
    }

    /// Current rows for the requested IDs, in request order, with expired
    /// reservations masked. Unknown IDs are omitted.
    pub async fn get_multiple_slots_status(
        &self,
        ctx: &RequestContext,
        slot_ids: &[SlotId],
    ) -> Result<Vec<Slot>, BatchError> {
        let span = request_span("get_multiple_slots_status", ctx, slot_ids);
        async {
            self.admit(ctx, slot_ids).await?;

            let now = self.clock.now();
            let rows = self.store.get_many(slot_ids).await.map_err(|e| {
                warn!(error = ?e, "status read failed");
                BatchError::StoreUnavailable(format!("{e:#}"))
            })?;

            let mut by_id: std::collections::HashMap<SlotId, Slot> =
                rows.into_iter().map(|s| (s.id, s)).collect();

            Ok::<_, BatchError>(slot_ids
                .iter()
                .filter_map(|id| by_id.remove(id))
                .map(|s| s.with_lazy_expiry(now))
                .collect())
        }
        .instrument(span)
        .await
    }

    pub async fn verify_availability(
        &self,
        ctx: &RequestContext,
        slot_ids: &[SlotId],
    ) -> Result<BatchOperationResult<Availability>, BatchError> {
        let span = request_span("verify_availability", ctx, slot_ids);
        async {
            self.admit(ctx, slot_ids).await?;
            Ok::<_, BatchError>(self.availability.verify(slot_ids).await)
        }
        .instrument(span)
        .await
    }

    /// Single-slot placement, reported in batch form so callers handle one shape.
    pub async fn assign_product(
        &self,
        ctx: &RequestContext,
        slot_id: SlotId,
        product_id: ProductId,
        window: ListingWindow,
    ) -> Result<BatchOperationResult<Slot>, BatchError> {
        let span = request_span("assign_product", ctx, &[slot_id]);
        async {
            if product_id.trim().is_empty() {
                return Err(self.reject(BatchError::InvalidRequest(
                    "productId must not be blank".to_string(),
                )));
            }
            self.admit(ctx, &[slot_id]).await?;
            Ok(self
                .occupancy
                .assign(slot_id, product_id, ctx.actor.trim(), window)
                .await)
        }
        .instrument(span)
        .await
    }

    pub async fn set_draft_status_many(
        &self,
        ctx: &RequestContext,
        slot_ids: &[SlotId],
        target: DraftStatus,
    ) -> Result<BatchOperationResult<Slot>, BatchError> {
        let span = request_span("set_draft_status_many", ctx, slot_ids);
        async {
            self.admit(ctx, slot_ids).await?;
            Ok::<_, BatchError>(self.occupancy.set_draft_status(slot_ids, target).await)
        }
        .instrument(span)
        .await
    }

    #[instrument(skip(self, ctx, slot_ids), target = "batch")]
    async fn admit(&self, ctx: &RequestContext, slot_ids: &[SlotId]) -> Result<(), BatchError> {
        if ctx.actor.trim().is_empty() {
            return Err(self.reject(BatchError::Unauthenticated));
        }

        validate_ids(slot_ids, self.max_batch_size).map_err(|e| self.reject(e))?;

        if let Err(e) = self.store.ping().await {
            return Err(self.reject(BatchError::StoreUnavailable(format!("{e:#}"))));
        }

        Counters::bump(&self.counters.batches_accepted);
        info!(target: "batch", slot_count = slot_ids.len(), "request admitted");
        Ok(())
    }

    fn reject(&self, err: BatchError) -> BatchError {
        Counters::bump(&self.counters.batches_rejected);
        warn!(target: "batch", error = %err, "request rejected");
        err
    }
}

fn request_span(name: &'static str, ctx: &RequestContext, slot_ids: &[SlotId]) -> Span {
    let span = root_span(name, &ctx.trace_id);
    span.record("actor", field::display(&ctx.actor));
    span.record("slot_count", slot_ids.len());
    span
}

/// Out-of-range IDs are allowed here; they fail per slot as `NOT_FOUND`.
fn validate_ids(slot_ids: &[SlotId], max_batch_size: usize) -> Result<(), BatchError> {
    if slot_ids.len() > max_batch_size {
        return Err(BatchError::InvalidRequest(format!(
            "{} slot ids exceed the limit of {max_batch_size}",
            slot_ids.len()
        )));
    }

    let mut seen = HashSet::with_capacity(slot_ids.len());
    for id in slot_ids {
        if !seen.insert(*id) {
            return Err(BatchError::InvalidRequest(format!("duplicate slot id {id}")));
        }
    }

    Ok(())
}
