//! Fan-out of one per-slot operation over a list of slot IDs.
//!
//! Guarantees:
//! - every input ID yields exactly one outcome, in input order
//! - a failure, timeout or panic in one slot's operation is recorded against that
//!   slot only; the remaining IDs are still processed
//! - at most `max_concurrency` slot operations are in flight at once
//! - a slot operation that has started runs to completion even if the caller
//!   stops awaiting the batch
//!
//! This module NEVER:
//! - validates transitions (the operation closure does)
//! - rejects a whole request (the service layer does that before fan-out)

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::{FutureExt, StreamExt, stream};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, warn};

use common::logger::child_span;

use crate::batch::aggregator::aggregate;
use crate::batch::types::BatchOperationResult;
use crate::error::{SlotError, SlotErrorType};
use crate::metrics::counters::Counters;
use crate::slot::model::SlotId;

#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Upper bound on per-slot operations in flight for one batch.
    pub max_concurrency: usize,

    /// Budget for one slot's whole operation (guard read plus write).
    pub per_slot_timeout: Duration,

    /// Maximum number of IDs accepted in one request.
    pub max_batch_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            per_slot_timeout: Duration::from_secs(4),
            max_batch_size: 100,
        }
    }
}

#[derive(Clone)]
pub struct BatchExecutor {
    config: BatchConfig,
    counters: Counters,
}

impl BatchExecutor {
    pub fn new(config: BatchConfig, counters: Counters) -> Self {
        Self { config, counters }
    }

    /// Run `op` once per ID and aggregate the outcomes.
    ///
    /// IDs are processed independently; there is no cross-slot atomicity.
    /// Each dispatched unit runs as its own task, so dropping the returned
    /// future stops collecting results but never cancels a write already in
    /// flight.
    pub async fn execute<T, F, Fut>(
        &self,
        op_name: &'static str,
        slot_ids: &[SlotId],
        op: F,
    ) -> BatchOperationResult<T>
    where
        T: Send + 'static,
        F: Fn(SlotId) -> Fut,
        Fut: Future<Output = Result<T, SlotError>> + Send + 'static,
    {
        let op = &op;
        // `buffered` pulls from the map lazily, so at most `max_concurrency`
        // units are spawned at any time.
        let outcomes: Vec<(SlotId, Result<T, SlotError>)> =
            stream::iter(slot_ids.iter().copied())
                .map(|slot_id| {
                    let unit = match std::panic::catch_unwind(AssertUnwindSafe(|| op(slot_id))) {
                        Ok(fut) => Ok(self.spawn_one(op_name, slot_id, fut)),
                        Err(payload) => {
                            Err(panicked(&self.counters, op_name, slot_id, payload.as_ref()))
                        }
                    };
                    async move {
                        let res = match unit {
                            Ok(handle) => handle.await.unwrap_or_else(|e| {
                                error!(target: "batch", slot_id, op = op_name, error = %e, "slot task aborted");
                                Err(SlotError::new(
                                    SlotErrorType::Unknown,
                                    format!("operation aborted: {e}"),
                                ))
                            }),
                            Err(e) => Err(e),
                        };
                        (slot_id, res)
                    }
                })
                .buffered(self.config.max_concurrency.max(1))
                .collect()
                .await;

        let result = aggregate(outcomes);

        self.counters
            .slot_successes
            .fetch_add(result.success_count as u64, std::sync::atomic::Ordering::Relaxed);
        self.counters
            .slot_failures
            .fetch_add(result.failure_count as u64, std::sync::atomic::Ordering::Relaxed);

        info!(
            target: "batch",
            op = op_name,
            total = result.total(),
            success_count = result.success_count,
            failure_count = result.failure_count,
            "batch finished"
        );

        result
    }

    fn spawn_one<T, Fut>(
        &self,
        op_name: &'static str,
        slot_id: SlotId,
        fut: Fut,
    ) -> JoinHandle<Result<T, SlotError>>
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T, SlotError>> + Send + 'static,
    {
        let span = child_span(op_name);
        span.record("slot_id", slot_id);

        let budget = self.config.per_slot_timeout;
        let counters = self.counters.clone();

        tokio::spawn(
            async move {
                let guarded = AssertUnwindSafe(fut).catch_unwind();
                match tokio::time::timeout(budget, guarded).await {
                    Ok(Ok(Ok(v))) => Ok(v),
                    Ok(Ok(Err(e))) => {
                        debug!(target: "batch", slot_id, op = op_name, error = %e, "slot operation rejected");
                        Err(e)
                    }
                    Ok(Err(payload)) => Err(panicked(&counters, op_name, slot_id, payload.as_ref())),
                    Err(_) => {
                        Counters::bump(&counters.slot_timeouts);
                        warn!(
                            target: "batch",
                            slot_id,
                            op = op_name,
                            budget_ms = budget.as_millis() as u64,
                            "slot operation timed out"
                        );
                        Err(SlotError::new(
                            SlotErrorType::Unknown,
                            format!("operation timed out after {}ms", budget.as_millis()),
                        ))
                    }
                }
            }
            .instrument(span),
        )
    }
}

fn panicked(
    counters: &Counters,
    op_name: &'static str,
    slot_id: SlotId,
    payload: &(dyn Any + Send),
) -> SlotError {
    Counters::bump(&counters.slot_panics);
    let msg = panic_message(payload);
    error!(target: "batch", slot_id, op = op_name, panic = %msg, "slot operation panicked");
    SlotError::new(SlotErrorType::Unknown, format!("operation panicked: {msg}"))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
