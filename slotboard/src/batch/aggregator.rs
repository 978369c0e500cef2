//! Folds per-slot outcomes into a `BatchOperationResult`. Pure; no IO.

use crate::batch::types::{
    BatchClassification, BatchOperationResult, SlotFailure, SlotOutcome, SlotResult,
};
use crate::error::SlotError;
use crate::slot::model::SlotId;

/// Build the batch result from outcomes already in input order.
pub fn aggregate<T>(outcomes: Vec<(SlotId, Result<T, SlotError>)>) -> BatchOperationResult<T> {
    let mut results = Vec::with_capacity(outcomes.len());
    let mut errors = Vec::new();
    let mut success_count = 0;

    for (slot_id, outcome) in outcomes {
        let outcome = match outcome {
            Ok(data) => {
                success_count += 1;
                SlotOutcome::Success { data }
            }
            Err(e) => {
                errors.push(SlotFailure {
                    slot_id,
                    error: e.kind,
                    message: e.message.clone(),
                });
                SlotOutcome::Failure {
                    error: e.kind,
                    message: e.message,
                }
            }
        };
        results.push(SlotResult { slot_id, outcome });
    }

    let failure_count = errors.len();

    BatchOperationResult {
        overall_success: failure_count == 0,
        success_count,
        failure_count,
        results,
        errors,
    }
}

/// An empty batch is a complete success.
pub fn classify(success_count: usize, failure_count: usize) -> BatchClassification {
    match (success_count, failure_count) {
        (_, 0) => BatchClassification::CompleteSuccess,
        (0, _) => BatchClassification::CompleteFailure,
        _ => BatchClassification::PartialSuccess,
    }
}
