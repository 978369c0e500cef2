use serde::{Deserialize, Serialize};

use crate::error::SlotErrorType;
use crate::slot::model::SlotId;

/// Outcome of one slot inside a batch: a payload or a tagged failure, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum SlotOutcome<T> {
    Success { data: T },
    Failure { error: SlotErrorType, message: String },
}

impl<T> SlotOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, SlotOutcome::Success { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotResult<T> {
    pub slot_id: SlotId,
    pub outcome: SlotOutcome<T>,
}

/// Flattened failure record; the slot IDs here are what a caller retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotFailure {
    pub slot_id: SlotId,
    pub error: SlotErrorType,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchClassification {
    CompleteSuccess,
    PartialSuccess,
    CompleteFailure,
}

/// Result of one batch call.
///
/// `results` is in input order and has exactly one entry per input ID, so
/// `success_count + failure_count == results.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOperationResult<T> {
    pub overall_success: bool,
    pub success_count: usize,
    pub failure_count: usize,
    pub results: Vec<SlotResult<T>>,
    pub errors: Vec<SlotFailure>,
}

impl<T> BatchOperationResult<T> {
    pub fn total(&self) -> usize {
        self.success_count + self.failure_count
    }

    pub fn classification(&self) -> BatchClassification {
        crate::batch::aggregator::classify(self.success_count, self.failure_count)
    }

    pub fn failed_ids(&self) -> Vec<SlotId> {
        self.errors.iter().map(|e| e.slot_id).collect()
    }

    /// First outcome recorded for `slot_id`.
    pub fn get(&self, slot_id: SlotId) -> Option<&SlotOutcome<T>> {
        self.results
            .iter()
            .find(|r| r.slot_id == slot_id)
            .map(|r| &r.outcome)
    }
}
