use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::slot::model::SlotId;

/// Failure taxonomy recorded against a single slot inside a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotErrorType {
    NotFound,
    InvalidTransition,
    AlreadyOccupied,
    ReservationConflict,
    Unknown,
}

impl SlotErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotErrorType::NotFound => "NOT_FOUND",
            SlotErrorType::InvalidTransition => "INVALID_TRANSITION",
            SlotErrorType::AlreadyOccupied => "ALREADY_OCCUPIED",
            SlotErrorType::ReservationConflict => "RESERVATION_CONFLICT",
            SlotErrorType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for SlotErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A per-slot failure. Never escapes a batch call; it is folded into the result instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct SlotError {
    pub kind: SlotErrorType,
    pub message: String,
}

impl SlotError {
    pub fn new(kind: SlotErrorType, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(slot_id: SlotId) -> Self {
        Self::new(SlotErrorType::NotFound, format!("slot {slot_id} does not exist"))
    }

    pub fn invalid_transition(message: impl Into<String>) -> Self {
        Self::new(SlotErrorType::InvalidTransition, message)
    }

    pub fn already_occupied(slot_id: SlotId) -> Self {
        Self::new(
            SlotErrorType::AlreadyOccupied,
            format!("slot {slot_id} already holds a product"),
        )
    }

    pub fn reservation_conflict(message: impl Into<String>) -> Self {
        Self::new(SlotErrorType::ReservationConflict, message)
    }

    /// Wrap an unexpected storage/infrastructure error, keeping the whole chain.
    pub fn unknown(err: &anyhow::Error) -> Self {
        Self::new(SlotErrorType::Unknown, format!("{err:#}"))
    }
}

/// Request-level failures: not attributable to any one slot, so the whole call aborts.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("request is not authenticated")]
    Unauthenticated,

    #[error("slot store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
