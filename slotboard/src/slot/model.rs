use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type SlotId = i64;
pub type ProductId = String;

/// Size of the fixed slot pool. IDs are exactly `1..=SLOT_COUNT`.
pub const SLOT_COUNT: SlotId = 25;

pub fn is_valid_slot_id(id: SlotId) -> bool {
    (1..=SLOT_COUNT).contains(&id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Empty,
    Live,
    Maintenance,
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SlotStatus::Empty => "empty",
            SlotStatus::Live => "live",
            SlotStatus::Maintenance => "maintenance",
        };
        f.write_str(s)
    }
}

impl FromStr for SlotStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "empty" => Ok(SlotStatus::Empty),
            "live" => Ok(SlotStatus::Live),
            "maintenance" => Ok(SlotStatus::Maintenance),
            other => Err(anyhow::anyhow!("Invalid SlotStatus value: {}", other)),
        }
    }
}

/// Publication workflow for the product destined for a slot. Independent of `SlotStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    Empty,
    Drafting,
    ReadyToPublish,
}

impl fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DraftStatus::Empty => "empty",
            DraftStatus::Drafting => "drafting",
            DraftStatus::ReadyToPublish => "ready_to_publish",
        };
        f.write_str(s)
    }
}

impl FromStr for DraftStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "empty" => Ok(DraftStatus::Empty),
            "drafting" => Ok(DraftStatus::Drafting),
            "ready_to_publish" => Ok(DraftStatus::ReadyToPublish),
            other => Err(anyhow::anyhow!("Invalid DraftStatus value: {}", other)),
        }
    }
}

/// Status combined with the reservation bit, as seen at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Empty,
    ReservedEmpty,
    Live,
    ReservedLive,
    Maintenance,
}

/// One display slot row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,

    // Occupancy
    pub status: SlotStatus,
    pub draft_status: DraftStatus,
    pub product_id: Option<ProductId>,
    pub is_active: bool,

    // Reservation (advisory hold)
    pub reserved_by: Option<String>,
    pub reservation_end_time: Option<DateTime<Utc>>,

    // Listing window
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,

    /// Owned by the analytics collaborator; never written here.
    pub view_count: i64,
}

impl Slot {
    /// The seeded, never-touched state of slot `id`.
    pub fn empty(id: SlotId) -> Self {
        Self {
            id,
            status: SlotStatus::Empty,
            draft_status: DraftStatus::Empty,
            product_id: None,
            is_active: false,
            reserved_by: None,
            reservation_end_time: None,
            start_time: None,
            end_time: None,
            view_count: 0,
        }
    }

    /// Holder of a reservation that has not yet expired at `now`.
    ///
    /// Expiry is lazy: a reservation whose end time has passed counts as absent
    /// even while its fields are still stored.
    pub fn active_reservation(&self, now: DateTime<Utc>) -> Option<&str> {
        match (&self.reserved_by, self.reservation_end_time) {
            (Some(holder), Some(until)) if now <= until => Some(holder.as_str()),
            _ => None,
        }
    }

    pub fn is_reserved(&self, now: DateTime<Utc>) -> bool {
        self.active_reservation(now).is_some()
    }

    /// Reservation fields are present but no longer active.
    pub fn has_stale_reservation(&self, now: DateTime<Utc>) -> bool {
        (self.reserved_by.is_some() || self.reservation_end_time.is_some())
            && !self.is_reserved(now)
    }

    pub fn lifecycle_state(&self, now: DateTime<Utc>) -> LifecycleState {
        let reserved = self.is_reserved(now);
        match (self.status, reserved) {
            (SlotStatus::Maintenance, _) => LifecycleState::Maintenance,
            (SlotStatus::Empty, false) => LifecycleState::Empty,
            (SlotStatus::Empty, true) => LifecycleState::ReservedEmpty,
            (SlotStatus::Live, false) => LifecycleState::Live,
            (SlotStatus::Live, true) => LifecycleState::ReservedLive,
        }
    }

    /// Copy of the row as callers should see it at `now`: expired reservations are masked.
    pub fn with_lazy_expiry(mut self, now: DateTime<Utc>) -> Self {
        if self.has_stale_reservation(now) {
            self.reserved_by = None;
            self.reservation_end_time = None;
        }
        self
    }

    /// The status `disable maintenance` restores: whichever `product_id` implies.
    pub fn implied_status(&self) -> SlotStatus {
        if self.product_id.is_some() {
            SlotStatus::Live
        } else {
            SlotStatus::Empty
        }
    }

    pub fn clear_reservation(&mut self) {
        self.reserved_by = None;
        self.reservation_end_time = None;
    }

    /// Check the row-level invariants that do not depend on time.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if !is_valid_slot_id(self.id) {
            return Err(InvariantViolation::OutOfRange(self.id));
        }
        if (self.status == SlotStatus::Live) != self.product_id.is_some()
            && self.status != SlotStatus::Maintenance
        {
            return Err(InvariantViolation::StatusProductMismatch(self.id, self.status));
        }
        if self.reserved_by.is_some() != self.reservation_end_time.is_some() {
            return Err(InvariantViolation::HalfReservation(self.id));
        }
        if self.status == SlotStatus::Maintenance && self.reserved_by.is_some() {
            return Err(InvariantViolation::ReservedInMaintenance(self.id));
        }
        Ok(())
    }
}

/// A slot snapshot that no legal sequence of transitions can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("slot id {0} outside the fixed pool 1..=25")]
    OutOfRange(SlotId),

    #[error("slot {0}: status {1} inconsistent with product assignment")]
    StatusProductMismatch(SlotId, SlotStatus),

    #[error("slot {0}: reserved_by and reservation_end_time must be set together")]
    HalfReservation(SlotId),

    #[error("slot {0}: reserved while under maintenance")]
    ReservedInMaintenance(SlotId),
}

/// Partial update for one slot row. `None` leaves a column untouched;
/// `Some(None)` on a nullable column clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotPatch {
    pub status: Option<SlotStatus>,
    pub draft_status: Option<DraftStatus>,
    pub product_id: Option<Option<ProductId>>,
    pub is_active: Option<bool>,
    pub reserved_by: Option<Option<String>>,
    pub reservation_end_time: Option<Option<DateTime<Utc>>>,
    pub start_time: Option<Option<DateTime<Utc>>>,
    pub end_time: Option<Option<DateTime<Utc>>>,
}

impl SlotPatch {
    /// The minimal patch that turns `before` into `after`.
    pub fn between(before: &Slot, after: &Slot) -> Self {
        fn diff<T: PartialEq + Clone>(a: &T, b: &T) -> Option<T> {
            (a != b).then(|| b.clone())
        }

        Self {
            status: diff(&before.status, &after.status),
            draft_status: diff(&before.draft_status, &after.draft_status),
            product_id: diff(&before.product_id, &after.product_id),
            is_active: diff(&before.is_active, &after.is_active),
            reserved_by: diff(&before.reserved_by, &after.reserved_by),
            reservation_end_time: diff(&before.reservation_end_time, &after.reservation_end_time),
            start_time: diff(&before.start_time, &after.start_time),
            end_time: diff(&before.end_time, &after.end_time),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, slot: &mut Slot) {
        if let Some(v) = self.status {
            slot.status = v;
        }
        if let Some(v) = self.draft_status {
            slot.draft_status = v;
        }
        if let Some(v) = &self.product_id {
            slot.product_id = v.clone();
        }
        if let Some(v) = self.is_active {
            slot.is_active = v;
        }
        if let Some(v) = &self.reserved_by {
            slot.reserved_by = v.clone();
        }
        if let Some(v) = self.reservation_end_time {
            slot.reservation_end_time = v;
        }
        if let Some(v) = self.start_time {
            slot.start_time = v;
        }
        if let Some(v) = self.end_time {
            slot.end_time = v;
        }
    }
}
