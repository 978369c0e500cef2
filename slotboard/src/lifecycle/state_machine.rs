//! Slot transition rules.
//
//  Pure: no async, no IO. `now` is passed in, so reservation expiry is
//  evaluated at decision time and never stored.

use chrono::{DateTime, Utc};

use crate::error::SlotError;
use crate::slot::model::{DraftStatus, LifecycleState, ProductId, Slot, SlotStatus};

/// A requested change to one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    AssignProduct {
        product_id: ProductId,
        actor: String,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    },
    Clear,
    EnableMaintenance,
    DisableMaintenance,
    Reserve {
        by: String,
        until: DateTime<Utc>,
    },
    CancelReservation,
    SetDraftStatus(DraftStatus),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::AssignProduct { .. } => "assign_product",
            Action::Clear => "clear",
            Action::EnableMaintenance => "enable_maintenance",
            Action::DisableMaintenance => "disable_maintenance",
            Action::Reserve { .. } => "reserve",
            Action::CancelReservation => "cancel_reservation",
            Action::SetDraftStatus(_) => "set_draft_status",
        }
    }
}

/// Validate `action` against `current` and return the next snapshot.
///
/// Returning a snapshot equal to `current` means the action is a legal no-op.
/// `id` and `view_count` are never touched.
pub fn transition(current: &Slot, action: &Action, now: DateTime<Utc>) -> Result<Slot, SlotError> {
    let state = current.lifecycle_state(now);
    let mut next = current.clone();

    match action {
        Action::AssignProduct {
            product_id,
            actor,
            start_time,
            end_time,
        } => {
            if state == LifecycleState::Maintenance {
                return Err(SlotError::invalid_transition(format!(
                    "slot {} is under maintenance",
                    current.id
                )));
            }
            if current.product_id.is_some() {
                return Err(SlotError::already_occupied(current.id));
            }
            match current.active_reservation(now) {
                Some(holder) if holder != actor => {
                    return Err(reserved_by_other(current, holder));
                }
                _ => {}
            }
            if let (Some(start), Some(end)) = (start_time, end_time) {
                if end <= start {
                    return Err(SlotError::invalid_transition(
                        "listing end time must be after start time",
                    ));
                }
            }

            next.status = SlotStatus::Live;
            next.product_id = Some(product_id.clone());
            next.is_active = true;
            next.start_time = *start_time;
            next.end_time = *end_time;
            // The draft has been published and the actor's hold has served its purpose.
            next.draft_status = DraftStatus::Empty;
            next.clear_reservation();
        }

        Action::Clear => match state {
            LifecycleState::Maintenance => {
                return Err(SlotError::invalid_transition(format!(
                    "slot {} is under maintenance; disable maintenance before clearing",
                    current.id
                )));
            }
            LifecycleState::Empty | LifecycleState::ReservedEmpty => {}
            LifecycleState::Live | LifecycleState::ReservedLive => {
                next.status = SlotStatus::Empty;
                next.product_id = None;
                next.is_active = false;
                next.start_time = None;
                next.end_time = None;
            }
        },

        Action::EnableMaintenance => match state {
            LifecycleState::Maintenance => {}
            LifecycleState::ReservedEmpty | LifecycleState::ReservedLive => {
                let holder = current.active_reservation(now).unwrap_or_default();
                return Err(reserved_by_other(current, holder));
            }
            LifecycleState::Empty | LifecycleState::Live => {
                next.status = SlotStatus::Maintenance;
                // An expired hold may still be stored; maintenance never coexists with one.
                next.clear_reservation();
            }
        },

        Action::DisableMaintenance => {
            if state == LifecycleState::Maintenance {
                next.status = current.implied_status();
            }
        }

        Action::Reserve { by, until } => {
            if by.trim().is_empty() {
                return Err(SlotError::invalid_transition("reservation holder must not be blank"));
            }
            if *until <= now {
                return Err(SlotError::invalid_transition(
                    "reservation end time must be in the future",
                ));
            }
            match state {
                LifecycleState::Maintenance => {
                    return Err(SlotError::invalid_transition(format!(
                        "slot {} is under maintenance",
                        current.id
                    )));
                }
                LifecycleState::ReservedEmpty | LifecycleState::ReservedLive => {
                    let holder = current.active_reservation(now).unwrap_or_default();
                    if holder != by {
                        return Err(reserved_by_other(current, holder));
                    }
                    // Same holder: refresh.
                    next.reservation_end_time = Some(*until);
                }
                LifecycleState::Empty | LifecycleState::Live => {
                    next.reserved_by = Some(by.clone());
                    next.reservation_end_time = Some(*until);
                }
            }
        }

        Action::CancelReservation => next.clear_reservation(),

        Action::SetDraftStatus(target) => {
            if !draft_move_allowed(current.draft_status, *target) {
                return Err(SlotError::invalid_transition(format!(
                    "draft status cannot move from {} to {}",
                    current.draft_status, target
                )));
            }
            next.draft_status = *target;
        }
    }

    Ok(next)
}

fn draft_move_allowed(from: DraftStatus, to: DraftStatus) -> bool {
    use DraftStatus::*;

    from == to
        || to == Empty
        || matches!(
            (from, to),
            (Empty, Drafting) | (Drafting, ReadyToPublish) | (ReadyToPublish, Drafting)
        )
}

fn reserved_by_other(slot: &Slot, holder: &str) -> SlotError {
    let until = slot
        .reservation_end_time
        .map(|t| t.to_rfc3339())
        .unwrap_or_default();
    SlotError::reservation_conflict(format!(
        "slot {} is reserved by {holder} until {until}",
        slot.id
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SlotErrorType;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap()
    }

    fn empty(id: i64) -> Slot {
        Slot::empty(id)
    }

    fn live(id: i64) -> Slot {
        Slot {
            status: SlotStatus::Live,
            product_id: Some(format!("prod-{id}")),
            is_active: true,
            ..Slot::empty(id)
        }
    }

    fn maintenance(id: i64) -> Slot {
        Slot {
            status: SlotStatus::Maintenance,
            ..Slot::empty(id)
        }
    }

    fn reserve(mut s: Slot, by: &str, until: DateTime<Utc>) -> Slot {
        s.reserved_by = Some(by.into());
        s.reservation_end_time = Some(until);
        s
    }

    fn assign(product: &str, actor: &str) -> Action {
        Action::AssignProduct {
            product_id: product.into(),
            actor: actor.into(),
            start_time: None,
            end_time: None,
        }
    }

    fn kind(r: Result<Slot, SlotError>) -> SlotErrorType {
        r.unwrap_err().kind
    }

    #[test]
    fn assign_moves_empty_to_live() {
        let next = transition(&empty(1), &assign("p-1", "admin"), now()).unwrap();
        assert_eq!(next.status, SlotStatus::Live);
        assert_eq!(next.product_id.as_deref(), Some("p-1"));
        assert!(next.is_active);
        assert!(next.check_invariants().is_ok());
    }

    #[test]
    fn assign_onto_live_is_already_occupied() {
        assert_eq!(
            kind(transition(&live(2), &assign("p-2", "admin"), now())),
            SlotErrorType::AlreadyOccupied
        );
    }

    #[test]
    fn assign_onto_maintenance_is_invalid() {
        assert_eq!(
            kind(transition(&maintenance(3), &assign("p", "admin"), now())),
            SlotErrorType::InvalidTransition
        );
    }

    #[test]
    fn assign_respects_foreign_reservation_and_consumes_own() {
        let held = reserve(empty(4), "admin-A", now() + Duration::hours(1));

        assert_eq!(
            kind(transition(&held, &assign("p", "admin-B"), now())),
            SlotErrorType::ReservationConflict
        );

        let next = transition(&held, &assign("p", "admin-A"), now()).unwrap();
        assert_eq!(next.reserved_by, None);
        assert_eq!(next.reservation_end_time, None);
    }

    #[test]
    fn assign_rejects_inverted_window() {
        let action = Action::AssignProduct {
            product_id: "p".into(),
            actor: "a".into(),
            start_time: Some(now() + Duration::hours(2)),
            end_time: Some(now() + Duration::hours(1)),
        };
        assert_eq!(
            kind(transition(&empty(5), &action, now())),
            SlotErrorType::InvalidTransition
        );
    }

    #[test]
    fn assign_resets_draft_status() {
        let mut s = empty(6);
        s.draft_status = DraftStatus::ReadyToPublish;
        let next = transition(&s, &assign("p", "a"), now()).unwrap();
        assert_eq!(next.draft_status, DraftStatus::Empty);
    }

    #[test]
    fn clear_live_becomes_empty() {
        let mut s = live(7);
        s.start_time = Some(now());
        let next = transition(&s, &Action::Clear, now()).unwrap();

        assert_eq!(next.status, SlotStatus::Empty);
        assert_eq!(next.product_id, None);
        assert!(!next.is_active);
        assert_eq!(next.start_time, None);
        assert!(next.check_invariants().is_ok());
    }

    #[test]
    fn clear_empty_is_noop() {
        let s = empty(8);
        assert_eq!(transition(&s, &Action::Clear, now()).unwrap(), s);
    }

    #[test]
    fn clear_keeps_reservation() {
        let s = reserve(live(9), "a", now() + Duration::hours(1));
        let next = transition(&s, &Action::Clear, now()).unwrap();
        assert_eq!(next.reserved_by.as_deref(), Some("a"));
    }

    #[test]
    fn clear_under_maintenance_is_invalid() {
        assert_eq!(
            kind(transition(&maintenance(10), &Action::Clear, now())),
            SlotErrorType::InvalidTransition
        );
    }

    #[test]
    fn enable_maintenance_from_empty_and_live() {
        for s in [empty(11), live(12)] {
            let next = transition(&s, &Action::EnableMaintenance, now()).unwrap();
            assert_eq!(next.status, SlotStatus::Maintenance);
            assert_eq!(next.product_id, s.product_id);
        }
    }

    #[test]
    fn enable_maintenance_blocked_by_active_reservation() {
        let s = reserve(live(13), "admin-A", now() + Duration::minutes(30));
        let err = transition(&s, &Action::EnableMaintenance, now()).unwrap_err();
        assert_eq!(err.kind, SlotErrorType::ReservationConflict);
        assert!(err.message.contains("admin-A"));
    }

    #[test]
    fn enable_maintenance_clears_expired_reservation() {
        let s = reserve(empty(14), "admin-A", now() - Duration::minutes(1));
        let next = transition(&s, &Action::EnableMaintenance, now()).unwrap();
        assert_eq!(next.status, SlotStatus::Maintenance);
        assert_eq!(next.reserved_by, None);
        assert!(next.check_invariants().is_ok());
    }

    #[test]
    fn enable_maintenance_is_idempotent() {
        let s = maintenance(15);
        assert_eq!(transition(&s, &Action::EnableMaintenance, now()).unwrap(), s);
    }

    #[test]
    fn disable_restores_status_implied_by_product() {
        let mut with_product = live(16);
        with_product.status = SlotStatus::Maintenance;
        let next = transition(&with_product, &Action::DisableMaintenance, now()).unwrap();
        assert_eq!(next.status, SlotStatus::Live);

        let next = transition(&maintenance(17), &Action::DisableMaintenance, now()).unwrap();
        assert_eq!(next.status, SlotStatus::Empty);
    }

    #[test]
    fn disable_outside_maintenance_is_noop() {
        let s = live(18);
        assert_eq!(transition(&s, &Action::DisableMaintenance, now()).unwrap(), s);
    }

    #[test]
    fn reserve_sets_fields() {
        let until = now() + Duration::hours(1);
        let next = transition(
            &empty(19),
            &Action::Reserve {
                by: "ops".into(),
                until,
            },
            now(),
        )
        .unwrap();
        assert_eq!(next.reserved_by.as_deref(), Some("ops"));
        assert_eq!(next.reservation_end_time, Some(until));
        assert_eq!(next.status, SlotStatus::Empty);
    }

    #[test]
    fn reserve_requires_future_end() {
        for until in [now(), now() - Duration::seconds(1)] {
            let r = transition(
                &empty(20),
                &Action::Reserve {
                    by: "ops".into(),
                    until,
                },
                now(),
            );
            assert_eq!(kind(r), SlotErrorType::InvalidTransition);
        }
    }

    #[test]
    fn reserve_conflicts_with_other_holder_and_refreshes_own() {
        let s = reserve(live(21), "admin-A", now() + Duration::minutes(10));
        let later = now() + Duration::hours(3);

        let r = transition(
            &s,
            &Action::Reserve {
                by: "admin-B".into(),
                until: later,
            },
            now(),
        );
        assert_eq!(kind(r), SlotErrorType::ReservationConflict);

        let next = transition(
            &s,
            &Action::Reserve {
                by: "admin-A".into(),
                until: later,
            },
            now(),
        )
        .unwrap();
        assert_eq!(next.reservation_end_time, Some(later));
        assert_eq!(next.reserved_by.as_deref(), Some("admin-A"));
    }

    #[test]
    fn reserve_over_expired_hold_succeeds_for_anyone() {
        let s = reserve(empty(22), "admin-A", now() - Duration::minutes(1));
        let next = transition(
            &s,
            &Action::Reserve {
                by: "admin-B".into(),
                until: now() + Duration::minutes(5),
            },
            now(),
        )
        .unwrap();
        assert_eq!(next.reserved_by.as_deref(), Some("admin-B"));
    }

    #[test]
    fn reserve_under_maintenance_is_invalid() {
        let r = transition(
            &maintenance(23),
            &Action::Reserve {
                by: "ops".into(),
                until: now() + Duration::minutes(5),
            },
            now(),
        );
        assert_eq!(kind(r), SlotErrorType::InvalidTransition);
    }

    #[test]
    fn cancel_clears_or_noops() {
        let s = reserve(empty(24), "a", now() + Duration::minutes(5));
        let next = transition(&s, &Action::CancelReservation, now()).unwrap();
        assert_eq!(next.reserved_by, None);
        assert_eq!(next.reservation_end_time, None);

        let plain = empty(25);
        assert_eq!(
            transition(&plain, &Action::CancelReservation, now()).unwrap(),
            plain
        );
    }

    #[test]
    fn draft_workflow_moves() {
        use DraftStatus::*;

        assert!(draft_move_allowed(Empty, Drafting));
        assert!(draft_move_allowed(Drafting, ReadyToPublish));
        assert!(draft_move_allowed(ReadyToPublish, Drafting));
        assert!(draft_move_allowed(ReadyToPublish, Empty));
        assert!(draft_move_allowed(Drafting, Drafting));
        assert!(!draft_move_allowed(Empty, ReadyToPublish));

        let err = transition(&empty(1), &Action::SetDraftStatus(ReadyToPublish), now())
            .unwrap_err();
        assert_eq!(err.kind, SlotErrorType::InvalidTransition);
        assert!(err.message.contains("empty to ready_to_publish"));
    }

    #[test]
    fn draft_status_is_independent_of_occupancy() {
        let s = maintenance(2);
        let next = transition(&s, &Action::SetDraftStatus(DraftStatus::Drafting), now()).unwrap();
        assert_eq!(next.status, SlotStatus::Maintenance);
        assert_eq!(next.draft_status, DraftStatus::Drafting);
    }
}
