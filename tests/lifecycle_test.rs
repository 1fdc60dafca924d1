//! Integration tests for the assignment lifecycle
//!
//! These tests exercise [`RosterService::apply_action`] and the hand-off
//! token flow over generated and hand-made events.

mod common;

use common::{config_with, date, seed_slot, service_with};
use rota::lifecycle::{Action, Actor, LifecycleError, RejectReason, TokenRejection};
use rota::models::{ActionKind, AssignmentRef, AssignmentStatus, EventKind, Occupant, Role};
use rota::notifications::NotificationKind;
use rota::scheduler::YearMonth;

const PEOPLE: [&str; 4] = ["Ana", "Ben", "Cleo", "Dev"];

// ============================================================================
// Decline and coverage
// ============================================================================

#[test]
fn test_decline_then_pick_up() {
    let service = service_with(config_with(&PEOPLE));
    let slot = seed_slot(&service, date(2026, 2, 8), Role::Camera1, "Ana");

    service
        .apply_action(slot, &Actor::person("Ana"), Action::Confirm)
        .unwrap();
    let declined = service
        .apply_action(slot, &Actor::person("Ana"), Action::Decline)
        .unwrap();
    assert_eq!(declined.assignment.status, AssignmentStatus::NeedsCoverage);
    assert_eq!(declined.notifications.len(), 1);
    assert_eq!(declined.notifications[0].kind, NotificationKind::CoverageNeeded);
    assert_eq!(declined.notifications[0].person, "Ana");

    let covered = service
        .apply_action(slot, &Actor::person("Ben"), Action::PickUp)
        .unwrap();
    assert_eq!(covered.assignment.status, AssignmentStatus::Confirmed);
    assert_eq!(covered.assignment.person, Occupant::person("Ana"));
    assert_eq!(covered.assignment.cover.as_deref(), Some("Ben"));
    assert_eq!(covered.notifications[0].kind, NotificationKind::ShiftCovered);
    assert_eq!(covered.notifications[0].actor, "Ben");

    let kinds: Vec<ActionKind> = covered.assignment.history.iter().map(|h| h.action).collect();
    assert_eq!(kinds, vec![ActionKind::Confirm, ActionKind::Decline, ActionKind::PickUp]);
}

#[test]
fn test_pick_up_requires_needs_coverage() {
    let service = service_with(config_with(&PEOPLE));
    let slot = seed_slot(&service, date(2026, 2, 8), Role::Camera1, "Ana");

    let err = service
        .apply_action(slot, &Actor::person("Ben"), Action::PickUp)
        .unwrap_err();
    assert_eq!(err.reject_reason(), Some(RejectReason::NotNeedingCoverage));

    service
        .apply_action(slot, &Actor::person("Ana"), Action::Decline)
        .unwrap();
    let err = service
        .apply_action(slot, &Actor::person("Ana"), Action::PickUp)
        .unwrap_err();
    assert_eq!(err.reject_reason(), Some(RejectReason::OwnSlot));
}

#[test]
fn test_decline_drops_previous_cover() {
    let service = service_with(config_with(&PEOPLE));
    let slot = seed_slot(&service, date(2026, 2, 8), Role::Camera1, "Ana");

    service
        .apply_action(slot, &Actor::person("Ana"), Action::Decline)
        .unwrap();
    service
        .apply_action(slot, &Actor::person("Ben"), Action::PickUp)
        .unwrap();
    let again = service
        .apply_action(slot, &Actor::manager("Mo"), Action::Decline)
        .unwrap();
    assert_eq!(again.assignment.status, AssignmentStatus::NeedsCoverage);
    assert!(again.assignment.cover.is_none());
}

// ============================================================================
// Hand-off tokens
// ============================================================================

#[test]
fn test_decline_token_redeems_exactly_once() {
    let service = service_with(config_with(&PEOPLE));
    let slot = seed_slot(&service, date(2026, 2, 15), Role::Camera2, "Ana");

    let outcome = service
        .apply_action(slot, &Actor::person("Ana"), Action::Decline)
        .unwrap();
    let token = outcome.token.expect("future decline issues a token");
    assert_eq!(token.token.len(), 32);
    assert!(!token.used);

    let redeemed = service
        .redeem_handoff_token(&token.token, &Actor::person("Cleo"))
        .unwrap();
    assert_eq!(redeemed.assignment.cover.as_deref(), Some("Cleo"));
    assert_eq!(redeemed.assignment.status, AssignmentStatus::Confirmed);
    assert_eq!(
        redeemed.assignment.history.last().map(|h| h.action),
        Some(ActionKind::Redeem)
    );

    let stored = service.repository().get_token(&token.token).unwrap().unwrap();
    assert!(stored.used);

    let err = service
        .redeem_handoff_token(&token.token, &Actor::person("Dev"))
        .unwrap_err();
    assert!(matches!(err, LifecycleError::TokenInvalid(TokenRejection::AlreadyUsed)));
}

#[test]
fn test_token_goes_stale_after_manual_pick_up() {
    let service = service_with(config_with(&PEOPLE));
    let slot = seed_slot(&service, date(2026, 2, 15), Role::Camera2, "Ana");

    let token = service
        .apply_action(slot, &Actor::person("Ana"), Action::Decline)
        .unwrap()
        .token
        .unwrap();
    service
        .apply_action(slot, &Actor::person("Ben"), Action::PickUp)
        .unwrap();

    let err = service
        .redeem_handoff_token(&token.token, &Actor::person("Cleo"))
        .unwrap_err();
    assert!(matches!(err, LifecycleError::TokenInvalid(TokenRejection::NoLongerNeeded)));

    let stored = service.repository().find_assignment(slot).unwrap().unwrap();
    assert_eq!(stored.cover.as_deref(), Some("Ben"));
}

// ============================================================================
// Volunteer and reassign
// ============================================================================

#[test]
fn test_volunteer_into_open_slot() {
    let service = service_with(config_with(&PEOPLE));
    service
        .create_event(date(2026, 2, 20), EventKind::Secondary, None, &[])
        .unwrap();
    let helper = AssignmentRef::new(date(2026, 2, 20), 1);

    let err = service
        .apply_action(helper, &Actor::manager("Mo"), Action::Volunteer)
        .unwrap_err();
    assert_eq!(err.reject_reason(), Some(RejectReason::ManagerCannotVolunteer));

    let outcome = service
        .apply_action(helper, &Actor::person("Dev"), Action::Volunteer)
        .unwrap();
    assert_eq!(outcome.assignment.role, Role::Helper);
    assert_eq!(outcome.assignment.person, Occupant::person("Dev"));
    assert_eq!(outcome.assignment.status, AssignmentStatus::Confirmed);

    let err = service
        .apply_action(helper, &Actor::person("Cleo"), Action::Volunteer)
        .unwrap_err();
    assert_eq!(err.reject_reason(), Some(RejectReason::SlotNotVacant));
}

#[test]
fn test_reassign_rules() {
    let service = service_with(config_with(&PEOPLE));
    let slot = seed_slot(&service, date(2026, 2, 8), Role::Computer, "Ana");

    let err = service
        .apply_action(
            slot,
            &Actor::person("Ben"),
            Action::Reassign {
                person: Occupant::person("Ben"),
            },
        )
        .unwrap_err();
    assert_eq!(err.reject_reason(), Some(RejectReason::ReassignNotPermitted));

    let err = service
        .apply_action(
            slot,
            &Actor::manager("Mo"),
            Action::Reassign {
                person: Occupant::person("Zed"),
            },
        )
        .unwrap_err();
    assert_eq!(err.reject_reason(), Some(RejectReason::UnknownPerson));

    let outcome = service
        .apply_action(
            slot,
            &Actor::manager("Mo"),
            Action::Reassign {
                person: Occupant::Unfilled,
            },
        )
        .unwrap();
    assert_eq!(outcome.assignment.person, Occupant::Unfilled);
    assert_eq!(outcome.assignment.status, AssignmentStatus::Pending);

    // a vacant slot can be taken by the person themself and is confirmed
    let outcome = service
        .apply_action(
            slot,
            &Actor::person("Ben"),
            Action::Reassign {
                person: Occupant::person("Ben"),
            },
        )
        .unwrap();
    assert_eq!(outcome.assignment.person, Occupant::person("Ben"));
    assert_eq!(outcome.assignment.status, AssignmentStatus::Confirmed);
}

// ============================================================================
// Swap
// ============================================================================

#[test]
fn test_swap_exchanges_people() {
    let service = service_with(config_with(&PEOPLE));
    let mine = seed_slot(&service, date(2026, 2, 8), Role::Camera1, "Ana");
    let theirs = seed_slot(&service, date(2026, 2, 15), Role::Camera2, "Ben");

    let outcome = service
        .apply_action(theirs, &Actor::person("Ana"), Action::Swap { offer: mine })
        .unwrap();
    let counterpart = outcome.counterpart.unwrap();

    assert_eq!(outcome.assignment.person, Occupant::person("Ana"));
    assert_eq!(outcome.assignment.swapped_with.as_deref(), Some("Ana"));
    assert_eq!(counterpart.person, Occupant::person("Ben"));
    assert_eq!(counterpart.swapped_with.as_deref(), Some("Ben"));
    for side in [&outcome.assignment, &counterpart] {
        assert_eq!(side.status, AssignmentStatus::Confirmed);
        assert!(side.cover.is_none());
    }
}

#[test]
fn test_swap_preconditions() {
    let service = service_with(config_with(&PEOPLE));
    let mine = seed_slot(&service, date(2026, 2, 8), Role::Camera1, "Ana");
    let theirs = seed_slot(&service, date(2026, 2, 15), Role::Camera2, "Ben");
    let past = seed_slot(&service, date(2026, 1, 25), Role::Camera1, "Ana");

    let err = service
        .apply_action(theirs, &Actor::person("Cleo"), Action::Swap { offer: mine })
        .unwrap_err();
    assert_eq!(err.reject_reason(), Some(RejectReason::OfferNotOwned));

    let err = service
        .apply_action(theirs, &Actor::person("Ana"), Action::Swap { offer: past })
        .unwrap_err();
    assert_eq!(err.reject_reason(), Some(RejectReason::OfferInPast));

    service
        .apply_action(mine, &Actor::person("Ana"), Action::Decline)
        .unwrap();
    let err = service
        .apply_action(theirs, &Actor::person("Ana"), Action::Swap { offer: mine })
        .unwrap_err();
    assert_eq!(err.reject_reason(), Some(RejectReason::OfferNotSwappable));

    // nothing changed on the target side
    let stored = service.repository().find_assignment(theirs).unwrap().unwrap();
    assert_eq!(stored.person, Occupant::person("Ben"));
    assert!(stored.history.is_empty());
}

// ============================================================================
// Undo
// ============================================================================

#[test]
fn test_undo_walks_back_one_step_at_a_time() {
    let service = service_with(config_with(&PEOPLE));
    let slot = seed_slot(&service, date(2026, 2, 8), Role::Camera1, "Ana");
    let original = service.repository().find_assignment(slot).unwrap().unwrap();

    service
        .apply_action(slot, &Actor::person("Ana"), Action::Confirm)
        .unwrap();
    service
        .apply_action(slot, &Actor::person("Ana"), Action::Decline)
        .unwrap();
    service
        .apply_action(slot, &Actor::person("Ben"), Action::PickUp)
        .unwrap();

    // the cover can take back their own pick-up
    let undone = service
        .apply_action(slot, &Actor::person("Ben"), Action::Undo)
        .unwrap();
    assert_eq!(undone.assignment.status, AssignmentStatus::NeedsCoverage);
    assert!(undone.assignment.cover.is_none());

    let err = service
        .apply_action(slot, &Actor::person("Cleo"), Action::Undo)
        .unwrap_err();
    assert_eq!(err.reject_reason(), Some(RejectReason::NotOwner));

    service
        .apply_action(slot, &Actor::person("Ana"), Action::Undo)
        .unwrap();
    let back = service
        .apply_action(slot, &Actor::person("Ana"), Action::Undo)
        .unwrap();
    assert_eq!(back.assignment.status, original.status);
    assert_eq!(back.assignment.person, original.person);
    assert!(back.assignment.history.is_empty());

    let err = service
        .apply_action(slot, &Actor::person("Ana"), Action::Undo)
        .unwrap_err();
    assert_eq!(err.reject_reason(), Some(RejectReason::NothingToUndo));
}

#[test]
fn test_undo_reverts_each_side_of_a_swap() {
    let service = service_with(config_with(&PEOPLE));
    let mine = seed_slot(&service, date(2026, 2, 8), Role::Camera1, "Ana");
    let theirs = seed_slot(&service, date(2026, 2, 15), Role::Camera2, "Ben");
    service
        .apply_action(mine, &Actor::person("Ana"), Action::Confirm)
        .unwrap();

    let before_mine = service.repository().find_assignment(mine).unwrap().unwrap();
    let before_theirs = service.repository().find_assignment(theirs).unwrap().unwrap();

    service
        .apply_action(theirs, &Actor::person("Ana"), Action::Swap { offer: mine })
        .unwrap();

    // Ana now holds the target and records the swap on both sides
    let undone = service
        .apply_action(theirs, &Actor::person("Ana"), Action::Undo)
        .unwrap();
    assert_eq!(undone.assignment.snapshot(), before_theirs.snapshot());
    assert_eq!(undone.assignment.history.len(), before_theirs.history.len());

    let still_swapped = service.repository().find_assignment(mine).unwrap().unwrap();
    assert_eq!(still_swapped.person, Occupant::person("Ben"));
    assert_eq!(still_swapped.swapped_with.as_deref(), Some("Ben"));

    let undone = service
        .apply_action(mine, &Actor::person("Ana"), Action::Undo)
        .unwrap();
    assert_eq!(undone.assignment.snapshot(), before_mine.snapshot());
    assert_eq!(undone.assignment.history.len(), before_mine.history.len());
}

#[test]
fn test_undo_reverts_a_redeemed_token() {
    let service = service_with(config_with(&PEOPLE));
    let slot = seed_slot(&service, date(2026, 2, 15), Role::Camera2, "Ana");

    let token = service
        .apply_action(slot, &Actor::person("Ana"), Action::Decline)
        .unwrap()
        .token
        .unwrap();
    let declined = service.repository().find_assignment(slot).unwrap().unwrap();

    service
        .redeem_handoff_token(&token.token, &Actor::person("Cleo"))
        .unwrap();

    let undone = service
        .apply_action(slot, &Actor::person("Cleo"), Action::Undo)
        .unwrap();
    assert_eq!(undone.assignment.snapshot(), declined.snapshot());
    assert_eq!(undone.assignment.status, AssignmentStatus::NeedsCoverage);
    assert!(undone.assignment.cover.is_none());

    // the token stays spent
    let err = service
        .redeem_handoff_token(&token.token, &Actor::person("Dev"))
        .unwrap_err();
    assert!(matches!(err, LifecycleError::TokenInvalid(TokenRejection::AlreadyUsed)));
}

// ============================================================================
// Month maintenance
// ============================================================================

#[test]
fn test_bulk_confirm_and_wipe_generated_month() {
    let service = service_with(config_with(&["Ana", "Ben", "Cleo", "Dev", "Eli", "Fay"]));
    let month = YearMonth::new(2026, 2).unwrap();
    service.generate_month(month).unwrap();

    let pending = service
        .events_in_month(month)
        .unwrap()
        .iter()
        .flat_map(|e| e.assignments.iter())
        .filter(|a| a.status == AssignmentStatus::Pending)
        .count();
    assert!(pending > 0);

    assert_eq!(service.bulk_confirm(month, &Actor::manager("Mo")).unwrap(), pending);
    assert!(service
        .events_in_month(month)
        .unwrap()
        .iter()
        .flat_map(|e| e.assignments.iter())
        .all(|a| a.status == AssignmentStatus::Confirmed));

    let err = service.wipe_month(month, &Actor::person("Ana")).unwrap_err();
    assert_eq!(err.reject_reason(), Some(RejectReason::ManagerOnly));
    assert_eq!(service.wipe_month(month, &Actor::manager("Mo")).unwrap(), 8);
    assert!(service.events_in_month(month).unwrap().is_empty());
}
