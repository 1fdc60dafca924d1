//! Transition rules
//!
//! Every function here checks its precondition first and returns a
//! [`RejectReason`] without touching the assignment when it fails. On success
//! the prior state is pushed onto the assignment's history before mutating,
//! except for [`undo`], which pops it.

use chrono::NaiveDate;

use super::{Actor, RejectReason};
use crate::config::RosterConfig;
use crate::models::{ActionKind, Assignment, AssignmentStatus, Occupant};

pub type TransitionResult = Result<(), RejectReason>;

fn is_owner(assignment: &Assignment, actor: &Actor) -> bool {
    actor.is_manager || assignment.person.is(&actor.name)
}

pub fn confirm(assignment: &mut Assignment, actor: &Actor) -> TransitionResult {
    if !is_owner(assignment, actor) {
        return Err(RejectReason::NotOwner);
    }
    assignment.push_history(ActionKind::Confirm, &actor.name);
    assignment.status = AssignmentStatus::Confirmed;
    Ok(())
}

/// Give the slot up; any previous cover is dropped
pub fn decline(assignment: &mut Assignment, actor: &Actor) -> TransitionResult {
    if !is_owner(assignment, actor) {
        return Err(RejectReason::NotOwner);
    }
    assignment.push_history(ActionKind::Decline, &actor.name);
    assignment.status = AssignmentStatus::NeedsCoverage;
    assignment.cover = None;
    Ok(())
}

/// Take a vacant slot
pub fn volunteer(assignment: &mut Assignment, actor: &Actor) -> TransitionResult {
    if actor.is_manager {
        return Err(RejectReason::ManagerCannotVolunteer);
    }
    if !assignment.person.is_vacant() {
        return Err(RejectReason::SlotNotVacant);
    }
    assignment.push_history(ActionKind::Volunteer, &actor.name);
    assignment.person = Occupant::person(&actor.name);
    assignment.status = AssignmentStatus::Confirmed;
    Ok(())
}

/// Precondition shared by pick-up and token redemption; not actor-gated
pub fn check_pick_up(assignment: &Assignment, actor: &Actor) -> TransitionResult {
    if assignment.status != AssignmentStatus::NeedsCoverage {
        return Err(RejectReason::NotNeedingCoverage);
    }
    if assignment.person.is(&actor.name) {
        return Err(RejectReason::OwnSlot);
    }
    Ok(())
}

/// Cover a slot that needs coverage
pub fn pick_up(assignment: &mut Assignment, actor: &Actor) -> TransitionResult {
    pick_up_as(assignment, actor, ActionKind::PickUp)
}

pub(crate) fn pick_up_as(
    assignment: &mut Assignment,
    actor: &Actor,
    kind: ActionKind,
) -> TransitionResult {
    check_pick_up(assignment, actor)?;
    assignment.push_history(kind, &actor.name);
    assignment.cover = Some(actor.name.clone());
    assignment.status = AssignmentStatus::Confirmed;
    Ok(())
}

/// Trade `offer` (held by the actor) for `target`
///
/// `offer_date` and `target_date` are the dates of the two events; `today`
/// bounds how old the offered slot may be.
pub fn swap(
    target: &mut Assignment,
    target_date: NaiveDate,
    offer: &mut Assignment,
    offer_date: NaiveDate,
    actor: &Actor,
    today: NaiveDate,
) -> TransitionResult {
    if !actor.is_manager && !offer.person.is(&actor.name) {
        return Err(RejectReason::OfferNotOwned);
    }
    if !matches!(
        offer.status,
        AssignmentStatus::Pending | AssignmentStatus::Confirmed
    ) {
        return Err(RejectReason::OfferNotSwappable);
    }
    if offer_date < today {
        return Err(RejectReason::OfferInPast);
    }
    if offer_date == target_date {
        return Err(RejectReason::SameDate);
    }
    let Some(target_person) = target.person.name() else {
        return Err(RejectReason::TargetVacant);
    };
    if offer.person.is(target_person) {
        return Err(RejectReason::AlreadyAssigned);
    }

    let offer_prior = offer.person.clone();
    let target_prior = target.person.clone();

    target.push_history(ActionKind::Swap, &actor.name);
    offer.push_history(ActionKind::Swap, &actor.name);

    target.person = offer_prior.clone();
    target.swapped_with = Some(offer_prior.to_string());
    offer.person = target_prior.clone();
    offer.swapped_with = Some(target_prior.to_string());

    for side in [&mut *target, &mut *offer] {
        side.status = AssignmentStatus::Confirmed;
        side.cover = None;
    }
    Ok(())
}

/// Replace the slot's occupant
///
/// Managers may put anyone on the roster or either sentinel; others may only
/// put themselves into a vacant slot.
pub fn reassign(
    assignment: &mut Assignment,
    person: Occupant,
    actor: &Actor,
    roster: &RosterConfig,
) -> TransitionResult {
    if let Some(name) = person.name() {
        if !roster.is_member(name) {
            return Err(RejectReason::UnknownPerson);
        }
    }
    if !actor.is_manager && !(assignment.person.is_vacant() && person.is(&actor.name)) {
        return Err(RejectReason::ReassignNotPermitted);
    }

    let was_vacant = assignment.person.is_vacant();
    assignment.push_history(ActionKind::Reassign, &actor.name);
    assignment.person = person;
    assignment.cover = None;
    assignment.swapped_with = None;
    assignment.status = if was_vacant {
        AssignmentStatus::Confirmed
    } else {
        AssignmentStatus::Pending
    };
    Ok(())
}

/// Restore the state before the most recent mutation
pub fn undo(assignment: &mut Assignment, actor: &Actor) -> TransitionResult {
    let Some(last) = assignment.history.last() else {
        return Err(RejectReason::NothingToUndo);
    };
    if !is_owner(assignment, actor) && last.actor != actor.name {
        return Err(RejectReason::NotOwner);
    }
    if let Some(entry) = assignment.history.pop() {
        assignment.restore(entry.prior);
    }
    Ok(())
}
