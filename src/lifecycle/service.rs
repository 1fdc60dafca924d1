//! Roster service facade
//!
//! The single entry point collaborators use: month generation, the unified
//! `apply_action`, hand-off tokens, event maintenance and unavailability.
//! Each lifecycle call is one read-modify-write against one or two
//! assignments, committed through the repository's versioned update. The
//! notifications it returns are produced after the commit and carry no
//! obligation: dropping them never undoes anything.

use std::sync::Arc;

use chrono::{Local, NaiveDate};

use super::handoff::token_for;
use super::machine;
use super::{
    Action, ActionOutcome, Actor, LifecycleError, LifecycleResult, RejectReason, TokenRejection,
};
use crate::config::Config;
use crate::metrics;
use crate::models::{
    ActionKind, Assignment, AssignmentRef, AssignmentStatus, Event, EventKind, HandoffToken,
    NewAssignment, NewEvent, NewUnavailability, Role, Unavailability,
};
use crate::notifications::Notification;
use crate::scheduler::{GenerationReport, RosterGenerator, SchedulerResult, YearMonth};
use crate::storage::{SharedRosterRepository, StorageError};

/// Source of "today" for date-dependent rules
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local calendar date
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock stuck on one date
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

pub struct RosterService {
    config: Arc<Config>,
    repo: SharedRosterRepository,
    clock: Arc<dyn Clock>,
}

impl RosterService {
    pub fn new(config: Arc<Config>, repo: SharedRosterRepository) -> Self {
        Self {
            config,
            repo,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn repository(&self) -> &SharedRosterRepository {
        &self.repo
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    // ------------------------------------------------------------------
    // Generation
    // ------------------------------------------------------------------

    pub fn generate_month(&self, month: YearMonth) -> SchedulerResult<GenerationReport> {
        RosterGenerator::new(&self.config, self.repo.as_ref()).generate(month)
    }

    pub fn events_in_month(&self, month: YearMonth) -> LifecycleResult<Vec<Event>> {
        Ok(self
            .repo
            .events_between(month.first_day(), month.last_day())?)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Apply one action to the slot at `reference`
    ///
    /// A rejected action leaves every record untouched.
    pub fn apply_action(
        &self,
        reference: AssignmentRef,
        actor: &Actor,
        action: Action,
    ) -> LifecycleResult<ActionOutcome> {
        let kind = action.kind();
        let result = self.apply(reference, actor, action);
        self.observe(kind, &reference.to_string(), actor, &result);
        result
    }

    fn apply(
        &self,
        reference: AssignmentRef,
        actor: &Actor,
        action: Action,
    ) -> LifecycleResult<ActionOutcome> {
        let (event, mut assignment) = self.load(reference)?;
        let today = self.today();
        let kind = action.kind();

        let transition = match action {
            Action::Confirm => machine::confirm(&mut assignment, actor),
            Action::Decline => machine::decline(&mut assignment, actor),
            Action::Volunteer => machine::volunteer(&mut assignment, actor),
            Action::PickUp => machine::pick_up(&mut assignment, actor),
            Action::Reassign { person } => {
                machine::reassign(&mut assignment, person, actor, &self.config.roster)
            }
            Action::Undo => machine::undo(&mut assignment, actor),
            Action::Swap { offer } => {
                let (offer_event, mut offered) = self.load(offer)?;
                machine::swap(
                    &mut assignment,
                    event.date,
                    &mut offered,
                    offer_event.date,
                    actor,
                    today,
                )
                .map_err(LifecycleError::Rejected)?;

                let mut saved = self.repo.update_assignments(&[assignment, offered])?;
                let counterpart = saved.pop();
                let target = saved.pop().ok_or_else(|| {
                    LifecycleError::NotFound(format!("assignment at {reference}"))
                })?;
                let mut outcome = ActionOutcome::new(target);
                outcome.counterpart = counterpart;
                return Ok(outcome);
            }
        };
        transition.map_err(LifecycleError::Rejected)?;

        // a future decline stores its token in the same write
        let token = (kind == ActionKind::Decline && event.date >= today)
            .then(|| token_for(&assignment));
        let saved = match &token {
            Some(token) => self.repo.save_with_token(&assignment, token)?,
            None => self.save(assignment)?,
        };
        let mut outcome = ActionOutcome::new(saved);

        match kind {
            ActionKind::Decline => {
                let mut notification =
                    Notification::coverage_needed(&event, &outcome.assignment, &actor.name);
                if let Some(token) = token {
                    notification = notification
                        .with_token(&token.token, self.config.notifications.pickup_url(&token.token));
                    outcome.token = Some(token);
                }
                outcome.notifications.push(notification);
            }
            ActionKind::PickUp => {
                outcome.notifications.push(Notification::shift_covered(
                    &event,
                    &outcome.assignment,
                    &actor.name,
                ));
            }
            _ => {}
        }

        Ok(outcome)
    }

    /// Issue a hand-off token for a slot that needs coverage
    pub fn issue_handoff_token(&self, reference: AssignmentRef) -> LifecycleResult<HandoffToken> {
        let (_, assignment) = self.load(reference)?;
        if assignment.status != AssignmentStatus::NeedsCoverage {
            return Err(LifecycleError::Rejected(RejectReason::NotNeedingCoverage));
        }

        let token = token_for(&assignment);
        self.repo.insert_token(&token)?;
        tracing::info!(%reference, assignment_id = assignment.id, "Hand-off token issued");
        Ok(token)
    }

    /// Redeem a hand-off token: same effect as a pick-up by `actor`
    ///
    /// Every failure is terminal and leaves both the token and the assignment
    /// unchanged.
    pub fn redeem_handoff_token(
        &self,
        token: &str,
        actor: &Actor,
    ) -> LifecycleResult<ActionOutcome> {
        let result = self.redeem(token, actor);
        self.observe(ActionKind::Redeem, "token", actor, &result);
        result
    }

    fn redeem(&self, token: &str, actor: &Actor) -> LifecycleResult<ActionOutcome> {
        let stored = self
            .repo
            .get_token(token)?
            .ok_or(LifecycleError::TokenInvalid(TokenRejection::Unknown))?;
        if stored.used {
            return Err(LifecycleError::TokenInvalid(TokenRejection::AlreadyUsed));
        }

        let mut assignment = self
            .repo
            .get_assignment(stored.assignment_id)?
            .ok_or_else(|| LifecycleError::NotFound(format!("assignment {}", stored.assignment_id)))?;

        machine::pick_up_as(&mut assignment, actor, ActionKind::Redeem).map_err(|reason| {
            LifecycleError::TokenInvalid(match reason {
                RejectReason::OwnSlot => TokenRejection::OwnSlot,
                _ => TokenRejection::NoLongerNeeded,
            })
        })?;

        let event = self.repo.get_event(assignment.event_id)?;
        let saved = self.repo.redeem_token(token, &assignment).map_err(|e| match e {
            StorageError::TokenUsed => LifecycleError::TokenInvalid(TokenRejection::AlreadyUsed),
            StorageError::TokenNotFound => LifecycleError::TokenInvalid(TokenRejection::Unknown),
            other => LifecycleError::Storage(other),
        })?;

        let mut outcome = ActionOutcome::new(saved);
        if let Some(event) = event {
            outcome.notifications.push(Notification::shift_covered(
                &event,
                &outcome.assignment,
                &actor.name,
            ));
        }
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Event maintenance
    // ------------------------------------------------------------------

    /// Create an event by hand; every slot starts open and pending
    ///
    /// `roles` is only used for custom events.
    pub fn create_event(
        &self,
        date: NaiveDate,
        kind: EventKind,
        title: Option<&str>,
        roles: &[Role],
    ) -> LifecycleResult<Event> {
        if self.repo.get_event_by_date(date)?.is_some() {
            return Err(LifecycleError::Rejected(RejectReason::DateTaken));
        }

        let roles = match kind {
            EventKind::Custom => roles.to_vec(),
            _ => kind.default_roles(),
        };
        let mut new_event = NewEvent::new(date, kind);
        if let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) {
            new_event = new_event.with_title(title);
        }
        for role in roles {
            new_event = new_event.with_assignment(NewAssignment::open(role));
        }

        let event = self.repo.insert_event(&new_event).map_err(|e| match e {
            StorageError::DuplicateDate(_) => LifecycleError::Rejected(RejectReason::DateTaken),
            other => LifecycleError::Storage(other),
        })?;
        tracing::info!(%date, %kind, slots = event.assignments.len(), "Event created");
        Ok(event)
    }

    /// Delete the event on `date` with its assignments and tokens
    pub fn delete_event(&self, date: NaiveDate) -> LifecycleResult<()> {
        let event = self.event_on(date)?;
        self.repo.delete_event(event.id)?;
        tracing::info!(%date, "Event deleted");
        Ok(())
    }

    pub fn set_title(&self, date: NaiveDate, title: Option<&str>) -> LifecycleResult<()> {
        let event = self.event_on(date)?;
        let title = title.map(str::trim).filter(|t| !t.is_empty());
        Ok(self.repo.set_event_title(event.id, title)?)
    }

    pub fn set_notes(&self, date: NaiveDate, notes: Option<&str>) -> LifecycleResult<()> {
        let event = self.event_on(date)?;
        let notes = notes.map(str::trim).filter(|t| !t.is_empty());
        Ok(self.repo.set_event_notes(event.id, notes)?)
    }

    /// Delete every event in `month`; returns how many were removed
    pub fn wipe_month(&self, month: YearMonth, actor: &Actor) -> LifecycleResult<usize> {
        if !actor.is_manager {
            return Err(LifecycleError::Rejected(RejectReason::ManagerOnly));
        }
        let removed = self
            .repo
            .delete_events_between(month.first_day(), month.last_day())?;
        tracing::warn!(%month, removed, actor = %actor, "Month wiped");
        Ok(removed)
    }

    /// Confirm every pending assignment in `month` in one commit
    pub fn bulk_confirm(&self, month: YearMonth, actor: &Actor) -> LifecycleResult<usize> {
        if !actor.is_manager {
            return Err(LifecycleError::Rejected(RejectReason::ManagerOnly));
        }

        let mut pending: Vec<Assignment> = self
            .events_in_month(month)?
            .into_iter()
            .flat_map(|e| e.assignments)
            .filter(|a| a.status == AssignmentStatus::Pending)
            .collect();
        for assignment in &mut pending {
            machine::confirm(assignment, actor).map_err(LifecycleError::Rejected)?;
        }

        let count = self.repo.update_assignments(&pending)?.len();
        tracing::info!(%month, count, "Pending assignments confirmed");
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Unavailability
    // ------------------------------------------------------------------

    pub fn add_unavailability(&self, period: NewUnavailability) -> LifecycleResult<Unavailability> {
        if !self.config.roster.is_member(&period.person) {
            return Err(LifecycleError::Rejected(RejectReason::UnknownPerson));
        }
        if period.start > period.end {
            return Err(LifecycleError::Rejected(RejectReason::InvalidPeriod));
        }
        let stored = self.repo.add_unavailability(&period)?;
        tracing::info!(
            person = %stored.person,
            start = %stored.start,
            end = %stored.end,
            pattern = ?stored.pattern.as_ref().map(ToString::to_string),
            "Unavailability added"
        );
        Ok(stored)
    }

    pub fn list_unavailability(&self, person: Option<&str>) -> LifecycleResult<Vec<Unavailability>> {
        Ok(self.repo.list_unavailability(person)?)
    }

    pub fn remove_unavailability(&self, id: i64) -> LifecycleResult<bool> {
        Ok(self.repo.remove_unavailability(id)?)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn event_on(&self, date: NaiveDate) -> LifecycleResult<Event> {
        self.repo
            .get_event_by_date(date)?
            .ok_or_else(|| LifecycleError::NotFound(format!("no event on {date}")))
    }

    fn load(&self, reference: AssignmentRef) -> LifecycleResult<(Event, Assignment)> {
        let event = self.event_on(reference.date)?;
        let assignment = event
            .assignments
            .iter()
            .find(|a| a.position == reference.position)
            .cloned()
            .ok_or_else(|| LifecycleError::NotFound(format!("no slot at {reference}")))?;
        Ok((event, assignment))
    }

    fn save(&self, assignment: Assignment) -> LifecycleResult<Assignment> {
        let id = assignment.id;
        self.repo
            .update_assignments(std::slice::from_ref(&assignment))?
            .pop()
            .ok_or_else(|| LifecycleError::NotFound(format!("assignment {id}")))
    }

    fn observe(
        &self,
        kind: ActionKind,
        slot: &str,
        actor: &Actor,
        result: &LifecycleResult<ActionOutcome>,
    ) {
        match result {
            Ok(outcome) => {
                metrics::record_action(kind, "applied");
                tracing::info!(
                    action = %kind,
                    slot,
                    actor = %actor,
                    status = %outcome.assignment.status,
                    "Action applied"
                );
            }
            Err(LifecycleError::Rejected(reason)) => {
                metrics::record_action(kind, "rejected");
                tracing::info!(action = %kind, slot, actor = %actor, reason = reason.as_str(), "Action rejected");
            }
            Err(LifecycleError::TokenInvalid(reason)) => {
                metrics::record_action(kind, "rejected");
                tracing::info!(action = %kind, actor = %actor, reason = %reason, "Token rejected");
            }
            Err(e) => {
                metrics::record_action(kind, "error");
                tracing::warn!(action = %kind, slot, actor = %actor, error = %e, "Action failed");
            }
        }
    }
}
