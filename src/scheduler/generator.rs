//! Roster generation for one month
//!
//! Single-pass greedy fill. For each candidate date without an event, every
//! role slot is filled in order and committed into the per-run context before
//! the next slot is considered; the date's event is then persisted before the
//! engine moves on, so an interrupted run resumes cleanly.

use std::sync::{Mutex, PoisonError};

use chrono::NaiveDate;
use serde::Serialize;

use super::calendar::YearMonth;
use super::context::{GapRule, GenerationContext, Slot};
use super::error::{SchedulerError, SchedulerResult};
use super::rotation::{find_anchor, rotation_holder, Rotation};
use super::scoring;
use super::SelectionTier;
use crate::availability::AvailabilityOracle;
use crate::config::Config;
use crate::history::{History, MonthlyTallies};
use crate::metrics;
use crate::models::{EventKind, NewAssignment, NewEvent, Occupant, Role};
use crate::storage::{RosterRepository, StorageError};

/// Generation runs are serialized process-wide
static GENERATION_LOCK: Mutex<()> = Mutex::new(());

/// How one slot was filled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotOutcome {
    pub role: Role,
    pub occupant: Occupant,
    pub tier: SelectionTier,
}

/// One newly created event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateOutcome {
    pub date: NaiveDate,
    pub kind: EventKind,
    pub slots: Vec<SlotOutcome>,
}

/// Result of one generation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub month: YearMonth,
    pub created: Vec<DateOutcome>,
    /// Candidate dates that already had an event
    pub skipped: Vec<NaiveDate>,
}

impl GenerationReport {
    fn new(month: YearMonth) -> Self {
        Self {
            month,
            created: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Slots filled by exceeding a cap or left as the placeholder
    pub fn degraded_slots(&self) -> impl Iterator<Item = (NaiveDate, &SlotOutcome)> {
        self.created.iter().flat_map(|d| {
            d.slots
                .iter()
                .filter(|s| matches!(s.tier, SelectionTier::OverCap | SelectionTier::Placeholder))
                .map(move |s| (d.date, s))
        })
    }
}

/// Roster generation engine
pub struct RosterGenerator<'a> {
    config: &'a Config,
    repo: &'a dyn RosterRepository,
}

impl<'a> RosterGenerator<'a> {
    pub fn new(config: &'a Config, repo: &'a dyn RosterRepository) -> Self {
        Self { config, repo }
    }

    /// Generate every missing weekly event of `month`
    ///
    /// Dates that already carry an event are skipped untouched.
    pub fn generate(&self, month: YearMonth) -> SchedulerResult<GenerationReport> {
        let _guard = GENERATION_LOCK
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let _timer = metrics::start_generation_timer();

        let roster = &self.config.roster;
        let policy = &self.config.policy;
        if roster.people.is_empty() {
            return Err(SchedulerError::EmptyRoster);
        }

        let candidates = month.generation_dates(roster);
        tracing::info!(%month, dates = candidates.len(), "Generating roster");

        let all_events = self.repo.all_events()?;
        let month_events: Vec<_> = all_events
            .iter()
            .filter(|e| YearMonth::of(e.date) == month)
            .cloned()
            .collect();

        let oracle = AvailabilityOracle::load(roster, self.repo)?;
        let mut ctx = GenerationContext::new(
            roster,
            policy,
            &oracle,
            History::aggregate(&all_events, roster),
            MonthlyTallies::from_events(&month_events, roster),
        );

        let anchor = candidates
            .first()
            .and_then(|(first, _)| find_anchor(&all_events, *first, roster));
        let mut rotation = Rotation::resume_after(&roster.rotation_order, anchor);
        tracing::debug!(anchor = ?anchor, position = rotation.position(), "Rotation resumed");

        let mut report = GenerationReport::new(month);

        for (date, kind) in candidates {
            if let Some(existing) = month_events.iter().find(|e| e.date == date) {
                tracing::debug!(%date, "Event exists, skipping");
                if let Some(holder) = rotation_holder(existing, roster) {
                    rotation = Rotation::resume_after(&roster.rotation_order, Some(holder));
                    tracing::debug!(%date, holder, "Rotation re-anchored");
                }
                report.skipped.push(date);
                continue;
            }

            let (new_event, slots) = self.fill_date(&mut ctx, &mut rotation, date, kind);

            match self.repo.insert_event(&new_event) {
                Ok(event) => {
                    tracing::info!(
                        %date,
                        kind = %kind,
                        event_id = event.id,
                        assigned = ?slots.iter().map(|s| s.occupant.to_string()).collect::<Vec<_>>(),
                        "Event created"
                    );
                    report.created.push(DateOutcome { date, kind, slots });
                }
                Err(StorageError::DuplicateDate(_)) => {
                    tracing::warn!(%date, "Event appeared during generation, skipping");
                    report.skipped.push(date);
                }
                Err(e) => return Err(e.into()),
            }
        }

        metrics::record_generation_run(&report);
        tracing::info!(
            %month,
            created = report.created.len(),
            skipped = report.skipped.len(),
            degraded = report.degraded_slots().count(),
            "Roster generation complete"
        );
        Ok(report)
    }

    fn fill_date(
        &self,
        ctx: &mut GenerationContext<'_>,
        rotation: &mut Rotation<'_>,
        date: NaiveDate,
        kind: EventKind,
    ) -> (NewEvent, Vec<SlotOutcome>) {
        let mut event = NewEvent::new(date, kind);
        let mut outcomes = Vec::new();
        let mut assigned_today: Vec<String> = Vec::new();

        for role in kind.default_roles() {
            let slot = Slot::new(date, role);

            if role == Role::Helper {
                event = event.with_assignment(NewAssignment::open(role));
                outcomes.push(SlotOutcome {
                    role,
                    occupant: Occupant::Open,
                    tier: SelectionTier::LeftOpen,
                });
                continue;
            }

            let picked = if role == ctx.roster.rotation_role && !rotation.is_empty() {
                rotation
                    .select(ctx, &slot, &assigned_today)
                    .map(|(p, tier)| (p.to_string(), tier))
            } else {
                pick_best(ctx, &slot, &assigned_today)
            };

            let (occupant, tier) = match picked {
                Some((person, tier)) => {
                    ctx.commit(&person, &slot);
                    assigned_today.push(person.clone());
                    (Occupant::Person(person), tier)
                }
                None => (Occupant::Unfilled, SelectionTier::Placeholder),
            };

            tracing::debug!(%date, role = %role, occupant = %occupant, tier = ?tier, "Slot filled");
            metrics::record_slot(tier);

            event = event.with_assignment(NewAssignment::new(role, occupant.clone()));
            outcomes.push(SlotOutcome {
                role,
                occupant,
                tier,
            });
        }

        (event, outcomes)
    }
}

/// Choose the lowest-scoring candidate for `slot`
///
/// Pools, in order: under every cap; caps with the gap rule relaxed (primary
/// slots only); anyone capable and available. Ties keep roster order.
pub fn pick_best(
    ctx: &GenerationContext<'_>,
    slot: &Slot,
    assigned_today: &[String],
) -> Option<(String, SelectionTier)> {
    let valid: Vec<&str> = ctx
        .roster
        .candidates_for(slot.role)
        .into_iter()
        .filter(|p| ctx.is_available(p, slot.date))
        .filter(|p| !assigned_today.iter().any(|a| a == p))
        .collect();

    let filter = |gap: GapRule| -> Vec<&str> {
        valid
            .iter()
            .copied()
            .filter(|p| ctx.within_caps(p, slot, gap))
            .collect()
    };

    let mut tier = SelectionTier::Preferred;
    let mut pool = filter(GapRule::Enforce);

    if pool.is_empty() && slot.family == crate::models::EventFamily::Primary {
        tier = SelectionTier::GapRelaxed;
        pool = filter(GapRule::Relax);
    }
    if pool.is_empty() {
        tier = SelectionTier::OverCap;
        pool = valid.clone();
    }

    pool.into_iter()
        .min_by_key(|p| scoring::score(ctx, p, slot))
        .map(|p| (p.to_string(), tier))
}
