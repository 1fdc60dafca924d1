//! Candidate scoring
//!
//! The score is a sum of independent integer terms; lower is better. The cap
//! and gap pressure terms are orders of magnitude larger than the soft
//! preferences so that they dominate whenever a relaxed pool lets an
//! over-limit candidate through.

use serde::Serialize;

use super::context::{GenerationContext, Slot};
use crate::models::EventFamily;

/// Individual terms of one candidate's score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub fatigue: i64,
    pub fairness: i64,
    pub total_cap: i64,
    pub primary_cap: i64,
    pub leader_cap: i64,
    pub cross_type: i64,
    pub consecutive_primary: i64,
    pub specialist: i64,
    pub priority: i64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> i64 {
        self.fatigue
            + self.fairness
            + self.total_cap
            + self.primary_cap
            + self.leader_cap
            + self.cross_type
            + self.consecutive_primary
            + self.specialist
            + self.priority
    }
}

/// Penalty for having worked shortly before `slot`
pub fn fatigue_penalty(ctx: &GenerationContext<'_>, person: &str, slot: &Slot) -> i64 {
    let weights = &ctx.policy.weights;
    let Some(last) = ctx.history.last_worked_on_or_before(person, slot.date) else {
        return 0;
    };

    let days_since = (slot.date - last).num_days();
    if days_since < weights.recent_window_days {
        weights.fatigue_recent
    } else if days_since == 7 {
        weights.fatigue_weekly
    } else if days_since < weights.near_window_days {
        weights.fatigue_near
    } else {
        0
    }
}

/// Units by which `count` has reached or passed `cap`
fn cap_pressure(count: u32, cap: u32) -> i64 {
    (i64::from(count) - (i64::from(cap) - 1)).max(0)
}

pub fn breakdown(ctx: &GenerationContext<'_>, person: &str, slot: &Slot) -> ScoreBreakdown {
    let weights = &ctx.policy.weights;
    let tally = ctx.tally(person);
    let total_cap = ctx.effective_total_cap(person);
    let primary_slot = slot.family == EventFamily::Primary;

    let mut score = ScoreBreakdown {
        fatigue: fatigue_penalty(ctx, person, slot),
        fairness: i64::from(ctx.history.stats(person).total) * weights.fairness_per_assignment,
        total_cap: cap_pressure(tally.total, total_cap) * weights.total_cap_pressure,
        ..ScoreBreakdown::default()
    };

    if primary_slot {
        score.primary_cap =
            cap_pressure(tally.primary, ctx.primary_cap(person)) * weights.primary_cap_pressure;
        if ctx.violates_gap(person, slot.date) {
            score.consecutive_primary = weights.consecutive_primary;
        }

        let mut primary_roles = ctx
            .roster
            .person(person)
            .into_iter()
            .flat_map(|p| p.primary_roles());
        if let (Some(only), None) = (primary_roles.next(), primary_roles.next()) {
            if *only == slot.role {
                score.specialist = -weights.specialist_bonus;
            }
        }
    }

    if slot.is_leader() {
        score.leader_cap =
            cap_pressure(tally.leader, ctx.leader_cap(person)) * weights.leader_cap_pressure;
        score.cross_type = i64::from(tally.primary) * weights.cross_type_bias;
    }

    if ctx.roster.in_priority_pool(person) && tally.total < total_cap {
        score.priority = -weights.priority_bonus;
    }

    score
}

pub fn score(ctx: &GenerationContext<'_>, person: &str, slot: &Slot) -> i64 {
    breakdown(ctx, person, slot).total()
}
