//! Round-robin rotation for the distinguished primary-type role
//!
//! The rotation role is not scored. Instead the engine resumes the configured
//! order right after whoever held the role on the most recent earlier
//! primary-family event, and walks forward (wrapping) until a candidate passes
//! the filters of the current pass. The cursor keeps advancing across passes
//! and across dates of one run, and re-anchors on every existing event the
//! run skips.

use chrono::NaiveDate;

use super::context::{GapRule, GenerationContext, Slot};
use super::scoring::fatigue_penalty;
use super::SelectionTier;
use crate::config::RosterConfig;
use crate::history::classify;
use crate::models::{Event, EventFamily};

/// Holder of the rotation role on the most recent primary-family event
/// before `before` whose slot holds a rotation member
///
/// `events` must be sorted by date ascending.
pub fn find_anchor<'e>(
    events: &'e [Event],
    before: NaiveDate,
    roster: &RosterConfig,
) -> Option<&'e str> {
    events
        .iter()
        .rev()
        .filter(|e| e.date < before)
        .find_map(|e| rotation_holder(e, roster))
}

/// Rotation member holding the rotation role on a primary-family `event`
pub fn rotation_holder<'e>(event: &'e Event, roster: &RosterConfig) -> Option<&'e str> {
    if classify(event, roster) != Some(EventFamily::Primary) {
        return None;
    }
    event
        .assignments
        .iter()
        .filter(|a| a.role == roster.rotation_role)
        .filter_map(|a| a.person.name())
        .find(|name| roster.rotation_order.iter().any(|r| r == *name))
}

/// Walking cursor over the rotation order
#[derive(Debug, Clone)]
pub struct Rotation<'a> {
    order: &'a [String],
    cursor: usize,
}

impl<'a> Rotation<'a> {
    /// Start right after `last`; from the top when `last` is unknown
    pub fn resume_after(order: &'a [String], last: Option<&str>) -> Self {
        let cursor = last
            .and_then(|name| order.iter().position(|p| p == name))
            .map_or(0, |idx| idx + 1);
        Self { order, cursor }
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Position of the next candidate in the order
    pub fn position(&self) -> usize {
        if self.order.is_empty() {
            0
        } else {
            self.cursor % self.order.len()
        }
    }

    fn advance(&mut self) -> Option<&'a str> {
        if self.order.is_empty() {
            return None;
        }
        let candidate = &self.order[self.cursor % self.order.len()];
        self.cursor += 1;
        Some(candidate.as_str())
    }

    /// Walk at most two full rotations looking for an accepted candidate
    pub fn next_matching(&mut self, mut accept: impl FnMut(&str) -> bool) -> Option<&'a str> {
        for _ in 0..self.order.len() * 2 {
            let candidate = self.advance()?;
            if accept(candidate) {
                return Some(candidate);
            }
        }
        None
    }

    /// Fill the rotation slot: full filters, then the gap relaxed, then
    /// availability and caps only
    pub fn select(
        &mut self,
        ctx: &GenerationContext<'_>,
        slot: &Slot,
        assigned_today: &[String],
    ) -> Option<(&'a str, SelectionTier)> {
        let threshold = ctx.policy.rotation_fatigue_threshold;
        let eligible = |p: &str| {
            ctx.roster.can_fill(p, slot.role)
                && ctx.is_available(p, slot.date)
                && !assigned_today.iter().any(|a| a == p)
        };

        if let Some(p) = self.next_matching(|p| {
            eligible(p)
                && ctx.within_caps(p, slot, GapRule::Enforce)
                && fatigue_penalty(ctx, p, slot) < threshold
        }) {
            return Some((p, SelectionTier::Preferred));
        }

        if let Some(p) = self.next_matching(|p| {
            eligible(p)
                && ctx.within_caps(p, slot, GapRule::Relax)
                && fatigue_penalty(ctx, p, slot) < threshold
        }) {
            return Some((p, SelectionTier::GapRelaxed));
        }

        self.next_matching(|p| eligible(p) && ctx.within_caps(p, slot, GapRule::Relax))
            .map(|p| (p, SelectionTier::FatigueRelaxed))
    }
}
