//! Integration tests for month generation
//!
//! These tests drive [`RosterService::generate_month`] against an in-memory
//! store and check the outcomes end to end:
//! - Idempotency and skipping of existing dates
//! - Monthly caps and the gap rule, with the tier report
//! - Rotation order across months
//! - Availability and placeholder slots

mod common;

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Weekday};
use common::{config_with, date, service_with};
use rota::config::PersonConfig;
use rota::models::{EventKind, NewAssignment, NewEvent, NewUnavailability, Occupant, Role};
use rota::scheduler::{SchedulerError, SelectionTier, YearMonth};

const PEOPLE: [&str; 7] = ["Ana", "Ben", "Cleo", "Dev", "Eli", "Fay", "Gina"];

fn february() -> YearMonth {
    YearMonth::new(2026, 2).unwrap()
}

// ============================================================================
// Idempotency
// ============================================================================

#[test]
fn test_generation_creates_every_weekly_date() {
    let service = service_with(config_with(&PEOPLE));
    let report = service.generate_month(february()).unwrap();

    let dates: Vec<NaiveDate> = report.created.iter().map(|d| d.date).collect();
    assert_eq!(
        dates,
        vec![
            date(2026, 2, 1),
            date(2026, 2, 6),
            date(2026, 2, 8),
            date(2026, 2, 13),
            date(2026, 2, 15),
            date(2026, 2, 20),
            date(2026, 2, 22),
            date(2026, 2, 27),
        ]
    );

    for outcome in &report.created {
        let roles: Vec<Role> = outcome.slots.iter().map(|s| s.role).collect();
        match outcome.date.weekday() {
            Weekday::Sun => {
                assert_eq!(outcome.kind, EventKind::Primary);
                assert_eq!(roles, vec![Role::Computer, Role::Camera1, Role::Camera2]);
            }
            Weekday::Fri => {
                assert_eq!(outcome.kind, EventKind::Secondary);
                assert_eq!(roles, vec![Role::Leader, Role::Helper]);
                assert_eq!(outcome.slots[1].occupant, Occupant::Open);
                assert_eq!(outcome.slots[1].tier, SelectionTier::LeftOpen);
            }
            other => panic!("unexpected weekday {other}"),
        }
    }
}

#[test]
fn test_second_run_is_a_no_op() {
    let service = service_with(config_with(&PEOPLE));
    service.generate_month(february()).unwrap();
    let before = service.events_in_month(february()).unwrap();

    let report = service.generate_month(february()).unwrap();
    assert!(report.created.is_empty());
    assert_eq!(report.skipped.len(), 8);

    let after = service.events_in_month(february()).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_existing_event_is_left_untouched() {
    let service = service_with(config_with(&PEOPLE));
    service
        .create_event(date(2026, 2, 8), EventKind::Custom, Some("Baptism"), &[Role::Camera1])
        .unwrap();

    let report = service.generate_month(february()).unwrap();
    assert_eq!(report.skipped, vec![date(2026, 2, 8)]);
    assert_eq!(report.created.len(), 7);

    let event = service
        .repository()
        .get_event_by_date(date(2026, 2, 8))
        .unwrap()
        .unwrap();
    assert_eq!(event.title.as_deref(), Some("Baptism"));
    assert_eq!(event.assignments.len(), 1);
    assert_eq!(event.assignments[0].person, Occupant::Open);
}

#[test]
fn test_empty_roster_is_an_error() {
    let service = service_with(config_with(&[]));
    assert!(matches!(
        service.generate_month(february()),
        Err(SchedulerError::EmptyRoster)
    ));
}

// ============================================================================
// Caps and the gap rule
// ============================================================================

#[test]
fn test_person_at_cap_is_never_selected() {
    let service = service_with(config_with(&PEOPLE));

    // Gina already works four custom Monday events this month
    for day in [2, 9, 16, 23] {
        service
            .repository()
            .insert_event(
                &NewEvent::new(date(2026, 2, day), EventKind::Custom).with_assignment(
                    NewAssignment::new(Role::Camera1, Occupant::person("Gina")),
                ),
            )
            .unwrap();
    }

    let report = service.generate_month(february()).unwrap();
    assert_eq!(report.created.len(), 8);

    for outcome in &report.created {
        for slot in &outcome.slots {
            assert!(
                !slot.occupant.is("Gina"),
                "Gina selected for {} on {}",
                slot.role,
                outcome.date
            );
        }
    }
}

#[test]
fn test_gap_rule_holds_unless_reported_relaxed() {
    let service = service_with(config_with(&PEOPLE));
    let report = service.generate_month(february()).unwrap();

    let mut primary: HashMap<String, Vec<(NaiveDate, SelectionTier)>> = HashMap::new();
    for outcome in report.created.iter().filter(|d| d.kind == EventKind::Primary) {
        for slot in &outcome.slots {
            if let Some(name) = slot.occupant.name() {
                primary
                    .entry(name.to_string())
                    .or_default()
                    .push((outcome.date, slot.tier));
            }
        }
    }

    for (name, dates) in &primary {
        for pair in dates.windows(2) {
            let (earlier, _) = pair[0];
            let (later, tier) = pair[1];
            if (later - earlier).num_days() < 8 {
                assert_ne!(
                    tier,
                    SelectionTier::Preferred,
                    "{name} worked {earlier} and {later} without a relaxation"
                );
            }
        }
        assert!(
            dates.len() <= 2 || dates.iter().any(|(_, t)| *t == SelectionTier::OverCap),
            "{name} exceeded the primary cap silently"
        );
    }
}

#[test]
fn test_small_roster_degrades_through_tiers() {
    let service = service_with(config_with(&["Ana", "Ben", "Cleo"]));
    let report = service.generate_month(february()).unwrap();

    let tiers = |day: u32| -> Vec<SelectionTier> {
        report
            .created
            .iter()
            .find(|d| d.date == date(2026, 2, day))
            .unwrap()
            .slots
            .iter()
            .map(|s| s.tier)
            .collect()
    };

    assert_eq!(tiers(1), vec![SelectionTier::Preferred; 3]);
    // everyone worked the previous Sunday
    assert_eq!(tiers(8), vec![SelectionTier::GapRelaxed; 3]);
    // everyone is at the primary cap
    assert_eq!(tiers(15), vec![SelectionTier::OverCap; 3]);

    assert!(report.degraded_slots().count() >= 3);

    // the same person never fills two slots of one event
    for outcome in &report.created {
        let mut names: Vec<&str> = outcome.slots.iter().filter_map(|s| s.occupant.name()).collect();
        let len = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), len, "duplicate on {}", outcome.date);
    }
}

#[test]
fn test_unfillable_slot_gets_placeholder() {
    let mut config = config_with(&[]);
    config.roster.people = vec![
        PersonConfig::new("Ana", &[Role::Computer, Role::Camera1]),
        PersonConfig::new("Ben", &[Role::Computer, Role::Camera1, Role::Camera2]),
        PersonConfig::new("Cleo", &[Role::Camera1, Role::Camera2]),
    ];
    let service = service_with(config);

    let report = service.generate_month(february()).unwrap();
    let friday = report
        .created
        .iter()
        .find(|d| d.date == date(2026, 2, 6))
        .unwrap();
    assert_eq!(friday.slots[0].occupant, Occupant::Unfilled);
    assert_eq!(friday.slots[0].tier, SelectionTier::Placeholder);

    let stored = service
        .repository()
        .get_event_by_date(date(2026, 2, 6))
        .unwrap()
        .unwrap();
    assert_eq!(stored.assignments[0].person.to_string(), "TBD");
    assert_eq!(stored.assignments[1].person.to_string(), "Open");
}

// ============================================================================
// Rotation
// ============================================================================

fn rotation_config() -> rota::config::Config {
    let mut config = config_with(&[]);
    let mut people: Vec<PersonConfig> = ["Ana", "Ben", "Cleo"]
        .iter()
        .map(|n| PersonConfig::new(*n, &[Role::Computer]))
        .collect();
    people.extend(
        ["Dev", "Eli", "Fay", "Gina", "Hal"]
            .iter()
            .map(|n| PersonConfig::new(*n, &[Role::Camera1, Role::Camera2, Role::Leader])),
    );
    config.roster.people = people;
    config.roster.rotation_order = vec!["Ana".into(), "Ben".into(), "Cleo".into()];
    config
}

fn computer_holders(service: &rota::RosterService, month: YearMonth) -> Vec<String> {
    service
        .events_in_month(month)
        .unwrap()
        .into_iter()
        .filter(|e| e.kind == EventKind::Primary)
        .map(|e| e.assignments[0].person.to_string())
        .collect()
}

#[test]
fn test_rotation_walks_the_order_and_resumes_next_month() {
    let service = service_with(rotation_config());

    service.generate_month(february()).unwrap();
    assert_eq!(computer_holders(&service, february()), vec!["Ana", "Ben", "Cleo", "Ana"]);

    let march = YearMonth::new(2026, 3).unwrap();
    service.generate_month(march).unwrap();
    assert_eq!(
        computer_holders(&service, march),
        vec!["Ben", "Cleo", "Ana", "Ben", "Cleo"]
    );
}

#[test]
fn test_rotation_resumes_inside_partially_generated_month() {
    let service = service_with(rotation_config());

    service.generate_month(february()).unwrap();
    let full = computer_holders(&service, february());
    assert_eq!(full, vec!["Ana", "Ben", "Cleo", "Ana"]);

    service.delete_event(date(2026, 2, 15)).unwrap();
    service.delete_event(date(2026, 2, 22)).unwrap();

    let report = service.generate_month(february()).unwrap();
    let created: Vec<_> = report.created.iter().map(|d| d.date).collect();
    assert_eq!(created, vec![date(2026, 2, 15), date(2026, 2, 22)]);
    assert_eq!(computer_holders(&service, february()), full);
}

#[test]
fn test_rotation_skips_unavailable_member() {
    let service = service_with(rotation_config());
    service
        .add_unavailability(NewUnavailability {
            person: "Ben".to_string(),
            start: date(2026, 2, 8),
            end: date(2026, 2, 8),
            reason: Some("travel".to_string()),
            pattern: None,
        })
        .unwrap();

    service.generate_month(february()).unwrap();
    assert_eq!(computer_holders(&service, february()), vec!["Ana", "Cleo", "Ana", "Ben"]);
}

// ============================================================================
// Availability
// ============================================================================

#[test]
fn test_recurring_unavailability_is_respected() {
    let service = service_with(config_with(&PEOPLE));
    service
        .add_unavailability(NewUnavailability {
            person: "Ana".to_string(),
            start: date(2026, 1, 1),
            end: date(2026, 12, 31),
            reason: None,
            pattern: Some("every_sunday".parse().unwrap()),
        })
        .unwrap();
    service
        .add_unavailability(NewUnavailability {
            person: "Ben".to_string(),
            start: date(2026, 2, 1),
            end: date(2026, 2, 28),
            reason: Some("sabbatical".to_string()),
            pattern: None,
        })
        .unwrap();

    let report = service.generate_month(february()).unwrap();
    for outcome in &report.created {
        for slot in &outcome.slots {
            assert!(!slot.occupant.is("Ben"), "Ben scheduled on {}", outcome.date);
            if outcome.date.weekday() == Weekday::Sun {
                assert!(!slot.occupant.is("Ana"), "Ana scheduled on {}", outcome.date);
            }
        }
    }
}
