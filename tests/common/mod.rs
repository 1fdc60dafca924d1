//! Common test utilities

use std::sync::Arc;

use chrono::NaiveDate;
use rota::config::{Config, PersonConfig};
use rota::lifecycle::{FixedClock, RosterService};
use rota::models::{AssignmentRef, EventKind, NewAssignment, NewEvent, Occupant, Role};
use rota::storage::repository::create_memory_repository;
use rota::storage::SharedRosterRepository;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Config whose roster holds `names`, each able to fill every role
pub fn config_with(names: &[&str]) -> Config {
    let mut config = Config::default();
    config.roster.people = names
        .iter()
        .map(|n| PersonConfig::new(*n, &Role::all()))
        .collect();
    config
}

/// Service over an in-memory store with the clock fixed on 2026-02-01
pub fn service_with(config: Config) -> RosterService {
    service_on(config, create_memory_repository())
}

#[allow(dead_code)]
pub fn service_on(config: Config, repo: SharedRosterRepository) -> RosterService {
    RosterService::new(Arc::new(config), repo).with_clock(FixedClock(date(2026, 2, 1)))
}

/// Store a single-slot primary event and return a reference to the slot
#[allow(dead_code)]
pub fn seed_slot(service: &RosterService, day: NaiveDate, role: Role, person: &str) -> AssignmentRef {
    let event = service
        .repository()
        .insert_event(
            &NewEvent::new(day, EventKind::Primary)
                .with_assignment(NewAssignment::new(role, Occupant::person(person))),
        )
        .unwrap();
    AssignmentRef::new(event.date, 0)
}
