//! Record store tests run against both repository implementations

mod common;

use std::sync::Arc;

use common::{config_with, date, service_on};
use rota::lifecycle::{Action, Actor};
use rota::models::{
    AssignmentRef, AssignmentStatus, EventKind, HandoffToken, NewAssignment, NewEvent,
    NewUnavailability, Occupant, Role,
};
use rota::scheduler::YearMonth;
use rota::storage::repository::{create_memory_repository, create_sqlite_repository};
use rota::storage::{SharedRosterRepository, SqliteRosterRepository, StorageError};
use tempfile::TempDir;

fn sqlite() -> SharedRosterRepository {
    Arc::new(SqliteRosterRepository::in_memory().unwrap())
}

fn each_repository(check: impl Fn(SharedRosterRepository)) {
    check(create_memory_repository());
    check(sqlite());
}

fn primary_event(day: u32) -> NewEvent {
    NewEvent::new(date(2026, 2, day), EventKind::Primary)
        .with_assignment(NewAssignment::new(Role::Computer, Occupant::person("Ana")))
        .with_assignment(NewAssignment::new(Role::Camera1, Occupant::Unfilled))
        .with_assignment(NewAssignment::open(Role::Camera2))
}

#[test]
fn test_events_round_trip_with_positions() {
    each_repository(|repo| {
        let stored = repo.insert_event(&primary_event(8).with_title("Easter")).unwrap();
        assert_eq!(stored.assignments.len(), 3);

        let loaded = repo.get_event(stored.id).unwrap().unwrap();
        assert_eq!(loaded, stored);
        assert_eq!(loaded.title.as_deref(), Some("Easter"));

        let positions: Vec<usize> = loaded.assignments.iter().map(|a| a.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert_eq!(loaded.assignments[1].person, Occupant::Unfilled);
        assert_eq!(loaded.assignments[2].person, Occupant::Open);

        let found = repo
            .find_assignment(AssignmentRef::new(date(2026, 2, 8), 1))
            .unwrap()
            .unwrap();
        assert_eq!(found.role, Role::Camera1);
    });
}

#[test]
fn test_one_event_per_date() {
    each_repository(|repo| {
        repo.insert_event(&primary_event(8)).unwrap();
        assert!(matches!(
            repo.insert_event(&primary_event(8)),
            Err(StorageError::DuplicateDate(d)) if d == date(2026, 2, 8)
        ));
    });
}

#[test]
fn test_range_queries_are_sorted() {
    each_repository(|repo| {
        for day in [22, 1, 15, 8] {
            repo.insert_event(&primary_event(day)).unwrap();
        }
        let dates: Vec<_> = repo
            .events_between(date(2026, 2, 2), date(2026, 2, 22))
            .unwrap()
            .iter()
            .map(|e| e.date)
            .collect();
        assert_eq!(dates, vec![date(2026, 2, 8), date(2026, 2, 15), date(2026, 2, 22)]);

        assert_eq!(
            repo.delete_events_between(date(2026, 2, 1), date(2026, 2, 14)).unwrap(),
            2
        );
        assert_eq!(repo.all_events().unwrap().len(), 2);
    });
}

#[test]
fn test_stale_version_is_a_conflict_and_nothing_is_written() {
    each_repository(|repo| {
        let event = repo.insert_event(&primary_event(8)).unwrap();
        let mut first = event.assignments[0].clone();
        let mut second = event.assignments[1].clone();

        first.status = AssignmentStatus::Confirmed;
        let saved = repo.update_assignments(&[first.clone()]).unwrap();
        assert_eq!(saved[0].version, first.version + 1);

        // `first` still carries the old version
        second.status = AssignmentStatus::Confirmed;
        first.status = AssignmentStatus::NeedsCoverage;
        let err = repo.update_assignments(&[second.clone(), first.clone()]).unwrap_err();
        assert!(matches!(err, StorageError::Conflict { assignment_id } if assignment_id == first.id));

        let untouched = repo.get_assignment(second.id).unwrap().unwrap();
        assert_eq!(untouched.status, AssignmentStatus::Pending);
        assert_eq!(untouched.version, 0);
    });
}

#[test]
fn test_token_redeem_is_single_use() {
    each_repository(|repo| {
        let event = repo.insert_event(&primary_event(8)).unwrap();
        let mut assignment = event.assignments[0].clone();
        repo.insert_token(&HandoffToken::new("abc", assignment.id)).unwrap();

        assignment.cover = Some("Ben".to_string());
        let saved = repo.redeem_token("abc", &assignment).unwrap();
        assert_eq!(saved.cover.as_deref(), Some("Ben"));
        assert!(repo.get_token("abc").unwrap().unwrap().used);

        assert!(matches!(
            repo.redeem_token("abc", &saved),
            Err(StorageError::TokenUsed)
        ));
        assert!(matches!(
            repo.redeem_token("nope", &saved),
            Err(StorageError::TokenNotFound)
        ));
        assert_eq!(repo.tokens_for_assignment(assignment.id).unwrap().len(), 1);

        // deleting the event takes its tokens along
        assert!(repo.delete_event(event.id).unwrap());
        assert!(repo.get_token("abc").unwrap().is_none());
    });
}

#[test]
fn test_save_with_token_is_all_or_nothing() {
    each_repository(|repo| {
        let event = repo.insert_event(&primary_event(8)).unwrap();
        let mut assignment = event.assignments[0].clone();
        repo.insert_token(&HandoffToken::new("taken", assignment.id)).unwrap();

        assignment.status = AssignmentStatus::NeedsCoverage;
        assert!(matches!(
            repo.save_with_token(&assignment, &HandoffToken::new("taken", assignment.id)),
            Err(StorageError::DuplicateToken)
        ));

        let untouched = repo.get_assignment(assignment.id).unwrap().unwrap();
        assert_eq!(untouched.status, AssignmentStatus::Pending);
        assert_eq!(untouched.version, 0);
        assert_eq!(repo.tokens_for_assignment(assignment.id).unwrap().len(), 1);

        let saved = repo
            .save_with_token(&assignment, &HandoffToken::new("fresh", assignment.id))
            .unwrap();
        assert_eq!(saved.status, AssignmentStatus::NeedsCoverage);
        assert_eq!(saved.version, 1);
        assert!(!repo.get_token("fresh").unwrap().unwrap().used);

        // a stale version writes neither record
        assert!(matches!(
            repo.save_with_token(&assignment, &HandoffToken::new("late", assignment.id)),
            Err(StorageError::Conflict { .. })
        ));
        assert!(repo.get_token("late").unwrap().is_none());
    });
}

#[test]
fn test_unavailability_crud() {
    each_repository(|repo| {
        let added = repo
            .add_unavailability(&NewUnavailability {
                person: "Ana".to_string(),
                start: date(2026, 3, 1),
                end: date(2026, 3, 31),
                reason: Some("travel".to_string()),
                pattern: Some("2nd_sunday".parse().unwrap()),
            })
            .unwrap();
        repo.add_unavailability(&NewUnavailability {
            person: "Ben".to_string(),
            start: date(2026, 2, 1),
            end: date(2026, 2, 1),
            reason: None,
            pattern: None,
        })
        .unwrap();

        let all = repo.list_unavailability(None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].person, "Ben");

        let ana = repo.list_unavailability(Some("Ana")).unwrap();
        assert_eq!(ana, vec![added.clone()]);
        assert!(ana[0].covers(date(2026, 3, 8)));
        assert!(!ana[0].covers(date(2026, 3, 15)));

        assert!(repo.remove_unavailability(added.id).unwrap());
        assert!(!repo.remove_unavailability(added.id).unwrap());
    });
}

#[test]
fn test_sqlite_file_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("roster.db");
    let month = YearMonth::new(2026, 2).unwrap();
    let people = ["Ana", "Ben", "Cleo", "Dev", "Eli"];

    let slot = {
        let service = service_on(config_with(&people), create_sqlite_repository(&path).unwrap());
        service.generate_month(month).unwrap();
        let slot = AssignmentRef::new(date(2026, 2, 8), 1);
        let holder = service
            .repository()
            .find_assignment(slot)
            .unwrap()
            .unwrap()
            .person
            .to_string();
        service
            .apply_action(slot, &Actor::person(holder), Action::Decline)
            .unwrap();
        slot
    };

    let service = service_on(config_with(&people), create_sqlite_repository(&path).unwrap());
    assert_eq!(service.events_in_month(month).unwrap().len(), 8);

    let reopened = service.repository().find_assignment(slot).unwrap().unwrap();
    assert_eq!(reopened.status, AssignmentStatus::NeedsCoverage);
    assert_eq!(reopened.history.len(), 1);
    assert_eq!(service.repository().tokens_for_assignment(reopened.id).unwrap().len(), 1);

    let report = service.generate_month(month).unwrap();
    assert!(report.created.is_empty());
}
