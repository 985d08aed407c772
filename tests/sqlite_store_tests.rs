#![cfg(feature = "sqlite")]

use chrono::{NaiveDate, Weekday};
use tempfile::NamedTempFile;
use working_days::calendar::{DateOverride, WorkCalendarConfig};
use working_days::cause::ChangeCause;
use working_days::entity::{FollowsRelation, ScheduledEntity};
use working_days::persistence::{
    ChangeSet, JournalEntry, ProjectSnapshot, ScheduleStore, SqliteStore, StoreError,
};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn snapshot() -> ProjectSnapshot {
    ProjectSnapshot {
        calendar: Some(WorkCalendarConfig::new(
            [Weekday::Mon, Weekday::Tue, Weekday::Thu, Weekday::Fri],
            [DateOverride {
                date: d(2025, 12, 25),
                working: false,
            }],
        )),
        entities: vec![
            ScheduledEntity::new(3, "Later").with_dates(Some(d(2025, 2, 3)), None),
            ScheduledEntity::new(1, "Earlier")
                .in_project("Tower")
                .with_dates(Some(d(2025, 1, 6)), Some(d(2025, 1, 10)))
                .with_duration(4),
            ScheduledEntity::new(2, "Due only").with_dates(None, Some(d(2025, 1, 20))),
            ScheduledEntity::new(4, "Dateless"),
        ],
        relations: vec![FollowsRelation::new(1, 3, 2)],
    }
}

#[test]
fn sqlite_store_round_trips_project() {
    let file = NamedTempFile::new().unwrap();
    let mut store = SqliteStore::new(file.path()).unwrap();
    let snapshot = snapshot();
    store.replace_project(&snapshot).unwrap();

    // Reopen to make sure everything hit the file.
    let store = SqliteStore::new(file.path()).unwrap();
    assert_eq!(store.load_calendar().unwrap(), snapshot.calendar);
    assert_eq!(store.load_relations().unwrap(), snapshot.relations);

    let ids: Vec<i32> = store
        .load_entities()
        .unwrap()
        .iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, vec![4, 2, 1, 3]);

    let earlier = store
        .load_entities()
        .unwrap()
        .into_iter()
        .find(|e| e.id == 1)
        .unwrap();
    assert_eq!(earlier.project.as_deref(), Some("Tower"));
    assert_eq!(earlier.duration, Some(4));
}

#[test]
fn commit_updates_entities_and_appends_journal() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    store.replace_project(&snapshot()).unwrap();

    let moved = ScheduledEntity::new(1, "Earlier")
        .in_project("Tower")
        .with_dates(Some(d(2025, 1, 6)), Some(d(2025, 1, 13)))
        .with_duration(4);
    let change_set = ChangeSet {
        calendar: None,
        entities: vec![moved.clone()],
        journal: vec![JournalEntry::new(1, ChangeCause::predecessor_changed(2))],
    };
    store.commit(&change_set).unwrap();

    let entities = store.load_entities().unwrap();
    assert!(entities.contains(&moved));
    let journal = store.load_journal().unwrap();
    assert_eq!(journal, change_set.journal);
}

#[test]
fn commit_with_unknown_entity_writes_nothing() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    store.replace_project(&snapshot()).unwrap();
    let before = store.load_entities().unwrap();

    let change_set = ChangeSet {
        calendar: None,
        entities: vec![
            ScheduledEntity::new(1, "Earlier").with_dates(Some(d(2025, 3, 3)), None),
            ScheduledEntity::new(99, "Ghost"),
        ],
        journal: vec![JournalEntry::new(1, ChangeCause::predecessor_changed(2))],
    };
    let err = store.commit(&change_set).unwrap_err();

    assert!(matches!(err, StoreError::NotFound(99)));
    assert_eq!(store.load_entities().unwrap(), before);
    assert!(store.load_journal().unwrap().is_empty());
}

#[test]
fn commit_writes_calendar_with_entities() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    store.replace_project(&snapshot()).unwrap();
    let calendar = WorkCalendarConfig::new([Weekday::Mon, Weekday::Thu], Vec::<DateOverride>::new());

    let moved = ScheduledEntity::new(1, "Earlier")
        .in_project("Tower")
        .with_dates(Some(d(2025, 1, 6)), Some(d(2025, 1, 20)))
        .with_duration(4);
    store
        .commit(&ChangeSet {
            calendar: Some(calendar.clone()),
            entities: vec![moved.clone()],
            journal: vec![],
        })
        .unwrap();

    assert_eq!(store.load_calendar().unwrap(), Some(calendar));
    assert!(store.load_entities().unwrap().contains(&moved));
}

#[test]
fn failed_commit_keeps_previous_calendar() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    store.replace_project(&snapshot()).unwrap();
    let before = store.load_calendar().unwrap();

    let change_set = ChangeSet {
        calendar: Some(WorkCalendarConfig::new([Weekday::Mon], Vec::<DateOverride>::new())),
        entities: vec![ScheduledEntity::new(99, "Ghost")],
        journal: vec![],
    };
    assert!(matches!(
        store.commit(&change_set),
        Err(StoreError::NotFound(99))
    ));
    assert_eq!(store.load_calendar().unwrap(), before);
}

#[test]
fn replace_project_rejects_invalid_snapshot() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let mut bad = snapshot();
    bad.relations.push(FollowsRelation::new(1, 42, 0));

    assert!(matches!(
        store.replace_project(&bad),
        Err(StoreError::InvalidData(_))
    ));
    assert!(store.load_entities().unwrap().is_empty());
}

#[test]
fn empty_store_has_no_calendar() {
    let store = SqliteStore::open_in_memory().unwrap();
    assert_eq!(store.load_calendar().unwrap(), None);
    assert!(store.load_journal().unwrap().is_empty());
}
