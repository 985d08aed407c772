use chrono::NaiveDate;
use std::fs;
use tempfile::tempdir;
use working_days::calendar::WorkCalendarConfig;
use working_days::entity::{FollowsRelation, ScheduledEntity};
use working_days::persistence::{
    InMemoryStore, ProjectSnapshot, ScheduleStore, StoreError, load_entities_from_csv,
    load_relations_from_csv, load_snapshot_from_json, save_entities_to_csv,
    save_relations_to_csv, save_snapshot_to_json,
};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn sample() -> ProjectSnapshot {
    ProjectSnapshot {
        calendar: Some(WorkCalendarConfig::default()),
        entities: vec![
            ScheduledEntity::new(1, "Design")
                .in_project("Tower")
                .with_dates(Some(d(2025, 1, 6)), Some(d(2025, 1, 10)))
                .with_duration(4),
            ScheduledEntity::new(2, "Cure, then pour")
                .with_dates(Some(d(2025, 1, 13)), None)
                .ignoring_non_working_days(),
        ],
        relations: vec![FollowsRelation::new(1, 2, 3)],
    }
}

#[test]
fn json_snapshot_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("project.json");
    let snapshot = sample();

    save_snapshot_to_json(&snapshot, &path).unwrap();
    let loaded = load_snapshot_from_json(&path).unwrap();
    assert_eq!(loaded, snapshot);

    let store = InMemoryStore::from_snapshot(&loaded).unwrap();
    assert_eq!(store.load_entities().unwrap().len(), 2);
}

#[test]
fn csv_files_round_trip() {
    let dir = tempdir().unwrap();
    let entities_path = dir.path().join("entities.csv");
    let relations_path = dir.path().join("relations.csv");
    let snapshot = sample();

    save_entities_to_csv(&snapshot.entities, &entities_path).unwrap();
    save_relations_to_csv(&snapshot.relations, &relations_path).unwrap();

    assert_eq!(load_entities_from_csv(&entities_path).unwrap(), snapshot.entities);
    assert_eq!(load_relations_from_csv(&relations_path).unwrap(), snapshot.relations);
}

#[test]
fn csv_with_blank_optional_columns_loads() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("entities.csv");
    fs::write(
        &path,
        "id,subject,project,start_date,due_date,duration,ignore_non_working_days\n\
         7,Loose,,,2025-02-03,,\n",
    )
    .unwrap();

    let entities = load_entities_from_csv(&path).unwrap();
    assert_eq!(
        entities,
        vec![ScheduledEntity::new(7, "Loose").with_dates(None, Some(d(2025, 2, 3)))]
    );
}

#[test]
fn csv_with_bad_date_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("entities.csv");
    fs::write(
        &path,
        "id,subject,project,start_date,due_date,duration,ignore_non_working_days\n\
         1,Bad,,2025-13-01,,,false\n",
    )
    .unwrap();

    assert!(matches!(
        load_entities_from_csv(&path),
        Err(StoreError::InvalidData(message)) if message.contains("2025-13-01")
    ));
}

#[test]
fn invalid_snapshots_are_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("project.json");

    let mut duplicate = sample();
    duplicate.entities.push(ScheduledEntity::new(1, "Again"));
    assert!(matches!(
        save_snapshot_to_json(&duplicate, &path),
        Err(StoreError::InvalidData(message)) if message.contains("duplicate entity id 1")
    ));

    let mut inverted = sample();
    inverted.entities[0].due_date = Some(d(2025, 1, 1));
    assert!(InMemoryStore::from_snapshot(&inverted).is_err());

    let mut self_follow = sample();
    self_follow.relations.push(FollowsRelation::new(2, 2, 0));
    assert!(InMemoryStore::from_snapshot(&self_follow).is_err());

    fs::write(&path, r#"{"calendar":{"working_days":[]},"entities":[]}"#).unwrap();
    assert!(matches!(
        load_snapshot_from_json(&path),
        Err(StoreError::InvalidData(_))
    ));
}
