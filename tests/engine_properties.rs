use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use working_days::access::{Actor, ExecutionContext};
use working_days::calendar::{WeekdaySet, WorkCalendar, WorkCalendarConfig};
use working_days::entity::{FollowsRelation, ScheduledEntity};
use working_days::persistence::{InMemoryStore, ProjectSnapshot, ScheduleStore};
use working_days::{Engine, EngineConfig};

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
}

fn entity_strategy() -> impl Strategy<Value = (Option<u64>, Option<u64>, Option<u32>, bool)> {
    (
        proptest::option::of(0u64..60),
        proptest::option::of(0u64..15),
        proptest::option::of(0u32..10),
        proptest::bool::weighted(0.2),
    )
}

fn weekday_strategy() -> impl Strategy<Value = WeekdaySet> {
    (1u8..128).prop_map(|bits| {
        WeekdaySet::ALL_WEEKDAYS
            .into_iter()
            .enumerate()
            .filter(|(i, _)| bits & (1 << i) != 0)
            .map(|(_, day)| day)
            .collect()
    })
}

fn build_entities(
    shapes: &[(Option<u64>, Option<u64>, Option<u32>, bool)],
) -> Vec<ScheduledEntity> {
    shapes
        .iter()
        .enumerate()
        .map(|(i, (start, span, duration, ignore))| {
            let start_date = start.map(|offset| base() + Days::new(offset));
            let due_date = match (start_date, span) {
                (Some(start), Some(span)) => Some(start + Days::new(*span)),
                (None, Some(span)) => Some(base() + Days::new(*span)),
                (_, None) => None,
            };
            let mut entity =
                ScheduledEntity::new(i as i32 + 1, format!("E{i}")).with_dates(start_date, due_date);
            entity.duration = *duration;
            entity.ignore_non_working_days = *ignore;
            entity
        })
        .collect()
}

fn build_relations(count: usize, links: &[Option<u32>]) -> Vec<FollowsRelation> {
    links
        .iter()
        .take(count.saturating_sub(1))
        .enumerate()
        .filter_map(|(i, lag)| lag.map(|lag| FollowsRelation::new(i as i32 + 1, i as i32 + 2, lag)))
        .collect()
}

fn engine(
    calendar: &WorkCalendar,
    entities: Vec<ScheduledEntity>,
    relations: Vec<FollowsRelation>,
) -> Engine<InMemoryStore> {
    let snapshot = ProjectSnapshot {
        calendar: Some(WorkCalendarConfig::from(calendar)),
        entities,
        relations,
    };
    Engine::new(
        InMemoryStore::from_snapshot(&snapshot).unwrap(),
        EngineConfig::default(),
    )
}

fn system() -> ExecutionContext {
    ExecutionContext::system(Actor::admin(0, "system"))
}

proptest! {
    #[test]
    fn equal_calendars_change_nothing(
        shapes in proptest::collection::vec(entity_strategy(), 1..12),
        links in proptest::collection::vec(proptest::option::of(0u32..4), 12),
        weekdays in weekday_strategy(),
    ) {
        let calendar = WorkCalendar::new(weekdays).unwrap();
        let entities = build_entities(&shapes);
        let relations = build_relations(entities.len(), &links);
        let mut engine = engine(&calendar, entities, relations);
        let before = engine.store().load_entities().unwrap();

        let report = engine.run(&system(), &calendar).unwrap();

        prop_assert_eq!(report.changed_count(), 0);
        prop_assert_eq!(engine.store().load_entities().unwrap(), before);
    }

    #[test]
    fn second_run_changes_no_dates(
        shapes in proptest::collection::vec(entity_strategy(), 1..12),
        links in proptest::collection::vec(proptest::option::of(0u32..4), 12),
        weekdays in weekday_strategy(),
    ) {
        let current = WorkCalendar::new(weekdays).unwrap();
        let previous = WorkCalendar::default();
        let entities = build_entities(&shapes);
        let relations = build_relations(entities.len(), &links);
        let mut engine = engine(&current, entities, relations);

        engine.run(&system(), &previous).unwrap();
        let after_first = engine.store().load_entities().unwrap();
        let journal_len = engine.store().load_journal().unwrap().len();

        let second = engine.run(&system(), &previous).unwrap();

        prop_assert_eq!(second.changed_count(), 0);
        prop_assert_eq!(engine.store().load_entities().unwrap(), after_first);
        prop_assert_eq!(engine.store().load_journal().unwrap().len(), journal_len);
    }

    #[test]
    fn ignoring_entities_without_relations_never_move(
        shapes in proptest::collection::vec(entity_strategy(), 1..12),
        weekdays in weekday_strategy(),
    ) {
        let current = WorkCalendar::new(weekdays).unwrap();
        let mut entities = build_entities(&shapes);
        for entity in &mut entities {
            entity.ignore_non_working_days = true;
        }
        let mut engine = engine(&current, entities.clone(), vec![]);

        let report = engine.run(&system(), &WorkCalendar::default()).unwrap();

        prop_assert_eq!(report.changed_count(), 0);
        for entity in entities {
            prop_assert_eq!(engine.store().entity(entity.id), Some(&entity));
        }
    }
}
