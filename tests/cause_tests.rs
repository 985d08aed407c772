use chrono::{NaiveDate, Weekday};
use working_days::access::{AccessPolicy, Actor, OpenAccess, ProjectMembership};
use working_days::calculations::{PropagationResult, ShiftOrigin};
use working_days::cause::{
    CauseRecorder, CauseRenderer, ChangeCause, EntityDirectory, ProgressRuleChange,
    RelationKind, RenderContext, SystemFeature,
};
use working_days::config::{CausePrecedence, NoteFormat};
use working_days::diff::{CalendarDiff, DateChange, WeekdayChange};
use working_days::entity::{DatePair, ScheduledEntity};
use working_days::i18n::Catalog;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn render(
    cause: &ChangeCause,
    viewer: &Actor,
    locale: &str,
    format: NoteFormat,
    access: &dyn AccessPolicy,
    directory: &dyn EntityDirectory,
) -> String {
    let catalog = Catalog::bundled();
    CauseRenderer::new(RenderContext {
        viewer,
        locale,
        format,
        translator: &catalog,
        access,
        directory,
        link_base: "https://pm.example.com/",
    })
    .render(cause)
}

fn result(entity_id: i32, origin: ShiftOrigin, changed: bool) -> PropagationResult {
    let dates = DatePair {
        start: Some(d(2025, 1, 6)),
        due: Some(d(2025, 1, 7)),
    };
    PropagationResult {
        entity_id,
        previous: dates,
        current: dates,
        changed,
        origin,
    }
}

fn wednesday_off() -> CalendarDiff {
    CalendarDiff {
        weekdays: vec![WeekdayChange {
            weekday: Weekday::Wed,
            working: false,
        }],
        dates: vec![],
    }
}

#[test]
fn recorder_maps_origins_to_causes_in_processing_order() {
    let diff = wednesday_off();
    let results = vec![
        result(5, ShiftOrigin::Calendar, true),
        result(2, ShiftOrigin::Calendar, false),
        result(3, ShiftOrigin::Predecessor(5), true),
    ];
    let causes = CauseRecorder::default().record(&diff, &results);
    assert_eq!(
        causes,
        vec![
            (5, ChangeCause::working_days_changed(&diff)),
            (3, ChangeCause::predecessor_changed(5)),
        ]
    );
}

#[test]
fn direct_precedence_keeps_working_days_cause() {
    let diff = wednesday_off();
    let results = vec![
        result(1, ShiftOrigin::Predecessor(9), true),
        result(1, ShiftOrigin::Calendar, true),
    ];
    let causes = CauseRecorder::new(CausePrecedence::Direct).record(&diff, &results);
    assert_eq!(causes, vec![(1, ChangeCause::working_days_changed(&diff))]);

    let reversed: Vec<_> = results.into_iter().rev().collect();
    let causes = CauseRecorder::new(CausePrecedence::Direct).record(&diff, &reversed);
    assert_eq!(causes, vec![(1, ChangeCause::working_days_changed(&diff))]);
}

#[test]
fn propagated_precedence_keeps_related_cause() {
    let diff = wednesday_off();
    let results = vec![
        result(1, ShiftOrigin::Calendar, true),
        result(1, ShiftOrigin::Predecessor(9), true),
    ];
    let causes = CauseRecorder::new(CausePrecedence::Propagated).record(&diff, &results);
    assert_eq!(causes, vec![(1, ChangeCause::predecessor_changed(9))]);
}

#[test]
fn working_days_clauses_are_ordered_weekdays_then_dates() {
    let cause = ChangeCause::WorkingDaysChanged {
        changed_days: CalendarDiff {
            weekdays: vec![
                WeekdayChange {
                    weekday: Weekday::Sat,
                    working: true,
                },
                WeekdayChange {
                    weekday: Weekday::Wed,
                    working: false,
                },
            ],
            dates: vec![
                DateChange {
                    date: d(2025, 12, 26),
                    working: false,
                },
                DateChange {
                    date: d(2025, 12, 24),
                    working: true,
                },
            ],
        },
    };
    let viewer = Actor::new(1, "alice");
    let empty: Vec<ScheduledEntity> = Vec::new();

    let plain = render(&cause, &viewer, "en", NoteFormat::Plain, &OpenAccess, &empty);
    assert_eq!(
        plain,
        "Dates changed by changes to working days (Wednesday is now non-working, \
         Saturday is now working, 12/24/2025 is now working, 12/26/2025 is now non-working)"
    );

    let german = render(&cause, &viewer, "de", NoteFormat::Html, &OpenAccess, &empty);
    assert!(german.starts_with("<strong>Daten geändert</strong> durch Änderungen der Arbeitstage ("));
    assert!(german.contains("Mittwoch ist jetzt ein arbeitsfreier Tag, Samstag ist jetzt ein Arbeitstag"));
    assert!(german.contains("24.12.2025 ist jetzt ein Arbeitstag"));
}

#[test]
fn related_entity_renders_link_for_visible_upstream() {
    let directory = vec![ScheduledEntity::new(42, "Pour <foundation>").in_project("Tower")];
    let viewer = Actor::new(1, "alice");
    let access = ProjectMembership::new().with_member(1, "Tower");
    let cause = ChangeCause::predecessor_changed(42);

    let html = render(&cause, &viewer, "en", NoteFormat::Html, &access, &directory);
    assert_eq!(
        html,
        "<strong>Dates changed</strong> by changes to predecessor \
         <a href=\"https://pm.example.com/entities/42\" class=\"entity-link\">\
         Tower: Pour &lt;foundation&gt; #42</a>"
    );

    let plain = render(&cause, &viewer, "en", NoteFormat::Plain, &access, &directory);
    assert_eq!(plain, "Dates changed by changes to predecessor #42");
}

#[test]
fn invisible_upstream_leaks_nothing() {
    let directory = vec![ScheduledEntity::new(42, "Secret merger").in_project("Skunkworks")];
    let outsider = Actor::new(2, "bob");
    let access = ProjectMembership::new().with_member(1, "Skunkworks");
    let cause = ChangeCause::predecessor_changed(42);

    for format in [NoteFormat::Plain, NoteFormat::Html] {
        let note = render(&cause, &outsider, "en", format, &access, &directory);
        assert!(note.contains("by changes to a related work item"));
        assert!(!note.contains("42"));
        assert!(!note.contains("Secret"));
        assert!(!note.contains("Skunkworks"));
        assert!(!note.contains("href"));
    }

    let admin = Actor::admin(3, "root");
    let note = render(&cause, &admin, "en", NoteFormat::Plain, &access, &directory);
    assert!(note.ends_with("#42"));
}

#[test]
fn missing_upstream_uses_fallback() {
    let directory: Vec<ScheduledEntity> = Vec::new();
    let viewer = Actor::admin(1, "root");
    let cause = ChangeCause::RelatedEntityChanged {
        upstream: 7,
        relation: RelationKind::Parent,
    };
    let note = render(&cause, &viewer, "en", NoteFormat::Plain, &OpenAccess, &directory);
    assert_eq!(note, "Dates changed by changes to a related work item");
}

#[test]
fn system_update_strips_tags_in_plain_mode() {
    let directory: Vec<ScheduledEntity> = Vec::new();
    let viewer = Actor::new(1, "alice");
    let cause = ChangeCause::SystemUpdate {
        feature: SystemFeature::ProgressCalculationAdjusted,
    };

    let html = render(&cause, &viewer, "en", NoteFormat::Html, &OpenAccess, &directory);
    assert!(html.starts_with("<strong>System update:</strong> "));
    assert!(html.contains("href=\"https://pm.example.com/help/progress-calculation\""));

    let plain = render(&cause, &viewer, "en", NoteFormat::Plain, &OpenAccess, &directory);
    assert_eq!(
        plain,
        "System update: Progress calculation automatically adjusted with the version update."
    );

    // Only English carries system update notes; German falls back.
    let german = render(&cause, &viewer, "de", NoteFormat::Plain, &OpenAccess, &directory);
    assert_eq!(
        german,
        "Systemaktualisierung: Progress calculation automatically adjusted with the version update."
    );
}

#[test]
fn status_percent_change_escapes_status_name() {
    let directory: Vec<ScheduledEntity> = Vec::new();
    let viewer = Actor::new(1, "alice");
    let cause = ChangeCause::ProgressRuleChanged {
        change: ProgressRuleChange::StatusPercentChanged {
            status_name: "<b>QA</b>".into(),
            old_percent: 40,
            new_percent: 60,
        },
    };

    let html = render(&cause, &viewer, "en", NoteFormat::Html, &OpenAccess, &directory);
    assert_eq!(
        html,
        "<strong>Status '&lt;b&gt;QA&lt;/b&gt;'</strong> % complete changed from 40% to 60%"
    );

    let plain = render(&cause, &viewer, "en", NoteFormat::Plain, &OpenAccess, &directory);
    assert_eq!(plain, "Status '<b>QA</b>' % complete changed from 40% to 60%");
}

#[test]
fn mode_change_has_fixed_message() {
    let directory: Vec<ScheduledEntity> = Vec::new();
    let viewer = Actor::new(1, "alice");
    let cause = ChangeCause::ProgressRuleChanged {
        change: ProgressRuleChange::ModeChangedToStatusBased,
    };
    let note = render(&cause, &viewer, "en", NoteFormat::Plain, &OpenAccess, &directory);
    assert_eq!(
        note,
        "Progress calculation updated Progress calculation mode set to status-based"
    );
}

#[test]
fn causes_serialize_with_type_tag() {
    let cause = ChangeCause::predecessor_changed(3);
    let json = serde_json::to_value(&cause).unwrap();
    assert_eq!(json["type"], "related_entity_changed");
    assert_eq!(json["upstream"], 3);
    assert_eq!(json["relation"], "predecessor");

    let legacy: ChangeCause = serde_json::from_str(
        r#"{"type":"system_update","feature":"progress_calculation_changed"}"#,
    )
    .unwrap();
    assert_eq!(
        legacy,
        ChangeCause::SystemUpdate {
            feature: SystemFeature::ProgressCalculationAdjusted
        }
    );
}
