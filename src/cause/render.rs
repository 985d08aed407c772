use super::{ChangeCause, ProgressRuleChange, RelationKind, SystemFeature};
use crate::access::{AccessPolicy, Actor};
use crate::config::NoteFormat;
use crate::diff::CalendarDiff;
use crate::entity::{EntityId, ScheduledEntity};
use crate::i18n::Translator;
use std::collections::{BTreeMap, HashMap};

/// Resolves an entity id for link rendering.
pub trait EntityDirectory {
    fn find_entity(&self, id: EntityId) -> Option<ScheduledEntity>;
}

impl EntityDirectory for BTreeMap<EntityId, ScheduledEntity> {
    fn find_entity(&self, id: EntityId) -> Option<ScheduledEntity> {
        self.get(&id).cloned()
    }
}

impl EntityDirectory for HashMap<EntityId, ScheduledEntity> {
    fn find_entity(&self, id: EntityId) -> Option<ScheduledEntity> {
        self.get(&id).cloned()
    }
}

impl EntityDirectory for Vec<ScheduledEntity> {
    fn find_entity(&self, id: EntityId) -> Option<ScheduledEntity> {
        self.iter().find(|entity| entity.id == id).cloned()
    }
}

pub struct RenderContext<'a> {
    pub viewer: &'a Actor,
    pub locale: &'a str,
    pub format: NoteFormat,
    pub translator: &'a dyn Translator,
    pub access: &'a dyn AccessPolicy,
    pub directory: &'a dyn EntityDirectory,
    pub link_base: &'a str,
}

pub struct CauseRenderer<'a> {
    ctx: RenderContext<'a>,
}

impl<'a> CauseRenderer<'a> {
    pub fn new(ctx: RenderContext<'a>) -> Self {
        Self { ctx }
    }

    pub fn render(&self, cause: &ChangeCause) -> String {
        let title = self.title(cause);
        let description = match cause {
            ChangeCause::WorkingDaysChanged { changed_days } => self.working_days_changed(changed_days),
            ChangeCause::RelatedEntityChanged { upstream, relation } => {
                self.related_entity_changed(*upstream, *relation)
            }
            ChangeCause::SystemUpdate { feature } => self.system_update(*feature),
            ChangeCause::ProgressRuleChanged { change } => self.progress_rule_changed(change),
        };
        match self.ctx.format {
            NoteFormat::Html => format!("<strong>{title}</strong> {description}"),
            NoteFormat::Plain => format!("{title} {description}"),
        }
    }

    fn t(&self, key: &str, args: &[(&str, &str)]) -> String {
        self.ctx.translator.translate(key, self.ctx.locale, args)
    }

    fn is_html(&self) -> bool {
        self.ctx.format == NoteFormat::Html
    }

    fn title(&self, cause: &ChangeCause) -> String {
        match cause {
            ChangeCause::WorkingDaysChanged { .. } | ChangeCause::RelatedEntityChanged { .. } => {
                self.t("journals.caused_changes.dates_changed", &[])
            }
            ChangeCause::SystemUpdate { .. } => self.t("journals.caused_changes.system_update", &[]),
            ChangeCause::ProgressRuleChanged {
                change: ProgressRuleChange::StatusPercentChanged { status_name, .. },
            } => {
                let status_name = self.escape_if_html(status_name);
                self.t(
                    "journals.caused_changes.status_percent_changed",
                    &[("status_name", &status_name)],
                )
            }
            ChangeCause::ProgressRuleChanged {
                change: ProgressRuleChange::ModeChangedToStatusBased,
            } => self.t("journals.caused_changes.progress_mode_changed_to_status_based", &[]),
        }
    }

    /// Weekdays Monday first, then dates ascending.
    fn working_days_changed(&self, diff: &CalendarDiff) -> String {
        let mut weekdays = diff.weekdays.clone();
        weekdays.sort_by_key(|change| change.weekday.num_days_from_monday());
        let mut dates = diff.dates.clone();
        dates.sort();

        let day_clauses = weekdays.iter().map(|change| {
            let day = self.ctx.translator.day_name(change.weekday, self.ctx.locale);
            self.t(
                if change.working {
                    "journals.cause_descriptions.working_days_changed.days.working"
                } else {
                    "journals.cause_descriptions.working_days_changed.days.non_working"
                },
                &[("day", &day)],
            )
        });
        let date_clauses = dates.iter().map(|change| {
            let date = self.ctx.translator.format_date(change.date, self.ctx.locale);
            self.t(
                if change.working {
                    "journals.cause_descriptions.working_days_changed.dates.working"
                } else {
                    "journals.cause_descriptions.working_days_changed.dates.non_working"
                },
                &[("date", &date)],
            )
        });
        let changes = day_clauses.chain(date_clauses).collect::<Vec<_>>().join(", ");

        self.t(
            "journals.cause_descriptions.working_days_changed.changed",
            &[("changes", &changes)],
        )
    }

    fn related_entity_changed(&self, upstream: EntityId, relation: RelationKind) -> String {
        let visible = self
            .ctx
            .directory
            .find_entity(upstream)
            .filter(|entity| self.ctx.access.can_view(self.ctx.viewer, entity));
        let Some(entity) = visible else {
            return self.t("journals.cause_descriptions.unaccessible_entity_changed", &[]);
        };

        let link = if self.is_html() {
            self.entity_link(&entity)
        } else {
            format!("#{}", entity.id)
        };
        let key = match relation {
            RelationKind::Predecessor => "journals.cause_descriptions.related_changed.predecessor",
            RelationKind::Parent => "journals.cause_descriptions.related_changed.parent",
            RelationKind::Child => "journals.cause_descriptions.related_changed.child",
            RelationKind::Related => "journals.cause_descriptions.related_changed.related",
        };
        self.t(key, &[("link", &link)])
    }

    fn entity_link(&self, entity: &ScheduledEntity) -> String {
        let label = match &entity.project {
            Some(project) => format!("{project}: {} #{}", entity.subject, entity.id),
            None => format!("{} #{}", entity.subject, entity.id),
        };
        format!(
            "<a href=\"{}/entities/{}\" class=\"entity-link\">{}</a>",
            self.ctx.link_base.trim_end_matches('/'),
            entity.id,
            escape_html(&label)
        )
    }

    fn system_update(&self, feature: SystemFeature) -> String {
        let base = self.ctx.link_base.trim_end_matches('/');
        let (key, href) = match feature {
            SystemFeature::ProgressCalculationAdjusted => (
                "journals.cause_descriptions.system_update.progress_calculation_adjusted",
                format!("{base}/help/progress-calculation"),
            ),
            SystemFeature::ProgressCalculationAdjustedFromDisabledMode => (
                "journals.cause_descriptions.system_update.progress_calculation_adjusted_from_disabled_mode",
                format!("{base}/help/progress-calculation"),
            ),
            SystemFeature::TotalsRemovedFromChildlessEntities => (
                "journals.cause_descriptions.system_update.totals_removed_from_childless_entities",
                format!("{base}/help/release-notes"),
            ),
        };
        let message = self.t(key, &[("href", &href)]);
        if self.is_html() {
            message
        } else {
            strip_tags(&message)
        }
    }

    fn progress_rule_changed(&self, change: &ProgressRuleChange) -> String {
        match change {
            ProgressRuleChange::StatusPercentChanged {
                old_percent,
                new_percent,
                ..
            } => self.t(
                "journals.cause_descriptions.status_percent_changed",
                &[
                    ("old_value", &old_percent.to_string()),
                    ("new_value", &new_percent.to_string()),
                ],
            ),
            ProgressRuleChange::ModeChangedToStatusBased => self.t(
                "journals.cause_descriptions.progress_mode_changed_to_status_based",
                &[],
            ),
        }
    }

    fn escape_if_html(&self, text: &str) -> String {
        if self.is_html() {
            escape_html(text)
        } else {
            text.to_string()
        }
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}
