use crate::access::{AccessPolicy, Actor, ExecutionContext, OpenAccess};
use crate::calculations::{
    DurationPreservingRescheduler, PropagationResult, ShiftOrigin, SuccessorPropagator,
};
use crate::calendar::{CalendarError, WeekdaySet, WorkCalendar, WorkCalendarConfig};
use crate::cause::{CauseRecorder, ChangeCause};
use crate::config::{EngineConfig, NoteFormat};
use crate::diff::CalendarDiff;
use crate::entity::{EntityId, ScheduledEntity};
use crate::graph::{GraphError, RelationDag};
use crate::i18n::{Catalog, Translator};
use crate::journal::{Journal, JournalNote};
use crate::persistence::{ChangeSet, JournalEntry, ScheduleStore, StoreError};
use crate::selection::AffectedSetSelector;
use crate::validation::EntityError;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("working-day recomputation requires a system execution context")]
    NotElevated,
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error("follows relations form a cycle through entity {entity}")]
    CycleDetected { entity: EntityId },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<GraphError> for RunError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::CycleDetected { entity } => RunError::CycleDetected { entity },
        }
    }
}

/// What one run changed and what it had to skip.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub diff: CalendarDiff,
    /// One cause per committed entity, in processing order.
    pub causes: Vec<(EntityId, ChangeCause)>,
    pub results: Vec<PropagationResult>,
    pub skipped: Vec<EntityError>,
}

impl RunReport {
    pub fn changed_count(&self) -> usize {
        self.causes.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn cause_for(&self, id: EntityId) -> Option<&ChangeCause> {
        self.causes
            .iter()
            .find(|(entity_id, _)| *entity_id == id)
            .map(|(_, cause)| cause)
    }
}

pub struct Engine<S: ScheduleStore> {
    store: S,
    config: EngineConfig,
    translator: Box<dyn Translator>,
    access: Box<dyn AccessPolicy>,
}

impl<S: ScheduleStore> Engine<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            translator: Box::new(Catalog::bundled()),
            access: Box::new(OpenAccess),
        }
    }

    pub fn with_translator(mut self, translator: impl Translator + 'static) -> Self {
        self.translator = Box::new(translator);
        self
    }

    pub fn with_access(mut self, access: impl AccessPolicy + 'static) -> Self {
        self.access = Box::new(access);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// The stored calendar, or Monday to Friday when none was saved yet.
    pub fn current_calendar(&self) -> Result<WorkCalendar, RunError> {
        match self.store.load_calendar()? {
            Some(config) => Ok(WorkCalendar::from_config(&config)?),
            None => Ok(WorkCalendar::default()),
        }
    }

    /// Reschedule everything affected by the transition from `previous` to the
    /// stored calendar, then commit dates and journal entries together.
    pub fn run(
        &mut self,
        ctx: &ExecutionContext,
        previous: &WorkCalendar,
    ) -> Result<RunReport, RunError> {
        if !ctx.is_system() {
            return Err(RunError::NotElevated);
        }
        let current = self.current_calendar()?;
        self.transition(ctx, previous, &current, None)
    }

    /// Like [`Engine::run`], with the previous calendar being the stored one
    /// with its working weekdays replaced by `previous_weekdays`.
    pub fn run_weekdays(
        &mut self,
        ctx: &ExecutionContext,
        previous_weekdays: WeekdaySet,
    ) -> Result<RunReport, RunError> {
        let previous = self.current_calendar()?.with_weekdays(previous_weekdays)?;
        self.run(ctx, &previous)
    }

    /// Store `next` as the working calendar and apply the transition. The
    /// calendar is written in the same commit as the rescheduled dates, so a
    /// failed run leaves the previous calendar in place.
    pub fn apply_calendar(
        &mut self,
        ctx: &ExecutionContext,
        next: &WorkCalendar,
    ) -> Result<RunReport, RunError> {
        if !ctx.is_system() {
            return Err(RunError::NotElevated);
        }
        let previous = self.current_calendar()?;
        self.transition(ctx, &previous, next, Some(next.to_config()))
    }

    fn transition(
        &mut self,
        ctx: &ExecutionContext,
        previous: &WorkCalendar,
        current: &WorkCalendar,
        save: Option<WorkCalendarConfig>,
    ) -> Result<RunReport, RunError> {
        let span = info_span!("working_days_run", actor = %ctx.actor().login);
        let _guard = span.enter();

        let diff = CalendarDiff::between(previous, current);
        if diff.is_empty() {
            debug!("calendar unchanged, nothing to reschedule");
            if save.is_some() {
                self.store.commit(&ChangeSet {
                    calendar: save,
                    ..ChangeSet::default()
                })?;
            }
            return Ok(RunReport {
                diff,
                ..RunReport::default()
            });
        }

        let loaded = self.store.load_entities()?;
        let relations = self.store.load_relations()?;
        let dag = RelationDag::build(&relations)?;

        let selector = AffectedSetSelector::new(&loaded);
        let direct = selector.covering_changed_days(&diff);
        let lag_sensitive = selector.lag_sensitive_successors(&relations);

        let original: BTreeMap<EntityId, ScheduledEntity> = loaded
            .into_iter()
            .map(|entity| (entity.id, entity))
            .collect();
        let mut entities = original.clone();
        let range = self.config.date_range();

        let mut results = Vec::new();
        let mut skipped = Vec::new();
        let mut moved = Vec::new();

        let rescheduler = DurationPreservingRescheduler::new(current, range);
        for id in direct {
            let Some(entity) = entities.get(&id) else {
                continue;
            };
            match rescheduler.reschedule(entity) {
                Ok(rescheduled) => {
                    if rescheduled.changed {
                        debug!(entity = id, "rescheduled under new working days");
                        moved.push(id);
                    }
                    results.push(PropagationResult {
                        entity_id: id,
                        previous: rescheduled.previous,
                        current: rescheduled.entity.dates(),
                        changed: rescheduled.changed,
                        origin: ShiftOrigin::Calendar,
                    });
                    entities.insert(id, rescheduled.entity);
                }
                Err(err) => skipped.push(err),
            }
        }

        let propagator = SuccessorPropagator::new(current, &dag, range);
        let outcome = propagator.propagate(&mut entities, &moved, &lag_sensitive)?;
        results.extend(outcome.results);
        skipped.extend(outcome.skipped);

        let mut seen = HashSet::new();
        skipped.retain(|err| seen.insert(err.entity_id()));
        for err in &skipped {
            warn!(entity = err.entity_id(), error = %err, "skipped entity");
        }

        // An entity that moved and came back to its stored dates gets no note.
        let causes: Vec<(EntityId, ChangeCause)> = CauseRecorder::new(self.config.cause_precedence)
            .record(&diff, &results)
            .into_iter()
            .filter(|(id, _)| {
                entities.get(id).map(ScheduledEntity::dates)
                    != original.get(id).map(ScheduledEntity::dates)
            })
            .collect();

        let mut change_set = ChangeSet {
            calendar: save,
            ..ChangeSet::default()
        };
        for (id, cause) in &causes {
            if let Some(entity) = entities.get(id) {
                change_set.entities.push(entity.clone());
                change_set.journal.push(JournalEntry::new(*id, cause.clone()));
            }
        }
        if !change_set.is_empty() {
            self.store.commit(&change_set)?;
        }

        info!(
            changed = causes.len(),
            skipped = skipped.len(),
            "working-day change applied"
        );
        Ok(RunReport {
            diff,
            causes,
            results,
            skipped,
        })
    }

    /// Stored journal rendered for `viewer`.
    pub fn render_journal(
        &self,
        viewer: &Actor,
        locale: &str,
        format: NoteFormat,
    ) -> Result<Vec<JournalNote>, RunError> {
        let entries = self.store.load_journal()?;
        let directory = self.store.load_entities()?;
        let journal = Journal::new(
            self.translator.as_ref(),
            self.access.as_ref(),
            &directory,
            &self.config.link_base,
        );
        Ok(journal.render(&entries, viewer, locale, format))
    }
}
