use crate::calendar::WorkCalendar;
use crate::entity::{DatePair, EntityId, ScheduledEntity};
use crate::graph::{GraphError, RelationDag};
use crate::validation::{self, DateRange, EntityError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

/// Why an entity's dates moved during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftOrigin {
    Calendar,
    Predecessor(EntityId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagationResult {
    pub entity_id: EntityId,
    pub previous: DatePair,
    pub current: DatePair,
    pub changed: bool,
    pub origin: ShiftOrigin,
}

#[derive(Debug, Default)]
pub struct PropagationOutcome {
    /// Every evaluated successor, in topological order.
    pub results: Vec<PropagationResult>,
    pub skipped: Vec<EntityError>,
}

impl PropagationOutcome {
    pub fn changed(&self) -> impl Iterator<Item = &PropagationResult> {
        self.results.iter().filter(|result| result.changed)
    }
}

/// Cascades date changes along follows relations, shifting successors forward
/// only as far as their lag constraints require.
pub struct SuccessorPropagator<'a> {
    calendar: &'a WorkCalendar,
    dag: &'a RelationDag,
    range: DateRange,
}

impl<'a> SuccessorPropagator<'a> {
    pub fn new(calendar: &'a WorkCalendar, dag: &'a RelationDag, range: DateRange) -> Self {
        Self {
            calendar,
            dag,
            range,
        }
    }

    /// `changed` are entities whose dates already moved; their successors are
    /// re-evaluated, and so are they. `recheck` are evaluated even though none
    /// of their predecessors moved.
    pub fn propagate(
        &self,
        entities: &mut BTreeMap<EntityId, ScheduledEntity>,
        changed: &[EntityId],
        recheck: &[EntityId],
    ) -> Result<PropagationOutcome, GraphError> {
        let mut outcome = PropagationOutcome::default();
        let mut worklist: BTreeSet<(usize, EntityId)> = BTreeSet::new();
        let mut visited: HashSet<EntityId> = HashSet::new();

        for &id in changed {
            self.enqueue(&mut worklist, &visited, id)?;
            for (successor, _) in self.dag.successors(id) {
                self.enqueue(&mut worklist, &visited, successor)?;
            }
        }
        for &id in recheck {
            self.enqueue(&mut worklist, &visited, id)?;
        }

        while let Some((_, id)) = worklist.pop_first() {
            visited.insert(id);
            let Some(entity) = entities.get(&id) else {
                continue;
            };

            // Nothing to shift without a date.
            let Some(effective_start) = self.effective_start(entity) else {
                continue;
            };
            let Some((required, upstream)) = self.required_start(entity, entities) else {
                continue;
            };
            let previous = entity.dates();
            if effective_start >= required {
                outcome.results.push(PropagationResult {
                    entity_id: id,
                    previous,
                    current: previous,
                    changed: false,
                    origin: ShiftOrigin::Predecessor(upstream),
                });
                continue;
            }

            match self.shift_to(entity, required) {
                Ok(shifted) => {
                    debug!(
                        entity = id,
                        upstream,
                        %required,
                        "shifted successor to satisfy follows relation"
                    );
                    let current = shifted.dates();
                    entities.insert(id, shifted);
                    outcome.results.push(PropagationResult {
                        entity_id: id,
                        previous,
                        current,
                        changed: current != previous,
                        origin: ShiftOrigin::Predecessor(upstream),
                    });
                    for (successor, _) in self.dag.successors(id) {
                        self.enqueue(&mut worklist, &visited, successor)?;
                    }
                }
                Err(err) => outcome.skipped.push(err),
            }
        }

        Ok(outcome)
    }

    fn enqueue(
        &self,
        worklist: &mut BTreeSet<(usize, EntityId)>,
        visited: &HashSet<EntityId>,
        id: EntityId,
    ) -> Result<(), GraphError> {
        let Some(rank) = self.dag.rank(id) else {
            return Ok(());
        };
        if visited.contains(&id) {
            return Err(GraphError::CycleDetected { entity: id });
        }
        worklist.insert((rank, id));
        Ok(())
    }

    /// Latest start demanded by any predecessor, with the predecessor that
    /// demands it (lowest id on ties).
    fn required_start(
        &self,
        entity: &ScheduledEntity,
        entities: &BTreeMap<EntityId, ScheduledEntity>,
    ) -> Option<(NaiveDate, EntityId)> {
        let arithmetic = self.calendar.arithmetic(entity.ignore_non_working_days);
        let mut required: Option<(NaiveDate, EntityId)> = None;
        for (predecessor, lag) in self.dag.predecessors(entity.id) {
            let Some(finish) = entities.get(&predecessor).and_then(ScheduledEntity::finish) else {
                continue;
            };
            // Out of date range: nothing can satisfy it, the shift will be rejected.
            let candidate = arithmetic.advance(finish, lag).unwrap_or(NaiveDate::MAX);
            if required.is_none_or(|(current, _)| candidate > current) {
                required = Some((candidate, predecessor));
            }
        }
        required
    }

    fn effective_start(&self, entity: &ScheduledEntity) -> Option<NaiveDate> {
        let arithmetic = self.calendar.arithmetic(entity.ignore_non_working_days);
        entity.start_date.or_else(|| {
            entity
                .due_date
                .and_then(|due| arithmetic.snap_backward(due))
                .and_then(|due| arithmetic.retreat(due, entity.duration.unwrap_or(0)))
        })
    }

    fn shift_to(
        &self,
        entity: &ScheduledEntity,
        required: NaiveDate,
    ) -> Result<ScheduledEntity, EntityError> {
        validation::validate_entity(entity)?;
        let arithmetic = self.calendar.arithmetic(entity.ignore_non_working_days);
        let span = match (entity.duration, entity.start_date, entity.due_date) {
            (Some(duration), _, _) => Some(duration),
            (None, Some(start), Some(due)) => Some(arithmetic.steps_between(start, due)),
            (None, None, Some(_)) => Some(0),
            (None, _, None) => None,
        };

        // A zero lag may point at a non-working finish day.
        let start = self
            .range
            .ensure(entity.id, arithmetic.snap_forward(required))?;
        let due = match span {
            Some(steps) => Some(self.range.ensure(entity.id, arithmetic.advance(start, steps))?),
            None => None,
        };

        let mut shifted = entity.clone();
        shifted.start_date = Some(start);
        shifted.due_date = due;
        Ok(shifted)
    }
}
