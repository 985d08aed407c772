use crate::diff::CalendarDiff;
use crate::entity::{EntityId, FollowsRelation, ScheduledEntity, schedule_order};
use std::collections::HashSet;

/// Read-only candidate queries for a calendar change.
pub struct AffectedSetSelector<'a> {
    entities: &'a [ScheduledEntity],
}

impl<'a> AffectedSetSelector<'a> {
    pub fn new(entities: &'a [ScheduledEntity]) -> Self {
        Self { entities }
    }

    /// Entities whose `[start, due]` interval contains a changed weekday or date.
    pub fn covering_changed_days(&self, diff: &CalendarDiff) -> Vec<EntityId> {
        if diff.is_empty() {
            return Vec::new();
        }
        self.ordered(|entity| {
            entity
                .interval()
                .is_some_and(|(start, due)| diff.touches(start, due))
        })
    }

    /// Successors of relations with a positive lag; the lag is counted in
    /// working days, so it moves with the calendar.
    pub fn lag_sensitive_successors(&self, relations: &[FollowsRelation]) -> Vec<EntityId> {
        let successors: HashSet<EntityId> = relations
            .iter()
            .filter(|relation| relation.lag > 0)
            .map(|relation| relation.successor)
            .collect();
        self.ordered(|entity| successors.contains(&entity.id))
    }

    fn ordered<F>(&self, predicate: F) -> Vec<EntityId>
    where
        F: Fn(&ScheduledEntity) -> bool,
    {
        let mut selected: Vec<&ScheduledEntity> =
            self.entities.iter().filter(|entity| predicate(entity)).collect();
        selected.sort_by(|a, b| schedule_order(a, b));
        let mut seen = HashSet::with_capacity(selected.len());
        selected
            .into_iter()
            .filter(|entity| seen.insert(entity.id))
            .map(|entity| entity.id)
            .collect()
    }
}
