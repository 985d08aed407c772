use super::{ChangeSet, JournalEntry, ProjectSnapshot, ScheduleStore, StoreError, StoreResult};
use crate::calendar::WorkCalendarConfig;
use crate::entity::{EntityId, FollowsRelation, ScheduledEntity, schedule_order};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    calendar: Option<WorkCalendarConfig>,
    entities: BTreeMap<EntityId, ScheduledEntity>,
    relations: Vec<FollowsRelation>,
    journal: Vec<JournalEntry>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: &ProjectSnapshot) -> StoreResult<Self> {
        let mut store = Self::new();
        store.replace_project(snapshot)?;
        Ok(store)
    }

    pub fn entity(&self, id: EntityId) -> Option<&ScheduledEntity> {
        self.entities.get(&id)
    }
}

impl ScheduleStore for InMemoryStore {
    fn load_calendar(&self) -> StoreResult<Option<WorkCalendarConfig>> {
        Ok(self.calendar.clone())
    }

    fn load_entities(&self) -> StoreResult<Vec<ScheduledEntity>> {
        let mut entities: Vec<ScheduledEntity> = self.entities.values().cloned().collect();
        entities.sort_by(schedule_order);
        Ok(entities)
    }

    fn load_relations(&self) -> StoreResult<Vec<FollowsRelation>> {
        Ok(self.relations.clone())
    }

    fn commit(&mut self, change_set: &ChangeSet) -> StoreResult<()> {
        // Check everything before touching anything.
        for entity in &change_set.entities {
            if !self.entities.contains_key(&entity.id) {
                return Err(StoreError::NotFound(entity.id));
            }
        }
        for entry in &change_set.journal {
            if !self.entities.contains_key(&entry.entity_id) {
                return Err(StoreError::NotFound(entry.entity_id));
            }
        }

        if let Some(calendar) = &change_set.calendar {
            self.calendar = Some(calendar.clone());
        }
        for entity in &change_set.entities {
            self.entities.insert(entity.id, entity.clone());
        }
        self.journal.extend(change_set.journal.iter().cloned());
        Ok(())
    }

    fn load_journal(&self) -> StoreResult<Vec<JournalEntry>> {
        Ok(self.journal.clone())
    }

    fn replace_project(&mut self, snapshot: &ProjectSnapshot) -> StoreResult<()> {
        super::validate_snapshot(snapshot)?;
        if let Some(calendar) = &snapshot.calendar {
            self.calendar = Some(calendar.clone());
        }
        self.entities = snapshot
            .entities
            .iter()
            .map(|entity| (entity.id, entity.clone()))
            .collect();
        self.relations = snapshot.relations.clone();
        self.journal.clear();
        Ok(())
    }
}
