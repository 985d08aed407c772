use crate::calendar::{WorkCalendar, WorkCalendarConfig};
use crate::cause::ChangeCause;
use crate::entity::{EntityId, FollowsRelation, ScheduledEntity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeJsonError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("serialization error: {0}")]
    Serialization(#[from] SerdeJsonError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("entity {0} not found")]
    NotFound(EntityId),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One journal line: the entity that changed and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub entity_id: EntityId,
    pub cause: ChangeCause,
    pub recorded_at: DateTime<Utc>,
}

impl JournalEntry {
    pub fn new(entity_id: EntityId, cause: ChangeCause) -> Self {
        Self {
            entity_id,
            cause,
            recorded_at: Utc::now(),
        }
    }
}

/// Everything one run writes. Applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Calendar to store alongside the rescheduled dates.
    pub calendar: Option<WorkCalendarConfig>,
    pub entities: Vec<ScheduledEntity>,
    pub journal: Vec<JournalEntry>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.calendar.is_none() && self.entities.is_empty() && self.journal.is_empty()
    }
}

pub trait ScheduleStore {
    fn load_calendar(&self) -> StoreResult<Option<WorkCalendarConfig>>;
    /// Ordered by start ascending (unset first), then due ascending, then id.
    fn load_entities(&self) -> StoreResult<Vec<ScheduledEntity>>;
    fn load_relations(&self) -> StoreResult<Vec<FollowsRelation>>;
    /// Update existing entities and append journal entries in one unit.
    /// Unknown entity ids fail the whole commit.
    fn commit(&mut self, change_set: &ChangeSet) -> StoreResult<()>;
    fn load_journal(&self) -> StoreResult<Vec<JournalEntry>>;
    fn replace_project(&mut self, snapshot: &ProjectSnapshot) -> StoreResult<()>;
}

pub fn validate_snapshot(snapshot: &ProjectSnapshot) -> StoreResult<()> {
    if let Some(config) = &snapshot.calendar {
        WorkCalendar::from_config(config).map_err(|err| StoreError::InvalidData(err.to_string()))?;
    }
    crate::validation::validate_project(&snapshot.entities, &snapshot.relations)
        .map_err(|err| StoreError::InvalidData(err.to_string()))
}

pub mod file;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{
    ProjectSnapshot, load_entities_from_csv, load_relations_from_csv, load_snapshot_from_json,
    save_entities_to_csv, save_relations_to_csv, save_snapshot_to_json,
};
pub use memory::InMemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
