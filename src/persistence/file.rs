use super::{StoreError, StoreResult};
use crate::calendar::WorkCalendarConfig;
use crate::entity::{FollowsRelation, ScheduledEntity};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// A whole project: calendar, entities and relations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar: Option<WorkCalendarConfig>,
    #[serde(default)]
    pub entities: Vec<ScheduledEntity>,
    #[serde(default)]
    pub relations: Vec<FollowsRelation>,
}

pub fn save_snapshot_to_json<P: AsRef<Path>>(
    snapshot: &ProjectSnapshot,
    path: P,
) -> StoreResult<()> {
    super::validate_snapshot(snapshot)?;
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, snapshot)?;
    Ok(())
}

pub fn load_snapshot_from_json<P: AsRef<Path>>(path: P) -> StoreResult<ProjectSnapshot> {
    let file = File::open(path)?;
    let snapshot: ProjectSnapshot = serde_json::from_reader(file)?;
    super::validate_snapshot(&snapshot)?;
    Ok(snapshot)
}

#[derive(Default, Serialize, Deserialize)]
struct EntityCsvRecord {
    id: i32,
    subject: String,
    #[serde(default)]
    project: String,
    #[serde(default)]
    start_date: String,
    #[serde(default)]
    due_date: String,
    #[serde(default)]
    duration: String,
    #[serde(default)]
    ignore_non_working_days: String,
}

impl From<&ScheduledEntity> for EntityCsvRecord {
    fn from(entity: &ScheduledEntity) -> Self {
        Self {
            id: entity.id,
            subject: entity.subject.clone(),
            project: entity.project.clone().unwrap_or_default(),
            start_date: format_date(entity.start_date),
            due_date: format_date(entity.due_date),
            duration: entity.duration.map(|d| d.to_string()).unwrap_or_default(),
            ignore_non_working_days: entity.ignore_non_working_days.to_string(),
        }
    }
}

impl EntityCsvRecord {
    fn into_entity(self) -> StoreResult<ScheduledEntity> {
        let mut entity = ScheduledEntity::new(self.id, self.subject);
        entity.project = parse_string_option(self.project);
        entity.start_date = parse_date(&self.start_date)?;
        entity.due_date = parse_date(&self.due_date)?;
        entity.duration = parse_u32(&self.duration)?;
        entity.ignore_non_working_days = parse_bool(&self.ignore_non_working_days)?.unwrap_or(false);
        Ok(entity)
    }
}

pub fn save_entities_to_csv<P: AsRef<Path>>(
    entities: &[ScheduledEntity],
    path: P,
) -> StoreResult<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for entity in entities {
        writer.serialize(EntityCsvRecord::from(entity))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_entities_from_csv<P: AsRef<Path>>(path: P) -> StoreResult<Vec<ScheduledEntity>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut entities = Vec::new();
    for record in reader.deserialize::<EntityCsvRecord>() {
        entities.push(record?.into_entity()?);
    }
    if entities.is_empty() {
        return Err(StoreError::InvalidData(
            "CSV file contained no entities".into(),
        ));
    }
    Ok(entities)
}

pub fn save_relations_to_csv<P: AsRef<Path>>(
    relations: &[FollowsRelation],
    path: P,
) -> StoreResult<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for relation in relations {
        writer.serialize(relation)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_relations_from_csv<P: AsRef<Path>>(path: P) -> StoreResult<Vec<FollowsRelation>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut relations = Vec::new();
    for record in reader.deserialize::<FollowsRelation>() {
        relations.push(record?);
    }
    Ok(relations)
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn parse_date(input: &str) -> StoreResult<Option<NaiveDate>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map(Some)
        .map_err(|e| StoreError::InvalidData(format!("invalid date '{input}': {e}")))
}

fn parse_u32(input: &str) -> StoreResult<Option<u32>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    input
        .trim()
        .parse::<u32>()
        .map(Some)
        .map_err(|e| StoreError::InvalidData(format!("invalid duration '{input}': {e}")))
}

fn parse_bool(input: &str) -> StoreResult<Option<bool>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    match input.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(Some(true)),
        "false" => Ok(Some(false)),
        other => Err(StoreError::InvalidData(format!("invalid boolean '{other}'"))),
    }
}

fn parse_string_option(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
