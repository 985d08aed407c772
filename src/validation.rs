use crate::entity::{EntityId, FollowsRelation, ScheduledEntity};
use chrono::NaiveDate;
use std::collections::HashSet;
use thiserror::Error;

/// Per-entity failure. The entity is skipped; the run goes on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityError {
    #[error("entity {id} is invalid: {reason}")]
    Invalid { id: EntityId, reason: String },
    #[error("entity {id} would be scheduled outside {min}..={max}")]
    OutOfRange {
        id: EntityId,
        min: NaiveDate,
        max: NaiveDate,
    },
}

impl EntityError {
    pub fn invalid(id: EntityId, reason: impl Into<String>) -> Self {
        EntityError::Invalid {
            id,
            reason: reason.into(),
        }
    }

    pub fn entity_id(&self) -> EntityId {
        match self {
            EntityError::Invalid { id, .. } | EntityError::OutOfRange { id, .. } => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProjectValidationError {
    message: String,
}

impl ProjectValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub fn validate_entity(entity: &ScheduledEntity) -> Result<(), EntityError> {
    if let (Some(start), Some(due)) = (entity.start_date, entity.due_date) {
        if start > due {
            return Err(EntityError::invalid(
                entity.id,
                format!("start date {start} is after due date {due}"),
            ));
        }
    }
    Ok(())
}

/// Inclusive date window that recomputed dates must stay within.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub min: NaiveDate,
    pub max: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.min && date <= self.max
    }

    /// `None` comes from exhausted date arithmetic and counts as out of range.
    pub fn ensure(&self, id: EntityId, date: Option<NaiveDate>) -> Result<NaiveDate, EntityError> {
        match date {
            Some(date) if self.contains(date) => Ok(date),
            _ => Err(EntityError::OutOfRange {
                id,
                min: self.min,
                max: self.max,
            }),
        }
    }
}

pub fn validate_project(
    entities: &[ScheduledEntity],
    relations: &[FollowsRelation],
) -> Result<(), ProjectValidationError> {
    let mut seen_ids = HashSet::with_capacity(entities.len());
    for entity in entities {
        if !seen_ids.insert(entity.id) {
            return Err(ProjectValidationError::new(format!(
                "duplicate entity id {}",
                entity.id
            )));
        }
        validate_entity(entity).map_err(|err| ProjectValidationError::new(err.to_string()))?;
    }

    let mut seen_edges = HashSet::with_capacity(relations.len());
    for relation in relations {
        if relation.predecessor == relation.successor {
            return Err(ProjectValidationError::new(format!(
                "entity {} cannot follow itself",
                relation.predecessor
            )));
        }
        for endpoint in [relation.predecessor, relation.successor] {
            if !seen_ids.contains(&endpoint) {
                return Err(ProjectValidationError::new(format!(
                    "relation {} -> {} references unknown entity {}",
                    relation.predecessor, relation.successor, endpoint
                )));
            }
        }
        if !seen_edges.insert((relation.predecessor, relation.successor)) {
            return Err(ProjectValidationError::new(format!(
                "duplicate relation {} -> {}",
                relation.predecessor, relation.successor
            )));
        }
    }
    Ok(())
}
