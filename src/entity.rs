use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type EntityId = i32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledEntity {
    pub id: EntityId,
    #[serde(default)]
    pub subject: String,
    /// Owning project; used for visibility and link rendering only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Working-day steps from start to due.
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub ignore_non_working_days: bool,
}

impl ScheduledEntity {
    pub fn new(id: EntityId, subject: impl Into<String>) -> Self {
        Self {
            id,
            subject: subject.into(),
            project: None,
            start_date: None,
            due_date: None,
            duration: None,
            ignore_non_working_days: false,
        }
    }

    pub fn with_dates(mut self, start: Option<NaiveDate>, due: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.due_date = due;
        self
    }

    pub fn with_duration(mut self, duration: u32) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn in_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn ignoring_non_working_days(mut self) -> Self {
        self.ignore_non_working_days = true;
        self
    }

    pub fn dates(&self) -> DatePair {
        DatePair {
            start: self.start_date,
            due: self.due_date,
        }
    }

    /// `[start, due]`, degenerating to a single day when one side is unset.
    pub fn interval(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.start_date, self.due_date) {
            (Some(start), Some(due)) => Some((start, due)),
            (Some(day), None) | (None, Some(day)) => Some((day, day)),
            (None, None) => None,
        }
    }

    /// The date successors are measured against.
    pub fn finish(&self) -> Option<NaiveDate> {
        self.due_date.or(self.start_date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatePair {
    pub start: Option<NaiveDate>,
    pub due: Option<NaiveDate>,
}

/// `successor` may start no earlier than `lag` working days after `predecessor` finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FollowsRelation {
    pub predecessor: EntityId,
    pub successor: EntityId,
    #[serde(default)]
    pub lag: u32,
}

impl FollowsRelation {
    pub fn new(predecessor: EntityId, successor: EntityId, lag: u32) -> Self {
        Self {
            predecessor,
            successor,
            lag,
        }
    }
}

/// Store ordering: start ascending with unset starts first, then due, then id.
pub fn schedule_order(a: &ScheduledEntity, b: &ScheduledEntity) -> std::cmp::Ordering {
    a.start_date
        .cmp(&b.start_date)
        .then_with(|| a.due_date.cmp(&b.due_date))
        .then_with(|| a.id.cmp(&b.id))
}
