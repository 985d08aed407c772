//! Structured reasons for schedule changes, and their rendering into journal notes.

pub mod recorder;
pub mod render;

pub use recorder::CauseRecorder;
pub use render::{CauseRenderer, EntityDirectory, RenderContext};

use crate::diff::CalendarDiff;
use crate::entity::EntityId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeCause {
    WorkingDaysChanged {
        changed_days: CalendarDiff,
    },
    RelatedEntityChanged {
        upstream: EntityId,
        #[serde(default)]
        relation: RelationKind,
    },
    SystemUpdate {
        feature: SystemFeature,
    },
    ProgressRuleChanged {
        change: ProgressRuleChange,
    },
}

impl ChangeCause {
    pub fn working_days_changed(diff: &CalendarDiff) -> Self {
        ChangeCause::WorkingDaysChanged {
            changed_days: diff.clone(),
        }
    }

    pub fn predecessor_changed(upstream: EntityId) -> Self {
        ChangeCause::RelatedEntityChanged {
            upstream,
            relation: RelationKind::Predecessor,
        }
    }

    pub fn is_direct(&self) -> bool {
        matches!(self, ChangeCause::WorkingDaysChanged { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    #[default]
    Predecessor,
    Parent,
    Child,
    Related,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemFeature {
    #[serde(alias = "progress_calculation_changed")]
    ProgressCalculationAdjusted,
    ProgressCalculationAdjustedFromDisabledMode,
    TotalsRemovedFromChildlessEntities,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressRuleChange {
    StatusPercentChanged {
        status_name: String,
        old_percent: u8,
        new_percent: u8,
    },
    ModeChangedToStatusBased,
}
