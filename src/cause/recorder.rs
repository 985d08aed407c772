use super::ChangeCause;
use crate::calculations::{PropagationResult, ShiftOrigin};
use crate::config::CausePrecedence;
use crate::diff::CalendarDiff;
use crate::entity::EntityId;
use std::collections::HashMap;

/// Assigns one cause per changed entity.
#[derive(Debug, Clone, Copy, Default)]
pub struct CauseRecorder {
    precedence: CausePrecedence,
}

impl CauseRecorder {
    pub fn new(precedence: CausePrecedence) -> Self {
        Self { precedence }
    }

    /// Unchanged results are ignored. Order follows the first appearance of
    /// each entity in `results`.
    pub fn record(
        &self,
        diff: &CalendarDiff,
        results: &[PropagationResult],
    ) -> Vec<(EntityId, ChangeCause)> {
        let mut causes: Vec<(EntityId, ChangeCause)> = Vec::new();
        let mut positions: HashMap<EntityId, usize> = HashMap::new();

        for result in results.iter().filter(|result| result.changed) {
            let cause = match result.origin {
                ShiftOrigin::Calendar => ChangeCause::working_days_changed(diff),
                ShiftOrigin::Predecessor(upstream) => ChangeCause::predecessor_changed(upstream),
            };
            match positions.get(&result.entity_id) {
                Some(&idx) => {
                    if self.replaces(&causes[idx].1, &cause) {
                        causes[idx].1 = cause;
                    }
                }
                None => {
                    positions.insert(result.entity_id, causes.len());
                    causes.push((result.entity_id, cause));
                }
            }
        }
        causes
    }

    fn replaces(&self, existing: &ChangeCause, candidate: &ChangeCause) -> bool {
        match self.precedence {
            CausePrecedence::Direct => !existing.is_direct() && candidate.is_direct(),
            CausePrecedence::Propagated => existing.is_direct() && !candidate.is_direct(),
        }
    }
}
