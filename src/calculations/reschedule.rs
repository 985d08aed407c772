use crate::calendar::WorkCalendar;
use crate::entity::{DatePair, ScheduledEntity};
use crate::validation::{self, DateRange, EntityError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rescheduled {
    pub entity: ScheduledEntity,
    pub previous: DatePair,
    pub changed: bool,
}

/// Recomputes an entity's dates under a new calendar while keeping its duration.
pub struct DurationPreservingRescheduler<'a> {
    calendar: &'a WorkCalendar,
    range: DateRange,
}

impl<'a> DurationPreservingRescheduler<'a> {
    pub fn new(calendar: &'a WorkCalendar, range: DateRange) -> Self {
        Self { calendar, range }
    }

    pub fn reschedule(&self, entity: &ScheduledEntity) -> Result<Rescheduled, EntityError> {
        validation::validate_entity(entity)?;

        let previous = entity.dates();
        let mut updated = entity.clone();

        // Calendar-day arithmetic does not depend on which weekdays are working.
        if entity.ignore_non_working_days {
            return Ok(Rescheduled {
                entity: updated,
                previous,
                changed: false,
            });
        }
        let Some(duration) = entity.duration else {
            return Ok(Rescheduled {
                entity: updated,
                previous,
                changed: false,
            });
        };

        match (entity.start_date, entity.due_date) {
            (Some(start), _) => {
                let start = self
                    .range
                    .ensure(entity.id, self.calendar.snap_forward(start))?;
                let due = self
                    .range
                    .ensure(entity.id, self.calendar.advance(start, duration))?;
                updated.start_date = Some(start);
                updated.due_date = Some(due);
            }
            (None, Some(due)) => {
                let due = self
                    .range
                    .ensure(entity.id, self.calendar.snap_backward(due))?;
                let start = self
                    .range
                    .ensure(entity.id, self.calendar.retreat(due, duration))?;
                updated.start_date = Some(start);
                updated.due_date = Some(due);
            }
            (None, None) => {}
        }

        let changed = updated.dates() != previous;
        Ok(Rescheduled {
            entity: updated,
            previous,
            changed,
        })
    }
}
