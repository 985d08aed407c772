use crate::calendar::{WeekdaySet, WorkCalendar};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayChange {
    pub weekday: Weekday,
    pub working: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DateChange {
    pub date: NaiveDate,
    pub working: bool,
}

/// Symmetric difference between two working-day definitions, tagged with the
/// new state of every flipped weekday or date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDiff {
    /// Monday first.
    pub weekdays: Vec<WeekdayChange>,
    /// Ascending.
    pub dates: Vec<DateChange>,
}

impl CalendarDiff {
    pub fn between(previous: &WorkCalendar, current: &WorkCalendar) -> Self {
        let weekdays = Self::weekday_changes(previous.weekdays(), current.weekdays());

        let candidates: BTreeSet<NaiveDate> = previous
            .overrides()
            .keys()
            .chain(current.overrides().keys())
            .copied()
            .collect();
        let dates = candidates
            .into_iter()
            .filter(|date| previous.is_working(*date) != current.is_working(*date))
            .map(|date| DateChange {
                date,
                working: current.is_working(date),
            })
            .collect();

        Self { weekdays, dates }
    }

    pub fn weekday_changes(previous: WeekdaySet, current: WeekdaySet) -> Vec<WeekdayChange> {
        WeekdaySet::ALL_WEEKDAYS
            .into_iter()
            .filter(|day| previous.contains(*day) != current.contains(*day))
            .map(|weekday| WeekdayChange {
                weekday,
                working: current.contains(weekday),
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.weekdays.is_empty() && self.dates.is_empty()
    }

    pub fn changed_weekdays(&self) -> WeekdaySet {
        self.weekdays.iter().map(|change| change.weekday).collect()
    }

    /// Whether any changed weekday or changed date falls in `[start, end]`.
    pub fn touches(&self, start: NaiveDate, end: NaiveDate) -> bool {
        if end < start {
            return false;
        }
        if self
            .dates
            .iter()
            .any(|change| change.date >= start && change.date <= end)
        {
            return true;
        }
        if self.weekdays.is_empty() {
            return false;
        }
        // A week or longer covers every weekday.
        if (end - start).num_days() >= 6 {
            return true;
        }
        let changed = self.changed_weekdays();
        start
            .iter_days()
            .take_while(|day| *day <= end)
            .any(|day| changed.contains(day.weekday()))
    }
}
