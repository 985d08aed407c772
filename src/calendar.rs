use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    #[error("working calendar requires at least one working weekday")]
    NoWorkingWeekdays,
    #[error("invalid weekday '{0}'")]
    InvalidWeekday(String),
}

/// Working/non-working flag per weekday, indexed Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WeekdaySet([bool; 7]);

impl WeekdaySet {
    pub const ALL_WEEKDAYS: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    pub fn empty() -> Self {
        Self([false; 7])
    }

    pub fn monday_to_friday() -> Self {
        Self([true, true, true, true, true, false, false])
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0[day.num_days_from_monday() as usize]
    }

    pub fn set(&mut self, day: Weekday, working: bool) {
        self.0[day.num_days_from_monday() as usize] = working;
    }

    pub fn is_empty(&self) -> bool {
        !self.0.iter().any(|working| *working)
    }

    /// Working weekdays in Monday-first order.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        Self::ALL_WEEKDAYS
            .into_iter()
            .filter(move |day| self.contains(*day))
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<T: IntoIterator<Item = Weekday>>(iter: T) -> Self {
        let mut set = Self::empty();
        for day in iter {
            set.set(day, true);
        }
        set
    }
}

impl FromStr for WeekdaySet {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut set = Self::empty();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let day = part
                .parse::<Weekday>()
                .map_err(|_| CalendarError::InvalidWeekday(part.to_string()))?;
            set.set(day, true);
        }
        Ok(set)
    }
}

impl fmt::Display for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days: Vec<String> = self.iter().map(|day| day.to_string()).collect();
        write!(f, "{}", days.join(","))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkCalendar {
    weekdays: WeekdaySet,
    overrides: BTreeMap<NaiveDate, bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateOverride {
    pub date: NaiveDate,
    pub working: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkCalendarConfig {
    working_days: Vec<Weekday>,
    #[serde(default)]
    overrides: Vec<DateOverride>,
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self {
            weekdays: WeekdaySet::monday_to_friday(),
            overrides: BTreeMap::new(),
        }
    }
}

impl WorkCalendar {
    pub fn new(weekdays: WeekdaySet) -> Result<Self, CalendarError> {
        if weekdays.is_empty() {
            return Err(CalendarError::NoWorkingWeekdays);
        }
        Ok(Self {
            weekdays,
            overrides: BTreeMap::new(),
        })
    }

    pub fn custom<I, J>(working_days: I, overrides: J) -> Result<Self, CalendarError>
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = DateOverride>,
    {
        let mut calendar = Self::new(working_days.into_iter().collect())?;
        for item in overrides {
            calendar.set_override(item.date, item.working);
        }
        Ok(calendar)
    }

    pub fn from_config(config: &WorkCalendarConfig) -> Result<Self, CalendarError> {
        Self::custom(
            config.working_days.iter().copied(),
            config.overrides.iter().copied(),
        )
    }

    pub fn to_config(&self) -> WorkCalendarConfig {
        WorkCalendarConfig::from(self)
    }

    pub fn weekdays(&self) -> WeekdaySet {
        self.weekdays
    }

    pub fn overrides(&self) -> &BTreeMap<NaiveDate, bool> {
        &self.overrides
    }

    /// Same overrides, different working weekdays.
    pub fn with_weekdays(&self, weekdays: WeekdaySet) -> Result<Self, CalendarError> {
        if weekdays.is_empty() {
            return Err(CalendarError::NoWorkingWeekdays);
        }
        Ok(Self {
            weekdays,
            overrides: self.overrides.clone(),
        })
    }

    /// Mark a specific date as working or non-working regardless of its weekday.
    pub fn set_override(&mut self, date: NaiveDate, working: bool) {
        self.overrides.insert(date, working);
    }

    pub fn clear_override(&mut self, date: NaiveDate) {
        self.overrides.remove(&date);
    }

    pub fn add_non_working_date(&mut self, date: NaiveDate) {
        self.set_override(date, false);
    }

    pub fn is_working(&self, date: NaiveDate) -> bool {
        self.overrides
            .get(&date)
            .copied()
            .unwrap_or_else(|| self.weekdays.contains(date.weekday()))
    }

    /// First working day on or after `from`.
    pub fn snap_forward(&self, from: NaiveDate) -> Option<NaiveDate> {
        let mut current = from;
        while !self.is_working(current) {
            current = current.succ_opt()?;
        }
        Some(current)
    }

    /// Last working day on or before `from`.
    pub fn snap_backward(&self, from: NaiveDate) -> Option<NaiveDate> {
        let mut current = from;
        while !self.is_working(current) {
            current = current.pred_opt()?;
        }
        Some(current)
    }

    /// Find the date `steps` working days after `from`.
    pub fn advance(&self, from: NaiveDate, steps: u32) -> Option<NaiveDate> {
        let mut current = from;
        let mut count = 0;
        while count < steps {
            current = current.succ_opt()?;
            if self.is_working(current) {
                count += 1;
            }
        }
        Some(current)
    }

    /// Find the date `steps` working days before `from` (inverse of `advance`).
    pub fn retreat(&self, from: NaiveDate, steps: u32) -> Option<NaiveDate> {
        let mut current = from;
        let mut count = 0;
        while count < steps {
            current = current.pred_opt()?;
            if self.is_working(current) {
                count += 1;
            }
        }
        Some(current)
    }

    /// Count working days in `(start, end]`; zero when `end <= start`.
    pub fn steps_between(&self, start: NaiveDate, end: NaiveDate) -> u32 {
        let mut count = 0;
        let mut current = start;
        while current < end {
            match current.succ_opt() {
                Some(next) => current = next,
                None => break,
            }
            if self.is_working(current) {
                count += 1;
            }
        }
        count
    }

    /// Get all working days in a date range (inclusive).
    pub fn working_days_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        start
            .iter_days()
            .take_while(|day| *day <= end)
            .filter(|day| self.is_working(*day))
            .collect()
    }

    pub fn arithmetic(&self, ignore_non_working_days: bool) -> DayArithmetic<'_> {
        if ignore_non_working_days {
            DayArithmetic::CalendarDays
        } else {
            DayArithmetic::WorkingDays(self)
        }
    }
}

/// Date stepping either over working days or over plain calendar days.
#[derive(Debug, Clone, Copy)]
pub enum DayArithmetic<'a> {
    WorkingDays(&'a WorkCalendar),
    CalendarDays,
}

impl DayArithmetic<'_> {
    pub fn snap_forward(&self, from: NaiveDate) -> Option<NaiveDate> {
        match self {
            DayArithmetic::WorkingDays(calendar) => calendar.snap_forward(from),
            DayArithmetic::CalendarDays => Some(from),
        }
    }

    pub fn snap_backward(&self, from: NaiveDate) -> Option<NaiveDate> {
        match self {
            DayArithmetic::WorkingDays(calendar) => calendar.snap_backward(from),
            DayArithmetic::CalendarDays => Some(from),
        }
    }

    pub fn advance(&self, from: NaiveDate, steps: u32) -> Option<NaiveDate> {
        match self {
            DayArithmetic::WorkingDays(calendar) => calendar.advance(from, steps),
            DayArithmetic::CalendarDays => from.checked_add_days(chrono::Days::new(steps.into())),
        }
    }

    pub fn retreat(&self, from: NaiveDate, steps: u32) -> Option<NaiveDate> {
        match self {
            DayArithmetic::WorkingDays(calendar) => calendar.retreat(from, steps),
            DayArithmetic::CalendarDays => from.checked_sub_days(chrono::Days::new(steps.into())),
        }
    }

    pub fn steps_between(&self, start: NaiveDate, end: NaiveDate) -> u32 {
        match self {
            DayArithmetic::WorkingDays(calendar) => calendar.steps_between(start, end),
            DayArithmetic::CalendarDays => {
                u32::try_from((end - start).num_days().max(0)).unwrap_or(u32::MAX)
            }
        }
    }
}

impl WorkCalendarConfig {
    pub fn new<I, J>(working_days: I, overrides: J) -> Self
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = DateOverride>,
    {
        let mut working: Vec<Weekday> = working_days.into_iter().collect();
        working.sort_by_key(|wd| wd.num_days_from_monday());
        working.dedup();

        // Later entries win for duplicate dates.
        let by_date: BTreeMap<NaiveDate, bool> = overrides
            .into_iter()
            .map(|item| (item.date, item.working))
            .collect();

        Self {
            working_days: working,
            overrides: by_date
                .into_iter()
                .map(|(date, working)| DateOverride { date, working })
                .collect(),
        }
    }

    pub fn working_days(&self) -> &[Weekday] {
        &self.working_days
    }

    pub fn overrides(&self) -> &[DateOverride] {
        &self.overrides
    }
}

impl Default for WorkCalendarConfig {
    fn default() -> Self {
        WorkCalendarConfig::from(&WorkCalendar::default())
    }
}

impl From<&WorkCalendar> for WorkCalendarConfig {
    fn from(calendar: &WorkCalendar) -> Self {
        Self {
            working_days: calendar.weekdays.iter().collect(),
            overrides: calendar
                .overrides
                .iter()
                .map(|(date, working)| DateOverride {
                    date: *date,
                    working: *working,
                })
                .collect(),
        }
    }
}
