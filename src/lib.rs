pub mod access;
pub mod calculations;
pub mod calendar;
pub mod cause;
pub mod config;
pub mod diff;
pub mod engine;
pub mod entity;
pub mod graph;
pub mod i18n;
pub mod journal;
pub mod persistence;
pub mod selection;
pub mod validation;

pub use access::{AccessPolicy, Actor, ExecutionContext, OpenAccess, ProjectMembership};
pub use calendar::{CalendarError, WeekdaySet, WorkCalendar, WorkCalendarConfig};
pub use cause::ChangeCause;
pub use config::{CausePrecedence, EngineConfig, NoteFormat};
pub use diff::CalendarDiff;
pub use engine::{Engine, RunError, RunReport};
pub use entity::{EntityId, FollowsRelation, ScheduledEntity};
pub use i18n::{Catalog, Translator};
pub use journal::{AuditSink, Journal, JournalNote, publish};
pub use persistence::{ScheduleStore, StoreError};
