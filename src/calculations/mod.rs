pub mod propagate;
pub mod reschedule;

pub use propagate::{PropagationOutcome, PropagationResult, ShiftOrigin, SuccessorPropagator};
pub use reschedule::{DurationPreservingRescheduler, Rescheduled};
