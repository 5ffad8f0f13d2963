//! Error types reported by scheduler operations.

use std::fmt;

use crate::task::Priority;

/// Kind of registry entry a capacity check applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Task,
    Semaphore,
    Event,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Task => "task",
            Self::Semaphore => "semaphore",
            Self::Event => "event",
        };
        f.write_str(name)
    }
}

/// Errors returned by [`Scheduler`](crate::scheduler::Scheduler) operations.
///
/// Creation failures are non-fatal: the registry is left untouched and the
/// scheduler remains usable.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The registry for `resource` already holds `limit` entries.
    #[error("{resource} capacity exceeded (limit {limit})")]
    CapacityExceeded { resource: ResourceKind, limit: usize },

    /// A task was requested with a priority outside `0..max`.
    #[error("priority {requested} out of range (must be below {max})")]
    InvalidPriority { requested: Priority, max: usize },

    /// A handle created by a different scheduler was passed in.
    #[error("handle belongs to another scheduler")]
    ForeignHandle,

    /// The dispatch thread could not be spawned.
    #[error("failed to spawn dispatch thread")]
    Spawn(#[from] std::io::Error),

    /// The dispatch thread terminated by panic, i.e. a task body panicked.
    #[error("dispatch thread panicked")]
    DispatchPanicked,
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
