//! # Scheduler Configuration
//!
//! Compile-time constants governing the scheduler and its resources.
//! All limits are fixed at compile time; creation requests beyond them are
//! rejected, never grown.

use std::time::Duration;

/// Maximum number of tasks a scheduler can register.
pub const MAX_TASKS: usize = 32;

/// Number of distinct priority levels. Valid priorities are
/// `0..MAX_PRIORITIES`, higher value = more important. Rate-monotonic
/// assignment hands out `MAX_PRIORITIES - 1` to the shortest period.
pub const MAX_PRIORITIES: usize = 16;

/// Maximum number of semaphores (mutual-exclusion resources).
pub const MAX_RESOURCES: usize = 16;

/// Maximum number of one-shot events.
pub const MAX_EVENTS: usize = 16;

/// Initial count of a semaphore created with
/// [`Scheduler::create_semaphore`](crate::scheduler::Scheduler::create_semaphore).
/// A count of 1 gives binary hand-off semantics.
pub const DEFAULT_SEMAPHORE_COUNT: u32 = 1;

/// How long the dispatch thread sleeps when no task is ready before it
/// rescans the registry.
pub const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Name given to the dispatch thread.
pub const DISPATCH_THREAD_NAME: &str = "rmsched-dispatch";
