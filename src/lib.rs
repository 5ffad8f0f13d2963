//! # rmsched: Rate-Monotonic Scheduler
//!
//! A cooperative, non-preemptive, fixed-priority real-time scheduler that
//! runs inside an ordinary host process. It models the building blocks of
//! a real-time kernel so that scheduling theory can be exercised and
//! validated without hardware.
//!
//! ## Overview
//!
//! - **Rate-monotonic assignment**: on start, shorter periods receive
//!   higher static priorities
//! - **Priority dispatch**: a dedicated thread repeatedly runs the
//!   highest-priority ready task to completion
//! - **Semaphores with priority inheritance**: a resource holder runs at the
//!   priority of the highest-priority task it blocks
//! - **One-shot events**: broadcast wake-up of every waiting task
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                  Application Task Bodies                │
//! ├────────────────────────────────────────────────────────┤
//! │              Scheduler API (scheduler.rs)               │
//! │   create_task() · create_semaphore() · create_event()   │
//! │              start() · stop() · dispatch loop           │
//! ├──────────────┬────────────────────┬───────────────────┤
//! │  RMA         │  Semaphore (PIP)   │  Event            │
//! │  rma.rs      │  semaphore.rs      │  event.rs         │
//! │  ─ order     │  ─ acquire()       │  ─ wait_for()     │
//! │  ─ assign    │  ─ release()       │  ─ trigger()      │
//! ├──────────────┴────────────────────┴───────────────────┤
//! │        Kernel arena (kernel.rs) · Task model (task.rs)  │
//! │     Registry · TaskControlBlock · ids · handles        │
//! ├────────────────────────────────────────────────────────┤
//! │    Critical section (sync.rs) · System log (log.rs)     │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Execution Model
//!
//! - One dispatch thread per scheduler; task bodies run on it one at a time
//! - No preemption: a body runs until it returns, whatever happens to
//!   priorities and readiness meanwhile
//! - Blocking is readiness-based: a failed `acquire` or a `wait_for` marks
//!   the task not ready and returns immediately
//! - Every observable transition is written to the scheduler's
//!   [`SystemLog`](log::SystemLog) and mirrored to `tracing`
//!
//! ## Example
//!
//! ```no_run
//! use rmsched::Scheduler;
//!
//! let scheduler = Scheduler::new();
//! let sensor = scheduler.create_task(0, 50, || { /* sample */ })?;
//! let logger = scheduler.create_task(0, 200, || { /* flush */ })?;
//!
//! scheduler.start()?;
//! assert!(sensor.priority() > logger.priority());
//! scheduler.stop()?;
//! # Ok::<(), rmsched::SchedulerError>(())
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod kernel;
pub mod log;
pub mod rma;
pub mod scheduler;
pub mod semaphore;
pub mod sync;
pub mod task;

pub use error::{ResourceKind, Result, SchedulerError};
pub use event::{Event, EventId};
pub use log::SystemLog;
pub use scheduler::Scheduler;
pub use semaphore::{Semaphore, SemaphoreId};
pub use task::{Period, Priority, TaskBody, TaskHandle, TaskId};
