//! # Task Control Block
//!
//! Defines the task model. A task is a unit of schedulable work: a stable
//! id, a priority that the scheduler and the inheritance protocol rewrite,
//! an immutable period that feeds rate-monotonic assignment, a readiness
//! flag that gates dispatch, and an opaque body.
//!
//! ## Readiness
//!
//! ```text
//!   ┌──────────┐   acquire() fails /     ┌───────────┐
//!   │  Ready   │   wait_for() queues     │ Not ready │
//!   │ (true)   │ ──────────────────────► │ (false)   │
//!   └──────────┘                         └───────────┘
//!        ▲                                     │
//!        │    release() wakes / trigger()      │
//!        └─────────────────────────────────────┘
//! ```
//!
//! A ready task stays ready after its body returns, so the dispatch loop
//! will select it again on a later pass.

use std::fmt;
use std::sync::Arc;

use crate::event::{Event, EventId};
use crate::kernel::Kernel;

/// Task priority. Higher value = more important; valid range is
/// `0..MAX_PRIORITIES` once the scheduler has started.
pub type Priority = u8;

/// Task period in abstract time units. Only used to derive static
/// priorities; deadlines are not enforced.
pub type Period = u32;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Dense, sequential task identifier, starting at 0 within a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(usize);

impl TaskId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position of the task in its scheduler's registry.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Task body
// ---------------------------------------------------------------------------

/// The opaque work a task performs each time it is dispatched.
///
/// Bodies run on the dispatch thread and may call back into semaphore,
/// event and task handles they captured. Cloning shares the same closure.
#[derive(Clone)]
pub struct TaskBody(Arc<dyn Fn() + Send + Sync>);

impl TaskBody {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invoke the body synchronously on the calling thread.
    #[inline]
    pub fn run(&self) {
        (self.0)()
    }
}

impl fmt::Debug for TaskBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TaskBody(..)")
    }
}

// ---------------------------------------------------------------------------
// Task Control Block
// ---------------------------------------------------------------------------

/// Registry record for one task. Cross-references (owned events) are stored
/// as ids and resolved through the owning scheduler.
#[derive(Debug)]
pub struct TaskControlBlock {
    id: TaskId,
    priority: Priority,
    period: Period,
    ready: bool,
    body: Option<TaskBody>,
    events: Vec<EventId>,
}

impl TaskControlBlock {
    /// Create a ready task. `priority` is provisional until the scheduler
    /// runs rate-monotonic assignment.
    pub fn new(id: TaskId, priority: Priority, period: Period, body: Option<TaskBody>) -> Self {
        Self {
            id,
            priority,
            period,
            ready: true,
            body,
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    pub fn period(&self) -> Period {
        self.period
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// Record an event this task owns (and is allowed to trigger).
    pub fn add_event(&mut self, event: EventId) {
        self.events.push(event);
    }

    /// Events owned by this task, in creation order.
    pub fn events(&self) -> &[EventId] {
        &self.events
    }

    /// Handle to the body, for invoking it outside the registry lock.
    /// `None` for a no-op task.
    pub fn body(&self) -> Option<TaskBody> {
        self.body.clone()
    }

    /// Drop the body. Used on scheduler teardown: bodies usually capture
    /// handles that keep the kernel alive.
    pub(crate) fn clear_body(&mut self) {
        self.body = None;
    }
}

// ---------------------------------------------------------------------------
// Public handle
// ---------------------------------------------------------------------------

/// Handle to a task registered with a [`Scheduler`](crate::scheduler::Scheduler).
///
/// Cloning is cheap. Handles are what task bodies capture to operate on
/// semaphores and events, including on their own task.
#[derive(Clone)]
pub struct TaskHandle {
    id: TaskId,
    kernel: Arc<Kernel>,
}

impl TaskHandle {
    pub(crate) fn new(id: TaskId, kernel: Arc<Kernel>) -> Self {
        Self { id, kernel }
    }

    pub(crate) fn belongs_to(&self, kernel: &Arc<Kernel>) -> bool {
        Arc::ptr_eq(&self.kernel, kernel)
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn priority(&self) -> Priority {
        self.kernel
            .with_registry(|registry| registry.task(self.id).priority())
    }

    /// Overwrite the current priority. The dispatch loop sees the new value
    /// on its next scan.
    pub fn set_priority(&self, priority: Priority) {
        self.kernel
            .with_registry(|registry| registry.task_mut(self.id).set_priority(priority));
        self.kernel
            .log
            .record(format!("Task {} priority set to {priority}", self.id));
    }

    pub fn period(&self) -> Period {
        self.kernel
            .with_registry(|registry| registry.task(self.id).period())
    }

    pub fn is_ready(&self) -> bool {
        self.kernel
            .with_registry(|registry| registry.task(self.id).is_ready())
    }

    pub fn set_ready(&self, ready: bool) {
        self.kernel
            .with_registry(|registry| registry.task_mut(self.id).set_ready(ready));
        self.kernel
            .log
            .record(format!("Task {} ready set to {ready}", self.id));
    }

    /// Events this task owns, in creation order.
    pub fn events(&self) -> Vec<Event> {
        let ids = self
            .kernel
            .with_registry(|registry| registry.task(self.id).events().to_vec());
        ids.into_iter()
            .map(|id| Event::new(id, Arc::clone(&self.kernel)))
            .collect()
    }

    /// Run the body to completion on the calling thread. A task without a
    /// body does nothing.
    pub fn execute(&self) {
        self.kernel.execute(self.id);
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle").field("id", &self.id).finish()
    }
}
