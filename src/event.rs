//! # One-Shot Events
//!
//! Level-triggered broadcast signals bound to an owning task.
//!
//! ```text
//!   ┌────────┐   trigger() (owner set)   ┌───────────┐
//!   │  Idle  │ ────────────────────────► │ Triggered │
//!   └────────┘ ◄──────────────────────── └───────────┘
//!                      reset()
//! ```
//!
//! `wait_for` queues a task and marks it not ready, but only while the event
//! is idle and only for tasks other than the owner. `trigger` wakes every
//! queued task at once and empties the queue. A task that asks to wait
//! after the trigger is left ready rather than queued.

use std::fmt;
use std::sync::Arc;

use crate::kernel::{Kernel, Registry};
use crate::log::SystemLog;
use crate::task::{TaskHandle, TaskId};

/// Dense, sequential event identifier, starting at 0 within a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(usize);

impl EventId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry record for one event.
#[derive(Debug)]
pub struct EventControlBlock {
    id: EventId,
    /// The only task expected to trigger the event. Ownerless events can
    /// never be triggered.
    owner: Option<TaskId>,
    triggered: bool,
    waiters: Vec<TaskId>,
}

impl EventControlBlock {
    pub fn new(id: EventId, owner: Option<TaskId>) -> Self {
        Self {
            id,
            owner,
            triggered: false,
            waiters: Vec::new(),
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn owner(&self) -> Option<TaskId> {
        self.owner
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    pub fn waiting_tasks(&self) -> &[TaskId] {
        &self.waiters
    }
}

pub(crate) fn trigger(registry: &mut Registry, log: &SystemLog, event: EventId) {
    let block = registry.event_mut(event);
    let Some(owner) = block.owner else {
        return;
    };

    block.triggered = true;
    let woken = std::mem::take(&mut block.waiters);
    log.record(format!("Event {event} triggered by Task {owner}"));

    for task in woken {
        registry.task_mut(task).set_ready(true);
        log.record(format!("Task {task} woken up by event {event}"));
    }
}

pub(crate) fn reset(registry: &mut Registry, log: &SystemLog, event: EventId) {
    registry.event_mut(event).triggered = false;
    log.record(format!("Event {event} reset"));
}

pub(crate) fn wait_for(registry: &mut Registry, log: &SystemLog, event: EventId, task: TaskId) {
    let block = registry.event_mut(event);
    if block.triggered || block.owner == Some(task) {
        return;
    }
    if !block.waiters.contains(&task) {
        block.waiters.push(task);
    }
    registry.task_mut(task).set_ready(false);
    log.record(format!("Task {task} waiting for event {event}"));
}

// ---------------------------------------------------------------------------
// Public handle
// ---------------------------------------------------------------------------

/// Handle to an event owned by a [`Scheduler`](crate::scheduler::Scheduler).
#[derive(Clone)]
pub struct Event {
    id: EventId,
    kernel: Arc<Kernel>,
}

impl Event {
    pub(crate) fn new(id: EventId, kernel: Arc<Kernel>) -> Self {
        Self { id, kernel }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn owner(&self) -> Option<TaskId> {
        self.kernel
            .with_registry(|registry| registry.event(self.id).owner())
    }

    pub fn is_triggered(&self) -> bool {
        self.kernel
            .with_registry(|registry| registry.event(self.id).is_triggered())
    }

    pub fn waiting_tasks(&self) -> Vec<TaskId> {
        self.kernel
            .with_registry(|registry| registry.event(self.id).waiting_tasks().to_vec())
    }

    /// Signal the event and wake every waiting task. No effect on an
    /// ownerless event.
    pub fn trigger(&self) {
        self.kernel
            .with_registry(|registry| trigger(registry, &self.kernel.log, self.id));
    }

    /// Return to the idle state. Tasks already queued stay queued.
    pub fn reset(&self) {
        self.kernel
            .with_registry(|registry| reset(registry, &self.kernel.log, self.id));
    }

    /// Block `task` on this event until the next trigger.
    pub fn wait_for(&self, task: &TaskHandle) {
        if !task.belongs_to(&self.kernel) {
            self.kernel
                .log
                .error(format!("Task {} belongs to another scheduler", task.id()));
            return;
        }
        self.kernel
            .with_registry(|registry| wait_for(registry, &self.kernel.log, self.id, task.id()));
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event").field("id", &self.id).finish()
    }
}
