//! # Kernel
//!
//! The shared context behind a [`Scheduler`](crate::scheduler::Scheduler)
//! and every handle it gives out.
//!
//! The kernel owns an arena of task, semaphore and event control blocks.
//! All cross-references between them (semaphore owner and waiters, event
//! owner and waiters, a task's owned events) are ids into that arena, so
//! there are no pointer lifetimes to manage. The arena only grows: an id,
//! once handed out, stays valid for the kernel's lifetime.
//!
//! ```text
//!   Scheduler ──┐
//!   TaskHandle ─┤
//!   Semaphore ──┼──► Arc<Kernel> ──┬─► Mutex<Registry>  (tasks · semaphores · events)
//!   Event ──────┤                  ├─► SystemLog
//!   dispatch ───┘                  └─► running flag
//! ```
//!
//! There is no global instance; each scheduler builds its own kernel.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::event::{EventControlBlock, EventId};
use crate::log::SystemLog;
use crate::semaphore::{SemaphoreControlBlock, SemaphoreId};
use crate::sync;
use crate::task::{TaskControlBlock, TaskId};

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Arena of every control block owned by one kernel, indexed by id.
#[derive(Debug, Default)]
pub struct Registry {
    pub(crate) tasks: Vec<TaskControlBlock>,
    pub(crate) semaphores: Vec<SemaphoreControlBlock>,
    pub(crate) events: Vec<EventControlBlock>,
}

impl Registry {
    pub fn tasks(&self) -> &[TaskControlBlock] {
        &self.tasks
    }

    pub fn semaphores(&self) -> &[SemaphoreControlBlock] {
        &self.semaphores
    }

    pub fn events(&self) -> &[EventControlBlock] {
        &self.events
    }

    pub fn task(&self, id: TaskId) -> &TaskControlBlock {
        &self.tasks[id.index()]
    }

    pub fn task_mut(&mut self, id: TaskId) -> &mut TaskControlBlock {
        &mut self.tasks[id.index()]
    }

    pub fn semaphore(&self, id: SemaphoreId) -> &SemaphoreControlBlock {
        &self.semaphores[id.index()]
    }

    pub fn semaphore_mut(&mut self, id: SemaphoreId) -> &mut SemaphoreControlBlock {
        &mut self.semaphores[id.index()]
    }

    pub fn event(&self, id: EventId) -> &EventControlBlock {
        &self.events[id.index()]
    }

    pub fn event_mut(&mut self, id: EventId) -> &mut EventControlBlock {
        &mut self.events[id.index()]
    }

    /// Semaphores currently held by `task`, in creation order.
    pub fn semaphores_owned_by(
        &self,
        task: TaskId,
    ) -> impl Iterator<Item = &SemaphoreControlBlock> + '_ {
        self.semaphores
            .iter()
            .filter(move |sem| sem.owner() == Some(task))
    }
}

// ---------------------------------------------------------------------------
// Kernel
// ---------------------------------------------------------------------------

/// Shared state of one scheduler instance.
#[derive(Debug)]
pub(crate) struct Kernel {
    pub(crate) registry: Mutex<Registry>,
    pub(crate) log: SystemLog,
    running: AtomicBool,
}

impl Kernel {
    pub(crate) fn new(log: SystemLog) -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            log,
            running: AtomicBool::new(false),
        }
    }

    /// Run `f` inside the kernel critical section.
    #[inline]
    pub(crate) fn with_registry<R>(&self, f: impl FnOnce(&mut Registry) -> R) -> R {
        sync::critical_section(&self.registry, f)
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    /// Run a task's body to completion on the calling thread.
    ///
    /// The body handle is cloned out of the critical section first, so the
    /// body is free to call back into the kernel.
    pub(crate) fn execute(&self, task: TaskId) {
        let body = self.with_registry(|registry| registry.task(task).body());
        if let Some(body) = body {
            body.run();
        }
    }
}
