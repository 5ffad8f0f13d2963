//! # Scheduler
//!
//! Task registry, rate-monotonic start-up and the non-preemptive dispatch
//! loop.
//!
//! ## Scheduling Algorithm
//!
//! On [`Scheduler::start`]:
//! 1. **Assign priorities**: rate-monotonic pass over every registered task
//!    (see [`rma`](crate::rma))
//! 2. **Spawn dispatch thread**: runs the loop below until stopped
//!
//! Each pass of the dispatch loop:
//! 1. **Scan**: pick the ready task with the strictly highest priority;
//!    the lowest id wins ties
//! 2. **Run**: execute its body to completion on the dispatch thread.
//!    Nothing interrupts it, whatever priorities or readiness change
//!    while it runs
//! 3. **Idle**: if no task is ready, sleep `IDLE_POLL_INTERVAL` and rescan
//!
//! The running flag is checked once per pass, so after [`Scheduler::stop`]
//! at most the in-flight body completes before the thread exits.
//!
//! ## Panicking bodies
//!
//! A panic in a task body unwinds the dispatch thread and ends the loop.
//! [`Scheduler::stop`] then reports [`SchedulerError::DispatchPanicked`].

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::config::{
    DEFAULT_SEMAPHORE_COUNT, DISPATCH_THREAD_NAME, IDLE_POLL_INTERVAL, MAX_EVENTS,
    MAX_PRIORITIES, MAX_RESOURCES, MAX_TASKS,
};
use crate::error::{ResourceKind, Result, SchedulerError};
use crate::event::{Event, EventControlBlock, EventId};
use crate::kernel::Kernel;
use crate::log::SystemLog;
use crate::rma;
use crate::semaphore::{Semaphore, SemaphoreControlBlock, SemaphoreId};
use crate::task::{Period, Priority, TaskBody, TaskControlBlock, TaskHandle, TaskId};

// ---------------------------------------------------------------------------
// Scheduler struct
// ---------------------------------------------------------------------------

/// A cooperative, fixed-priority scheduler with its own registry, log and
/// dispatch thread.
///
/// Independent instances do not share any state. Dropping a scheduler stops
/// it and releases every task body.
pub struct Scheduler {
    kernel: Arc<Kernel>,
    /// Dispatch thread of the current session. Also serializes `start` and
    /// `stop`.
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Create a scheduler with a fresh log.
    pub fn new() -> Self {
        Self::with_log(SystemLog::new())
    }

    /// Create a scheduler writing to `log`.
    pub fn with_log(log: SystemLog) -> Self {
        Self {
            kernel: Arc::new(Kernel::new(log)),
            dispatcher: Mutex::new(None),
        }
    }

    pub fn log(&self) -> &SystemLog {
        &self.kernel.log
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register a new ready task.
    ///
    /// `priority` is provisional: [`start`](Self::start) replaces it with the
    /// rate-monotonic priority derived from `period`.
    ///
    /// # Errors
    /// - `CapacityExceeded` once `MAX_TASKS` tasks exist
    /// - `InvalidPriority` if `priority >= MAX_PRIORITIES`
    pub fn create_task<F>(&self, priority: Priority, period: Period, body: F) -> Result<TaskHandle>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.register_task(priority, period, Some(TaskBody::new(body)))
    }

    /// Register a task with no body. Dispatching it is a no-op.
    pub fn create_empty_task(&self, priority: Priority, period: Period) -> Result<TaskHandle> {
        self.register_task(priority, period, None)
    }

    fn register_task(
        &self,
        priority: Priority,
        period: Period,
        body: Option<TaskBody>,
    ) -> Result<TaskHandle> {
        let log = &self.kernel.log;
        let id = self.kernel.with_registry(|registry| {
            if registry.tasks.len() >= MAX_TASKS {
                log.error("Maximum number of tasks reached");
                return Err(SchedulerError::CapacityExceeded {
                    resource: ResourceKind::Task,
                    limit: MAX_TASKS,
                });
            }
            if usize::from(priority) >= MAX_PRIORITIES {
                log.error("Priority exceeds maximum allowed");
                return Err(SchedulerError::InvalidPriority {
                    requested: priority,
                    max: MAX_PRIORITIES,
                });
            }

            let id = TaskId::new(registry.tasks.len());
            registry
                .tasks
                .push(TaskControlBlock::new(id, priority, period, body));
            Ok(id)
        })?;

        log.record(format!(
            "Task {id} created with priority {priority} and period {period}"
        ));
        Ok(TaskHandle::new(id, Arc::clone(&self.kernel)))
    }

    /// Create a binary semaphore (initial count `DEFAULT_SEMAPHORE_COUNT`).
    pub fn create_semaphore(&self) -> Result<Semaphore> {
        self.create_counting_semaphore(DEFAULT_SEMAPHORE_COUNT)
    }

    /// Create a semaphore with `initial_count` units.
    ///
    /// # Errors
    /// `CapacityExceeded` once `MAX_RESOURCES` semaphores exist.
    pub fn create_counting_semaphore(&self, initial_count: u32) -> Result<Semaphore> {
        let log = &self.kernel.log;
        let id = self.kernel.with_registry(|registry| {
            if registry.semaphores.len() >= MAX_RESOURCES {
                log.error("Maximum number of semaphores reached");
                return Err(SchedulerError::CapacityExceeded {
                    resource: ResourceKind::Semaphore,
                    limit: MAX_RESOURCES,
                });
            }

            let id = SemaphoreId::new(registry.semaphores.len());
            registry
                .semaphores
                .push(SemaphoreControlBlock::new(id, initial_count));
            Ok(id)
        })?;

        log.record(format!("Semaphore {id} created"));
        Ok(Semaphore::new(id, Arc::clone(&self.kernel)))
    }

    /// Create an event, optionally owned by `owner`. Only an owned event can
    /// be triggered.
    ///
    /// # Errors
    /// - `CapacityExceeded` once `MAX_EVENTS` events exist
    /// - `ForeignHandle` if `owner` was created by another scheduler
    pub fn create_event(&self, owner: Option<&TaskHandle>) -> Result<Event> {
        if let Some(task) = owner {
            if !task.belongs_to(&self.kernel) {
                self.kernel
                    .log
                    .error(format!("Task {} belongs to another scheduler", task.id()));
                return Err(SchedulerError::ForeignHandle);
            }
        }

        let owner = owner.map(TaskHandle::id);
        let log = &self.kernel.log;
        let id = self.kernel.with_registry(|registry| {
            if registry.events.len() >= MAX_EVENTS {
                log.error("Maximum number of events reached");
                return Err(SchedulerError::CapacityExceeded {
                    resource: ResourceKind::Event,
                    limit: MAX_EVENTS,
                });
            }

            let id = EventId::new(registry.events.len());
            registry.events.push(EventControlBlock::new(id, owner));
            if let Some(owner) = owner {
                registry.task_mut(owner).add_event(id);
            }
            Ok(id)
        })?;

        match owner {
            Some(owner) => log.record(format!("Event {id} created owned by Task {owner}")),
            None => log.record(format!("Event {id} created")),
        }
        Ok(Event::new(id, Arc::clone(&self.kernel)))
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Assign rate-monotonic priorities and start dispatching on a dedicated
    /// thread. No effect if already running.
    ///
    /// # Errors
    /// `Spawn` if the dispatch thread cannot be created; the scheduler is
    /// left stopped.
    pub fn start(&self) -> Result<()> {
        let mut dispatcher = self.dispatcher.lock();
        if self.kernel.is_running() {
            return Ok(());
        }

        let log = &self.kernel.log;
        log.notice("Scheduler started");

        let assigned = self
            .kernel
            .with_registry(|registry| rma::assign_priorities(&mut registry.tasks));
        for (id, priority) in assigned {
            log.record(format!("Task {id} RMA priority set to {priority}"));
        }

        self.kernel.set_running(true);
        let kernel = Arc::clone(&self.kernel);
        let spawned = thread::Builder::new()
            .name(DISPATCH_THREAD_NAME.to_owned())
            .spawn(move || dispatch_loop(&kernel));

        match spawned {
            Ok(handle) => {
                *dispatcher = Some(handle);
                Ok(())
            }
            Err(err) => {
                self.kernel.set_running(false);
                log.error("Failed to spawn dispatch thread");
                Err(SchedulerError::Spawn(err))
            }
        }
    }

    /// Stop dispatching and wait for the dispatch thread to exit. No effect
    /// if not running.
    ///
    /// Must not be called from a task body: the dispatch thread would wait
    /// on itself.
    ///
    /// # Errors
    /// `DispatchPanicked` if a task body panicked during the session.
    pub fn stop(&self) -> Result<()> {
        let mut dispatcher = self.dispatcher.lock();
        if !self.kernel.is_running() {
            return Ok(());
        }

        let log = &self.kernel.log;
        self.kernel.set_running(false);
        log.notice("Scheduler stopping");

        let outcome = match dispatcher.take() {
            Some(handle) => handle.join().map_err(|_| SchedulerError::DispatchPanicked),
            None => Ok(()),
        };

        log.notice("Scheduler stopped");
        outcome
    }

    pub fn is_running(&self) -> bool {
        self.kernel.is_running()
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Handles to every task, in id order.
    pub fn tasks(&self) -> Vec<TaskHandle> {
        let count = self.kernel.with_registry(|registry| registry.tasks.len());
        (0..count)
            .map(|i| TaskHandle::new(TaskId::new(i), Arc::clone(&self.kernel)))
            .collect()
    }

    /// Handles to every semaphore, in id order.
    pub fn semaphores(&self) -> Vec<Semaphore> {
        let count = self.kernel.with_registry(|registry| registry.semaphores.len());
        (0..count)
            .map(|i| Semaphore::new(SemaphoreId::new(i), Arc::clone(&self.kernel)))
            .collect()
    }

    /// Handles to every event, in id order.
    pub fn events(&self) -> Vec<Event> {
        let count = self.kernel.with_registry(|registry| registry.events.len());
        (0..count)
            .map(|i| Event::new(EventId::new(i), Arc::clone(&self.kernel)))
            .collect()
    }

    pub fn task(&self, id: TaskId) -> Option<TaskHandle> {
        let exists = self
            .kernel
            .with_registry(|registry| id.index() < registry.tasks.len());
        exists.then(|| TaskHandle::new(id, Arc::clone(&self.kernel)))
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::error!(target: "rmsched", %err, "scheduler stopped with error");
        }
        // Bodies typically hold handles back into the kernel.
        self.kernel.with_registry(|registry| {
            registry
                .tasks
                .iter_mut()
                .for_each(TaskControlBlock::clear_body);
        });
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Select the next task to run: the ready task with the strictly highest
/// priority, first in id order on ties. `None` if nothing is ready.
pub fn select_next(tasks: &[TaskControlBlock]) -> Option<TaskId> {
    let mut best: Option<&TaskControlBlock> = None;

    for task in tasks {
        if !task.is_ready() {
            continue;
        }
        if best.map_or(true, |chosen| task.priority() > chosen.priority()) {
            best = Some(task);
        }
    }

    best.map(TaskControlBlock::id)
}

fn dispatch_loop(kernel: &Kernel) {
    tracing::debug!(target: "rmsched", "dispatch loop entered");

    while kernel.is_running() {
        let selected = kernel.with_registry(|registry| select_next(registry.tasks()));

        match selected {
            Some(task) => {
                kernel
                    .log
                    .record(format!("Task {task} selected for execution"));
                kernel.execute(task);
                kernel.log.record(format!("Task {task} completed execution"));
            }
            None => thread::sleep(IDLE_POLL_INTERVAL),
        }
    }

    tracing::debug!(target: "rmsched", "dispatch loop exited");
}
