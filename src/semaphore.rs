//! # Semaphores with Priority Inheritance
//!
//! Counting mutual-exclusion resources implementing the basic priority
//! inheritance protocol (PIP).
//!
//! ## Protocol
//!
//! ```text
//!   acquire(T)                                release(T), T == owner
//!   ──────────                                ───────────────────────
//!   count > 0 ──► count -= 1, owner = T       restore owner priority (*)
//!                 save T.priority             count += 1, owner = none
//!   count = 0 ──► queue T, T not ready        wake highest-priority waiter
//!                 owner.priority =
//!                   max(owner, T)             (*) unless another semaphore
//!                                                 held by T has a waiter
//!                                                 above the saved priority
//! ```
//!
//! `acquire` never blocks the calling thread. A failed acquire marks the
//! caller not ready and returns `false`; the body keeps running until it
//! returns, and the dispatch loop will not select the task again until a
//! release wakes it. The woken task must call `acquire` again.
//!
//! Inheritance bounds inversion to the time the resource is held, but it
//! does not prevent chained inversion across several resources. That is
//! why release consults the other semaphores the owner still holds before
//! dropping its priority.

use std::fmt;
use std::sync::Arc;

use crate::kernel::{Kernel, Registry};
use crate::log::SystemLog;
use crate::task::{Priority, TaskHandle, TaskId};

/// Dense, sequential semaphore identifier, starting at 0 within a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SemaphoreId(usize);

impl SemaphoreId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SemaphoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Semaphore Control Block
// ---------------------------------------------------------------------------

/// Registry record for one semaphore.
#[derive(Debug)]
pub struct SemaphoreControlBlock {
    id: SemaphoreId,
    count: u32,
    owner: Option<TaskId>,
    /// Owner's priority at the moment it acquired the resource.
    original_owner_priority: Option<Priority>,
    waiters: Vec<TaskId>,
}

impl SemaphoreControlBlock {
    pub fn new(id: SemaphoreId, initial_count: u32) -> Self {
        Self {
            id,
            count: initial_count,
            owner: None,
            original_owner_priority: None,
            waiters: Vec::new(),
        }
    }

    pub fn id(&self) -> SemaphoreId {
        self.id
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn owner(&self) -> Option<TaskId> {
        self.owner
    }

    pub fn original_owner_priority(&self) -> Option<Priority> {
        self.original_owner_priority
    }

    /// Tasks blocked on this semaphore, in arrival order.
    pub fn waiting_tasks(&self) -> &[TaskId] {
        &self.waiters
    }

    pub(crate) fn assign_owner(&mut self, task: TaskId, priority: Priority) {
        self.owner = Some(task);
        self.original_owner_priority = Some(priority);
    }
}

// ---------------------------------------------------------------------------
// Protocol
// ---------------------------------------------------------------------------

/// Try to take one unit of `sem` for `task`.
///
/// Returns `true` on success. On failure `task` is queued, marked not
/// ready, and the current owner inherits `task`'s priority if it is higher.
pub(crate) fn acquire(
    registry: &mut Registry,
    log: &SystemLog,
    sem: SemaphoreId,
    task: TaskId,
) -> bool {
    let task_priority = registry.task(task).priority();
    let block = registry.semaphore_mut(sem);

    if block.count > 0 {
        block.count -= 1;
        block.assign_owner(task, task_priority);
        log.record(format!("Task {task} acquired semaphore {sem}"));
        return true;
    }

    // A retry after an external wake-up must not queue the task twice.
    if !block.waiters.contains(&task) {
        block.waiters.push(task);
    }

    if let Some(owner) = block.owner {
        let owner_priority = registry.task(owner).priority();
        if task_priority > owner_priority {
            registry.task_mut(owner).set_priority(task_priority);
            log.record(format!(
                "Task {owner} inherited priority {task_priority} from Task {task} (was {owner_priority})"
            ));
        }
    }

    registry.task_mut(task).set_ready(false);
    log.record(format!("Task {task} waiting for semaphore {sem}"));
    false
}

/// Give back `sem` if `task` owns it; otherwise do nothing.
pub(crate) fn release(registry: &mut Registry, log: &SystemLog, sem: SemaphoreId, task: TaskId) {
    let block = registry.semaphore(sem);
    if block.owner != Some(task) {
        return;
    }

    if let Some(original) = block.original_owner_priority {
        match highest_competing_waiter(registry, sem, task, original) {
            Some(owed) => {
                registry.task_mut(task).set_priority(owed);
                log.record(format!(
                    "Task {task} maintains inherited priority {owed} due to other semaphores"
                ));
            }
            None => {
                registry.task_mut(task).set_priority(original);
                log.record(format!("Task {task} restored to original priority {original}"));
            }
        }
    }

    let block = registry.semaphore_mut(sem);
    block.original_owner_priority = None;
    block.owner = None;
    block.count += 1;

    if let Some(woken) = take_highest_waiter(registry, sem) {
        registry.task_mut(woken).set_ready(true);
        log.record(format!("Task {woken} woken up after semaphore release"));
    }

    log.record(format!("Task {task} released semaphore {sem}"));
}

/// Highest waiter priority above `floor` among the other semaphores `task`
/// still holds.
fn highest_competing_waiter(
    registry: &Registry,
    released: SemaphoreId,
    task: TaskId,
    floor: Priority,
) -> Option<Priority> {
    registry
        .semaphores_owned_by(task)
        .filter(|held| held.id() != released)
        .flat_map(|held| held.waiting_tasks())
        .map(|&waiter| registry.task(waiter).priority())
        .filter(|&priority| priority > floor)
        .max()
}

/// Remove and return the highest-priority waiter; the earliest arrival wins
/// ties.
fn take_highest_waiter(registry: &mut Registry, sem: SemaphoreId) -> Option<TaskId> {
    let mut best: Option<(usize, Priority)> = None;
    for (pos, &waiter) in registry.semaphore(sem).waiting_tasks().iter().enumerate() {
        let priority = registry.task(waiter).priority();
        if best.map_or(true, |(_, top)| priority > top) {
            best = Some((pos, priority));
        }
    }
    let (pos, _) = best?;
    Some(registry.semaphore_mut(sem).waiters.remove(pos))
}

// ---------------------------------------------------------------------------
// Public handle
// ---------------------------------------------------------------------------

/// Handle to a semaphore owned by a [`Scheduler`](crate::scheduler::Scheduler).
///
/// Cloning is cheap; clones refer to the same semaphore. Handles can be
/// captured by task bodies.
#[derive(Clone)]
pub struct Semaphore {
    id: SemaphoreId,
    kernel: Arc<Kernel>,
}

impl Semaphore {
    pub(crate) fn new(id: SemaphoreId, kernel: Arc<Kernel>) -> Self {
        Self { id, kernel }
    }

    pub fn id(&self) -> SemaphoreId {
        self.id
    }

    /// Take the resource on behalf of `task`. See the module docs for the
    /// failure path.
    pub fn acquire(&self, task: &TaskHandle) -> bool {
        if !task.belongs_to(&self.kernel) {
            self.kernel
                .log
                .error(format!("Task {} belongs to another scheduler", task.id()));
            return false;
        }
        self.kernel
            .with_registry(|registry| acquire(registry, &self.kernel.log, self.id, task.id()))
    }

    /// Give the resource back. No effect unless `task` is the owner.
    pub fn release(&self, task: &TaskHandle) {
        if !task.belongs_to(&self.kernel) {
            return;
        }
        self.kernel
            .with_registry(|registry| release(registry, &self.kernel.log, self.id, task.id()));
    }

    pub fn owner(&self) -> Option<TaskId> {
        self.kernel
            .with_registry(|registry| registry.semaphore(self.id).owner())
    }

    pub fn count(&self) -> u32 {
        self.kernel
            .with_registry(|registry| registry.semaphore(self.id).count())
    }

    pub fn waiting_tasks(&self) -> Vec<TaskId> {
        self.kernel
            .with_registry(|registry| registry.semaphore(self.id).waiting_tasks().to_vec())
    }
}

impl fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Semaphore").field("id", &self.id).finish()
    }
}
