//! # Rate-Monotonic Assignment
//!
//! Static priority assignment run once per scheduler start: the shorter a
//! task's period, the higher its priority.
//!
//! ## Algorithm
//!
//! 1. Stable-sort the tasks by ascending period. Equal periods keep
//!    registration order.
//! 2. Hand out `MAX_PRIORITIES - 1` to the first task in that order,
//!    one less to each following task.
//! 3. Tasks past the last level get 0. Several tasks may then share
//!    priority 0; that is accepted, not an error.
//!
//! The result overwrites whatever priority the task was created with. The
//! registry itself is never reordered, so the dispatch scan keeps running
//! in id order.

use crate::config::MAX_PRIORITIES;
use crate::task::{Priority, TaskControlBlock, TaskId};

/// Task ids ordered by ascending period, ties in registration order.
pub fn rate_monotonic_order(tasks: &[TaskControlBlock]) -> Vec<TaskId> {
    let mut order: Vec<&TaskControlBlock> = tasks.iter().collect();
    order.sort_by_key(|task| task.period());
    order.into_iter().map(TaskControlBlock::id).collect()
}

/// Priority for the task at position `rank` in rate-monotonic order.
pub const fn priority_for_rank(rank: usize) -> Priority {
    if rank < MAX_PRIORITIES {
        (MAX_PRIORITIES - 1 - rank) as Priority
    } else {
        0
    }
}

/// Overwrite every task's priority with its rate-monotonic priority.
///
/// Returns the assignments in rate-monotonic order, for logging.
pub fn assign_priorities(tasks: &mut [TaskControlBlock]) -> Vec<(TaskId, Priority)> {
    rate_monotonic_order(tasks)
        .into_iter()
        .enumerate()
        .map(|(rank, id)| {
            let priority = priority_for_rank(rank);
            tasks[id.index()].set_priority(priority);
            (id, priority)
        })
        .collect()
}
