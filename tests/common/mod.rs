//! Shared helpers for the scheduler integration tests.

#![allow(dead_code)]

use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rmsched::TaskHandle;

/// Generous upper bound for anything the dispatch thread should finish.
pub const SETTLE: Duration = Duration::from_secs(2);

/// Late-bound task handle, so a body can refer to its own task.
pub type Slot = Arc<OnceLock<TaskHandle>>;

pub fn slot() -> Slot {
    Arc::default()
}

pub fn bind(slot: &Slot, task: &TaskHandle) {
    slot.set(task.clone()).expect("slot bound twice");
}

/// Run `f` with the task bound to `slot`, if any.
pub fn with_task(slot: &Slot, f: impl FnOnce(&TaskHandle)) {
    if let Some(task) = slot.get() {
        f(task);
    }
}

/// Poll `cond` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

/// Ordered record of what task bodies did, shared with the test thread.
#[derive(Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
    pub fn push(&self, step: impl Into<String>) {
        self.0.lock().push(step.into());
    }

    pub fn steps(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }
}
