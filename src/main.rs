//! # rmsched Demo
//!
//! Demonstrates rate-monotonic assignment, priority inheritance and an event
//! hand-off with four tasks:
//!
//! | Task       | Period | RMA priority | Behavior |
//! |------------|--------|--------------|----------|
//! | `high`     | 100    | 15           | Needs the shared resource, triggers `done` |
//! | `medium`   | 200    | 14           | Pure computation, no resource |
//! | `low`      | 300    | 13           | Holds the shared resource across two turns |
//! | `reporter` | 400    | 12           | Waits on `done`, then reports |
//!
//! ## Expected Dynamics
//!
//! 1. Only `low` starts ready. It takes the resource and wakes `high` and
//!    `medium`, still holding the resource when its turn ends.
//! 2. `high` is selected, fails to acquire, and `low` inherits priority 15.
//! 3. Without inheritance `medium` would run next (classic priority
//!    inversion). With it, `low` is selected, finishes and releases,
//!    dropping back to 13 and waking `high`.
//! 4. `high` acquires, completes, and triggers `done`; `medium` runs; the
//!    `reporter` wakes last and ends the demo.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{mpsc, Arc, OnceLock};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use rmsched::{Scheduler, TaskHandle};

/// Late-bound handle so a body can refer to its own task.
type Slot = Arc<OnceLock<TaskHandle>>;

fn with_slot<F>(slot: &Slot, f: F)
where
    F: FnOnce(&TaskHandle),
{
    if let Some(task) = slot.get() {
        f(task);
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let scheduler = Scheduler::new();
    let resource = scheduler.create_semaphore()?;

    let high: Slot = Arc::default();
    let medium: Slot = Arc::default();
    let low: Slot = Arc::default();
    let reporter: Slot = Arc::default();
    let (finished_tx, finished_rx) = mpsc::channel::<()>();

    // --- high: period 100 ---
    let high_task = {
        let (me, resource) = (Arc::clone(&high), resource.clone());
        scheduler.create_task(0, 100, move || {
            with_slot(&me, |task| {
                if !resource.acquire(task) {
                    tracing::info!("high blocked on the shared resource");
                    return;
                }
                tracing::info!("high holds the shared resource");
                resource.release(task);
                for event in task.events() {
                    event.trigger();
                }
                task.set_ready(false);
            });
        })?
    };
    high.set(high_task.clone()).ok();

    // --- medium: period 200 ---
    let medium_task = {
        let me = Arc::clone(&medium);
        scheduler.create_task(0, 200, move || {
            with_slot(&me, |task| {
                tracing::info!(priority = task.priority(), "medium computing");
                task.set_ready(false);
            });
        })?
    };
    medium.set(medium_task.clone()).ok();

    // --- low: period 300, two turns ---
    let low_task = {
        let (me, resource) = (Arc::clone(&low), resource.clone());
        let (high, medium) = (Arc::clone(&high), Arc::clone(&medium));
        let turn = AtomicU8::new(0);
        scheduler.create_task(0, 300, move || {
            with_slot(&me, |task| match turn.fetch_add(1, Ordering::SeqCst) {
                0 => {
                    if resource.acquire(task) {
                        tracing::info!("low took the shared resource");
                    }
                    with_slot(&high, |h| h.set_ready(true));
                    with_slot(&medium, |m| m.set_ready(true));
                }
                _ => {
                    tracing::info!(priority = task.priority(), "low finishing critical section");
                    resource.release(task);
                    task.set_ready(false);
                }
            });
        })?
    };
    low.set(low_task.clone()).ok();

    // --- reporter: period 400, waits on high's event ---
    let reporter_task = {
        let me = Arc::clone(&reporter);
        scheduler.create_task(0, 400, move || {
            with_slot(&me, |task| {
                tracing::info!("reporter woken by high's event");
                task.set_ready(false);
                finished_tx.send(()).ok();
            });
        })?
    };
    reporter.set(reporter_task.clone()).ok();

    let done = scheduler.create_event(Some(&high_task))?;
    done.wait_for(&reporter_task);
    high_task.set_ready(false);
    medium_task.set_ready(false);

    scheduler.start()?;
    finished_rx
        .recv_timeout(Duration::from_secs(5))
        .context("demo did not finish in time")?;
    scheduler.stop()?;

    for entry in scheduler.log().entries() {
        println!("{entry}");
    }
    Ok(())
}
