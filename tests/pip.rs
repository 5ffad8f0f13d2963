//! Priority inheritance on semaphores.

mod common;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use common::{bind, slot, wait_until, with_task, Trace, SETTLE};
use rmsched::Scheduler;

#[test]
fn test_inherit_then_restore() {
    let scheduler = Scheduler::new();
    let sem = scheduler.create_semaphore().unwrap();
    let low = scheduler.create_empty_task(2, 300).unwrap();
    let high = scheduler.create_empty_task(9, 100).unwrap();

    assert!(sem.acquire(&low));
    assert_eq!(sem.owner(), Some(low.id()));

    assert!(!sem.acquire(&high));
    assert_eq!(low.priority(), high.priority());
    assert!(!high.is_ready());
    assert_eq!(sem.waiting_tasks(), vec![high.id()]);

    sem.release(&low);
    assert_eq!(low.priority(), 2);
    assert!(high.is_ready());
    assert_eq!(sem.owner(), None);
    assert_eq!(sem.count(), 1);

    // The woken task retries and now succeeds.
    assert!(sem.acquire(&high));

    let log = scheduler.log();
    assert!(log.contains("inherited priority"));
    assert!(log.contains("restored to original priority"));
}

#[test]
fn test_nested_resources_keep_owed_priority() {
    let scheduler = Scheduler::new();
    let outer = scheduler.create_semaphore().unwrap();
    let inner = scheduler.create_semaphore().unwrap();
    let low = scheduler.create_empty_task(1, 400).unwrap();
    let mid = scheduler.create_empty_task(6, 200).unwrap();
    let high = scheduler.create_empty_task(12, 100).unwrap();

    assert!(outer.acquire(&low));
    assert!(inner.acquire(&low));
    assert!(!outer.acquire(&high));
    assert!(!inner.acquire(&mid));
    assert_eq!(low.priority(), 12);

    // Releasing `outer` wakes `high`, but `inner` still owes `mid`'s priority.
    outer.release(&low);
    assert_eq!(low.priority(), 6);
    assert!(high.is_ready());

    inner.release(&low);
    assert_eq!(low.priority(), 1);
    assert!(mid.is_ready());
}

#[test]
fn test_foreign_task_is_rejected() {
    let scheduler = Scheduler::new();
    let other = Scheduler::new();
    let sem = scheduler.create_semaphore().unwrap();
    let stranger = other.create_empty_task(0, 100).unwrap();

    assert!(!sem.acquire(&stranger));
    assert_eq!(sem.count(), 1);
    assert!(scheduler.log().contains("belongs to another scheduler"));
}

/// Low holds the resource across two turns; high blocks on it; medium must
/// not run before low has released.
#[test]
fn test_inheritance_prevents_inversion_under_dispatch() {
    let scheduler = Scheduler::new();
    let resource = scheduler.create_semaphore().unwrap();
    let trace = Trace::default();
    let (high, medium, low) = (slot(), slot(), slot());

    let high_task = {
        let (me, resource, trace) = (Arc::clone(&high), resource.clone(), trace.clone());
        scheduler
            .create_task(0, 100, move || {
                with_task(&me, |task| {
                    if !resource.acquire(task) {
                        trace.push("high:blocked");
                        return;
                    }
                    trace.push("high:acquired");
                    resource.release(task);
                    task.set_ready(false);
                });
            })
            .unwrap()
    };
    bind(&high, &high_task);

    let medium_task = {
        let (me, trace) = (Arc::clone(&medium), trace.clone());
        scheduler
            .create_task(0, 200, move || {
                with_task(&me, |task| {
                    trace.push("medium");
                    task.set_ready(false);
                });
            })
            .unwrap()
    };
    bind(&medium, &medium_task);

    let low_task = {
        let (me, resource, trace) = (Arc::clone(&low), resource.clone(), trace.clone());
        let (high, medium) = (Arc::clone(&high), Arc::clone(&medium));
        let turn = AtomicU8::new(0);
        scheduler
            .create_task(0, 300, move || {
                with_task(&me, |task| {
                    if turn.fetch_add(1, Ordering::SeqCst) == 0 {
                        assert!(resource.acquire(task));
                        trace.push("low:acquired");
                        with_task(&high, |h| h.set_ready(true));
                        with_task(&medium, |m| m.set_ready(true));
                    } else {
                        trace.push(format!("low:release@{}", task.priority()));
                        resource.release(task);
                        task.set_ready(false);
                    }
                });
            })
            .unwrap()
    };
    bind(&low, &low_task);

    high_task.set_ready(false);
    medium_task.set_ready(false);
    scheduler.start().unwrap();
    assert!(wait_until(SETTLE, || trace.len() == 5));
    scheduler.stop().unwrap();

    assert_eq!(
        trace.steps(),
        vec![
            "low:acquired",
            "high:blocked",
            "low:release@15",
            "high:acquired",
            "medium",
        ]
    );
    assert_eq!(low_task.priority(), 13);
    assert!(scheduler.log().contains("Task 2 inherited priority 15 from Task 0 (was 13)"));
}
