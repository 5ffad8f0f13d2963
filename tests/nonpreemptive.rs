//! Non-preemptive dispatch: a selected body always runs to completion.

mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{bind, slot, wait_until, with_task, Trace, SETTLE};
use rmsched::Scheduler;

#[test]
fn test_higher_priority_waits_for_running_body() {
    let scheduler = Scheduler::new();
    let started = Arc::new(AtomicBool::new(false));
    let finished = Arc::new(AtomicBool::new(false));
    let saw_finished = Arc::new(AtomicBool::new(false));
    let (slow, urgent) = (slot(), slot());

    let slow_task = {
        let (me, started, finished) = (Arc::clone(&slow), Arc::clone(&started), Arc::clone(&finished));
        scheduler
            .create_task(0, 200, move || {
                started.store(true, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(50));
                finished.store(true, Ordering::SeqCst);
                with_task(&me, |task| task.set_ready(false));
            })
            .unwrap()
    };
    bind(&slow, &slow_task);

    let urgent_task = {
        let (me, finished, saw) = (Arc::clone(&urgent), Arc::clone(&finished), Arc::clone(&saw_finished));
        scheduler
            .create_task(0, 100, move || {
                saw.store(finished.load(Ordering::SeqCst), Ordering::SeqCst);
                with_task(&me, |task| task.set_ready(false));
            })
            .unwrap()
    };
    bind(&urgent, &urgent_task);
    urgent_task.set_ready(false);

    scheduler.start().unwrap();
    assert!(wait_until(SETTLE, || started.load(Ordering::SeqCst)));
    // Higher priority becomes ready while the slow body is mid-flight.
    urgent_task.set_ready(true);
    assert!(urgent_task.priority() > slow_task.priority());

    assert!(wait_until(SETTLE, || !urgent_task.is_ready()));
    scheduler.stop().unwrap();

    assert!(finished.load(Ordering::SeqCst));
    assert!(saw_finished.load(Ordering::SeqCst));
}

#[test]
fn test_bodies_never_overlap() {
    let scheduler = Scheduler::new();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_in_flight = Arc::new(AtomicUsize::new(0));
    let runs = Arc::new(AtomicUsize::new(0));

    for period in [10, 20, 30, 40] {
        let (in_flight, max_in_flight, runs) =
            (Arc::clone(&in_flight), Arc::clone(&max_in_flight), Arc::clone(&runs));
        scheduler
            .create_task(0, period, move || {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_in_flight.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(1));
                runs.fetch_add(1, Ordering::SeqCst);
                in_flight.fetch_sub(1, Ordering::SeqCst);
            })
            .unwrap();
    }

    scheduler.start().unwrap();
    assert!(wait_until(SETTLE, || runs.load(Ordering::SeqCst) >= 20));
    scheduler.stop().unwrap();

    assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(in_flight.load(Ordering::SeqCst), 0);
}

#[test]
fn test_equal_priority_tie_goes_to_lowest_id() {
    let scheduler = Scheduler::new();
    let trace = Trace::default();
    let (first, second) = (slot(), slot());

    // More tasks than levels: both land on priority 0 after assignment.
    for _ in 0..16 {
        scheduler.create_empty_task(0, 1).unwrap().set_ready(false);
    }
    for (name, me) in [("first", &first), ("second", &second)] {
        let (me_body, trace) = (Arc::clone(me), trace.clone());
        let task = scheduler
            .create_task(0, 1000, move || {
                trace.push(name);
                with_task(&me_body, |task| task.set_ready(false));
            })
            .unwrap();
        bind(me, &task);
    }

    scheduler.start().unwrap();
    assert!(wait_until(SETTLE, || trace.len() == 2));
    scheduler.stop().unwrap();

    assert_eq!(trace.steps(), vec!["first", "second"]);
}

#[test]
fn test_stop_waits_for_in_flight_body() {
    let scheduler = Scheduler::new();
    let started = Arc::new(AtomicBool::new(false));
    let finished = Arc::new(AtomicBool::new(false));
    {
        let (started, finished) = (Arc::clone(&started), Arc::clone(&finished));
        scheduler
            .create_task(0, 100, move || {
                if started.swap(true, Ordering::SeqCst) {
                    return;
                }
                thread::sleep(Duration::from_millis(40));
                finished.store(true, Ordering::SeqCst);
            })
            .unwrap();
    }

    scheduler.start().unwrap();
    assert!(wait_until(SETTLE, || started.load(Ordering::SeqCst)));
    scheduler.stop().unwrap();

    assert!(finished.load(Ordering::SeqCst));
    assert!(!scheduler.is_running());
}

#[test]
fn test_panicking_body_is_reported_on_stop() {
    let scheduler = Scheduler::new();
    let ran = Arc::new(AtomicBool::new(false));
    {
        let ran = Arc::clone(&ran);
        scheduler
            .create_task(0, 100, move || {
                ran.store(true, Ordering::SeqCst);
                panic!("task body failure");
            })
            .unwrap();
    }

    scheduler.start().unwrap();
    assert!(wait_until(SETTLE, || ran.load(Ordering::SeqCst)));
    let err = scheduler.stop().unwrap_err();
    assert!(matches!(err, rmsched::SchedulerError::DispatchPanicked));
}
