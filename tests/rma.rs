//! Rate-monotonic priority assignment observed through the public API.

use rmsched::config::MAX_PRIORITIES;
use rmsched::Scheduler;

#[test]
fn test_shorter_period_runs_at_higher_priority() {
    let scheduler = Scheduler::new();
    let a = scheduler.create_empty_task(0, 50).unwrap();
    let b = scheduler.create_empty_task(0, 100).unwrap();
    a.set_ready(false);
    b.set_ready(false);

    scheduler.start().unwrap();
    scheduler.stop().unwrap();

    assert!(a.priority() > b.priority());
}

#[test]
fn test_three_tasks_ordered_by_period() {
    let scheduler = Scheduler::new();
    let t100 = scheduler.create_empty_task(0, 100).unwrap();
    let t50 = scheduler.create_empty_task(0, 50).unwrap();
    let t200 = scheduler.create_empty_task(0, 200).unwrap();
    for task in scheduler.tasks() {
        task.set_ready(false);
    }

    scheduler.start().unwrap();
    scheduler.stop().unwrap();

    assert_eq!(t50.priority(), 15);
    assert_eq!(t100.priority(), 14);
    assert_eq!(t200.priority(), 13);
    assert!(scheduler.log().contains("Task 1 RMA priority set to 15"));
    // Registry order is untouched by the sort.
    let ids: Vec<usize> = scheduler.tasks().iter().map(|t| t.id().index()).collect();
    assert_eq!(ids, vec![0, 1, 2]);
}

#[test]
fn test_more_tasks_than_levels() {
    let scheduler = Scheduler::new();
    let tasks: Vec<_> = (0..20u32)
        .map(|i| scheduler.create_empty_task(0, 10 + i).unwrap())
        .collect();
    for task in &tasks {
        task.set_ready(false);
    }

    scheduler.start().unwrap();
    scheduler.stop().unwrap();

    for (rank, task) in tasks.iter().enumerate() {
        let expected = MAX_PRIORITIES.saturating_sub(1 + rank);
        assert_eq!(usize::from(task.priority()), expected);
    }
}

#[test]
fn test_restart_reassigns_priorities() {
    let scheduler = Scheduler::new();
    let fast = scheduler.create_empty_task(0, 10).unwrap();
    fast.set_ready(false);

    scheduler.start().unwrap();
    scheduler.stop().unwrap();
    fast.set_priority(2);

    scheduler.start().unwrap();
    scheduler.stop().unwrap();
    assert_eq!(fast.priority(), 15);
}
