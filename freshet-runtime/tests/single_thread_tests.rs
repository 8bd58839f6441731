// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use freshet_core::{Scheduler, TimeScheduler};
use freshet_runtime::{ExecutorScheduler, SingleThreadScheduler};
use std::sync::mpsc;
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(5);

#[test]
fn test_tasks_run_on_the_worker() -> anyhow::Result<()> {
    // Arrange
    let scheduler = SingleThreadScheduler::new();
    let (sender, receiver) = mpsc::channel();

    // Act
    scheduler
        .schedule(Box::new(move || {
            let _ = sender.send(std::thread::current().name().map(String::from));
        }))
        .expect("scheduler refused the task");

    // Assert
    let worker_name = receiver.recv_timeout(WAIT)?;
    assert_eq!(worker_name.as_deref(), Some("freshet-worker"));
    scheduler.shutdown();
    Ok(())
}

#[test]
fn test_tasks_run_in_submission_order() -> anyhow::Result<()> {
    let scheduler = SingleThreadScheduler::new();
    let (sender, receiver) = mpsc::channel();

    for index in 0..100 {
        let sender = sender.clone();
        scheduler
            .schedule(Box::new(move || {
                let _ = sender.send(index);
            }))
            .expect("scheduler refused the task");
    }

    let mut observed = Vec::new();
    for _ in 0..100 {
        observed.push(receiver.recv_timeout(WAIT)?);
    }
    assert_eq!(observed, (0..100).collect::<Vec<_>>());
    scheduler.shutdown();
    Ok(())
}

#[test]
fn test_cancelled_task_does_not_run() -> anyhow::Result<()> {
    let scheduler = SingleThreadScheduler::new();
    let (sender, receiver) = mpsc::channel::<&str>();

    // Park the worker long enough to cancel the second task in time
    let handle = scheduler
        .schedule_after(
            Box::new(move || {
                let _ = sender.send("should not run");
            }),
            Duration::from_millis(200),
        )
        .expect("scheduler refused the task");
    handle.cancel();

    assert!(receiver.recv_timeout(Duration::from_millis(600)).is_err());
    scheduler.shutdown();
    Ok(())
}

#[test]
fn test_delayed_task_waits_for_its_deadline() -> anyhow::Result<()> {
    let scheduler = SingleThreadScheduler::new();
    let (sender, receiver) = mpsc::channel();
    let delay = Duration::from_millis(150);
    let submitted = Instant::now();

    scheduler
        .schedule_after(
            Box::new(move || {
                let _ = sender.send(Instant::now());
            }),
            delay,
        )
        .expect("scheduler refused the task");

    let fired = receiver.recv_timeout(WAIT)?;
    assert!(fired.duration_since(submitted) >= delay);
    scheduler.shutdown();
    Ok(())
}

#[test]
fn test_periodic_task_keeps_firing_until_cancelled() -> anyhow::Result<()> {
    let scheduler = SingleThreadScheduler::new();
    let (sender, receiver) = mpsc::channel();

    let handle = scheduler
        .schedule_periodic(
            Box::new(move || {
                let _ = sender.send(());
            }),
            Duration::from_millis(10),
            Duration::from_millis(10),
        )
        .expect("scheduler refused the task");

    for _ in 0..3 {
        receiver.recv_timeout(WAIT)?;
    }
    handle.cancel();

    // Drain whatever was in flight, then expect silence
    while receiver.recv_timeout(Duration::from_millis(100)).is_ok() {}
    assert!(receiver.recv_timeout(Duration::from_millis(100)).is_err());
    scheduler.shutdown();
    Ok(())
}

#[test]
fn test_shutdown_rejects_further_work() {
    let scheduler = SingleThreadScheduler::new();
    scheduler.shutdown();
    scheduler.shutdown();

    let result = scheduler.schedule(Box::new(|| {}));
    assert!(result.is_err());
}

#[test]
fn test_executor_scheduler_runs_through_the_execute_fn() -> anyhow::Result<()> {
    // An inline executor running everything on the calling thread
    let scheduler = ExecutorScheduler::new(|task| {
        task();
        true
    });
    let (sender, receiver) = mpsc::channel();

    scheduler
        .schedule(Box::new(move || {
            let _ = sender.send(7);
        }))
        .expect("executor refused the task");

    assert_eq!(receiver.recv_timeout(WAIT)?, 7);
    Ok(())
}

#[test]
fn test_executor_scheduler_reports_rejection() {
    let scheduler = ExecutorScheduler::new(|_task| false);
    assert!(scheduler.schedule(Box::new(|| {})).is_err());
}

#[test]
fn test_executor_scheduler_cancel_prevents_late_tasks() -> anyhow::Result<()> {
    // The executor defers tasks; cancel lands before we run them
    let (task_sender, task_receiver) = mpsc::channel();
    let scheduler = ExecutorScheduler::new(move |task| {
        let _ = task_sender.send(task);
        true
    });
    let (sender, receiver) = mpsc::channel::<&str>();

    let handle = scheduler
        .schedule(Box::new(move || {
            let _ = sender.send("should not run");
        }))
        .expect("executor refused the task");
    handle.cancel();

    let deferred = task_receiver.recv_timeout(WAIT)?;
    deferred();

    assert!(receiver.recv_timeout(Duration::from_millis(100)).is_err());
    Ok(())
}
