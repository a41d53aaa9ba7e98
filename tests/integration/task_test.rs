// Tasks file persistence and the due-task scheduler

use chrono::{Local, TimeDelta};
use qdesk::core::ops::automation::{
    self, next_run, ScheduleType, TaskScheduler, TaskStore,
};
use qdesk::core::ops::Status;
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[test]
fn test_store_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tasks.json");

    let mut store = TaskStore::open(&path).unwrap();
    let backup = store
        .create("Backup", "robocopy a b", ScheduleType::Daily, "02:30")
        .unwrap();
    let report = store
        .create("Report", "qdesk report", ScheduleType::Weekly, "monday:09:00")
        .unwrap();
    assert_eq!((backup.id, report.id), (1, 2));

    store.delete(1).unwrap();
    let third = store
        .create("Sync", "sync.bat", ScheduleType::Hourly, "")
        .unwrap();
    // Ids continue from the highest one left
    assert_eq!(third.id, 3);

    let reopened = TaskStore::open(&path).unwrap();
    let names: Vec<&str> = reopened.list().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Report", "Sync"]);
}

#[test]
fn test_invalid_schedules_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tasks.json");

    let outcome = automation::create_task(&path, "bad", "x", ScheduleType::Daily, "25:00");
    assert_eq!(outcome.status, Status::Error);

    let outcome = automation::create_task(&path, "bad", "x", ScheduleType::Weekly, "someday:10:00");
    assert_eq!(outcome.status, Status::Error);

    assert!(automation::list_tasks(&path).detail.unwrap().is_empty());
}

#[test]
fn test_corrupt_file_is_reported_not_erased() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tasks.json");
    fs::write(&path, "{ not json").unwrap();

    assert_eq!(automation::list_tasks(&path).status, Status::Error);
    assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
}

#[test]
fn test_scheduler_runs_due_tasks_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tasks.json");
    let mut store = TaskStore::open(&path).unwrap();
    let task = store
        .create("Nightly", "cleanup.bat", ScheduleType::Daily, "00:00")
        .unwrap();
    store.create("Off", "never.bat", ScheduleType::Hourly, "").unwrap();
    store.set_enabled(2, false).unwrap();

    let executed = Arc::new(Mutex::new(Vec::new()));
    let log = executed.clone();
    let scheduler = TaskScheduler::with_executor(
        path.clone(),
        Box::new(move |command: &str| {
            log.lock().unwrap().push(command.to_string());
            Ok(())
        }),
    );

    // Not due yet right after creation
    assert!(scheduler.run_due(task.created).unwrap().is_empty());

    let later = task.created + TimeDelta::days(2);
    assert_eq!(scheduler.run_due(later).unwrap(), vec!["Nightly".to_string()]);
    assert!(scheduler.run_due(later).unwrap().is_empty());
    assert_eq!(*executed.lock().unwrap(), vec!["cleanup.bat".to_string()]);

    let stamped = TaskStore::open(&path).unwrap();
    assert_eq!(stamped.get(1).unwrap().last_run, Some(later));
}

#[test]
fn test_next_run_for_listing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tasks.json");
    let mut store = TaskStore::open(&path).unwrap();
    let task = store
        .create("Hourly", "ping", ScheduleType::Hourly, "")
        .unwrap();

    let now = Local::now().naive_local();
    let next = next_run(&task, now).unwrap();
    assert!(next > now);
    assert!(next <= now + TimeDelta::hours(1));
}

#[test]
fn test_scheduler_skips_slots_missed_while_down() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tasks.json");
    let now = Local::now().naive_local();
    let slot = now - TimeDelta::hours(3);

    let mut store = TaskStore::open(&path).unwrap();
    store
        .create(
            "Old nightly",
            "cleanup.bat",
            ScheduleType::Daily,
            &slot.format("%H:%M").to_string(),
        )
        .unwrap();
    // Pretend the task has existed for five days
    let mut tasks: Vec<serde_json::Value> =
        serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    tasks[0]["created"] = serde_json::json!((now - TimeDelta::days(5))
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string());
    fs::write(&path, serde_json::to_vec(&tasks).unwrap()).unwrap();

    let executed = Arc::new(Mutex::new(Vec::new()));
    let log = executed.clone();
    let scheduler = TaskScheduler::with_executor(
        path.clone(),
        Box::new(move |command: &str| {
            log.lock().unwrap().push(command.to_string());
            Ok(())
        }),
    )
    .starting_at(now);

    assert!(scheduler.run_due(now).unwrap().is_empty());
    assert!(executed.lock().unwrap().is_empty());

    // The next regular slot still fires
    let tomorrow = slot + TimeDelta::days(1) + TimeDelta::minutes(1);
    assert_eq!(
        scheduler.run_due(tomorrow).unwrap(),
        vec!["Old nightly".to_string()]
    );
}
