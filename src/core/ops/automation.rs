//! Power scheduling, application launch/close and persisted scheduled tasks.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::outcome::{guard, OpOutcome};
use super::processes::{self, ProcessTable};
use crate::error::{QdError, Result};
use crate::platform::shell;

// ---------------------------------------------------------------------------
// Power
// ---------------------------------------------------------------------------

/// Windows refuses shutdown delays above ten years
const MAX_DELAY_MINUTES: u32 = 10 * 365 * 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PowerAction {
    Shutdown,
    Restart,
}

impl PowerAction {
    fn verb(self) -> &'static str {
        match self {
            PowerAction::Shutdown => "shut down",
            PowerAction::Restart => "restart",
        }
    }
}

fn schedule_power(action: PowerAction, minutes: u32) -> Result<()> {
    if minutes > MAX_DELAY_MINUTES {
        return Err(QdError::invalid_input(format!(
            "delay of {} minutes is too long",
            minutes
        )));
    }

    #[cfg(windows)]
    {
        let flag = match action {
            PowerAction::Shutdown => "/s",
            PowerAction::Restart => "/r",
        };
        let seconds = (u64::from(minutes) * 60).to_string();
        shell::run_checked("shutdown", &[flag, "/t", &seconds])?;
    }

    #[cfg(not(windows))]
    {
        let flag = match action {
            PowerAction::Shutdown => "-h",
            PowerAction::Restart => "-r",
        };
        let when = format!("+{}", minutes);
        shell::run_checked("shutdown", &[flag, &when])?;
    }

    Ok(())
}

pub fn schedule_shutdown(minutes: u32) -> OpOutcome {
    guard("schedule_shutdown", || {
        schedule_power(PowerAction::Shutdown, minutes)?;
        Ok(OpOutcome::success(format!(
            "System will {} in {} minutes",
            PowerAction::Shutdown.verb(),
            minutes
        )))
    })
}

pub fn schedule_restart(minutes: u32) -> OpOutcome {
    guard("schedule_restart", || {
        schedule_power(PowerAction::Restart, minutes)?;
        Ok(OpOutcome::success(format!(
            "System will {} in {} minutes",
            PowerAction::Restart.verb(),
            minutes
        )))
    })
}

pub fn cancel_shutdown() -> OpOutcome {
    guard("cancel_shutdown", || {
        #[cfg(windows)]
        shell::run_checked("shutdown", &["/a"])?;

        #[cfg(not(windows))]
        shell::run_checked("shutdown", &["-c"])?;

        Ok(OpOutcome::success("Scheduled shutdown/restart cancelled"))
    })
}

// ---------------------------------------------------------------------------
// Applications
// ---------------------------------------------------------------------------

pub const DEFAULT_CLOSE_EXCLUDE: &[&str] = &["explorer.exe", "dwm.exe", "winlogon.exe", "csrss.exe"];

/// Executables and paths start directly; bare names go through the shell
fn launch_target(app: &str) -> Result<u32> {
    let app = app.trim();
    if app.is_empty() {
        return Err(QdError::invalid_input("empty application name"));
    }
    if app.to_ascii_lowercase().ends_with(".exe") || app.contains('\\') || app.contains('/') {
        shell::spawn(app, &[])
    } else {
        shell::spawn_line(app)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LaunchReport {
    pub launched: Vec<String>,
    pub failed: Vec<String>,
}

pub fn launch_apps(apps: &[String]) -> OpOutcome<LaunchReport> {
    guard("launch_apps", || {
        if apps.is_empty() {
            return Ok(OpOutcome::warning("No applications specified"));
        }

        let mut report = LaunchReport::default();
        for app in apps {
            match launch_target(app) {
                Ok(pid) => {
                    log::info!("Launched {} (pid {})", app, pid);
                    report.launched.push(app.clone());
                }
                Err(e) => report.failed.push(format!("{}: {}", app, e)),
            }
        }

        let message = format!(
            "Launched {} applications, {} failed",
            report.launched.len(),
            report.failed.len()
        );
        let outcome = if report.launched.is_empty() {
            OpOutcome::error(message)
        } else {
            OpOutcome::success(message)
        };
        let items: Vec<String> = report
            .launched
            .iter()
            .cloned()
            .chain(report.failed.iter().cloned())
            .collect();
        Ok(outcome.with_items(items).with_detail(report))
    })
}

/// Terminate every `.exe` application not named in `exclude`
/// (an empty list means the default shell processes)
pub fn close_all_apps(exclude: &[String]) -> OpOutcome<Vec<String>> {
    guard("close_all_apps", || {
        let exclude: Vec<String> = if exclude.is_empty() {
            DEFAULT_CLOSE_EXCLUDE.iter().map(|s| s.to_string()).collect()
        } else {
            exclude.to_vec()
        };

        let table = ProcessTable::load();
        let snapshots = table.snapshots();
        let targets = processes::select_applications(&snapshots, &exclude);
        let closed = table.terminate_all(&targets);

        Ok(OpOutcome::success(format!("Closed {} applications", closed.len()))
            .with_items(closed.clone())
            .with_detail(closed))
    })
}

// ---------------------------------------------------------------------------
// Scheduled tasks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleType {
    Once,
    Hourly,
    Daily,
    Weekly,
}

impl fmt::Display for ScheduleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleType::Once => write!(f, "once"),
            ScheduleType::Hourly => write!(f, "hourly"),
            ScheduleType::Daily => write!(f, "daily"),
            ScheduleType::Weekly => write!(f, "weekly"),
        }
    }
}

impl std::str::FromStr for ScheduleType {
    type Err = QdError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "once" => Ok(ScheduleType::Once),
            "hourly" => Ok(ScheduleType::Hourly),
            "daily" => Ok(ScheduleType::Daily),
            "weekly" => Ok(ScheduleType::Weekly),
            other => Err(QdError::invalid_input(format!(
                "unknown schedule type '{}' (once, hourly, daily, weekly)",
                other
            ))),
        }
    }
}

/// One entry of the tasks file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: u32,
    pub name: String,
    pub command: String,
    pub schedule_type: ScheduleType,
    /// `HH:MM` (daily, once), `YYYY-MM-DD HH:MM` (once), `monday:HH:MM` (weekly)
    pub schedule_value: String,
    pub created: NaiveDateTime,
    pub enabled: bool,
    pub last_run: Option<NaiveDateTime>,
}

impl TaskRecord {
    /// Next time this task is due, counted from its last run (or creation)
    pub fn next_due(&self) -> Option<NaiveDateTime> {
        next_run(self, self.last_run.unwrap_or(self.created))
    }

    /// Like [`next_due`](Self::next_due), but slots before `floor` are
    /// skipped rather than caught up
    pub fn next_due_since(&self, floor: NaiveDateTime) -> Option<NaiveDateTime> {
        next_run(self, self.last_run.unwrap_or(self.created).max(floor))
    }

    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        self.next_due().is_some_and(|due| due <= now)
    }

    pub fn is_due_since(&self, now: NaiveDateTime, floor: NaiveDateTime) -> bool {
        self.next_due_since(floor).is_some_and(|due| due <= now)
    }

    pub fn describe(&self) -> String {
        let state = if self.enabled { "Enabled" } else { "Disabled" };
        let last = self
            .last_run
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "Never".to_string());
        format!(
            "[{}] {} - {} at {} ({}, last run {})",
            self.id, self.name, self.schedule_type, self.schedule_value, state, last
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Schedule {
    OnceAt(NaiveDateTime),
    OnceDaily(NaiveTime),
    Hourly,
    Daily(NaiveTime),
    Weekly(Weekday, NaiveTime),
}

fn parse_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| QdError::invalid_input(format!("expected HH:MM, got '{}'", value)))
}

fn parse_schedule(kind: ScheduleType, value: &str) -> Result<Schedule> {
    match kind {
        ScheduleType::Hourly => Ok(Schedule::Hourly),
        ScheduleType::Daily => parse_time(value).map(Schedule::Daily),
        ScheduleType::Once => {
            if let Ok(at) = NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%d %H:%M") {
                Ok(Schedule::OnceAt(at))
            } else {
                parse_time(value).map(Schedule::OnceDaily)
            }
        }
        ScheduleType::Weekly => {
            let (day, time) = value.split_once(':').ok_or_else(|| {
                QdError::invalid_input(format!("expected day:HH:MM, got '{}'", value))
            })?;
            let day: Weekday = day
                .trim()
                .parse()
                .map_err(|_| QdError::invalid_input(format!("unknown weekday '{}'", day)))?;
            Ok(Schedule::Weekly(day, parse_time(time)?))
        }
    }
}

fn next_time_of_day(after: NaiveDateTime, time: NaiveTime) -> NaiveDateTime {
    let candidate = after.date().and_time(time);
    if candidate > after {
        candidate
    } else {
        candidate + TimeDelta::days(1)
    }
}

fn next_weekday(after: NaiveDateTime, day: Weekday, time: NaiveTime) -> NaiveDateTime {
    let ahead = (7 + day.num_days_from_monday() - after.weekday().num_days_from_monday()) % 7;
    let date: NaiveDate = after.date() + TimeDelta::days(i64::from(ahead));
    let candidate = date.and_time(time);
    if candidate > after {
        candidate
    } else {
        candidate + TimeDelta::days(7)
    }
}

/// First due time strictly after `after`; `None` for disabled, finished or
/// unparseable tasks
pub fn next_run(task: &TaskRecord, after: NaiveDateTime) -> Option<NaiveDateTime> {
    if !task.enabled {
        return None;
    }

    let schedule = match parse_schedule(task.schedule_type, &task.schedule_value) {
        Ok(schedule) => schedule,
        Err(e) => {
            log::debug!("Task {} has an invalid schedule: {}", task.id, e);
            return None;
        }
    };

    match schedule {
        Schedule::Hourly => Some(after + TimeDelta::hours(1)),
        Schedule::Daily(time) => Some(next_time_of_day(after, time)),
        Schedule::Weekly(day, time) => Some(next_weekday(after, day, time)),
        Schedule::OnceDaily(time) => task
            .last_run
            .is_none()
            .then(|| next_time_of_day(after, time)),
        Schedule::OnceAt(at) => (task.last_run.is_none() && at > after).then_some(at),
    }
}

/// Task list persisted as a JSON array, rewritten wholesale on every change
pub struct TaskStore {
    path: PathBuf,
    tasks: Vec<TaskRecord>,
}

impl TaskStore {
    /// Load `path`; a missing or empty file is an empty list
    pub fn open(path: &Path) -> Result<Self> {
        let tasks = match fs::read(path) {
            Ok(data) if data.iter().all(u8::is_ascii_whitespace) => Vec::new(),
            Ok(data) => serde_json::from_slice(&data)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            tasks,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> &[TaskRecord] {
        &self.tasks
    }

    pub fn get(&self, id: u32) -> Option<&TaskRecord> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_vec_pretty(&self.tasks)?)?;
        Ok(())
    }

    pub fn create(
        &mut self,
        name: &str,
        command: &str,
        schedule_type: ScheduleType,
        schedule_value: &str,
    ) -> Result<TaskRecord> {
        if name.trim().is_empty() {
            return Err(QdError::invalid_input("task name is empty"));
        }
        if command.trim().is_empty() {
            return Err(QdError::invalid_input("task command is empty"));
        }
        parse_schedule(schedule_type, schedule_value)?;

        let task = TaskRecord {
            id: self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1,
            name: name.trim().to_string(),
            command: command.trim().to_string(),
            schedule_type,
            schedule_value: schedule_value.trim().to_string(),
            created: Local::now().naive_local(),
            enabled: true,
            last_run: None,
        };
        self.tasks.push(task.clone());
        self.save()?;
        Ok(task)
    }

    /// `false` when no task has this id
    pub fn delete(&mut self, id: u32) -> Result<bool> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    pub fn set_enabled(&mut self, id: u32, enabled: bool) -> Result<bool> {
        self.update(id, |t| t.enabled = enabled)
    }

    pub fn mark_run(&mut self, id: u32, at: NaiveDateTime) -> Result<bool> {
        self.update(id, |t| t.last_run = Some(at))
    }

    fn update<F: FnOnce(&mut TaskRecord)>(&mut self, id: u32, f: F) -> Result<bool> {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                f(task);
                self.save()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

pub fn create_task(
    store_path: &Path,
    name: &str,
    command: &str,
    schedule_type: ScheduleType,
    schedule_value: &str,
) -> OpOutcome<TaskRecord> {
    guard("create_task", || {
        let mut store = TaskStore::open(store_path)?;
        let task = store.create(name, command, schedule_type, schedule_value)?;
        Ok(OpOutcome::success(format!("Task '{}' created with id {}", task.name, task.id))
            .with_detail(task))
    })
}

pub fn delete_task(store_path: &Path, id: u32) -> OpOutcome {
    guard("delete_task", || {
        let mut store = TaskStore::open(store_path)?;
        if store.delete(id)? {
            Ok(OpOutcome::success(format!("Task {} deleted", id)))
        } else {
            Ok(OpOutcome::warning(format!("No task with id {}", id)))
        }
    })
}

pub fn set_task_enabled(store_path: &Path, id: u32, enabled: bool) -> OpOutcome {
    guard("set_task_enabled", || {
        let mut store = TaskStore::open(store_path)?;
        let word = if enabled { "enabled" } else { "disabled" };
        if store.set_enabled(id, enabled)? {
            Ok(OpOutcome::success(format!("Task {} {}", id, word)))
        } else {
            Ok(OpOutcome::warning(format!("No task with id {}", id)))
        }
    })
}

pub fn list_tasks(store_path: &Path) -> OpOutcome<Vec<TaskRecord>> {
    guard("list_tasks", || {
        let store = TaskStore::open(store_path)?;
        let tasks = store.list().to_vec();
        let message = if tasks.is_empty() {
            "No scheduled tasks found".to_string()
        } else {
            format!("Scheduled tasks ({})", tasks.len())
        };
        let items: Vec<String> = tasks.iter().map(TaskRecord::describe).collect();
        Ok(OpOutcome::success(message).with_items(items).with_detail(tasks))
    })
}

/// Start a task command without waiting for it
pub fn execute_command(command: &str) -> Result<()> {
    launch_target(command).map(|pid| log::debug!("Task command started (pid {})", pid))
}

pub type TaskExecutor = Box<dyn Fn(&str) -> Result<()> + Send>;

/// Runs due tasks from the tasks file until cancelled.
///
/// The file is re-read on every check so edits from other qdesk processes
/// are picked up. Slots that passed before the scheduler started are not
/// run late.
pub struct TaskScheduler {
    store_path: PathBuf,
    poll: Duration,
    started: NaiveDateTime,
    executor: TaskExecutor,
}

impl TaskScheduler {
    pub fn new(store_path: PathBuf) -> Self {
        Self::with_executor(store_path, Box::new(execute_command))
    }

    pub fn with_executor(store_path: PathBuf, executor: TaskExecutor) -> Self {
        Self {
            store_path,
            poll: Duration::from_secs(1),
            started: Local::now().naive_local(),
            executor,
        }
    }

    /// Treat `started` as the moment the scheduler came up
    pub fn starting_at(mut self, started: NaiveDateTime) -> Self {
        self.started = started;
        self
    }

    /// Run every task due at `now`, stamping `last_run`; returns their names
    pub fn run_due(&self, now: NaiveDateTime) -> Result<Vec<String>> {
        let mut store = TaskStore::open(&self.store_path)?;
        let due: Vec<(u32, String, String)> = store
            .list()
            .iter()
            .filter(|t| t.is_due_since(now, self.started))
            .map(|t| (t.id, t.name.clone(), t.command.clone()))
            .collect();

        let mut ran = Vec::new();
        for (id, name, command) in due {
            log::info!("Executing scheduled task: {}", name);
            if let Err(e) = (self.executor)(&command) {
                log::warn!("Task {} failed: {}", name, e);
            }
            // Failed runs are stamped too so a broken command is not retried every second
            store.mark_run(id, now)?;
            ran.push(name);
        }
        Ok(ran)
    }

    pub async fn run(self, cancel: CancellationToken) {
        log::info!("Task scheduler watching {:?}", self.store_path);

        let mut ticker = interval(self.poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.run_due(Local::now().naive_local()) {
                        log::warn!("Scheduler error: {}", e);
                    }
                }
            }
        }

        log::info!("Task scheduler stopped");
    }
}
