use std::collections::VecDeque;
use std::io;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc::error::TryRecvError;

use crate::core::monitor::state;
use crate::core::monitor::{MonitorState, SharedMonitor};
use crate::core::ops::optimizer;
use crate::core::ops::{BulkHandle, BulkStep, ProgressEvent, Status};
use crate::core::session::Session;

use super::event_handler::{event_for_key, DashboardEvent};
use super::render::render_ui;

/// Lines kept in the log pane
const LOG_CAPACITY: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub status: Option<Status>,
    pub text: String,
}

impl LogLine {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            status: None,
            text: text.into(),
        }
    }

    pub fn from_event(event: &ProgressEvent) -> Self {
        match event {
            ProgressEvent::Started { name, total } => {
                Self::plain(format!("▶ {} ({} steps)", name, total))
            }
            ProgressEvent::Step {
                name,
                status,
                message,
                completed,
                total,
                ..
            } => Self {
                status: Some(*status),
                text: format!("[{}/{}] {}: {}", completed, total, name, message),
            },
            ProgressEvent::Finished(summary) => Self {
                status: Some(summary.status()),
                text: format!(
                    "{}: {}/{} steps succeeded",
                    summary.name, summary.succeeded, summary.attempted
                ),
            },
        }
    }
}

/// Dashboard application state
pub struct DashboardApp {
    session: Session,
    monitor: SharedMonitor,
    pub state: MonitorState,
    pub log: VecDeque<LogLine>,
    running: Option<(String, BulkHandle)>,
    pub show_help: bool,
    pub should_quit: bool,
    pub refresh: Duration,
}

impl DashboardApp {
    pub fn new(session: Session, monitor: SharedMonitor) -> Self {
        let refresh = Duration::from_millis(session.config().sampler.tick_ms.max(50));
        let state = state::snapshot(&monitor);
        Self {
            session,
            monitor,
            state,
            log: VecDeque::new(),
            running: None,
            show_help: false,
            should_quit: false,
            refresh,
        }
    }

    /// Name of the bulk operation in progress
    pub fn busy(&self) -> Option<&str> {
        self.running.as_ref().map(|(name, _)| name.as_str())
    }

    pub fn threat_count(&self) -> usize {
        self.session.threat_count()
    }

    pub fn connection_count(&self) -> usize {
        self.session.connection_count()
    }

    pub fn refresh_state(&mut self) {
        self.state = state::snapshot(&self.monitor);
    }

    pub fn push_log(&mut self, line: LogLine) {
        if self.log.len() == LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(line);
    }

    pub fn handle_event(&mut self, event: DashboardEvent) {
        match event {
            DashboardEvent::Quit => self.should_quit = true,
            DashboardEvent::ToggleHelp => self.show_help = !self.show_help,
            DashboardEvent::EliteClean => {
                let steps = optimizer::elite_clean(&self.session.config().processes);
                self.start("Elite Clean", steps);
            }
            DashboardEvent::QuickScan => {
                let step = self.session.quick_scan_step();
                self.start("Quick Scan", vec![step]);
            }
            DashboardEvent::Quarantine => {
                let step = self.session.quarantine_step();
                self.start("Quarantine", vec![step]);
            }
            DashboardEvent::NetworkScan => {
                let step = self.session.network_scan_step();
                self.start("Network Scan", vec![step]);
            }
            DashboardEvent::Block => {
                let step = self.session.block_step();
                self.start("Block", vec![step]);
            }
            DashboardEvent::None => {}
        }
    }

    /// One operation at a time; the stashes are shared between steps
    fn start(&mut self, name: &str, steps: Vec<BulkStep>) {
        if let Some(busy) = self.busy() {
            let line = LogLine {
                status: Some(Status::Warning),
                text: format!("{} is still running", busy),
            };
            self.push_log(line);
            return;
        }

        match self.session.spawn_bulk(name, steps) {
            Ok(handle) => self.running = Some((name.to_string(), handle)),
            Err(e) => self.push_log(LogLine {
                status: Some(Status::Error),
                text: format!("Could not start {}: {}", name, e),
            }),
        }
    }

    /// Move pending progress events into the log; reap a finished run
    pub fn poll_bulk(&mut self) {
        let Some((_, handle)) = self.running.as_mut() else {
            return;
        };

        let mut lines = Vec::new();
        let mut finished = false;
        loop {
            match handle.events.try_recv() {
                Ok(event) => lines.push(LogLine::from_event(&event)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    finished = true;
                    break;
                }
            }
        }
        for line in lines {
            self.push_log(line);
        }

        if finished {
            if let Some((name, handle)) = self.running.take() {
                if let Err(e) = handle.join() {
                    self.push_log(LogLine {
                        status: Some(Status::Error),
                        text: format!("{} ended abnormally: {}", name, e),
                    });
                }
            }
        }
    }

    pub fn into_session(self) -> Session {
        self.session
    }
}

/// Run the dashboard until the user quits, then stop the sampler
pub fn run_dashboard(mut session: Session) -> Result<()> {
    let monitor = session
        .start_monitor()
        .context("Failed to start the metrics sampler")?;
    let mut app = DashboardApp::new(session, monitor);

    // Setup terminal
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    let result = event_loop(&mut terminal, &mut app);

    // Restore terminal even when the loop failed
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    app.into_session()
        .shutdown()
        .context("Failed to stop the metrics sampler")?;
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut DashboardApp,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|frame| render_ui(frame, app))?;

        let timeout = app
            .refresh
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout).context("Event poll failed")? {
            if let Event::Key(key) = event::read().context("Event read failed")? {
                if key.kind == KeyEventKind::Press {
                    let event = if app.show_help {
                        // Any key closes the help overlay
                        DashboardEvent::ToggleHelp
                    } else {
                        event_for_key(key.code)
                    };
                    app.handle_event(event);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }

        if last_tick.elapsed() >= app.refresh {
            app.refresh_state();
            app.poll_bulk();
            last_tick = Instant::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::core::ops::BulkSummary;

    fn app() -> DashboardApp {
        DashboardApp::new(Session::new(Config::default()), state::shared(60))
    }

    fn wait_idle(app: &mut DashboardApp) {
        for _ in 0..500 {
            app.poll_bulk();
            if app.busy().is_none() {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("bulk operation did not finish");
    }

    #[test]
    fn test_quit_and_help() {
        let mut app = app();
        app.handle_event(DashboardEvent::ToggleHelp);
        assert!(app.show_help);
        app.handle_event(DashboardEvent::Quit);
        assert!(app.should_quit);
    }

    #[test]
    fn test_quarantine_without_scan_logs_warning() {
        let mut app = app();
        app.handle_event(DashboardEvent::Quarantine);
        assert_eq!(app.busy(), Some("Quarantine"));
        wait_idle(&mut app);

        let step = app
            .log
            .iter()
            .find(|l| l.text.contains("Quarantine:"))
            .unwrap();
        assert_eq!(step.status, Some(Status::Warning));
        assert!(step.text.contains("No threats"));
    }

    #[test]
    fn test_log_is_bounded() {
        let mut app = app();
        for i in 0..(LOG_CAPACITY + 5) {
            app.push_log(LogLine::plain(format!("line {}", i)));
        }
        assert_eq!(app.log.len(), LOG_CAPACITY);
        assert_eq!(app.log.front().unwrap().text, "line 5");
    }

    #[test]
    fn test_finished_event_line() {
        let summary = BulkSummary {
            name: "Elite Clean".into(),
            attempted: 6,
            succeeded: 4,
            warnings: 2,
            failed: 0,
            lines: Vec::new(),
        };
        let line = LogLine::from_event(&ProgressEvent::Finished(summary));
        assert_eq!(line.status, Some(Status::Warning));
        assert_eq!(line.text, "Elite Clean: 4/6 steps succeeded");
    }
}
