use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};

use super::app::DashboardApp;
use super::widgets::{colored_gauge, percent_sparkline, status_color, temp_color};
use crate::core::monitor::MetricKey;
use crate::ui::formatters::format_percent;

/// Main render function
pub fn render_ui(frame: &mut Frame, app: &DashboardApp) {
    let area = frame.area();

    let disk_rows = app.state.histories.disk_keys().len().div_ceil(2).clamp(1, 4) as u16;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),             // Header
            Constraint::Length(3),             // Gauges
            Constraint::Length(7),             // CPU / RAM / GPU sparklines
            Constraint::Length(disk_rows * 4), // Disks
            Constraint::Min(5),                // Log pane
            Constraint::Length(1),             // Footer
        ])
        .split(area);

    render_header(frame, chunks[0], app);
    render_gauges(frame, chunks[1], app);
    render_sparklines(frame, chunks[2], app);
    render_disks(frame, chunks[3], app);
    render_log(frame, chunks[4], app);
    render_footer(frame, chunks[5], app);

    if app.show_help {
        render_help_overlay(frame, area);
    }
}

/// Battery and network line
fn render_header(frame: &mut Frame, area: Rect, app: &DashboardApp) {
    let readings = &app.state.readings;

    let battery = match readings.battery {
        Some(b) if b.plugged => format!("AC {:.0}%", b.percent),
        Some(b) => format!("Battery {:.0}%", b.percent),
        None => "No battery".to_string(),
    };
    let network = match readings.network {
        Some(n) => format!("Sent {} MB │ Recv {} MB", n.sent_mb(), n.recv_mb()),
        None => "Network n/a".to_string(),
    };
    let border = match readings.battery {
        Some(b) if !b.plugged && b.percent < 20.0 => Color::Red,
        Some(b) if !b.plugged && b.percent < 50.0 => Color::Yellow,
        _ => Color::Cyan,
    };

    let title = format!(
        " QuantumDesk │ {} │ {} │ Tick {} ",
        battery, network, readings.tick
    );
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));

    let status = format!(
        " Threats pending: {}  Connections pending: {}{}",
        app.threat_count(),
        app.connection_count(),
        app.busy()
            .map(|name| format!("  Running: {}", name))
            .unwrap_or_default()
    );
    frame.render_widget(Paragraph::new(status).block(block), area);
}

fn render_gauges(frame: &mut Frame, area: Rect, app: &DashboardApp) {
    let readings = &app.state.readings;
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(33),
            Constraint::Percentage(33),
            Constraint::Percentage(34),
        ])
        .split(area);

    frame.render_widget(
        colored_gauge(" CPU ", readings.cpu_percent, format_percent(readings.cpu_percent)),
        chunks[0],
    );
    frame.render_widget(
        colored_gauge(" RAM ", readings.ram_percent, format_percent(readings.ram_percent)),
        chunks[1],
    );

    match &readings.gpu {
        Some(gpu) => {
            let label = format!(
                "{} {} {:.0}°C",
                gpu.name,
                format_percent(gpu.load_percent),
                gpu.temperature_celsius
            );
            frame.render_widget(colored_gauge(" GPU ", gpu.load_percent, label), chunks[2]);
        }
        None => {
            let para = Paragraph::new("Not available")
                .style(Style::default().fg(Color::DarkGray))
                .block(Block::default().title(" GPU ").borders(Borders::ALL));
            frame.render_widget(para, chunks[2]);
        }
    }
}

fn render_sparklines(frame: &mut Frame, area: Rect, app: &DashboardApp) {
    let histories = &app.state.histories;
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(33),
            Constraint::Percentage(33),
            Constraint::Percentage(34),
        ])
        .split(area);

    for (i, (key, title)) in [
        (MetricKey::Cpu, "CPU history"),
        (MetricKey::Ram, "RAM history"),
        (MetricKey::Gpu, "GPU history"),
    ]
    .into_iter()
    .enumerate()
    {
        let data = histories
            .get(&key)
            .map(|h| h.as_scaled_u64())
            .unwrap_or_default();
        frame.render_widget(percent_sparkline(format!(" {} ", title), data), chunks[i]);
    }

    if let Some(temp) = app.state.readings.gpu.as_ref().map(|g| g.temperature_celsius) {
        let inner = chunks[2].inner(Margin::new(1, 0));
        let label = Paragraph::new(format!("{:.0}°C", temp))
            .alignment(Alignment::Right)
            .style(Style::default().fg(temp_color(temp)));
        frame.render_widget(label, Rect::new(inner.x, inner.y, inner.width, 1));
    }
}

/// One sparkline per discovered partition, two per row
fn render_disks(frame: &mut Frame, area: Rect, app: &DashboardApp) {
    let keys = app.state.histories.disk_keys();
    if keys.is_empty() {
        let para = Paragraph::new("No partitions sampled yet")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().title(" Disks ").borders(Borders::ALL));
        frame.render_widget(para, area);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(4); keys.len().div_ceil(2).min(4)])
        .split(area);

    for (i, key) in keys.iter().take(8).enumerate() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[i / 2]);

        let MetricKey::Disk(device) = key else {
            continue;
        };
        let reading = app
            .state
            .readings
            .disks
            .iter()
            .find(|d| &d.device == device);
        let title = match reading {
            Some(d) => match d.usage_percent {
                Some(p) => format!(" {} ({}) {} ", d.mount_point, device, format_percent(p)),
                None => format!(" {} ({}) unreadable ", d.mount_point, device),
            },
            None => format!(" {} ", device),
        };
        let data = app
            .state
            .histories
            .get(key)
            .map(|h| h.as_scaled_u64())
            .unwrap_or_default();
        frame.render_widget(percent_sparkline(title, data), cols[i % 2]);
    }
}

fn render_log(frame: &mut Frame, area: Rect, app: &DashboardApp) {
    let visible = area.height.saturating_sub(2) as usize;
    let items: Vec<ListItem> = app
        .log
        .iter()
        .skip(app.log.len().saturating_sub(visible))
        .map(|line| {
            let style = line
                .status
                .map(|s| Style::default().fg(status_color(s)))
                .unwrap_or_else(|| Style::default().fg(Color::White));
            ListItem::new(line.text.as_str()).style(style)
        })
        .collect();

    let list = List::new(items).block(Block::default().title(" Log ").borders(Borders::ALL));
    frame.render_widget(list, area);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &DashboardApp) {
    let help = " q: Quit │ ?: Help │ c: Elite clean │ s: Quick scan │ x: Quarantine │ n: Network scan │ b: Block ";
    let color = if app.busy().is_some() {
        Color::Yellow
    } else {
        Color::DarkGray
    };
    let para = Paragraph::new(help).style(Style::default().fg(color));
    frame.render_widget(para, area);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let help_text = r#"
    QuantumDesk Dashboard - Help

    Keyboard Shortcuts:
    ─────────────────────────────────────
    q / Esc     Quit the application
    ? / h       Toggle this help screen
    c           Elite clean (memory, idle apps, temp, cache, prefetch)
    s           Quick malware scan of the configured folders
    x           Quarantine the threats from the last scan
    n           Scan active network connections
    b           Block the connections flagged by the last network scan

    Press any key to close this help
    "#;

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .style(Style::default().bg(Color::DarkGray));

    let paragraph = Paragraph::new(help_text)
        .block(block)
        .alignment(Alignment::Left);

    // Center the help popup
    let popup_area = centered_rect(70, 60, area);
    frame.render_widget(Clear, popup_area);
    frame.render_widget(paragraph, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::core::monitor::{state, DiskReading, MetricSample};
    use crate::core::session::Session;
    use ratatui::backend::TestBackend;

    #[test]
    fn test_renders_gauges_and_disks() {
        let shared = state::shared(60);
        {
            let mut s = shared.write();
            s.readings.cpu_percent = 42.0;
            s.readings.disks.push(DiskReading {
                device: "sda1".into(),
                mount_point: "/".into(),
                usage_percent: Some(55.0),
            });
            s.histories
                .record(&MetricSample::read(MetricKey::disk("sda1"), 55.0));
        }
        let app = DashboardApp::new(Session::new(Config::default()), shared);

        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|frame| render_ui(frame, &app)).unwrap();

        let text: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(text.contains("42.0%"));
        assert!(text.contains("sda1"));
        assert!(text.contains("Not available"));
    }
}
