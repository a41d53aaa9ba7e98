use crossterm::event::KeyCode;

/// Events that can occur in the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardEvent {
    /// Quit the application
    Quit,
    /// Toggle help overlay
    ToggleHelp,
    EliteClean,
    QuickScan,
    /// Quarantine what the last quick scan found
    Quarantine,
    NetworkScan,
    /// Block what the last network scan flagged
    Block,
    /// No action
    None,
}

pub fn event_for_key(code: KeyCode) -> DashboardEvent {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => DashboardEvent::Quit,
        KeyCode::Char('?') | KeyCode::Char('h') => DashboardEvent::ToggleHelp,
        KeyCode::Char('c') => DashboardEvent::EliteClean,
        KeyCode::Char('s') => DashboardEvent::QuickScan,
        KeyCode::Char('x') => DashboardEvent::Quarantine,
        KeyCode::Char('n') => DashboardEvent::NetworkScan,
        KeyCode::Char('b') => DashboardEvent::Block,
        _ => DashboardEvent::None,
    }
}
