use battery::units::ratio::percent;
use battery::{Manager, State};

use crate::core::monitor::BatteryReading;
use crate::error::{QdError, Result};

/// Charge of the first battery; `Ok(None)` on machines without one
pub fn read_battery() -> Result<Option<BatteryReading>> {
    let manager = Manager::new().map_err(|e| QdError::metric_unavailable(e.to_string()))?;
    let mut batteries = manager
        .batteries()
        .map_err(|e| QdError::metric_unavailable(e.to_string()))?;

    match batteries.next() {
        None => Ok(None),
        Some(Err(e)) => Err(QdError::metric_unavailable(e.to_string())),
        Some(Ok(battery)) => Ok(Some(BatteryReading {
            percent: battery.state_of_charge().get::<percent>() as f64,
            plugged: is_plugged(battery.state()),
        })),
    }
}

fn is_plugged(state: State) -> bool {
    matches!(state, State::Charging | State::Full)
}
