// Platform-specific code module

pub mod elevation;
pub mod firewall;
pub mod gpu;
pub mod paths;
pub mod power_source;
pub mod registry;
pub mod shell;

pub use elevation::{is_elevated, require_elevated};
pub use shell::CommandOutput;
