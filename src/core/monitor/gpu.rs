use super::metrics::GpuReading;
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    #[default]
    Unknown,
}

/// Trait for GPU metrics providers
///
/// Abstracts GPU load/temperature reads across vendors.
/// Implementations live in the platform layer.
pub trait GpuProvider: Send {
    /// Get the vendor of the GPU
    fn vendor(&self) -> GpuVendor;

    /// Read current load and temperature
    fn read(&mut self) -> Result<GpuReading>;
}
