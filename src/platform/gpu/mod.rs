//! GPU-specific platform code.
//!
//! Only NVIDIA cards are read (via NVML, behind the `nvml` feature).

mod nvidia;

pub use nvidia::NvidiaGpuProvider;

use crate::core::monitor::gpu::GpuProvider;
use crate::error::Result;

/// Attempt to get an available GPU provider
pub fn get_gpu_provider() -> Result<Box<dyn GpuProvider>> {
    Ok(Box::new(NvidiaGpuProvider::new()?))
}
