#[cfg(feature = "nvml")]
use nvml_wrapper::{enum_wrappers::device::TemperatureSensor, Device, Nvml};

use crate::core::monitor::gpu::{GpuProvider, GpuVendor};
use crate::core::monitor::GpuReading;
use crate::error::{QdError, Result};

/// NVIDIA GPU provider using NVML
pub struct NvidiaGpuProvider {
    #[cfg(feature = "nvml")]
    nvml: Nvml,
    #[cfg_attr(not(feature = "nvml"), allow(dead_code))]
    device_index: u32,
}

impl NvidiaGpuProvider {
    /// Initializes NVML and selects the first GPU.
    pub fn new() -> Result<Self> {
        Self::with_device_index(0)
    }

    pub fn with_device_index(index: u32) -> Result<Self> {
        #[cfg(feature = "nvml")]
        {
            let nvml = Nvml::init()
                .map_err(|e| QdError::gpu_not_available(format!("Failed to init NVML: {}", e)))?;

            let _ = nvml.device_by_index(index).map_err(|e| {
                QdError::gpu_not_available(format!("GPU {} not found: {}", index, e))
            })?;

            Ok(Self {
                nvml,
                device_index: index,
            })
        }
        #[cfg(not(feature = "nvml"))]
        {
            let _ = index;
            Err(QdError::gpu_not_available("NVIDIA GPU support not enabled"))
        }
    }

    #[cfg(feature = "nvml")]
    fn device(&self) -> Result<Device<'_>> {
        self.nvml
            .device_by_index(self.device_index)
            .map_err(|e| QdError::metric_unavailable(format!("GPU device lost: {}", e)))
    }
}

impl GpuProvider for NvidiaGpuProvider {
    fn vendor(&self) -> GpuVendor {
        GpuVendor::Nvidia
    }

    fn read(&mut self) -> Result<GpuReading> {
        #[cfg(feature = "nvml")]
        {
            let device = self.device()?;

            let name = device
                .name()
                .unwrap_or_else(|_| "Unknown NVIDIA GPU".to_string());

            let load = device
                .utilization_rates()
                .map_err(|e| QdError::metric_unavailable(format!("GPU utilization: {}", e)))?
                .gpu;

            // A missing sensor reads as 0 rather than failing the whole reading
            let temperature = device.temperature(TemperatureSensor::Gpu).unwrap_or(0);

            Ok(GpuReading {
                name,
                load_percent: load as f64,
                temperature_celsius: temperature as f64,
            })
        }
        #[cfg(not(feature = "nvml"))]
        {
            Err(QdError::gpu_not_available("NVIDIA GPU support not enabled"))
        }
    }
}
