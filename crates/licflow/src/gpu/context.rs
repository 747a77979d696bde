use anyhow::{bail, Context as AnyhowContext, Result};

use crate::types::Resolution;

/// Headless device and queue; nothing here presents to a window.
pub struct GpuContext {
    pub _instance: wgpu::Instance,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
    pub max_texture_dimension: u32,
}

impl GpuContext {
    pub fn new(power_preference: wgpu::PowerPreference) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let adapter_info = adapter.get_info();
        let limits = adapter.limits();
        tracing::debug!(
            name = %adapter_info.name,
            backend = ?adapter_info.backend,
            device_type = ?adapter_info.device_type,
            "selected GPU adapter"
        );

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("oceanflow device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits.clone(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::default(),
        }))
        .context("failed to create GPU device")?;

        Ok(Self {
            _instance: instance,
            device,
            queue,
            adapter_info,
            max_texture_dimension: limits.max_texture_dimension_2d,
        })
    }

    /// Fails when a texture of `resolution` would exceed the device limit.
    pub fn check_resolution(&self, resolution: Resolution) -> Result<()> {
        let max_dimension = self.max_texture_dimension;
        if resolution.width > max_dimension || resolution.height > max_dimension {
            bail!("GPU max texture dimension is {max_dimension}, requested {resolution}");
        }
        Ok(())
    }
}
