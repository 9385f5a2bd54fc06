use anyhow::Result;
use wgpu::{Adapter, Device, Instance, Queue};

use retrofx_core::FxError;

/// The shared handle to one GPU device and submission queue.
///
/// One context per engine instance; nothing here is global. The context
/// itself is cheap to share, but everything built on top of it (target,
/// caches) is serialized through the owning engine.
pub struct GpuContext {
    pub instance: Instance,
    pub adapter: Adapter,
    pub device: Device,
    pub queue: Queue,
}

impl GpuContext {
    /// Initializes WGPU headless, selecting the best available backend
    /// (Metal, Vulkan, DX12, etc.).
    ///
    /// Failure means no compatible graphics context exists on this
    /// machine: unrecoverable, surfaced immediately, never retried.
    pub fn init() -> Result<Self, FxError> {
        Self::init_inner().map_err(|e| FxError::UnsupportedHardware(e.to_string()))
    }

    fn init_inner() -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None, // Headless rendering
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| anyhow::anyhow!("no suitable wgpu adapter found"))?;

        tracing::debug!("selected adapter: {:?}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("RetroFX Headless GPU Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
            },
            None,
        ))?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }
}
