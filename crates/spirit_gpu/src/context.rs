//! Device and queue ownership

use crate::error::{GpuError, Result};
use crate::fbo::STATE_FORMAT;
use std::sync::Arc;

/// Shared wgpu device and queue
///
/// Cloning is cheap; every component holds its own handle.
#[derive(Clone)]
pub struct GpuContext {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    adapter: Option<Arc<wgpu::Adapter>>,
}

impl GpuContext {
    /// Wrap a device owned by the embedding renderer
    ///
    /// Without the adapter only the formats' guaranteed features are known.
    pub fn from_device(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        Self {
            device,
            queue,
            adapter: None,
        }
    }

    /// Wrap a device along with the adapter it came from
    pub fn from_adapter(
        adapter: Arc<wgpu::Adapter>,
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
    ) -> Self {
        Self {
            device,
            queue,
            adapter: Some(adapter),
        }
    }

    /// Pick backends by platform to avoid probing every driver stack
    fn preferred_backends() -> wgpu::Backends {
        #[cfg(target_os = "macos")]
        {
            wgpu::Backends::METAL
        }
        #[cfg(target_os = "windows")]
        {
            wgpu::Backends::DX12
        }
        #[cfg(target_os = "linux")]
        {
            wgpu::Backends::VULKAN | wgpu::Backends::GL
        }
        #[cfg(target_arch = "wasm32")]
        {
            wgpu::Backends::BROWSER_WEBGPU | wgpu::Backends::GL
        }
        #[cfg(not(any(
            target_os = "macos",
            target_os = "windows",
            target_os = "linux",
            target_arch = "wasm32"
        )))]
        {
            wgpu::Backends::PRIMARY
        }
    }

    /// Create a device with no surface (off-screen rendering and tests)
    pub async fn headless() -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: Self::preferred_backends(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::AdapterNotFound)?;

        let info = adapter.get_info();
        tracing::info!("Using adapter {} ({:?})", info.name, info.backend);
        if !adapter.get_downlevel_capabilities().is_webgpu_compliant() {
            tracing::warn!("Adapter {} is downlevel", info.name);
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Spirit GPU Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::MemoryUsage,
                },
                None,
            )
            .await?;

        let ctx = Self::from_adapter(Arc::new(adapter), Arc::new(device), Arc::new(queue));
        if !ctx.supports_state_targets() {
            return Err(GpuError::UnsupportedAdapter(format!(
                "{} cannot render to and sample {:?} textures",
                info.name, STATE_FORMAT
            )));
        }
        Ok(ctx)
    }

    /// Blocking variant of [`headless`](Self::headless)
    pub fn headless_blocking() -> Result<Self> {
        pollster::block_on(Self::headless())
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    pub fn adapter(&self) -> Option<&Arc<wgpu::Adapter>> {
        self.adapter.as_ref()
    }

    /// Capabilities the device actually grants `format`
    ///
    /// Downlevel adapters, and devices with adapter specific format features
    /// enabled, follow the adapter's own table. Everything else gets the
    /// WebGPU guarantees.
    pub fn format_features(&self, format: wgpu::TextureFormat) -> wgpu::TextureFormatFeatures {
        let features = self.device.features();
        match &self.adapter {
            Some(adapter)
                if features.contains(wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES)
                    || !adapter.get_downlevel_capabilities().is_webgpu_compliant() =>
            {
                adapter.get_texture_format_features(format)
            }
            _ => format.guaranteed_format_features(features),
        }
    }

    /// Whether simulation state textures can be rendered to and sampled
    pub fn supports_state_targets(&self) -> bool {
        self.format_features(STATE_FORMAT).allowed_usages.contains(
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        )
    }

    /// Run `create` inside validation and out-of-memory error scopes
    ///
    /// Any error wgpu reports for the enclosed calls is returned as
    /// [`GpuError::Resource`] instead of reaching the device's uncaptured
    /// error handler.
    pub(crate) fn scoped<T>(&self, what: &str, create: impl FnOnce(&wgpu::Device) -> T) -> Result<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let value = create(&self.device);

        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());

        match validation.or(out_of_memory) {
            Some(err) => {
                tracing::error!("Failed to create {}: {}", what, err);
                Err(GpuError::Resource(format!("{}: {}", what, err)))
            }
            None => Ok(value),
        }
    }
}
