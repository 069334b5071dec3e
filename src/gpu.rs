//! # GPU Management Module
//!
//! The `gpu` module owns the wgpu objects every frame needs: the window surface, the device, the queue
//! and the surface configuration. The [`Renderer`](crate::Renderer) builds its pipelines and buffers on
//! top of it.
//!
//! ## Features
//!
//! - **Fallible Initialization**: [`Gpu::new_async`] reports a missing adapter or device as a
//!   [`SurfaceError`] instead of panicking, so the driver can log it and exit cleanly.
//! - **Dynamic Surface Resizing**: [`Gpu::resize`] reconfigures the surface for a new framebuffer size.
//! - **Depth Texture Creation**: [`Gpu::create_depth_texture`] builds the depth attachment the scene
//!   pass renders against.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use lumen_core::{Gpu, SurfaceError};
//!
//! async fn create_gpu(window: std::sync::Arc<winit::window::Window>) -> Result<Gpu, SurfaceError> {
//!     Gpu::new_async(window, 1280, 720).await
//! }
//! ```

use log::info;
use wgpu::InstanceDescriptor;

use crate::error::SurfaceError;

/// Format of the depth attachment used by every pipeline.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// The GPU resources tied to one window.
///
/// # Fields
/// - `surface`: The presentation surface of the window.
/// - `device`: Creates buffers, textures and pipelines.
/// - `queue`: Receives buffer writes and command buffers.
/// - `surface_config`: Current size, format and present mode of the surface.
/// - `surface_format`: The color format pipelines render into.
pub struct Gpu {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface_config: wgpu::SurfaceConfiguration,
    pub surface_format: wgpu::TextureFormat,
}

impl Gpu {
    pub fn aspect_ratio(&self) -> f32 {
        self.surface_config.width as f32 / self.surface_config.height.max(1) as f32
    }

    /// Reconfigures the surface for a new framebuffer size. Zero-sized requests are ignored; a minimized
    /// window reports them and wgpu rejects zero-sized surfaces.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Creates a depth texture matching the given size and returns its view.
    pub fn create_depth_texture(&self, width: u32, height: u32) -> wgpu::TextureView {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Depth Texture View"),
            format: Some(DEPTH_FORMAT),
            dimension: Some(wgpu::TextureViewDimension::D2),
            aspect: wgpu::TextureAspect::All,
            base_mip_level: 0,
            base_array_layer: 0,
            array_layer_count: None,
            mip_level_count: None,
            usage: None,
        })
    }

    /// Creates the surface for `window`, then requests an adapter able to present to it and a device.
    pub async fn new_async(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<Self, SurfaceError> {
        let instance = wgpu::Instance::new(&InstanceDescriptor::default());

        let surface = instance
            .create_surface(window)
            .map_err(|e| SurfaceError::CreateSurface(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(SurfaceError::Adapter)?;

        info!("WGPU Adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("WGPU Device"),
                    memory_hints: wgpu::MemoryHints::default(),
                    required_features: wgpu::Features::default(),
                    #[cfg(not(all(target_arch = "wasm32", feature = "webgl")))]
                    required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                    #[cfg(all(target_arch = "wasm32", feature = "webgl"))]
                    required_limits: wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits()),
                },
                None,
            )
            .await
            .map_err(|e| SurfaceError::Device(e.to_string()))?;

        let surface_capabilities = surface.get_capabilities(&adapter);
        let surface_format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or_else(|| SurfaceError::CreateSurface("surface reports no formats".into()))?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &surface_config);

        Ok(Self {
            surface,
            device,
            queue,
            surface_config,
            surface_format,
        })
    }
}
