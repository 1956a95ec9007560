use std::sync::Arc;

use anyhow::Context as _;
use winit::window::Window;

use crate::{
    config::ViewerConfig,
    data_structures::texture,
    render::Renderer,
    scene::Scene,
    viewport::{fit_to_limit, pick_sample_count, Viewport},
};

/// The window, its surface and everything the GPU needs to draw into it.
#[derive(Debug)]
pub struct Context {
    pub window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub viewport: Viewport,
    pub(crate) depth_texture: texture::Texture,
    /// Multisampled colour target, `None` when drawing straight to the surface.
    pub(crate) msaa_target: Option<texture::Texture>,
    pub renderer: Renderer,
    is_surface_configured: bool,
}

impl Context {
    /// Set up the surface, device and renderer for `window`. Fails if no
    /// adapter or device can be obtained.
    pub async fn new(window: Arc<Window>, viewer_config: &ViewerConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let viewport = Viewport::new(size, window.scale_factor(), &viewer_config.viewport);

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("Cannot create a rendering surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No graphics adapter can present to the window")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
                ..Default::default()
            })
            .await
            .context("Cannot open the graphics device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = viewport
            .color_space
            .pick_format(&surface_caps.formats)
            .context("The surface supports no texture format")?;
        let format_features = |format| adapter.get_texture_format_features(format).flags;
        let (colour_flags, depth_flags) = (
            format_features(surface_format),
            format_features(texture::Texture::DEPTH_FORMAT),
        );
        let adapter_specific = device
            .features()
            .contains(wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES);
        // 4 samples are guaranteed for renderable formats, anything else needs the feature
        let sample_count = pick_sample_count(viewer_config.viewport.msaa_samples, |count| {
            (count == 4 || adapter_specific)
                && colour_flags.sample_count_supported(count)
                && depth_flags.sample_count_supported(count)
        });

        let (width, height) = fit_to_limit(
            size.width.max(1),
            size.height.max(1),
            device.limits().max_texture_dimension_2d,
        );
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        // zero sized windows (web canvas before layout) are configured on the first resize
        let is_surface_configured = size.width > 0 && size.height > 0;
        if is_surface_configured {
            surface.configure(&device, &config);
        }

        let depth_texture = texture::Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            sample_count,
            "depth_texture",
        );
        let msaa_target = (sample_count > 1).then(|| {
            texture::Texture::create_msaa_target(
                &device,
                [config.width, config.height],
                surface_format,
                sample_count,
            )
        });
        let renderer = Renderer::new(
            &device,
            surface_format,
            size,
            viewport.shadows,
            sample_count,
            viewer_config,
        );
        log::info!(
            "Context ready: {}x{} @{}x, {:?}, {}x MSAA",
            size.width,
            size.height,
            viewport.pixel_ratio(),
            surface_format,
            sample_count
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            viewport,
            depth_texture,
            msaa_target,
            renderer,
            is_surface_configured,
        })
    }

    /// Apply a new drawable size to the viewport, camera, surface and depth buffer.
    ///
    /// The camera keeps the window's aspect. The surface is scaled down to the
    /// device's texture limit when the window is larger.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if !self
            .viewport
            .resize(width, height, &mut self.renderer.projection)
        {
            return false;
        }
        let (surface_width, surface_height) =
            fit_to_limit(width, height, self.device.limits().max_texture_dimension_2d);
        self.config.width = surface_width;
        self.config.height = surface_height;
        self.surface.configure(&self.device, &self.config);
        self.is_surface_configured = true;
        let sample_count = self.renderer.sample_count;
        self.depth_texture = texture::Texture::create_depth_texture(
            &self.device,
            [self.config.width, self.config.height],
            sample_count,
            "depth_texture",
        );
        if sample_count > 1 {
            self.msaa_target = Some(texture::Texture::create_msaa_target(
                &self.device,
                [self.config.width, self.config.height],
                self.config.format,
                sample_count,
            ));
        }
        self.renderer.camera.controller.set_viewport_height(height);
        true
    }

    pub fn set_pixel_ratio(&mut self, pixel_ratio: f64) {
        self.viewport.set_pixel_ratio(pixel_ratio);
    }

    pub fn is_surface_configured(&self) -> bool {
        self.is_surface_configured
    }

    /// Draw `scene` to the window.
    pub fn render(&mut self, scene: &Scene) -> Result<(), wgpu::SurfaceError> {
        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        let (colour, resolve) = match &self.msaa_target {
            Some(msaa) => (&msaa.view, Some(&view)),
            None => (&view, None),
        };
        self.renderer
            .encode(&mut encoder, colour, resolve, &self.depth_texture.view, scene);

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}
