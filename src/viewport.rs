//! Viewport bookkeeping that does not need a GPU.
//!
//! [`Viewport`] remembers the drawable size, the pixel ratio of the display and
//! how frames are presented (colour space, clear colour, shadows). The GPU
//! context reads it whenever the surface has to be (re)configured.

use winit::dpi::{LogicalSize, PhysicalSize};

use crate::{
    camera::Projection,
    config::{ShadowKind, ViewportConfig},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Srgb,
    Linear,
}

impl ColorSpace {
    /// Pick a surface format that matches this colour space, falling back to the first one offered.
    pub fn pick_format(&self, formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
        let wants_srgb = *self == ColorSpace::Srgb;
        formats
            .iter()
            .copied()
            .find(|f| f.is_srgb() == wants_srgb)
            .or_else(|| formats.first().copied())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowSettings {
    pub enabled: bool,
    pub kind: ShadowKind,
    pub map_size: u32,
}

#[derive(Debug, Clone)]
pub struct Viewport {
    size: PhysicalSize<u32>,
    pixel_ratio: f64,
    pub color_space: ColorSpace,
    pub clear_colour: wgpu::Color,
    pub shadows: ShadowSettings,
}

impl Viewport {
    pub fn new(size: PhysicalSize<u32>, pixel_ratio: f64, config: &ViewportConfig) -> Self {
        Self {
            size,
            pixel_ratio: sanitize_ratio(pixel_ratio),
            color_space: ColorSpace::Srgb,
            clear_colour: config.clear_colour,
            shadows: ShadowSettings {
                enabled: config.shadows_enabled,
                kind: config.shadow_kind,
                map_size: config.shadow_map_size.max(1),
            },
        }
    }

    /// Drawable size in physical pixels; this is what the surface is configured with.
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Size in CSS / logical pixels.
    pub fn logical_size(&self) -> LogicalSize<f64> {
        self.size.to_logical(self.pixel_ratio)
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    pub fn aspect(&self) -> f32 {
        self.size.width as f32 / self.size.height.max(1) as f32
    }

    /// Apply a new drawable size and re-derive the camera aspect from it.
    ///
    /// A zero width or height (minimised window) is ignored and `false` is returned.
    pub fn resize(&mut self, width: u32, height: u32, projection: &mut Projection) -> bool {
        if width == 0 || height == 0 {
            log::debug!("Ignoring resize to {}x{}", width, height);
            return false;
        }
        self.size = PhysicalSize::new(width, height);
        projection.resize(width, height);
        true
    }

    /// The display moved to a screen with another density.
    pub fn set_pixel_ratio(&mut self, pixel_ratio: f64) {
        self.pixel_ratio = sanitize_ratio(pixel_ratio);
    }
}

/// Scale `width` x `height` down so neither side exceeds `max_dimension`,
/// keeping the aspect ratio. Sizes within the limit come back unchanged.
pub fn fit_to_limit(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let max_dimension = max_dimension.max(1);
    let longest = width.max(height);
    if longest <= max_dimension {
        return (width, height);
    }
    let scale = max_dimension as f64 / longest as f64;
    let fit = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, max_dimension);
    log::debug!(
        "{}x{} exceeds the texture limit {}, drawing at {}x{}",
        width,
        height,
        max_dimension,
        fit(width),
        fit(height)
    );
    (fit(width), fit(height))
}

/// Highest multisample count up to `requested` that `supported` accepts, or 1.
pub fn pick_sample_count(requested: u32, supported: impl Fn(u32) -> bool) -> u32 {
    [16, 8, 4, 2]
        .into_iter()
        .filter(|&count| count <= requested)
        .find(|&count| supported(count))
        .unwrap_or(1)
}

fn sanitize_ratio(pixel_ratio: f64) -> f64 {
    if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
        pixel_ratio
    } else {
        log::warn!("Invalid pixel ratio {}, falling back to 1.0", pixel_ratio);
        1.0
    }
}
