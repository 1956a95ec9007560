//! Viewer configuration.
//!
//! Every tunable of the viewer lives here so the scene, the camera rig and the
//! redirect rules can be adjusted in one place. [`ViewerConfig::default`]
//! reproduces the showcase scene: a grey floor, a narrow spotlight from above,
//! the sci-fi chair and an orbit camera that stays above ground.

use instant::Duration;

#[derive(Clone, Debug, PartialEq)]
pub struct ViewerConfig {
    pub viewport: ViewportConfig,
    pub camera: CameraConfig,
    pub orbit: OrbitConfig,
    pub ground: GroundConfig,
    pub spot_light: SpotLightConfig,
    pub model: ModelConfig,
    pub redirect: RedirectConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            viewport: ViewportConfig::default(),
            camera: CameraConfig::default(),
            orbit: OrbitConfig::default(),
            ground: GroundConfig::default(),
            spot_light: SpotLightConfig::default(),
            model: ModelConfig::default(),
            redirect: RedirectConfig::default(),
        }
    }
}

/// How shadows are filtered when sampling the shadow map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShadowKind {
    /// Single depth comparison per fragment.
    Basic,
    /// Percentage-closer filtering over a 3x3 kernel.
    PcfSoft,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ViewportConfig {
    pub clear_colour: wgpu::Color,
    pub shadows_enabled: bool,
    pub shadow_kind: ShadowKind,
    /// Edge length of the square shadow map in texels.
    pub shadow_map_size: u32,
    /// Samples per pixel for antialiasing. Lowered to what the surface format
    /// supports, 1 turns it off.
    pub msaa_samples: u32,
    /// Id of the canvas element. `None` lets winit create one and append it to `<body>`.
    pub canvas_id: Option<String>,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            clear_colour: wgpu::Color::BLACK,
            shadows_enabled: true,
            shadow_kind: ShadowKind::PcfSoft,
            shadow_map_size: 1024,
            msaa_samples: 4,
            canvas_id: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub look_at: [f32; 3],
    pub fovy: cgmath::Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [-4.0, 5.0, -11.0],
            look_at: [0.0, 0.0, 0.0],
            fovy: cgmath::Deg(45.0),
            znear: 1.0,
            zfar: 1000.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrbitConfig {
    pub target: [f32; 3],
    pub min_distance: f32,
    pub max_distance: f32,
    /// Radians from the +Y axis.
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub enable_pan: bool,
    pub enable_zoom: bool,
    pub auto_rotate: bool,
    /// Revolutions per minute when `auto_rotate` is on.
    pub auto_rotate_speed: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            target: [0.0, 1.0, 0.0],
            min_distance: 5.0,
            max_distance: 20.0,
            min_polar_angle: 0.5,
            max_polar_angle: 1.5,
            enable_damping: true,
            damping_factor: 0.05,
            enable_pan: false,
            enable_zoom: true,
            auto_rotate: false,
            auto_rotate_speed: 2.0,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroundConfig {
    pub width: f32,
    pub depth: f32,
    pub width_segments: u32,
    pub depth_segments: u32,
    /// sRGB hex colour, e.g. `0x555555`.
    pub colour: u32,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            width: 20.0,
            depth: 20.0,
            width_segments: 32,
            depth_segments: 32,
            colour: 0x555555,
            cast_shadow: false,
            receive_shadow: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpotLightConfig {
    pub colour: [f32; 3],
    /// Luminous intensity in candela.
    pub intensity: f32,
    /// Distance at which the light's contribution reaches zero.
    pub range: f32,
    /// Half-angle of the cone in radians.
    pub angle: f32,
    /// Fraction of the cone that fades out, in `[0, 1]`.
    pub penumbra: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub cast_shadow: bool,
    pub shadow_bias: f32,
}

impl Default for SpotLightConfig {
    fn default() -> Self {
        Self {
            colour: [1.0, 1.0, 1.0],
            intensity: 3000.0,
            range: 100.0,
            angle: 0.22,
            penumbra: 1.0,
            position: [0.0, 25.0, 0.0],
            target: [0.0, 0.0, 0.0],
            cast_shadow: true,
            shadow_bias: -0.0001,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ModelConfig {
    /// Directory below the asset root that holds the model and its resources.
    pub directory: String,
    pub file_name: String,
    pub position: [f32; 3],
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl ModelConfig {
    /// Path of the model file relative to the asset root.
    pub fn path(&self) -> String {
        if self.directory.is_empty() {
            self.file_name.clone()
        } else {
            format!("{}/{}", self.directory.trim_end_matches('/'), self.file_name)
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            directory: "public/scifi_chair_concept".to_string(),
            file_name: "scene.gltf".to_string(),
            position: [0.0, 2.5, 50.0],
            cast_shadow: true,
            receive_shadow: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RedirectConfig {
    /// Viewports narrower than this (in logical pixels) are sent to the fallback page.
    pub breakpoint_width: f64,
    /// Page navigated to, relative to the current location.
    pub fallback_page: String,
    /// Quiet period after the last resize before the width is checked.
    pub debounce: Duration,
    /// Whether the spacebar jumps to the fallback page.
    pub space_redirects: bool,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            breakpoint_width: 1024.0,
            fallback_page: "page.html".to_string(),
            debounce: Duration::from_millis(200),
            space_redirects: true,
        }
    }
}
