//! Camera, projection and the orbit controller.
//!
//! The [`Camera`] is a plain eye/target pair. [`OrbitController`] owns the
//! interaction state: it turns pointer drags and wheel steps into spherical
//! deltas around a fixed target and applies them, damped and clamped, once per
//! frame in [`OrbitController::update`].

use std::f32::consts::{PI, TAU};

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3};
use wgpu::util::DeviceExt;
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
};

use crate::config::{CameraConfig, OrbitConfig};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Keeps the polar angle away from the poles where `look_at` degenerates.
const POLE_EPSILON: f32 = 0.000001;

/// Pixels per line when the platform reports wheel steps in lines.
const PIXELS_PER_LINE: f64 = 100.0;

#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>, T: Into<Point3<f32>>>(position: P, target: T) -> Self {
        Self {
            position: position.into(),
            target: target.into(),
        }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(config.position, config.look_at)
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, Vector3::unit_y())
    }
}

/// Perspective projection. `aspect` always mirrors the last size passed to [`Projection::resize`].
#[derive(Debug, Clone)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// GPU side of the camera: the uniform and the bind group the pipelines read it from.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: OrbitController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(
        device: &wgpu::Device,
        camera: Camera,
        controller: OrbitController,
        projection: &Projection,
    ) -> Self {
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, projection);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            camera,
            controller,
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn write_to_buffer(&mut self, queue: &wgpu::Queue, projection: &Projection) {
        self.uniform.update_view_proj(&self.camera, projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

/// Position on a sphere: `radius`, polar angle `phi` from +Y and azimuth `theta` around Y from +Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    pub phi: f32,
    pub theta: f32,
}

impl Spherical {
    pub fn from_offset(offset: Vector3<f32>) -> Self {
        let radius = offset.magnitude();
        if radius == 0.0 {
            return Self {
                radius,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            theta: offset.x.atan2(offset.z),
        }
    }

    pub fn to_offset(&self) -> Vector3<f32> {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vector3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

/// Orbit, zoom and (optionally) auto-rotate a camera around a fixed target.
///
/// Input handlers only accumulate deltas; nothing moves until
/// [`update`](Self::update) runs. With damping on, each update consumes
/// `damping_factor` of the pending rotation and keeps the rest for the
/// following frames, which is what makes the motion trail the pointer.
#[derive(Debug, Clone)]
pub struct OrbitController {
    config: OrbitConfig,
    target: Point3<f32>,
    pending: Spherical,
    scale: f32,
    rotating: bool,
    panning: bool,
    last_cursor: Option<PhysicalPosition<f64>>,
    viewport_height: f32,
}

impl OrbitController {
    pub fn new(config: OrbitConfig) -> Self {
        let target = config.target.into();
        Self {
            config,
            target,
            pending: Spherical {
                radius: 0.0,
                phi: 0.0,
                theta: 0.0,
            },
            scale: 1.0,
            rotating: false,
            panning: false,
            last_cursor: None,
            viewport_height: 1.0,
        }
    }

    pub fn config(&self) -> &OrbitConfig {
        &self.config
    }

    pub fn target(&self) -> Point3<f32> {
        self.target
    }

    /// Drag distances are relative to the viewport height, so the rig needs to know it.
    pub fn set_viewport_height(&mut self, height: u32) {
        self.viewport_height = height.max(1) as f32;
    }

    /// Queue a rotation around the vertical axis (radians, positive turns left).
    ///
    /// Whole revolutions are dropped from the queue, they end where they started.
    pub fn rotate_left(&mut self, angle: f32) {
        if angle.is_finite() {
            self.pending.theta = (self.pending.theta - angle % TAU) % TAU;
        } else {
            log::warn!("Ignoring non-finite orbit angle {}", angle);
        }
    }

    /// Queue a change of the polar angle (radians, positive tilts the camera up).
    pub fn rotate_up(&mut self, angle: f32) {
        if angle.is_finite() {
            // the polar clamp never lets more than half a turn through
            self.pending.phi = (self.pending.phi - angle).clamp(-PI, PI);
        } else {
            log::warn!("Ignoring non-finite orbit angle {}", angle);
        }
    }

    /// Move closer: `factor` in `(0, 1)` shrinks the distance by that ratio on the next update.
    pub fn dolly_in(&mut self, factor: f32) {
        if self.config.enable_zoom && factor.is_finite() && factor > 0.0 {
            self.scale *= factor;
        }
    }

    pub fn dolly_out(&mut self, factor: f32) {
        if self.config.enable_zoom && factor.is_finite() && factor > 0.0 {
            self.scale /= factor;
        }
    }

    /// Panning is disabled for this rig unless the config turns it on, in which case the
    /// target moves in the horizontal plane.
    pub fn pan(&mut self, dx: f32, dz: f32) {
        if !self.config.enable_pan {
            return;
        }
        if dx.is_finite() && dz.is_finite() {
            self.target += Vector3::new(dx, 0.0, dz);
        }
    }

    fn zoom_factor(&self) -> f32 {
        0.95f32.powf(self.config.zoom_speed)
    }

    /// Pointer drag in physical pixels. A full viewport height equals one revolution.
    pub fn handle_mouse(&mut self, dx: f64, dy: f64) {
        let height = self.viewport_height;
        let speed = self.config.rotate_speed;
        self.rotate_left(2.0 * PI * dx as f32 / height * speed);
        self.rotate_up(2.0 * PI * dy as f32 / height * speed);
    }

    /// One wheel gesture; negative `delta_y` (scrolling up) zooms in.
    pub fn handle_scroll(&mut self, delta_y: f64) {
        if delta_y < 0.0 {
            self.dolly_in(self.zoom_factor());
        } else if delta_y > 0.0 {
            self.dolly_out(self.zoom_factor());
        }
    }

    pub fn handle_window_events(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.rotating = *state == ElementState::Pressed;
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Right,
                ..
            } => {
                self.panning = *state == ElementState::Pressed;
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(last) = self.last_cursor {
                    let (dx, dy) = (position.x - last.x, position.y - last.y);
                    if self.rotating {
                        self.handle_mouse(dx, dy);
                    } else if self.panning {
                        let distance_per_pixel = self.config.max_distance / self.viewport_height;
                        self.pan(-dx as f32 * distance_per_pixel, -dy as f32 * distance_per_pixel);
                    }
                }
                self.last_cursor = Some(*position);
            }
            WindowEvent::CursorLeft { .. } => {
                self.rotating = false;
                self.panning = false;
                self.last_cursor = None;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let delta_y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -(*y as f64) * PIXELS_PER_LINE,
                    MouseScrollDelta::PixelDelta(pos) => -pos.y,
                };
                self.handle_scroll(delta_y);
            }
            WindowEvent::PinchGesture { delta, .. } => {
                // positive deltas spread the fingers apart
                if *delta > 0.0 {
                    self.dolly_in(self.zoom_factor());
                } else if *delta < 0.0 {
                    self.dolly_out(self.zoom_factor());
                }
            }
            _ => (),
        }
    }

    /// Advance damping and apply pending input to `camera`. Call exactly once per frame.
    ///
    /// `dt` only matters for auto-rotation. Returns `true` if the camera moved.
    pub fn update(&mut self, camera: &mut Camera, dt: instant::Duration) -> bool {
        let before = camera.position;
        let mut spherical = Spherical::from_offset(camera.position - self.target);

        if self.config.auto_rotate {
            let angle = 2.0 * PI / 60.0 * self.config.auto_rotate_speed * dt.as_secs_f32();
            self.rotate_left(angle);
        }

        if self.config.enable_damping {
            spherical.theta += self.pending.theta * self.config.damping_factor;
            spherical.phi += self.pending.phi * self.config.damping_factor;
        } else {
            spherical.theta += self.pending.theta;
            spherical.phi += self.pending.phi;
        }

        spherical.phi = spherical
            .phi
            .clamp(self.config.min_polar_angle, self.config.max_polar_angle)
            .clamp(POLE_EPSILON, PI - POLE_EPSILON);
        let scaled = spherical.radius * self.scale;
        let radius = if scaled.is_nan() { spherical.radius } else { scaled };
        spherical.radius = radius.clamp(self.config.min_distance, self.config.max_distance);

        let position = self.target + spherical.to_offset();
        if !(position.x.is_finite() && position.y.is_finite() && position.z.is_finite()) {
            log::warn!("Orbit update produced {:?}, keeping the camera where it is", position);
            self.pending.theta = 0.0;
            self.pending.phi = 0.0;
            self.scale = 1.0;
            return false;
        }
        camera.position = position;
        camera.target = self.target;

        if self.config.enable_damping {
            self.pending.theta *= 1.0 - self.config.damping_factor;
            self.pending.phi *= 1.0 - self.config.damping_factor;
        } else {
            self.pending.theta = 0.0;
            self.pending.phi = 0.0;
        }
        self.scale = 1.0;

        (camera.position - before).magnitude2() > f32::EPSILON
    }

    /// Current distance of `camera` from the orbit target.
    pub fn distance(&self, camera: &Camera) -> f32 {
        (camera.position - self.target).magnitude()
    }

    /// Current polar angle of `camera` (radians from +Y).
    pub fn polar_angle(&self, camera: &Camera) -> f32 {
        Spherical::from_offset(camera.position - self.target).phi
    }
}
