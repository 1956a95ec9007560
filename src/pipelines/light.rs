use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3};
use wgpu::util::DeviceExt;

use crate::{
    camera::OPENGL_TO_WGPU_MATRIX,
    config::{ShadowKind, SpotLightConfig},
    viewport::ShadowSettings,
};

/// Closest distance the shadow camera renders.
const SHADOW_NEAR: f32 = 0.5;

/// A cone light with physically based falloff.
///
/// Irradiance drops with the inverse square of the distance and is windowed to
/// reach zero at `range`. Across the cone the light fades between
/// `angle * (1 - penumbra)` and `angle`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpotLight {
    pub colour: [f32; 3],
    pub intensity: f32,
    pub range: f32,
    pub angle: f32,
    pub penumbra: f32,
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub cast_shadow: bool,
    pub shadow_bias: f32,
}

impl SpotLight {
    pub fn from_config(config: &SpotLightConfig) -> Self {
        Self {
            colour: config.colour,
            intensity: config.intensity,
            range: config.range,
            angle: config.angle,
            penumbra: config.penumbra.clamp(0.0, 1.0),
            position: config.position.into(),
            target: config.target.into(),
            cast_shadow: config.cast_shadow,
            shadow_bias: config.shadow_bias,
        }
    }

    /// Unit vector from the light towards its target.
    pub fn direction(&self) -> Vector3<f32> {
        let dir = self.target - self.position;
        if dir.magnitude2() == 0.0 {
            -Vector3::unit_y()
        } else {
            dir.normalize()
        }
    }

    /// Cosines of the outer cone edge and of the angle where the fade starts.
    pub fn cone_cos(&self) -> (f32, f32) {
        let outer = self.angle.cos();
        let inner = (self.angle * (1.0 - self.penumbra)).cos();
        (outer, inner)
    }

    /// View-projection of the shadow camera: a square frustum matching the cone.
    pub fn view_proj(&self) -> Matrix4<f32> {
        let direction = self.direction();
        // look_at degenerates when looking along the up vector
        let up = if direction.cross(Vector3::unit_y()).magnitude2() < 1e-6 {
            Vector3::unit_z()
        } else {
            Vector3::unit_y()
        };
        let view = Matrix4::look_at_rh(self.position, self.position + direction, up);
        let far = if self.range > SHADOW_NEAR { self.range } else { 500.0 };
        let proj = cgmath::perspective(Rad(2.0 * self.angle), 1.0, SHADOW_NEAR, far);
        OPENGL_TO_WGPU_MATRIX * proj * view
    }

    pub fn to_uniform(&self, shadows: &ShadowSettings) -> LightUniform {
        let (cos_outer, cos_inner) = self.cone_cos();
        // smoothstep is undefined for equal edges
        let cos_inner = cos_inner.max(cos_outer + 1e-4);
        LightUniform {
            view_proj: self.view_proj().into(),
            position: self.position.into(),
            range: self.range,
            direction: self.direction().into(),
            intensity: self.intensity,
            colour: self.colour,
            cos_outer,
            cos_inner,
            shadow_bias: self.shadow_bias,
            cast_shadow: (shadows.enabled && self.cast_shadow) as u32,
            pcf: (shadows.kind == ShadowKind::PcfSoft) as u32,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub view_proj: [[f32; 4]; 4],
    pub position: [f32; 3],
    // shares the 16 byte slot of `position` in WGSL
    pub range: f32,
    pub direction: [f32; 3],
    pub intensity: f32,
    pub colour: [f32; 3],
    pub cos_outer: f32,
    pub cos_inner: f32,
    pub shadow_bias: f32,
    pub cast_shadow: u32,
    pub pcf: u32,
}

/// GPU copy of the scene's spotlight.
#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl LightResources {
    pub fn new(device: &wgpu::Device, light: &SpotLight, shadows: &ShadowSettings) -> Self {
        let uniform = light.to_uniform(shadows);
        let buffer = mk_buffer(device, uniform);
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = mk_bind_group(device, &bind_group_layout, &buffer);
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn write_to_buffer(
        &mut self,
        queue: &wgpu::Queue,
        light: &SpotLight,
        shadows: &ShadowSettings,
    ) {
        self.uniform = light.to_uniform(shadows);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

pub fn mk_buffer(device: &wgpu::Device, light_uniform: LightUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Spot Light Buffer"),
        contents: bytemuck::cast_slice(&[light_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
        label: Some("light_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    light_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: light_buffer.as_entire_binding(),
        }],
        label: Some("light_bind_group"),
    })
}
