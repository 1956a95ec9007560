//! The floor the showcase model stands on.
//!
//! A subdivided plane in the XZ plane facing +Y. The geometry is generated on
//! the CPU so it can be checked without a GPU; [`mk_ground_node`] uploads it.

use std::sync::Arc;

use crate::{
    config::GroundConfig,
    data_structures::{
        model::{Material, Mesh, Model, ModelVertex},
        scene_graph::{ModelNode, SceneNode, ShadowFlags},
        texture::Texture,
    },
};

/// Vertices and triangle indices of a `width` x `depth` plane cut into a grid of
/// `width_segments` x `depth_segments` quads, centred on the origin.
///
/// Rows run from -Z to +Z and texture coordinates put `v = 1` on the -Z edge.
pub fn plane_geometry(
    width: f32,
    depth: f32,
    width_segments: u32,
    depth_segments: u32,
) -> (Vec<ModelVertex>, Vec<u32>) {
    let grid_x = width_segments.max(1);
    let grid_z = depth_segments.max(1);
    let grid_x1 = grid_x + 1;
    let grid_z1 = grid_z + 1;
    let segment_width = width / grid_x as f32;
    let segment_depth = depth / grid_z as f32;

    let mut vertices = Vec::with_capacity((grid_x1 * grid_z1) as usize);
    for iz in 0..grid_z1 {
        let z = iz as f32 * segment_depth - depth / 2.0;
        for ix in 0..grid_x1 {
            let x = ix as f32 * segment_width - width / 2.0;
            vertices.push(ModelVertex {
                position: [x, 0.0, z],
                tex_coords: [ix as f32 / grid_x as f32, 1.0 - iz as f32 / grid_z as f32],
                normal: [0.0, 1.0, 0.0],
            });
        }
    }

    let mut indices = Vec::with_capacity((grid_x * grid_z * 6) as usize);
    for iz in 0..grid_z {
        for ix in 0..grid_x {
            let a = ix + grid_x1 * iz;
            let b = ix + grid_x1 * (iz + 1);
            let c = (ix + 1) + grid_x1 * (iz + 1);
            let d = (ix + 1) + grid_x1 * iz;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }

    (vertices, indices)
}

/// Convert a `0xRRGGBB` sRGB colour into linear RGBA with full opacity.
pub fn hex_to_linear(hex: u32) -> [f32; 4] {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xff) as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    [channel(16), channel(8), channel(0), 1.0]
}

pub fn mk_ground_node(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    material_layout: &wgpu::BindGroupLayout,
    config: &GroundConfig,
) -> Box<dyn SceneNode> {
    let (vertices, indices) = plane_geometry(
        config.width,
        config.depth,
        config.width_segments,
        config.depth_segments,
    );
    let mesh = Mesh::new(device, "ground", &vertices, &indices, 0);
    let white = Texture::from_colour(device, queue, [255, 255, 255, 255], "ground texture");
    let material = Material::new(
        device,
        "ground",
        white,
        hex_to_linear(config.colour),
        material_layout,
    );
    let model = Model {
        meshes: vec![mesh],
        materials: Arc::from(vec![material]),
    };
    let mut node = ModelNode::from_model(device, "ground", model);
    node.set_shadows(ShadowFlags {
        cast: config.cast_shadow,
        receive: config.receive_shadow,
    });
    Box::new(node)
}
