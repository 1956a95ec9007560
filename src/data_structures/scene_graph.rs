//! Scene graph and hierarchical scene organization.
//!
//! Nodes form a tree of [`SceneNode`] trait objects. Each node has a local
//! transform relative to its parent and a cached world transform that is
//! refreshed top-down by [`SceneNode::update_world_transforms`]. Mesh nodes
//! additionally carry [`ShadowFlags`] deciding whether they occlude the
//! spotlight and whether they are darkened by other occluders.

use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        instance::Instance,
        model::{self, ModelVertex},
    },
    render::Instanced,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShadowFlags {
    /// Rendered into the shadow map.
    pub cast: bool,
    /// Sampled against the shadow map when lit.
    pub receive: bool,
}

impl ShadowFlags {
    pub const BOTH: ShadowFlags = ShadowFlags {
        cast: true,
        receive: true,
    };
}

pub trait SceneNode {
    fn name(&self) -> &str;

    /// Whether this node draws geometry itself (as opposed to only grouping children).
    fn is_mesh(&self) -> bool;

    fn shadows(&self) -> ShadowFlags;

    fn set_shadows(&mut self, flags: ShadowFlags);

    fn get_local_transform(&self) -> &Instance;

    fn set_local_transform(&mut self, instance: Instance);

    fn get_world_transform(&self) -> &Instance;

    /// Recompute this node's world transform from `parent` and recurse into the children.
    fn update_world_transforms(&mut self, parent: &Instance);

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>>;

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>>;

    fn add_child(&mut self, child: Box<dyn SceneNode>);

    fn write_to_buffers(&mut self, queue: &wgpu::Queue);

    fn get_render(&self) -> Vec<Instanced<'_>>;
}

/// Visit `node` and all of its descendants, parents before children.
pub fn traverse(node: &dyn SceneNode, visit: &mut dyn FnMut(&dyn SceneNode)) {
    visit(node);
    for child in node.get_children() {
        traverse(child.as_ref(), visit);
    }
}

pub fn traverse_mut(node: &mut dyn SceneNode, visit: &mut dyn FnMut(&mut dyn SceneNode)) {
    visit(node);
    for child in node.get_children_mut() {
        traverse_mut(child.as_mut(), visit);
    }
}

/// Set `flags` on every mesh in the subtree rooted at `node`. Returns how many meshes were touched.
pub fn enable_shadows(node: &mut dyn SceneNode, flags: ShadowFlags) -> usize {
    let mut meshes = 0;
    traverse_mut(node, &mut |n: &mut dyn SceneNode| {
        if n.is_mesh() {
            n.set_shadows(flags);
            meshes += 1;
        }
    });
    meshes
}

/// Groups children without drawing anything itself.
pub struct ContainerNode {
    name: String,
    pub children: Vec<Box<dyn SceneNode>>,
    local: Instance,
    world: Instance,
    shadows: ShadowFlags,
}

impl ContainerNode {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            children: Vec::new(),
            local: Instance::default(),
            world: Instance::default(),
            shadows: ShadowFlags::default(),
        }
    }
}

impl SceneNode for ContainerNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_mesh(&self) -> bool {
        false
    }

    fn shadows(&self) -> ShadowFlags {
        self.shadows
    }

    fn set_shadows(&mut self, flags: ShadowFlags) {
        self.shadows = flags;
    }

    fn get_local_transform(&self) -> &Instance {
        &self.local
    }

    fn set_local_transform(&mut self, instance: Instance) {
        self.local = instance;
    }

    fn get_world_transform(&self) -> &Instance {
        &self.world
    }

    fn update_world_transforms(&mut self, parent: &Instance) {
        self.world = parent * &self.local;
        let world = self.world.clone();
        for child in self.children.iter_mut() {
            child.update_world_transforms(&world);
        }
    }

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.children
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        self.children
            .iter_mut()
            .for_each(|child| child.write_to_buffers(queue));
    }

    fn get_render(&self) -> Vec<Instanced<'_>> {
        self.children
            .iter()
            .flat_map(|child| child.get_render())
            .collect()
    }
}

/// A node that draws a [`model::Model`] with its world transform.
pub struct ModelNode {
    name: String,
    children: Vec<Box<dyn SceneNode>>,
    instance_buffer: wgpu::Buffer,
    local: Instance,
    world: Instance,
    shadows: ShadowFlags,
    model: model::Model,
}

impl ModelNode {
    pub fn from_model(device: &wgpu::Device, name: &str, model: model::Model) -> Self {
        let world = Instance::default();
        let shadows = ShadowFlags::default();
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Instance Buffer", name)),
            contents: bytemuck::cast_slice(&[world.to_raw(shadows.receive)]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            name: name.to_string(),
            children: vec![],
            instance_buffer,
            local: Instance::default(),
            world,
            shadows,
            model,
        }
    }
}

impl SceneNode for ModelNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_mesh(&self) -> bool {
        !self.model.meshes.is_empty()
    }

    fn shadows(&self) -> ShadowFlags {
        self.shadows
    }

    fn set_shadows(&mut self, flags: ShadowFlags) {
        self.shadows = flags;
    }

    fn get_local_transform(&self) -> &Instance {
        &self.local
    }

    fn set_local_transform(&mut self, instance: Instance) {
        self.local = instance;
    }

    fn get_world_transform(&self) -> &Instance {
        &self.world
    }

    fn update_world_transforms(&mut self, parent: &Instance) {
        self.world = parent * &self.local;
        let world = self.world.clone();
        for child in self.children.iter_mut() {
            child.update_world_transforms(&world);
        }
    }

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.children
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        let raw = self.world.to_raw(self.shadows.receive);
        queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&[raw]));
        self.children
            .iter_mut()
            .for_each(|child| child.write_to_buffers(queue));
    }

    fn get_render(&self) -> Vec<Instanced<'_>> {
        self.children
            .iter()
            .flat_map(|child| child.get_render())
            .chain(self.is_mesh().then(|| Instanced {
                instance: &self.instance_buffer,
                model: &self.model,
                amount: 1,
                cast_shadow: self.shadows.cast,
            }))
            .collect()
    }
}

/// Read the triangles of one glTF primitive. `None` if it has no positions or is not a triangle list.
pub fn read_primitive(
    primitive: &gltf::Primitive,
    buffers: &[Vec<u8>],
) -> Option<(Vec<ModelVertex>, Vec<u32>)> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        log::warn!(
            "Skipping primitive {} with unsupported mode {:?}",
            primitive.index(),
            primitive.mode()
        );
        return None;
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

    let mut vertices: Vec<ModelVertex> = reader
        .read_positions()?
        .map(|position| ModelVertex {
            position,
            ..Default::default()
        })
        .collect();
    if let Some(normals) = reader.read_normals() {
        vertices
            .iter_mut()
            .zip(normals)
            .for_each(|(vertex, normal)| vertex.normal = normal);
    }
    if let Some(tex_coords) = reader.read_tex_coords(0).map(|v| v.into_f32()) {
        vertices
            .iter_mut()
            .zip(tex_coords)
            .for_each(|(vertex, tex_coord)| vertex.tex_coords = tex_coord);
    }
    let indices = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertices.len() as u32).collect(),
    };
    Some((vertices, indices))
}

/// Build the GPU scene node for `node` and its descendants.
///
/// `materials` holds one entry per glTF material followed by a fallback used by
/// primitives without a material.
pub fn to_scene_node(
    node: gltf::scene::Node,
    buffers: &[Vec<u8>],
    device: &wgpu::Device,
    materials: &Arc<[model::Material]>,
) -> Box<dyn SceneNode> {
    let fallback_material = materials.len().saturating_sub(1);
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node_{}", node.index()));

    let mut scene_node: Box<dyn SceneNode> = match node.mesh() {
        Some(mesh) => {
            let mesh_name = mesh.name().unwrap_or("unknown_mesh");
            let meshes = mesh
                .primitives()
                .filter_map(|primitive| {
                    let (vertices, indices) = read_primitive(&primitive, buffers)?;
                    let material = primitive
                        .material()
                        .index()
                        .unwrap_or(fallback_material);
                    Some(model::Mesh::new(
                        device, mesh_name, &vertices, &indices, material,
                    ))
                })
                .collect();
            let model = model::Model {
                meshes,
                materials: materials.clone(),
            };
            Box::new(ModelNode::from_model(device, &name, model))
        }
        None => Box::new(ContainerNode::new(&name)),
    };
    scene_node.set_local_transform(node.transform().into());
    for child in node.children() {
        scene_node.add_child(to_scene_node(child, buffers, device, materials));
    }
    scene_node
}
