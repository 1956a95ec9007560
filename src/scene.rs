//! The showcase scene: floor, spotlight and (once loaded) the model.

use crate::{
    config::{ModelConfig, ViewerConfig},
    data_structures::{
        ground::mk_ground_node,
        instance::Instance,
        scene_graph::{enable_shadows, traverse, ContainerNode, SceneNode, ShadowFlags},
    },
    pipelines::light::SpotLight,
    render::Render,
};

pub struct Scene {
    root: ContainerNode,
    pub light: SpotLight,
    model_attached: bool,
}

impl Scene {
    /// An empty scene lit by `light`.
    pub fn new(light: SpotLight) -> Self {
        Self {
            root: ContainerNode::new("scene"),
            light,
            model_attached: false,
        }
    }

    /// Ground plane plus spotlight, ready for the model to be attached.
    pub fn compose(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        material_layout: &wgpu::BindGroupLayout,
        config: &ViewerConfig,
    ) -> Self {
        let mut scene = Self::new(SpotLight::from_config(&config.spot_light));
        scene.add(mk_ground_node(device, queue, material_layout, &config.ground));
        scene
    }

    pub fn add(&mut self, node: Box<dyn SceneNode>) {
        self.root.add_child(node);
    }

    /// Insert a freshly loaded model. Returns how many of its meshes now cast and receive shadows.
    pub fn attach_model(&mut self, mut node: Box<dyn SceneNode>, config: &ModelConfig) -> usize {
        let meshes = prepare_model(node.as_mut(), config);
        log::info!(
            "Attaching model {} with {} meshes at {:?}",
            node.name(),
            meshes,
            config.position
        );
        self.add(node);
        self.model_attached = true;
        meshes
    }

    pub fn has_model(&self) -> bool {
        self.model_attached
    }

    pub fn root(&self) -> &dyn SceneNode {
        &self.root
    }

    /// Number of nodes below the root that draw geometry.
    pub fn mesh_count(&self) -> usize {
        let mut meshes = 0;
        traverse(&self.root, &mut |node: &dyn SceneNode| {
            if node.is_mesh() {
                meshes += 1;
            }
        });
        meshes
    }

    /// Propagate transforms and upload every node's instance data.
    pub fn update(&mut self, queue: &wgpu::Queue) {
        self.refresh_transforms();
        self.root.write_to_buffers(queue);
    }

    pub fn refresh_transforms(&mut self) {
        self.root.update_world_transforms(&Instance::default());
    }

    pub fn get_render(&self) -> Render<'_> {
        Render::from(&self.root as &dyn SceneNode)
    }
}

/// Turn on shadows for every mesh of a loaded model and move its root to the
/// configured position. Rotation and scale from the asset are kept.
pub fn prepare_model(node: &mut dyn SceneNode, config: &ModelConfig) -> usize {
    let flags = ShadowFlags {
        cast: config.cast_shadow,
        receive: config.receive_shadow,
    };
    let meshes = enable_shadows(node, flags);
    let mut local = node.get_local_transform().clone();
    local.position = config.position.into();
    node.set_local_transform(local);
    meshes
}
