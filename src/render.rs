//! Render composition and frame encoding.
//!
//! Scene nodes describe what they want drawn as a [`Render`]. The frame
//! flattens that tree into a list of [`Instanced`] draws once and reuses it for
//! both the shadow pass (casters only) and the lit pass (everything).
//! [`Renderer`] owns the pipelines and uniforms and records both passes into
//! whatever colour and depth targets it is given, so the same code draws to
//! the window surface and to offscreen textures.

use winit::dpi::PhysicalSize;

use crate::{
    camera::{Camera, CameraResources, OrbitController, Projection},
    config::ViewerConfig,
    data_structures::{
        model::{DrawModel, DrawShadow, Model},
        scene_graph::SceneNode,
    },
    pipelines::{
        basic::mk_basic_pipeline,
        light::{LightResources, SpotLight},
        shadow::ShadowResources,
    },
    resources::texture::material_layout,
    scene::Scene,
    viewport::ShadowSettings,
};

/// Data for one draw: a model, its instance buffer and whether it occludes the spotlight.
#[derive(Clone)]
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub model: &'a Model,
    pub amount: usize,
    pub cast_shadow: bool,
}

/// Specifies how a scene object should be rendered.
///
/// - `None` renders nothing
/// - `Default(Instanced)` renders a single opaque object
/// - `Defaults(Vec<Instanced>)` renders a batch of opaque objects
/// - `Composed(Vec<Render>)` recursively renders a composition of renders
pub enum Render<'a> {
    None,
    Default(Instanced<'a>),
    Defaults(Vec<Instanced<'a>>),
    Composed(Vec<Render<'a>>),
}

impl<'a> Render<'a> {
    /// Append every draw in this render to `batch`, skipping empty ones.
    pub(crate) fn flatten_into(self, batch: &mut Vec<Instanced<'a>>) {
        match self {
            Render::None => (),
            Render::Default(instanced) => push_drawable(batch, instanced),
            Render::Defaults(vec) => vec
                .into_iter()
                .for_each(|instanced| push_drawable(batch, instanced)),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.flatten_into(batch)),
        }
    }

    pub fn flatten(self) -> Vec<Instanced<'a>> {
        let mut batch = Vec::new();
        self.flatten_into(&mut batch);
        batch
    }
}

fn push_drawable<'a>(batch: &mut Vec<Instanced<'a>>, instanced: Instanced<'a>) {
    if instanced.amount == 0 || instanced.instance.size() == 0 {
        log::warn!("Skipping a draw without instances");
        return;
    }
    batch.push(instanced);
}

impl<'a> From<&'a dyn SceneNode> for Render<'a> {
    fn from(sn: &'a dyn SceneNode) -> Self {
        Render::Defaults(sn.get_render())
    }
}

#[derive(Debug)]
pub struct Renderer {
    pub camera: CameraResources,
    pub projection: Projection,
    pub light: LightResources,
    pub shadow: ShadowResources,
    pub pipeline: wgpu::RenderPipeline,
    pub material_layout: wgpu::BindGroupLayout,
    pub shadows: ShadowSettings,
    pub clear_colour: wgpu::Color,
    /// Samples per pixel of the lit pass. Colour and depth targets handed to
    /// [`encode`](Self::encode) have to match.
    pub sample_count: u32,
}

impl Renderer {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        shadows: ShadowSettings,
        sample_count: u32,
        config: &ViewerConfig,
    ) -> Self {
        let projection = Projection::new(
            size.width,
            size.height,
            config.camera.fovy,
            config.camera.znear,
            config.camera.zfar,
        );
        let mut controller = OrbitController::new(config.orbit.clone());
        controller.set_viewport_height(size.height);
        let camera = CameraResources::new(
            device,
            Camera::from_config(&config.camera),
            controller,
            &projection,
        );

        let light = LightResources::new(
            device,
            &SpotLight::from_config(&config.spot_light),
            &shadows,
        );
        let shadow = ShadowResources::new(device, shadows.map_size, &light.bind_group_layout);
        let material_layout = material_layout(device);
        let pipeline = mk_basic_pipeline(
            device,
            color_format,
            sample_count,
            &material_layout,
            &camera.bind_group_layout,
            &light.bind_group_layout,
            &shadow.bind_group_layout,
        );

        Self {
            camera,
            projection,
            light,
            shadow,
            pipeline,
            material_layout,
            shadows,
            clear_colour: config.viewport.clear_colour,
            sample_count,
        }
    }

    /// Per-frame state update: advance the orbit controller once, then upload
    /// camera, light and node transforms.
    pub fn update(&mut self, queue: &wgpu::Queue, scene: &mut Scene, dt: instant::Duration) {
        self.camera
            .controller
            .update(&mut self.camera.camera, dt);
        self.camera.write_to_buffer(queue, &self.projection);
        self.light.write_to_buffer(queue, &scene.light, &self.shadows);
        scene.update(queue);
    }

    /// Record the shadow pass and the lit pass for `scene`.
    ///
    /// With multisampling `colour` is the multisampled target and `resolve`
    /// the single-sampled texture that ends up on screen.
    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        colour: &wgpu::TextureView,
        resolve: Option<&wgpu::TextureView>,
        depth: &wgpu::TextureView,
        scene: &Scene,
    ) {
        let draws = scene.get_render().flatten();

        if self.light.uniform.cast_shadow != 0 {
            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow.map.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            shadow_pass.set_pipeline(&self.shadow.pipeline);
            for instanced in draws.iter().filter(|instanced| instanced.cast_shadow) {
                shadow_pass.set_vertex_buffer(1, instanced.instance.slice(..));
                shadow_pass.draw_model_depth(
                    instanced.model,
                    0..instanced.amount as u32,
                    &self.light.bind_group,
                );
            }
        }

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: colour,
                resolve_target: resolve,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_colour),
                    // only the resolved image is kept
                    store: if resolve.is_some() {
                        wgpu::StoreOp::Discard
                    } else {
                        wgpu::StoreOp::Store
                    },
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        render_pass.set_pipeline(&self.pipeline);
        for instanced in draws {
            render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
            render_pass.draw_model_instanced(
                instanced.model,
                0..instanced.amount as u32,
                &self.camera.bind_group,
                &self.light.bind_group,
                &self.shadow.bind_group,
            );
        }
    }
}
