use vitrine::{
    data_structures::{
        instance::Instance,
        scene_graph::{SceneNode, ShadowFlags},
    },
    render::Instanced,
    resources::AssetSource,
};

/// Asset root holding the glTF fixtures.
pub(crate) fn fixture_source() -> AssetSource {
    AssetSource::new(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/assets"))
}

/// A scene node that needs no GPU. `mesh` decides whether it claims to draw geometry.
pub(crate) struct FakeNode {
    name: String,
    mesh: bool,
    shadows: ShadowFlags,
    local: Instance,
    world: Instance,
    children: Vec<Box<dyn SceneNode>>,
}

impl FakeNode {
    pub(crate) fn group(name: &str) -> Self {
        Self::new(name, false)
    }

    pub(crate) fn mesh(name: &str) -> Self {
        Self::new(name, true)
    }

    fn new(name: &str, mesh: bool) -> Self {
        Self {
            name: name.to_string(),
            mesh,
            shadows: ShadowFlags::default(),
            local: Instance::default(),
            world: Instance::default(),
            children: Vec::new(),
        }
    }

    pub(crate) fn with_child(mut self, child: FakeNode) -> Self {
        self.children.push(Box::new(child));
        self
    }

    pub(crate) fn at(mut self, position: [f32; 3]) -> Self {
        self.local.position = position.into();
        self
    }
}

impl SceneNode for FakeNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_mesh(&self) -> bool {
        self.mesh
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

    fn write_to_buffers(&mut self, _: &wgpu::Queue) {}

    fn get_render(&self) -> Vec<Instanced<'_>> {
        Vec::new()
    }
}

pub(crate) fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-4,
        "expected {expected}, got {actual}"
    );
}

#[cfg(feature = "integration-tests")]
pub(crate) mod gpu {
    use std::time::Duration;

    use vitrine::{
        config::ViewerConfig, data_structures::texture::Texture, render::Renderer, scene::Scene,
        viewport::ShadowSettings,
    };
    use winit::dpi::PhysicalSize;

    pub(crate) const SIZE: u32 = 256;
    pub(crate) const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    /// A device without a surface. `None` if the machine has no usable adapter.
    pub(crate) async fn headless() -> Option<(wgpu::Device, wgpu::Queue)> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok()?;
        adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("test device"),
                ..Default::default()
            })
            .await
            .ok()
    }

    pub(crate) fn renderer(device: &wgpu::Device, config: &ViewerConfig) -> Renderer {
        let shadows = ShadowSettings {
            enabled: config.viewport.shadows_enabled,
            kind: config.viewport.shadow_kind,
            map_size: config.viewport.shadow_map_size,
        };
        // every renderable format supports 4 samples
        let sample_count = if config.viewport.msaa_samples >= 4 { 4 } else { 1 };
        Renderer::new(
            device,
            FORMAT,
            PhysicalSize::new(SIZE, SIZE),
            shadows,
            sample_count,
            config,
        )
    }

    /// Render one frame of `scene` offscreen and read it back.
    pub(crate) async fn render_offscreen(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        renderer: &mut Renderer,
        scene: &mut Scene,
    ) -> image::RgbaImage {
        let extent = wgpu::Extent3d {
            width: SIZE,
            height: SIZE,
            depth_or_array_layers: 1,
        };
        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Golden Image Test Output Texture"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FORMAT,
            usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth = Texture::create_depth_texture(device, [SIZE, SIZE], renderer.sample_count, "test depth");
        let msaa = (renderer.sample_count > 1)
            .then(|| Texture::create_msaa_target(device, [SIZE, SIZE], FORMAT, renderer.sample_count));

        renderer.update(queue, scene, Duration::from_millis(16));
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Test Encoder"),
        });
        let view = target.create_view(&wgpu::TextureViewDescriptor::default());
        match &msaa {
            Some(msaa) => renderer.encode(&mut encoder, &msaa.view, Some(&view), &depth.view, scene),
            None => renderer.encode(&mut encoder, &view, None, &depth.view, scene),
        }

        let bytes_per_row = 4 * SIZE;
        let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: None,
            size: (bytes_per_row * SIZE) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(SIZE),
                },
            },
            extent,
        );
        queue.submit(std::iter::once(encoder.finish()));

        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        let buffer_slice = output_buffer.slice(..);
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).unwrap();
        });
        device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: Some(Duration::from_secs(3)),
            })
            .unwrap();
        rx.receive().await.unwrap().unwrap();
        let data = buffer_slice.get_mapped_range().to_vec();
        output_buffer.unmap();
        image::RgbaImage::from_raw(SIZE, SIZE, data).unwrap()
    }
}
