use crate::{
    data_structures::{model, texture::Texture},
    resources::ModelAsset,
};

/// Bind group layout every material is created against:
/// base colour texture, its sampler and the material uniform.
pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
        label: Some("material_bind_group_layout"),
    })
}

/// Upload one material per glTF material, followed by a plain white fallback
/// for primitives that reference none.
pub fn load_materials(
    asset: &ModelAsset,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> anyhow::Result<Vec<model::Material>> {
    let mut materials = Vec::new();
    for material in asset.document.materials() {
        let name = material
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}#{}", asset.path, materials.len()));
        let pbr = material.pbr_metallic_roughness();
        let decoded = pbr
            .base_color_texture()
            .map(|info| info.texture().source().index())
            .and_then(|index| asset.images.get(index).and_then(Option::as_ref));
        let diffuse_texture = match decoded {
            Some(img) => Texture::from_image(device, queue, img, Some(&name), true)?,
            None => white(device, queue, &name),
        };
        materials.push(model::Material::new(
            device,
            &name,
            diffuse_texture,
            pbr.base_color_factor(),
            layout,
        ));
    }

    let fallback = format!("{} default material", asset.path);
    materials.push(model::Material::new(
        device,
        &fallback,
        white(device, queue, &fallback),
        [1.0; 4],
        layout,
    ));
    Ok(materials)
}

fn white(device: &wgpu::Device, queue: &wgpu::Queue, label: &str) -> Texture {
    Texture::from_colour(device, queue, [255, 255, 255, 255], label)
}
