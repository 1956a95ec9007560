//! Reading model assets from disk or the network and turning them into scene nodes.
//!
//! Fetching and decoding ([`fetch_model`]) is plain CPU work that may run on
//! any executor. Uploading ([`upload_model`]) needs the device and queue and
//! runs on the event loop thread.

use std::{collections::BTreeSet, sync::Arc};

use anyhow::bail;
use futures::channel::mpsc::UnboundedSender;

use crate::{
    data_structures::scene_graph::{to_scene_node, ContainerNode, SceneNode},
    loader::{LoadError, LoadProgress},
};

pub mod texture;

/// Where asset paths are resolved from: `./assets` natively, `{origin}/assets`
/// on the web.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetSource {
    root: String,
}

impl AssetSource {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Join `relative` onto the asset root.
    pub fn resolve(&self, relative: &str) -> String {
        let root = self.root.trim_end_matches('/');
        let relative = relative.trim_start_matches("./").trim_start_matches('/');
        if root.is_empty() {
            relative.to_string()
        } else {
            format!("{root}/{relative}")
        }
    }

    pub async fn load_binary(&self, relative: &str) -> Result<Vec<u8>, LoadError> {
        let location = self.resolve(relative);

        #[cfg(target_arch = "wasm32")]
        let data = {
            let fetch_error = |err: reqwest::Error| LoadError::Fetch {
                url: location.clone(),
                message: err.to_string(),
            };
            reqwest::get(&location)
                .await
                .and_then(reqwest::Response::error_for_status)
                .map_err(fetch_error)?
                .bytes()
                .await
                .map_err(fetch_error)?
                .to_vec()
        };
        #[cfg(not(target_arch = "wasm32"))]
        let data = tokio::fs::read(&location)
            .await
            .map_err(|source| LoadError::Io {
                path: location.clone(),
                source,
            })?;

        Ok(data)
    }

    /// Size in bytes of `relative`, if the source can tell without reading it.
    pub async fn content_length(&self, relative: &str) -> Option<u64> {
        let location = self.resolve(relative);

        #[cfg(target_arch = "wasm32")]
        let size = match reqwest::Client::new().head(&location).send().await {
            Ok(response) if response.status().is_success() => response
                .headers()
                .get(reqwest::header::CONTENT_LENGTH)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok()),
            _ => None,
        };
        #[cfg(not(target_arch = "wasm32"))]
        let size = tokio::fs::metadata(&location)
            .await
            .ok()
            .map(|metadata| metadata.len());

        size
    }
}

impl Default for AssetSource {
    fn default() -> Self {
        #[cfg(target_arch = "wasm32")]
        {
            let origin = web_sys::window()
                .and_then(|window| window.location().origin().ok())
                .unwrap_or_default();
            Self::new(format!("{origin}/assets"))
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            // the build bundles a copy for binaries started elsewhere
            match option_env!("VITRINE_ASSET_DIR") {
                Some(bundled) if !std::path::Path::new("./assets").is_dir() => Self::new(bundled),
                _ => Self::new("./assets"),
            }
        }
    }
}

/// A parsed glTF document with every buffer and base colour image it needs.
pub struct ModelAsset {
    /// Path relative to the asset root, used for labels.
    pub path: String,
    pub document: gltf::Document,
    pub buffers: Vec<Vec<u8>>,
    /// Decoded images indexed like `document.images()`. Only images used as a
    /// base colour texture are decoded.
    pub images: Vec<Option<image::DynamicImage>>,
}

impl std::fmt::Debug for ModelAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelAsset")
            .field("path", &self.path)
            .field("buffers", &self.buffers.len())
            .field("images", &self.images.iter().flatten().count())
            .finish()
    }
}

impl ModelAsset {
    /// Number of nodes in the default scene that carry a mesh.
    pub fn mesh_node_count(&self) -> usize {
        fn count(node: gltf::Node) -> usize {
            node.mesh().is_some() as usize + node.children().map(count).sum::<usize>()
        }
        self.scene()
            .map(|scene| scene.nodes().map(count).sum())
            .unwrap_or(0)
    }

    pub fn scene(&self) -> Option<gltf::Scene<'_>> {
        self.document
            .default_scene()
            .or_else(|| self.document.scenes().next())
    }
}

/// Directory part of `path`, without the trailing slash.
fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

fn resolve_uri(dir: &str, uri: &str) -> Result<String, LoadError> {
    if uri.starts_with("data:") {
        let head: String = uri.chars().take(32).collect();
        return Err(LoadError::UnsupportedUri(head));
    }
    Ok(if dir.is_empty() {
        uri.to_string()
    } else {
        format!("{dir}/{uri}")
    })
}

fn decode_image(bytes: &[u8], mime_type: Option<&str>, name: &str) -> Result<image::DynamicImage, LoadError> {
    let decoded = match mime_type.and_then(image::ImageFormat::from_mime_type) {
        Some(format) => image::load_from_memory_with_format(bytes, format),
        None => image::load_from_memory(bytes),
    };
    decoded.map_err(|source| LoadError::Image {
        name: name.to_string(),
        source,
    })
}

fn report(progress_tx: &UnboundedSender<LoadProgress>, progress: LoadProgress) {
    log::debug!(
        "Model load progress {}/{} ({:.0}%)",
        progress.loaded,
        progress.total,
        progress.percent()
    );
    // the receiver may already be gone after a dispose
    let _ = progress_tx.unbounded_send(progress);
}

/// Fetch the glTF document at `path` plus its external buffers and base colour images.
///
/// Progress is reported in bytes: once the document is parsed, then after each
/// external resource. Sizes come from [`AssetSource::content_length`], falling
/// back to the declared buffer length or zero for images.
pub async fn fetch_model(
    source: &AssetSource,
    path: &str,
    progress_tx: UnboundedSender<LoadProgress>,
) -> Result<ModelAsset, LoadError> {
    let bytes = source.load_binary(path).await?;
    let gltf::Gltf { document, blob } =
        gltf::Gltf::from_slice(&bytes).map_err(|source| LoadError::Gltf {
            path: path.to_string(),
            source,
        })?;
    let dir = parent_dir(path);

    let base_colour_images: BTreeSet<usize> = document
        .materials()
        .filter_map(|material| material.pbr_metallic_roughness().base_color_texture())
        .map(|info| info.texture().source().index())
        .collect();

    let mut total = bytes.len() as u64;
    for buffer in document.buffers() {
        if let gltf::buffer::Source::Uri(uri) = buffer.source() {
            let size = source.content_length(&resolve_uri(dir, uri)?).await;
            total += size.unwrap_or(buffer.length() as u64);
        }
    }
    for image in document.images() {
        if !base_colour_images.contains(&image.index()) {
            continue;
        }
        if let gltf::image::Source::Uri { uri, .. } = image.source() {
            let size = source.content_length(&resolve_uri(dir, uri)?).await;
            total += size.unwrap_or(0);
        }
    }

    let mut progress = LoadProgress {
        loaded: bytes.len() as u64,
        total,
    };
    report(&progress_tx, progress);
    let mut arrived = |len: usize| {
        progress.loaded += len as u64;
        progress.total = progress.total.max(progress.loaded);
        report(&progress_tx, progress);
    };

    let mut buffers = Vec::new();
    for buffer in document.buffers() {
        let data = match buffer.source() {
            gltf::buffer::Source::Bin => blob
                .as_deref()
                .ok_or(LoadError::MissingBuffer {
                    index: buffer.index(),
                })?
                .to_vec(),
            gltf::buffer::Source::Uri(uri) => {
                let data = source.load_binary(&resolve_uri(dir, uri)?).await?;
                arrived(data.len());
                data
            }
        };
        if data.len() < buffer.length() {
            return Err(LoadError::MissingBuffer {
                index: buffer.index(),
            });
        }
        buffers.push(data);
    }

    let mut images = vec![None; document.images().len()];
    for image in document.images() {
        if !base_colour_images.contains(&image.index()) {
            continue;
        }
        let decoded = match image.source() {
            gltf::image::Source::View { view, mime_type } => {
                let buffer = buffers
                    .get(view.buffer().index())
                    .ok_or(LoadError::MissingBuffer {
                        index: view.buffer().index(),
                    })?;
                let bytes = buffer
                    .get(view.offset()..view.offset() + view.length())
                    .ok_or(LoadError::MissingBuffer {
                        index: view.buffer().index(),
                    })?;
                let name = image
                    .name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{path}#image{}", image.index()));
                decode_image(bytes, Some(mime_type), &name)?
            }
            gltf::image::Source::Uri { uri, mime_type } => {
                let location = resolve_uri(dir, uri)?;
                let bytes = source.load_binary(&location).await?;
                arrived(bytes.len());
                decode_image(&bytes, mime_type, &location)?
            }
        };
        images[image.index()] = Some(decoded);
    }

    // sizes announced larger than what arrived
    if progress.loaded < progress.total {
        progress.total = progress.loaded;
        report(&progress_tx, progress);
    }

    Ok(ModelAsset {
        path: path.to_string(),
        document,
        buffers,
        images,
    })
}

/// Upload a fetched asset and build its node tree. Several root nodes are
/// grouped under one container named after the asset.
pub fn upload_model(
    asset: &ModelAsset,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    material_layout: &wgpu::BindGroupLayout,
) -> anyhow::Result<Box<dyn SceneNode>> {
    let materials: Arc<[_]> = texture::load_materials(asset, device, queue, material_layout)?.into();

    let Some(scene) = asset.scene() else {
        bail!("{} contains no scene", asset.path);
    };
    let mut roots: Vec<Box<dyn SceneNode>> = scene
        .nodes()
        .map(|node| to_scene_node(node, &asset.buffers, device, &materials))
        .collect();

    let root = match roots.len() {
        0 => bail!("{} has an empty scene", asset.path),
        1 => roots.remove(0),
        _ => {
            let mut container = ContainerNode::new(&asset.path);
            container.children = roots;
            Box::new(container)
        }
    };
    Ok(root)
}
