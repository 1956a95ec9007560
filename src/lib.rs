//! vitrine
//!
//! A single-page showcase viewer for one glTF model. It renders the model on a
//! floor under a shadow casting spotlight, lets the visitor orbit and zoom
//! around it, and sends narrow viewports (or a press of the spacebar) to a
//! lighter fallback page. Runs natively through winit and in the browser on
//! WebGL.
//!
//! High-level modules
//! - `camera`: camera, projection and the orbit controller
//! - `config`: every tunable of the viewer with the showcase defaults
//! - `context`: window, surface and GPU device
//! - `data_structures`: meshes, textures, instances, the scene graph and the ground plane
//! - `indicator`: the loading indicator
//! - `loader`: background model loading with progress and cancellation
//! - `pipelines`: the shadow and lit render pipelines and the spotlight
//! - `redirect`: responsive redirect to the fallback page
//! - `render`: render composition and frame encoding
//! - `resources`: reading glTF assets and uploading them
//! - `scene`: the composed showcase scene
//! - `viewer`: lifecycle and event loop
//! - `viewport`: drawable size, pixel ratio and presentation settings
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod indicator;
pub mod loader;
pub mod pipelines;
pub mod redirect;
pub mod render;
pub mod resources;
pub mod scene;
pub mod viewer;
pub mod viewport;

pub use config::ViewerConfig;
pub use viewer::{run, run_with, Viewer};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    run().map_err(|err| JsValue::from_str(&format!("{err:#}")))
}
