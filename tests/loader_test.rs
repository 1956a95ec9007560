mod common;

use common::test_utils::fixture_source;
use futures::channel::mpsc;
use vitrine::{
    data_structures::scene_graph::read_primitive,
    loader::{LoadError, LoadProgress, ModelLoad},
    resources::{AssetSource, fetch_model},
};

fn fixture_size(relative: &str) -> u64 {
    std::fs::metadata(fixture_source().resolve(relative))
        .unwrap()
        .len()
}

#[tokio::test]
async fn should_fetch_model_with_external_resources() {
    let (progress_tx, mut progress_rx) = mpsc::unbounded();

    let asset = fetch_model(&fixture_source(), "chair/scene.gltf", progress_tx)
        .await
        .unwrap();

    let mut reports = Vec::new();
    while let Ok(progress) = progress_rx.try_recv() {
        reports.push(progress);
    }
    let document = fixture_size("chair/scene.gltf");
    let buffer = fixture_size("chair/scene.bin");
    let texture = fixture_size("chair/textures/fabric.png");
    let total = document + buffer + texture;
    assert_eq!(buffer, 212);
    assert_eq!(
        reports,
        vec![
            LoadProgress { loaded: document, total },
            LoadProgress { loaded: document + buffer, total },
            LoadProgress { loaded: total, total },
        ]
    );

    assert_eq!(asset.path, "chair/scene.gltf");
    assert_eq!(asset.mesh_node_count(), 2);
    assert_eq!(asset.buffers.len(), 1);
    assert_eq!(asset.buffers[0].len(), 212);
    let fabric = asset.images[0].as_ref().expect("base colour image decoded");
    assert_eq!((fabric.width(), fabric.height()), (2, 2));
}

#[tokio::test]
async fn should_read_fixture_primitives() {
    let (progress_tx, _progress_rx) = mpsc::unbounded();
    let asset = fetch_model(&fixture_source(), "chair/scene.gltf", progress_tx)
        .await
        .unwrap();

    let meshes: Vec<_> = asset.document.meshes().collect();
    let seat = meshes[0].primitives().next().unwrap();
    let (vertices, indices) = read_primitive(&seat, &asset.buffers).unwrap();
    assert_eq!(vertices.len(), 4);
    assert_eq!(indices.len(), 6);
    assert!(vertices.iter().all(|v| v.normal == [0.0, 1.0, 0.0]));

    // no index accessor: one index per vertex
    let back = meshes[1].primitives().next().unwrap();
    let (vertices, indices) = read_primitive(&back, &asset.buffers).unwrap();
    assert_eq!(vertices.len(), 3);
    assert_eq!(indices, vec![0, 1, 2]);
    assert!(vertices.iter().all(|v| v.tex_coords == [0.0, 0.0]));
}

#[tokio::test]
async fn should_report_missing_model_as_io_error() {
    let (progress_tx, mut progress_rx) = mpsc::unbounded();

    let result = fetch_model(&fixture_source(), "missing/scene.gltf", progress_tx).await;

    match result {
        Err(LoadError::Io { path, .. }) => assert!(path.ends_with("missing/scene.gltf")),
        other => panic!("expected an io error, got {other:?}"),
    }
    assert!(progress_rx.try_recv().is_err());
}

#[tokio::test]
async fn should_reject_malformed_document() {
    let (progress_tx, _progress_rx) = mpsc::unbounded();

    let result = fetch_model(&fixture_source(), "broken/scene.gltf", progress_tx).await;

    assert!(matches!(result, Err(LoadError::Gltf { .. })), "{result:?}");
}

#[tokio::test]
async fn should_reject_embedded_data_uri() {
    let (progress_tx, _progress_rx) = mpsc::unbounded();

    let result = fetch_model(&fixture_source(), "inline/scene.gltf", progress_tx).await;

    match result {
        Err(LoadError::UnsupportedUri(uri)) => assert!(uri.starts_with("data:")),
        other => panic!("expected an unsupported uri, got {other:?}"),
    }
}

#[tokio::test]
async fn should_deliver_result_once() {
    let (mut load, task) = ModelLoad::new(fixture_source(), "chair/scene.gltf");
    assert_eq!(load.path(), "chair/scene.gltf");
    assert!(load.try_result().is_none());

    task.await;

    let total = fixture_size("chair/scene.gltf")
        + fixture_size("chair/scene.bin")
        + fixture_size("chair/textures/fabric.png");
    assert_eq!(load.poll_progress(), Some(LoadProgress { loaded: total, total }));
    assert!(load.latest_progress().is_some_and(|p| p.is_complete()));
    assert!(load.poll_progress().is_none());
    assert_eq!(load.latest_progress(), Some(LoadProgress { loaded: total, total }));

    let asset = load.try_result().unwrap().unwrap();
    assert_eq!(asset.mesh_node_count(), 2);
    assert!(load.is_finished());
    assert!(load.try_result().is_none());
}

#[tokio::test]
async fn should_cancel_pending_load() {
    let (mut load, task) = ModelLoad::new(fixture_source(), "chair/scene.gltf");

    load.cancel();
    task.await;

    assert!(matches!(load.try_result(), Some(Err(LoadError::Cancelled))));
    assert!(load.poll_progress().is_none());
}

#[tokio::test]
async fn should_report_cancelled_when_task_is_dropped() {
    let (mut load, task) = ModelLoad::new(fixture_source(), "chair/scene.gltf");

    drop(task);

    assert!(matches!(load.try_result(), Some(Err(LoadError::Cancelled))));
    assert!(load.is_finished());
}

#[tokio::test]
async fn should_run_load_on_spawned_task() {
    let (mut load, task) = ModelLoad::new(fixture_source(), "broken/scene.gltf");

    tokio::spawn(task).await.unwrap();

    assert!(matches!(load.try_result(), Some(Err(LoadError::Gltf { .. }))));
}

#[tokio::test]
async fn should_size_resources_without_reading_them() {
    let source = fixture_source();

    assert_eq!(source.content_length("chair/scene.bin").await, Some(212));
    assert_eq!(
        source.content_length("chair/textures/fabric.png").await,
        Some(fixture_size("chair/textures/fabric.png"))
    );
    assert_eq!(source.content_length("chair/missing.bin").await, None);
}

#[test]
fn should_resolve_paths_against_root() {
    let source = AssetSource::new("./assets/");

    assert_eq!(source.resolve("public/chair/scene.gltf"), "./assets/public/chair/scene.gltf");
    assert_eq!(source.resolve("./scene.gltf"), "./assets/scene.gltf");
    assert_eq!(source.resolve("/scene.gltf"), "./assets/scene.gltf");
    assert_eq!(AssetSource::new("").resolve("scene.gltf"), "scene.gltf");
    assert_eq!(
        AssetSource::new("https://example.org/assets").resolve("chair/scene.gltf"),
        "https://example.org/assets/chair/scene.gltf"
    );
}

#[test]
fn should_default_to_local_assets_dir() {
    assert_eq!(AssetSource::default().root(), "./assets");
}

#[test]
fn should_compute_progress_percentage() {
    assert_eq!(LoadProgress::default().percent(), 0.0);
    assert!(!LoadProgress::default().is_complete());
    assert_eq!(LoadProgress { loaded: 1, total: 4 }.percent(), 25.0);
    assert_eq!(LoadProgress { loaded: 5, total: 4 }.percent(), 100.0);
    assert!(LoadProgress { loaded: 4, total: 4 }.is_complete());
}
