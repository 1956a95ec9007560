#[cfg(feature = "integration-tests")]
mod common;

#[cfg(feature = "integration-tests")]
mod gpu_tests {
    use crate::common::test_utils::{
        fixture_source,
        gpu::{SIZE, headless, render_offscreen, renderer},
    };
    use futures::channel::mpsc;
    use vitrine::{
        config::{ModelConfig, ViewerConfig},
        resources::{fetch_model, upload_model},
        scene::Scene,
    };

    fn brightness(pixel: &image::Rgba<u8>) -> u32 {
        pixel.0[..3].iter().map(|&c| c as u32).sum()
    }

    #[tokio::test]
    async fn should_light_ground_under_spotlight() {
        let Some((device, queue)) = headless().await else {
            eprintln!("no adapter available, skipping");
            return;
        };
        let config = ViewerConfig::default();
        let mut renderer = renderer(&device, &config);
        let mut scene = Scene::compose(&device, &queue, &renderer.material_layout, &config);

        let frame = render_offscreen(&device, &queue, &mut renderer, &mut scene).await;

        let centre = frame.get_pixel(SIZE / 2, SIZE / 2);
        let corner = frame.get_pixel(0, 0);
        assert_eq!(*corner, image::Rgba([0, 0, 0, 255]));
        assert!(
            brightness(centre) > brightness(corner) + 30,
            "centre {centre:?} is not lit"
        );
    }

    #[tokio::test]
    async fn should_clear_to_configured_colour() {
        let Some((device, queue)) = headless().await else {
            eprintln!("no adapter available, skipping");
            return;
        };
        let mut config = ViewerConfig::default();
        config.viewport.clear_colour = wgpu::Color::WHITE;
        let mut renderer = renderer(&device, &config);
        let mut scene = Scene::compose(&device, &queue, &renderer.material_layout, &config);

        let frame = render_offscreen(&device, &queue, &mut renderer, &mut scene).await;

        // the camera looks down on the floor, the top edge only sees sky
        for x in [0, SIZE / 2, SIZE - 1] {
            assert_eq!(*frame.get_pixel(x, 0), image::Rgba([255, 255, 255, 255]));
        }
    }

    #[tokio::test]
    async fn should_draw_loaded_model_into_scene() {
        let Some((device, queue)) = headless().await else {
            eprintln!("no adapter available, skipping");
            return;
        };
        let config = ViewerConfig::default();
        let mut renderer = renderer(&device, &config);
        let mut scene = Scene::compose(&device, &queue, &renderer.material_layout, &config);
        let empty = render_offscreen(&device, &queue, &mut renderer, &mut scene).await;

        let (progress_tx, _progress_rx) = mpsc::unbounded();
        let asset = fetch_model(&fixture_source(), "chair/scene.gltf", progress_tx)
            .await
            .unwrap();
        let node = upload_model(&asset, &device, &queue, &renderer.material_layout).unwrap();
        let meshes = scene.attach_model(
            node,
            &ModelConfig {
                position: [0.0, 0.0, 0.0],
                ..Default::default()
            },
        );
        let with_chair = render_offscreen(&device, &queue, &mut renderer, &mut scene).await;

        assert_eq!(meshes, 2);
        assert_eq!(scene.mesh_count(), 3);
        assert_ne!(empty, with_chair, "the chair left no trace in the frame");
    }

    #[tokio::test]
    async fn should_render_without_shadows() {
        let Some((device, queue)) = headless().await else {
            eprintln!("no adapter available, skipping");
            return;
        };
        let mut config = ViewerConfig::default();
        config.viewport.shadows_enabled = false;
        let mut renderer = renderer(&device, &config);
        let mut scene = Scene::compose(&device, &queue, &renderer.material_layout, &config);

        let frame = render_offscreen(&device, &queue, &mut renderer, &mut scene).await;

        assert_eq!(renderer.light.uniform.cast_shadow, 0);
        let centre = frame.get_pixel(SIZE / 2, SIZE / 2);
        assert!(brightness(centre) > 30, "centre {centre:?} is not lit");
    }

    #[tokio::test]
    async fn should_render_same_scene_with_and_without_multisampling() {
        let Some((device, queue)) = headless().await else {
            eprintln!("no adapter available, skipping");
            return;
        };
        let mut config = ViewerConfig::default();
        let mut smooth = renderer(&device, &config);
        config.viewport.msaa_samples = 1;
        let mut aliased = renderer(&device, &config);
        let mut smooth_scene = Scene::compose(&device, &queue, &smooth.material_layout, &config);
        let mut aliased_scene = Scene::compose(&device, &queue, &aliased.material_layout, &config);

        let with_msaa = render_offscreen(&device, &queue, &mut smooth, &mut smooth_scene).await;
        let without = render_offscreen(&device, &queue, &mut aliased, &mut aliased_scene).await;

        assert_eq!((smooth.sample_count, aliased.sample_count), (4, 1));
        // flat interiors resolve to the same colour, only edges differ
        assert_eq!(with_msaa.get_pixel(0, 0), without.get_pixel(0, 0));
        let centre = with_msaa.get_pixel(SIZE / 2, SIZE / 2);
        assert!(brightness(centre) > 30, "centre {centre:?} is not lit");
    }
}
