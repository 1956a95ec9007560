mod common;

use std::{f32::consts::PI, time::Duration};

use cgmath::{InnerSpace, Point3};
use common::test_utils::assert_close;
use vitrine::{
    camera::{Camera, OrbitController, Spherical},
    config::{CameraConfig, OrbitConfig},
};

const FRAME: Duration = Duration::from_millis(16);

fn default_rig() -> (Camera, OrbitController) {
    (
        Camera::from_config(&CameraConfig::default()),
        OrbitController::new(OrbitConfig::default()),
    )
}

fn undamped() -> OrbitConfig {
    OrbitConfig {
        enable_damping: false,
        ..Default::default()
    }
}

fn azimuth(camera: &Camera, controller: &OrbitController) -> f32 {
    Spherical::from_offset(camera.position - controller.target()).theta
}

/// `to - from`, wrapped into `(-PI, PI]`.
fn turned(from: f32, to: f32) -> f32 {
    let delta = (to - from).rem_euclid(2.0 * PI);
    if delta > PI { delta - 2.0 * PI } else { delta }
}

fn assert_within_limits(camera: &Camera, controller: &OrbitController) {
    let distance = controller.distance(camera);
    let polar = controller.polar_angle(camera);
    assert!(
        (5.0 - 1e-3..=20.0 + 1e-3).contains(&distance),
        "distance {distance} out of range"
    );
    assert!(
        (0.5 - 1e-4..=1.5 + 1e-4).contains(&polar),
        "polar angle {polar} out of range"
    );
    assert!(camera.position.x.is_finite() && camera.position.y.is_finite() && camera.position.z.is_finite());
}

#[test]
fn should_look_at_orbit_target_after_update() {
    let (mut camera, mut controller) = default_rig();

    controller.update(&mut camera, FRAME);

    assert_eq!(camera.target, Point3::new(0.0, 1.0, 0.0));
    assert_within_limits(&camera, &controller);
}

#[test]
fn should_keep_initial_pose_without_input() {
    let (mut camera, mut controller) = default_rig();
    controller.update(&mut camera, FRAME);
    let settled = camera.position;

    let moved = controller.update(&mut camera, FRAME);

    assert!(!moved);
    assert!((camera.position - settled).magnitude() < 1e-4);
}

#[test]
fn should_clamp_polar_angle_under_extreme_drags() {
    let (mut camera, mut controller) = default_rig();

    controller.rotate_up(1e30);
    for _ in 0..10 {
        controller.update(&mut camera, FRAME);
        assert_within_limits(&camera, &controller);
    }
    assert_close(controller.polar_angle(&camera), 0.5);

    controller.rotate_up(-1e30);
    for _ in 0..10 {
        controller.update(&mut camera, FRAME);
        assert_within_limits(&camera, &controller);
    }
    assert_close(controller.polar_angle(&camera), 1.5);
}

#[test]
fn should_clamp_distance_under_extreme_zoom() {
    let (mut camera, mut controller) = default_rig();

    for _ in 0..500 {
        controller.handle_scroll(-1.0);
    }
    controller.update(&mut camera, FRAME);
    assert!((controller.distance(&camera) - 5.0).abs() < 1e-3);

    for _ in 0..500 {
        controller.handle_scroll(1.0);
    }
    controller.update(&mut camera, FRAME);
    assert!((controller.distance(&camera) - 20.0).abs() < 1e-3);
}

#[test]
fn should_ignore_non_finite_input() {
    let (mut camera, mut controller) = default_rig();
    controller.set_viewport_height(800);

    controller.handle_mouse(f64::NAN, f64::INFINITY);
    controller.rotate_left(f32::NEG_INFINITY);
    controller.rotate_up(f32::NAN);
    controller.dolly_in(f32::NAN);
    controller.dolly_out(f32::INFINITY);
    controller.handle_scroll(f64::INFINITY);
    for _ in 0..5 {
        controller.update(&mut camera, FRAME);
        assert_within_limits(&camera, &controller);
    }
}

#[test]
fn should_stay_finite_when_queued_rotations_add_up_past_f32_range() {
    let (mut camera, mut controller) = default_rig();

    controller.rotate_left(f32::MAX);
    controller.rotate_left(f32::MAX);
    controller.rotate_up(f32::MAX);
    controller.rotate_up(f32::MAX);
    for _ in 0..2 {
        controller.update(&mut camera, FRAME);
        assert_within_limits(&camera, &controller);
    }

    controller.rotate_left(-f32::MAX);
    controller.rotate_left(-f32::MAX);
    controller.rotate_up(-f32::MAX);
    for _ in 0..20 {
        controller.update(&mut camera, FRAME);
        assert_within_limits(&camera, &controller);
    }
}

#[test]
fn should_trail_input_with_damping() {
    let (mut camera, mut controller) = default_rig();
    controller.update(&mut camera, FRAME);
    let start = azimuth(&camera, &controller);

    controller.rotate_left(1.0);
    controller.update(&mut camera, FRAME);
    let first = azimuth(&camera, &controller);
    assert_close(turned(start, first), -0.05);

    // no new input, the rest keeps easing out
    assert!(controller.update(&mut camera, FRAME));
    let second = azimuth(&camera, &controller);
    assert_close(turned(first, second), -0.0475);
}

#[test]
fn should_apply_full_rotation_without_damping() {
    let mut camera = Camera::from_config(&CameraConfig::default());
    let mut controller = OrbitController::new(undamped());
    controller.update(&mut camera, FRAME);
    let start = azimuth(&camera, &controller);

    controller.rotate_left(0.5);
    controller.update(&mut camera, FRAME);
    assert_close(turned(start, azimuth(&camera, &controller)), -0.5);

    assert!(!controller.update(&mut camera, FRAME));
}

#[test]
fn should_map_viewport_height_drag_to_revolution() {
    let mut camera = Camera::from_config(&CameraConfig::default());
    let mut controller = OrbitController::new(undamped());
    controller.set_viewport_height(800);
    controller.update(&mut camera, FRAME);
    let start = azimuth(&camera, &controller);

    controller.handle_mouse(200.0, 0.0);
    controller.update(&mut camera, FRAME);

    assert_close(turned(start, azimuth(&camera, &controller)), -PI / 2.0);
}

#[test]
fn should_not_pan_by_default() {
    let (mut camera, mut controller) = default_rig();

    controller.pan(3.0, -2.0);
    controller.update(&mut camera, FRAME);

    assert_eq!(controller.target(), Point3::new(0.0, 1.0, 0.0));
    assert_eq!(camera.target, Point3::new(0.0, 1.0, 0.0));
}

#[test]
fn should_pan_in_ground_plane_when_enabled() {
    let mut controller = OrbitController::new(OrbitConfig {
        enable_pan: true,
        ..Default::default()
    });

    controller.pan(3.0, -2.0);

    assert_eq!(controller.target(), Point3::new(3.0, 1.0, -2.0));
}

#[test]
fn should_not_zoom_when_disabled() {
    let mut camera = Camera::from_config(&CameraConfig::default());
    let mut controller = OrbitController::new(OrbitConfig {
        enable_zoom: false,
        ..Default::default()
    });
    controller.update(&mut camera, FRAME);
    let distance = controller.distance(&camera);

    controller.dolly_in(0.5);
    controller.handle_scroll(-1.0);
    controller.update(&mut camera, FRAME);

    assert_close(controller.distance(&camera), distance);
}

#[test]
fn should_auto_rotate_at_configured_speed() {
    let mut camera = Camera::from_config(&CameraConfig::default());
    let mut controller = OrbitController::new(OrbitConfig {
        enable_damping: false,
        auto_rotate: true,
        ..Default::default()
    });
    controller.update(&mut camera, Duration::ZERO);
    let start = azimuth(&camera, &controller);

    controller.update(&mut camera, Duration::from_secs(1));

    // two revolutions per minute
    let expected = -2.0 * PI / 60.0 * 2.0;
    assert_close(turned(start, azimuth(&camera, &controller)), expected);
}

#[test]
fn should_convert_spherical_coordinates_both_ways() {
    let offset = cgmath::Vector3::new(-4.0, 4.0, -11.0);
    let spherical = Spherical::from_offset(offset);

    assert_close(spherical.radius, 153f32.sqrt());
    let back = spherical.to_offset();
    assert_close(back.x, offset.x);
    assert_close(back.y, offset.y);
    assert_close(back.z, offset.z);
}
