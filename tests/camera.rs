use backdrop::camera::{Camera, FILM_GAUGE_MM, OrbitControls};
use backdrop::layers::Layer;
use glam::Vec3;

fn close(a: Vec3, b: Vec3) -> bool {
    (a - b).abs().max_element() < 1e-4
}

fn camera() -> Camera {
    let mut camera = Camera::perspective(75.0, 16.0 / 9.0, 0.1, 1000.0);
    camera.position = Vec3::new(0.0, 30.0, 150.0);
    camera
}

#[test]
fn default_layer_mask_is_base_only() {
    assert_eq!(camera().layers.single(), Some(Layer::Base));
}

#[test]
fn focal_length_sets_field_of_view() {
    let mut c = camera();
    c.set_focal_length(10.0);
    let film_height = FILM_GAUGE_MM / c.aspect;
    let expected = (2.0 * (0.5 * film_height / 10.0_f32).atan()).to_degrees();
    assert!((c.fov_y - expected).abs() < 1e-4);
    assert!((c.focal_length() - 10.0).abs() < 1e-3);

    c.set_focal_length(-1.0);
    assert!((c.fov_y - expected).abs() < 1e-4);
}

#[test]
fn look_at_points_forward_at_target() {
    let mut c = camera();
    let target = Vec3::new(0.0, 90.0, 50.0);
    c.look_at(target);
    assert!(close(c.forward(), (target - c.position).normalize()));

    let before = c.orientation;
    c.look_at(c.position);
    assert_eq!(c.orientation, before);
}

#[test]
fn set_aspect_ignores_zero_sizes() {
    let mut c = camera();
    c.set_aspect(800, 600);
    assert!((c.aspect - 4.0 / 3.0).abs() < 1e-6);
    c.set_aspect(0, 600);
    assert!((c.aspect - 4.0 / 3.0).abs() < 1e-6);
}

#[test]
fn uniform_projects_target_to_screen_centre() {
    let mut c = camera();
    c.look_at(Vec3::ZERO);
    let u = c.uniform();
    let m = glam::Mat4::from_cols_array_2d(&u.view_proj);
    let clip = m * Vec3::ZERO.extend(1.0);
    assert!((clip.x / clip.w).abs() < 1e-4 && (clip.y / clip.w).abs() < 1e-4);
    assert_eq!(u.position, [0.0, 30.0, 150.0, 1.0]);
}

#[test]
fn orbit_keeps_distance_and_aims_at_target() {
    let mut c = camera();
    let mut orbit = OrbitControls::new(Vec3::ZERO);
    let radius = c.position.length();

    assert!(!orbit.update(&mut c));
    orbit.drag(100.0, 20.0);
    assert!(orbit.update(&mut c));
    assert!((c.position.length() - radius).abs() < 1e-2);
    assert!(close(c.forward(), (-c.position).normalize()));
    assert!(!orbit.update(&mut c));
}

#[test]
fn disabled_orbit_ignores_drags() {
    let mut c = camera();
    let start = c.position;
    let mut orbit = OrbitControls::new(Vec3::ZERO);
    orbit.enabled = false;
    orbit.drag(100.0, 0.0);
    orbit.enabled = true;
    assert!(!orbit.update(&mut c));
    assert_eq!(c.position, start);
}
