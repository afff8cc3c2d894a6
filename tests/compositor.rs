use std::sync::Arc;

use backdrop::camera::Camera;
use backdrop::compositor::{BloomSettings, DualPassCompositor};
use backdrop::geometry::Mesh;
use backdrop::layers::{Layer, Layers};
use backdrop::partition;
use backdrop::renderer::{BackendCall, HeadlessBackend};
use backdrop::scene::{Light, Material, ObjectKind, SceneGraph, Transform, VisualObject};
use glam::Vec3;

fn scene_and_camera() -> (SceneGraph, Camera) {
    let mut scene = SceneGraph::new();
    let mesh = Arc::new(Mesh::sphere(1.0, 6, 4));
    for kind in [ObjectKind::Shape, ObjectKind::Particle, ObjectKind::Text, ObjectKind::Scenery] {
        scene.add(VisualObject::mesh(kind, mesh.clone(), Material::solid(0xffffff), Transform::default()));
    }
    scene.add(VisualObject::light(Light::point([1.0; 3], 1.0), Vec3::splat(5.0)));
    scene.add(VisualObject::light(Light::ambient([1.0; 3], 1.0), Vec3::ZERO));
    let mut camera = Camera::perspective(75.0, 1.0, 0.1, 1000.0);
    partition::assign_layers(&mut scene, &mut camera);
    (scene, camera)
}

#[test]
fn compose_orders_clears_and_passes() {
    let (scene, mut camera) = scene_and_camera();
    let mut compositor = DualPassCompositor::new(BloomSettings::default());
    let mut backend = HeadlessBackend::new();
    compositor.compose(&mut backend, &scene, &mut camera).unwrap();

    let calls = backend.calls();
    assert_eq!(calls.len(), 6);
    assert_eq!(calls[0], BackendCall::BeginFrame);
    assert_eq!(calls[1], BackendCall::ClearColor);
    assert!(matches!(calls[2], BackendCall::RenderBloom(_, s) if s == BloomSettings::default()));
    assert_eq!(calls[3], BackendCall::ClearDepth);
    assert!(matches!(calls[4], BackendCall::RenderBase(_)));
    assert_eq!(calls[5], BackendCall::EndFrame);
}

#[test]
fn each_pass_sees_its_own_layer_and_every_light() {
    let (scene, mut camera) = scene_and_camera();
    let mut compositor = DualPassCompositor::default();
    let mut backend = HeadlessBackend::new();
    compositor.compose(&mut backend, &scene, &mut camera).unwrap();

    let passes: Vec<_> = backend.passes().cloned().collect();
    assert_eq!(passes[0].layers, Layers::only(Layer::Bloom));
    assert_eq!(passes[1].layers, Layers::only(Layer::Base));
    assert_ne!(passes[0].layers, passes[1].layers);

    let kinds = |ids: &[backdrop::scene::ObjectId]| -> Vec<ObjectKind> {
        ids.iter().map(|id| scene.get(*id).unwrap().kind).collect()
    };
    assert_eq!(kinds(&passes[0].objects), vec![ObjectKind::Particle, ObjectKind::Text]);
    assert_eq!(kinds(&passes[1].objects), vec![ObjectKind::Shape, ObjectKind::Scenery]);
    assert_eq!(passes[0].lights, 2);
    assert_eq!(passes[1].lights, 2);
}

#[test]
fn camera_is_left_on_base_after_a_frame() {
    let (scene, mut camera) = scene_and_camera();
    assert!(camera.layers.is_enabled(Layer::Bloom) && camera.layers.is_enabled(Layer::Base));
    DualPassCompositor::default().compose(&mut HeadlessBackend::new(), &scene, &mut camera).unwrap();
    assert_eq!(camera.layers.single(), Some(Layer::Base));
}

#[test]
fn resize_is_idempotent() {
    let (_, mut camera) = scene_and_camera();
    let mut compositor = DualPassCompositor::default();
    let mut backend = HeadlessBackend::new();

    assert!(compositor.resize(&mut backend, &mut camera, 1920, 1080));
    assert!(!compositor.resize(&mut backend, &mut camera, 1920, 1080));
    assert_eq!(backend.resize_count(), 1);
    assert!((camera.aspect - 1920.0 / 1080.0).abs() < 1e-6);

    assert!(compositor.resize(&mut backend, &mut camera, 800, 600));
    assert_eq!(backend.resize_count(), 2);
    assert_eq!(backend.size(), (800, 600));
    assert_eq!(compositor.viewport(), Some((800, 600)));
}

#[test]
fn zero_sized_resize_is_ignored() {
    let (_, mut camera) = scene_and_camera();
    let mut compositor = DualPassCompositor::default();
    let mut backend = HeadlessBackend::new();
    assert!(!compositor.resize(&mut backend, &mut camera, 0, 720));
    assert_eq!(backend.resize_count(), 0);
    assert_eq!(camera.aspect, 1.0);
}
