use std::sync::Arc;

use backdrop::camera::Camera;
use backdrop::geometry::Mesh;
use backdrop::layers::{Layer, Layers};
use backdrop::partition;
use backdrop::scene::*;
use glam::Vec3;

fn mesh() -> Arc<Mesh> {
    Arc::new(Mesh::sphere(1.0, 8, 4))
}

fn object(kind: ObjectKind) -> VisualObject {
    VisualObject::mesh(kind, mesh(), Material::solid(0xffffff), Transform::default())
}

#[test]
fn removed_ids_go_stale_even_when_slots_are_reused() {
    let mut scene = SceneGraph::new();
    let a = scene.add(object(ObjectKind::Text));
    assert!(scene.remove(a).is_some());
    assert!(scene.remove(a).is_none());

    let b = scene.add(object(ObjectKind::Text));
    assert_eq!(a.index(), b.index());
    assert_ne!(a, b);
    assert!(scene.get(a).is_none());
    assert!(scene.contains(b));
    assert_eq!(scene.len(), 1);
}

#[test]
fn ids_of_kind_matches_light_variants_loosely() {
    let mut scene = SceneGraph::new();
    scene.add(object(ObjectKind::Shape));
    scene.add(VisualObject::light(Light::point([1.0; 3], 1.0), Vec3::ONE));
    scene.add(VisualObject::light(Light::ambient([1.0; 3], 0.5), Vec3::ZERO));
    assert_eq!(scene.ids_of_kind(ObjectKind::Light(Light::ambient([0.0; 3], 0.0))).len(), 2);
    assert_eq!(scene.ids_of_kind(ObjectKind::Shape).len(), 1);
}

#[test]
fn partition_assigns_layers_by_kind() {
    let mut scene = SceneGraph::new();
    let shape = scene.add(object(ObjectKind::Shape));
    let star = scene.add(object(ObjectKind::Particle));
    let text = scene.add(object(ObjectKind::Text));
    let terrain = scene.add(object(ObjectKind::Scenery));
    let light = scene.add(VisualObject::light(Light::point([1.0; 3], 1.0), Vec3::ONE));
    let mut camera = Camera::perspective(75.0, 1.0, 0.1, 100.0);

    assert_eq!(partition::assign_layers(&mut scene, &mut camera), 5);
    let layers = |id| scene.get(id).unwrap().layers;
    assert_eq!(layers(shape), Layers::only(Layer::Base));
    assert_eq!(layers(terrain), Layers::only(Layer::Base));
    assert_eq!(layers(star), Layers::only(Layer::Bloom));
    assert_eq!(layers(text), Layers::only(Layer::Bloom));
    assert_eq!(layers(light), Layers::ALL);
    assert!(camera.layers.is_enabled(Layer::Base) && camera.layers.is_enabled(Layer::Bloom));
}

#[test]
fn visible_to_filters_by_mask_intersection() {
    let mut scene = SceneGraph::new();
    let mut base = object(ObjectKind::Shape);
    partition::tag(&mut base);
    let mut bloom = object(ObjectKind::Particle);
    partition::tag(&mut bloom);
    let base = scene.add(base);
    let bloom = scene.add(bloom);

    let ids = |mask| scene.visible_to(mask).map(|(id, _)| id).collect::<Vec<_>>();
    assert_eq!(ids(Layers::only(Layer::Base)), vec![base]);
    assert_eq!(ids(Layers::only(Layer::Bloom)), vec![bloom]);
    assert_eq!(ids(Layers::ALL), vec![base, bloom]);
}

#[test]
fn world_bounds_apply_transform() {
    let mut scene = SceneGraph::new();
    let t = Transform { position: Vec3::new(0.0, 10.0, 0.0), scale: Vec3::splat(2.0), ..Transform::default() };
    let id = scene.add(VisualObject::mesh(ObjectKind::Particle, mesh(), Material::solid(0), t));
    let b = scene.world_bounds(id).unwrap();
    assert!((b.center() - Vec3::new(0.0, 10.0, 0.0)).abs().max_element() < 1e-4);
    assert!((b.size() - Vec3::splat(4.0)).abs().max_element() < 1e-4);

    let light = scene.add(VisualObject::light(Light::ambient([1.0; 3], 1.0), Vec3::ZERO));
    assert!(scene.world_bounds(light).is_none());
}

#[test]
fn rgb_to_linear_decodes_srgb_channels() {
    assert_eq!(rgb_to_linear(0xffffff), [1.0, 1.0, 1.0, 1.0]);
    assert_eq!(rgb_to_linear(0x000000), [0.0, 0.0, 0.0, 1.0]);
    let [r, g, b, _] = rgb_to_linear(0xff5345);
    assert_eq!(r, 1.0);
    assert!(g > 0.0 && g < 0.1 && b > 0.0 && b < g);
}
