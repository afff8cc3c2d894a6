use std::sync::Arc;

use backdrop::animation::{AnimationTargets, CameraRig, FrameScheduler, Motion};
use backdrop::camera::{Camera, OrbitControls};
use backdrop::compositor::DualPassCompositor;
use backdrop::follow::CameraFollow;
use backdrop::geometry::Mesh;
use backdrop::layers::Layer;
use backdrop::partition;
use backdrop::renderer::{BackendCall, HeadlessBackend};
use backdrop::scene::{Material, ObjectId, ObjectKind, SceneGraph, Transform, VisualObject};
use glam::Vec3;
use rand::SeedableRng;
use rand::rngs::StdRng;

struct Fixture {
    scene: SceneGraph,
    targets: AnimationTargets,
    camera: Camera,
    orbit: OrbitControls,
    follow: CameraFollow,
    compositor: DualPassCompositor,
    backend: HeadlessBackend,
    rng: StdRng,
}

/// One shape and two particles, partitioned.
fn fixture() -> Fixture {
    let mut scene = SceneGraph::new();
    let mesh = Arc::new(Mesh::sphere(1.0, 8, 6));
    scene.add(VisualObject::mesh(ObjectKind::Shape, mesh.clone(), Material::solid(0xff5345), Transform::default()));
    for x in [-5.0, 5.0] {
        let t = Transform::at(Vec3::new(x, 2.0, -3.0));
        scene.add(VisualObject::mesh(ObjectKind::Particle, mesh.clone(), Material::solid(0xffffff), t));
    }
    let mut camera = Camera::perspective(75.0, 16.0 / 9.0, 0.1, 1000.0);
    camera.position = Vec3::new(0.0, 30.0, 150.0);
    partition::assign_layers(&mut scene, &mut camera);
    let targets = AnimationTargets::from_scene(&scene);
    Fixture {
        scene,
        targets,
        camera,
        orbit: OrbitControls::new(Vec3::ZERO),
        follow: CameraFollow::new(),
        compositor: DualPassCompositor::default(),
        backend: HeadlessBackend::new(),
        rng: StdRng::seed_from_u64(11),
    }
}

impl Fixture {
    fn tick(&mut self, scheduler: &mut FrameScheduler, text_ready: bool) -> Option<backdrop::animation::TickReport> {
        let rig = CameraRig {
            camera: &mut self.camera,
            follow: &self.follow,
            orbit: &mut self.orbit,
            text_ready,
        };
        scheduler
            .tick(&mut self.scene, &self.targets, &mut self.rng, rig, &mut self.compositor, &mut self.backend)
            .unwrap()
    }

    fn transform(&self, id: ObjectId) -> Transform {
        self.scene.get(id).unwrap().transform
    }

    fn particle_positions(&self) -> Vec<Vec3> {
        self.targets.particles.iter().map(|id| self.transform(*id).position).collect()
    }
}

fn assert_vec_close(a: Vec3, b: Vec3) {
    assert!((a - b).abs().max_element() < 1e-5, "{a:?} != {b:?}");
}

#[test]
fn ten_ticks_rotate_shape_without_moving_zero_step_particles() {
    let mut f = fixture();
    let mut scheduler = FrameScheduler::new(Motion { jitter_step: 0.0, ..Motion::default() });
    let before = f.particle_positions();
    let shape = f.targets.shape.unwrap();

    for _ in 0..10 {
        let report = f.tick(&mut scheduler, false).unwrap();
        assert!(report.mutated);
    }

    assert_vec_close(f.transform(shape).rotation, Vec3::new(0.1, 0.05, 0.1));
    assert_eq!(f.particle_positions(), before);
    assert_eq!(f.backend.frames(), 10);
}

#[test]
fn paused_ticks_render_but_do_not_mutate() {
    let mut f = fixture();
    let mut scheduler = FrameScheduler::new(Motion::default());
    let shape = f.targets.shape.unwrap();

    scheduler.pause();
    for _ in 0..5 {
        let report = f.tick(&mut scheduler, false).unwrap();
        assert!(!report.mutated);
        assert!(report.bloom_pass);
    }
    assert_eq!(f.transform(shape).rotation, Vec3::ZERO);
    assert_eq!(f.backend.frames(), 5);

    let frozen = f.particle_positions();
    scheduler.resume();
    for _ in 0..5 {
        f.tick(&mut scheduler, false);
    }
    assert_vec_close(f.transform(shape).rotation, Vec3::new(0.05, 0.025, 0.05));
    assert_ne!(f.particle_positions(), frozen);
}

#[test]
fn pause_and_resume_are_idempotent() {
    let scheduler = FrameScheduler::default();
    let handle = scheduler.pauses();
    scheduler.pause();
    scheduler.pause();
    assert!(handle.is_paused());
    handle.resume();
    handle.resume();
    assert!(!scheduler.is_paused());
}

#[test]
fn jitter_stays_within_half_step_per_tick() {
    let mut f = fixture();
    let scheduler = FrameScheduler::new(Motion::default());
    let start = f.particle_positions();
    let ticks = 200;
    for _ in 0..ticks {
        scheduler.animate(&mut f.scene, &f.targets, &mut f.rng);
    }
    let bound = ticks as f32 * 0.03 / 2.0 + 1e-4;
    for (a, b) in start.iter().zip(f.particle_positions()) {
        assert!((b - *a).abs().max_element() <= bound);
    }
}

#[test]
fn exactly_one_layer_is_active_during_each_pass() {
    let mut f = fixture();
    let mut scheduler = FrameScheduler::default();
    f.tick(&mut scheduler, true);

    let masks: Vec<_> = f.backend.passes().map(|p| p.layers.single()).collect();
    assert_eq!(masks, vec![Some(Layer::Bloom), Some(Layer::Base)]);
}

#[test]
fn only_bloom_pass_runs_before_text_is_ready() {
    let mut f = fixture();
    let mut scheduler = FrameScheduler::default();
    let report = f.tick(&mut scheduler, false).unwrap();
    assert!(report.bloom_pass && !report.base_pass);
    assert!(!f.backend.calls().iter().any(|c| matches!(c, BackendCall::RenderBase(_))));

    let bloom = f.backend.passes().next().unwrap();
    assert_eq!(bloom.objects, f.targets.particles);
}

#[test]
fn orbit_is_disabled_for_good_once_text_is_ready() {
    let mut f = fixture();
    let mut scheduler = FrameScheduler::default();

    f.orbit.drag(40.0, 0.0);
    assert!(f.tick(&mut scheduler, false).unwrap().orbit_moved);

    f.tick(&mut scheduler, true);
    assert!(!f.orbit.enabled);
    f.orbit.drag(40.0, 0.0);
    let report = f.tick(&mut scheduler, false).unwrap();
    assert!(!report.orbit_moved);
    assert!(!f.orbit.enabled);
}

#[test]
fn ready_camera_faces_follow_target_in_both_passes() {
    let mut f = fixture();
    let mesh = Arc::new(Mesh::sphere(1.0, 6, 4));
    let title = f.scene.add(VisualObject::mesh(
        ObjectKind::Text,
        mesh.clone(),
        Material::solid(0xffffff),
        Transform::at(Vec3::new(0.0, 100.0, 50.0)),
    ));
    let description = f.scene.add(VisualObject::mesh(
        ObjectKind::Text,
        mesh,
        Material::solid(0xffffff),
        Transform::at(Vec3::new(0.0, 80.0, 50.0)),
    ));
    let target = f.follow.retarget(&f.scene, title, description).unwrap();
    assert_vec_close(target, Vec3::new(0.0, 90.0, 50.0));

    let mut scheduler = FrameScheduler::default();
    f.tick(&mut scheduler, true);

    let expected = (target - f.camera.position).normalize();
    for pass in f.backend.passes() {
        assert_vec_close(pass.camera_forward, expected);
    }
}

#[test]
fn stopped_loop_does_not_tick() {
    let mut f = fixture();
    let mut scheduler = FrameScheduler::default();
    scheduler.loop_handle().stop();
    assert!(f.tick(&mut scheduler, true).is_none());
    assert!(f.backend.calls().is_empty());
    assert_eq!(scheduler.ticks(), 0);
}
