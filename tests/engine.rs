use std::time::{Duration, Instant};

use backdrop::BackdropBuilder;
use backdrop::i18n::Language;
use backdrop::renderer::headless::{BackendCall, HeadlessBackend};
use backdrop::scene::ObjectKind;

fn builder() -> BackdropBuilder {
    BackdropBuilder::new().with_seed(7).with_asset_root(env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn headless_run_builds_the_full_scene() {
    let (backdrop, backend) = builder().run_headless(3).unwrap();
    let scene = backdrop.scene();

    assert_eq!(scene.ids_of_kind(ObjectKind::Particle).len(), 500);
    assert_eq!(scene.ids_of_kind(ObjectKind::Shape).len(), 1);
    assert_eq!(scene.ids_of_kind(ObjectKind::Text).len(), 2);
    assert!(backdrop.intro().is_ready());
    assert!(backdrop.intro().terrain_id().is_some());
    assert!(backdrop.follow().target().is_some());
    assert_eq!(backdrop.intro().title(), "JOÃO PINHEIRO");

    assert_eq!(backend.frames(), 3);
    assert_eq!((backend.base_passes(), backend.bloom_passes()), (3, 3));
}

#[test]
fn headless_run_keeps_no_call_log() {
    let (_, backend) = builder().run_headless(200).unwrap();
    assert!(!backend.is_recording());
    assert!(backend.calls().is_empty());
    assert_eq!(backend.frames(), 200);
    assert_eq!(backend.bloom_passes(), 200);
    assert_eq!(backend.resize_count(), 1);
}

#[test]
fn recording_backend_logs_every_pass() {
    let mut backdrop = builder().build().unwrap();
    let mut backend = HeadlessBackend::new();
    backdrop.resize(&mut backend, 800, 600);
    for _ in 0..2 {
        backdrop.tick(&mut backend, Instant::now()).unwrap();
    }
    let bloom = backend.calls().iter().filter(|c| matches!(c, BackendCall::RenderBloom(..))).count();
    assert_eq!(bloom, 2);
    assert_eq!(backend.passes().count() as u64, backend.bloom_passes() + backend.base_passes());
}

#[test]
fn same_seed_places_the_same_stars() {
    let a = builder().build().unwrap();
    let b = builder().build().unwrap();
    let positions = |d: &backdrop::Backdrop| {
        d.targets()
            .particles
            .iter()
            .map(|id| d.scene().get(*id).unwrap().transform.position)
            .collect::<Vec<_>>()
    };
    assert_eq!(positions(&a), positions(&b));
}

#[test]
fn language_cycle_rebuilds_text_on_next_tick() {
    let (mut backdrop, mut backend) = builder().run_headless(1).unwrap();
    let before = backdrop.intro().text_ids().unwrap();

    assert_eq!(backdrop.cycle_language(), Language::PtBr);
    assert_eq!(backdrop.intro().text_ids(), Some(before));

    backdrop.tick(&mut backend, Instant::now()).unwrap();
    assert_eq!(backdrop.intro().description(), "DESENVOLVEDOR DE SOFTWARE");
    assert_ne!(backdrop.intro().text_ids(), Some(before));
    assert_eq!(backdrop.scene().ids_of_kind(ObjectKind::Text).len(), 2);
}

#[test]
fn pause_freezes_the_shape_and_stop_ends_the_loop() {
    let (mut backdrop, mut backend) = builder().run_headless(1).unwrap();
    let shape = backdrop.targets().shape.unwrap();
    let rotation = |d: &backdrop::Backdrop| d.scene().get(shape).unwrap().transform.rotation;

    backdrop.pause();
    let frozen = rotation(&backdrop);
    let report = backdrop.tick(&mut backend, Instant::now()).unwrap().unwrap();
    assert!(!report.mutated);
    assert_eq!(rotation(&backdrop), frozen);

    backdrop.resume();
    backdrop.tick(&mut backend, Instant::now()).unwrap();
    assert_ne!(rotation(&backdrop), frozen);

    backdrop.loop_handle().stop();
    assert!(backdrop.tick(&mut backend, Instant::now()).unwrap().is_none());
}

#[test]
fn wheel_moves_the_camera_over_the_transition() {
    let mut backdrop = builder().build().unwrap();
    let mut backend = HeadlessBackend::new();
    backdrop.resize(&mut backend, 800, 600);
    let z = backdrop.camera().position.z;

    let start = Instant::now();
    backdrop.on_wheel(1.0, start);
    backdrop.tick(&mut backend, start + Duration::from_millis(500)).unwrap();
    assert!((backdrop.camera().position.z - (z - 5.0)).abs() < 1e-3);
}
