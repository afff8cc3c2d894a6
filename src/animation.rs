//! Frame scheduling: per-tick transform mutation followed by compositing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::camera::{Camera, OrbitControls};
use crate::compositor::{DualPassCompositor, RenderBackend};
use crate::error::Result;
use crate::follow::CameraFollow;
use crate::scene::{ObjectId, ObjectKind, SceneGraph};

// ── PauseFlag ────────────────────────────────────────────────────────────────

/// Gates transform mutation. Rendering continues while paused.
///
/// Clones share state, so a handle can be given to whatever hosts the
/// backdrop (e.g. a visibility watcher on another thread).
#[derive(Clone, Debug, Default)]
pub struct PauseFlag(Arc<AtomicBool>);

impl PauseFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        if !self.0.swap(true, Ordering::SeqCst) {
            log::info!("animation: paused");
        }
    }

    pub fn resume(&self) {
        if self.0.swap(false, Ordering::SeqCst) {
            log::info!("animation: resumed");
        }
    }

    pub fn toggle(&self) {
        if self.is_paused() { self.resume() } else { self.pause() }
    }

    pub fn is_paused(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ── LoopHandle ───────────────────────────────────────────────────────────────

/// Stops the render loop. Once stopped, a loop never restarts; mount a new
/// backdrop instead.
#[derive(Clone, Debug)]
pub struct LoopHandle(Arc<AtomicBool>);

impl Default for LoopHandle {
    fn default() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }
}

impl LoopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        if self.0.swap(false, Ordering::SeqCst) {
            log::info!("animation: loop stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ── Motion ───────────────────────────────────────────────────────────────────

/// Per-tick motion applied while unpaused.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Motion {
    /// Jitter on each particle axis is uniform in `[-step/2, step/2]`.
    pub jitter_step: f32,
    /// Radians added to the shape's XYZ rotation.
    pub rotation_step: Vec3,
}

impl Default for Motion {
    fn default() -> Self {
        Self { jitter_step: 0.03, rotation_step: Vec3::new(0.01, 0.005, 0.01) }
    }
}

/// Which objects the scheduler animates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnimationTargets {
    pub shape: Option<ObjectId>,
    pub particles: Vec<ObjectId>,
}

impl AnimationTargets {
    /// First shape and every particle currently in the scene.
    pub fn from_scene(scene: &SceneGraph) -> Self {
        Self {
            shape: scene.ids_of_kind(ObjectKind::Shape).into_iter().next(),
            particles: scene.ids_of_kind(ObjectKind::Particle),
        }
    }
}

/// Camera state the loop drives each tick.
pub struct CameraRig<'a> {
    pub camera: &'a mut Camera,
    pub follow: &'a CameraFollow,
    pub orbit: &'a mut OrbitControls,
    /// Text geometry is in place; gates the base pass and follow pointing.
    pub text_ready: bool,
}

/// What one tick did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub mutated: bool,
    pub bloom_pass: bool,
    pub base_pass: bool,
    pub orbit_moved: bool,
}

// ── FrameScheduler ───────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub struct FrameScheduler {
    pub motion: Motion,
    pause: PauseFlag,
    handle: LoopHandle,
    ticks: u64,
}

impl FrameScheduler {
    pub fn new(motion: Motion) -> Self {
        Self { motion, ..Self::default() }
    }

    pub fn pause(&self) {
        self.pause.pause();
    }

    pub fn resume(&self) {
        self.pause.resume();
    }

    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    /// Shared handle to the pause flag.
    pub fn pauses(&self) -> PauseFlag {
        self.pause.clone()
    }

    pub fn loop_handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Mutate transforms for one tick. Does nothing while paused; returns
    /// whether anything was mutated.
    pub fn animate<R: Rng + ?Sized>(&self, scene: &mut SceneGraph, targets: &AnimationTargets, rng: &mut R) -> bool {
        if self.is_paused() {
            return false;
        }

        let half = self.motion.jitter_step * 0.5;
        if half > 0.0 {
            for id in &targets.particles {
                if let Some(object) = scene.get_mut(*id) {
                    let jitter = Vec3::new(
                        rng.random_range(-half..=half),
                        rng.random_range(-half..=half),
                        rng.random_range(-half..=half),
                    );
                    object.transform.position += jitter;
                }
            }
        }

        if let Some(shape) = targets.shape.and_then(|id| scene.get_mut(id)) {
            shape.transform.rotation += self.motion.rotation_step;
        }
        true
    }

    /// One loop iteration: mutate, then render.
    ///
    /// Before text is ready only the bloom pass runs and pointer-drag orbit
    /// stays active. Once ready, orbit is switched off for good and the
    /// camera is aimed at the follow target before each of the two passes.
    /// Returns `None` once the loop handle has been stopped.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        scene: &mut SceneGraph,
        targets: &AnimationTargets,
        rng: &mut R,
        rig: CameraRig<'_>,
        compositor: &mut DualPassCompositor,
        backend: &mut dyn RenderBackend,
    ) -> Result<Option<TickReport>> {
        if !self.handle.is_running() {
            return Ok(None);
        }
        self.ticks += 1;
        let mut report = TickReport { tick: self.ticks, ..TickReport::default() };

        report.mutated = self.animate(scene, targets, rng);

        if rig.text_ready && rig.orbit.enabled {
            rig.orbit.enabled = false;
            log::info!("animation: text ready, orbit controls disabled");
        }
        report.orbit_moved = rig.orbit.update(rig.camera);

        compositor.begin_frame(backend)?;
        if rig.text_ready {
            rig.follow.point_camera(rig.camera);
        }
        compositor.bloom_pass(backend, scene, rig.camera)?;
        report.bloom_pass = true;

        if rig.text_ready {
            rig.follow.point_camera(rig.camera);
            compositor.base_pass(backend, scene, rig.camera)?;
            report.base_pass = true;
        }
        compositor.end_frame(backend)?;

        Ok(Some(report))
    }
}
