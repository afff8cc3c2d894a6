//! Camera-follow behaviour: aiming at the text block and wheel-driven depth
//! nudges.

use std::time::{Duration, Instant};

use glam::Vec3;

use crate::camera::Camera;
use crate::easing::{Easing, SmoothScroll};
use crate::geometry::Aabb;
use crate::scene::{ObjectId, SceneGraph};

// ── CameraFollow ─────────────────────────────────────────────────────────────

/// Keeps the camera aimed at the midpoint of the title and description text.
#[derive(Clone, Debug, Default)]
pub struct CameraFollow {
    target: Option<Vec3>,
}

impl CameraFollow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(&self) -> Option<Vec3> {
        self.target
    }

    /// Midpoint of the centres of two bounding boxes.
    pub fn midpoint(a: &Aabb, b: &Aabb) -> Vec3 {
        (a.center() + b.center()) * 0.5
    }

    /// Recompute the target from the world bounds of two scene objects.
    /// Clears the target when either object has no bounds.
    pub fn retarget(&mut self, scene: &SceneGraph, title: ObjectId, description: ObjectId) -> Option<Vec3> {
        self.target = match (scene.world_bounds(title), scene.world_bounds(description)) {
            (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => Some(Self::midpoint(&a, &b)),
            _ => None,
        };
        log::debug!("follow: target {:?}", self.target);
        self.target
    }

    pub fn clear(&mut self) {
        self.target = None;
    }

    /// Aim `camera` at the target. Returns `false` while there is no target.
    pub fn point_camera(&self, camera: &mut Camera) -> bool {
        match self.target {
            Some(target) => {
                camera.look_at(target);
                true
            }
            None => false,
        }
    }
}

// ── ScrollNudge ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct Move {
    started: Instant,
    scroll: SmoothScroll,
}

/// Wheel gestures move the camera along Z with an eased, time-based motion.
///
/// Each gesture queues an independent move of `step` units; overlapping moves
/// add up. Progress depends on wall-clock time, not on how often
/// [`advance`](Self::advance) is called.
#[derive(Clone, Debug)]
pub struct ScrollNudge {
    pub duration: Duration,
    pub step: f32,
    pub easing: Easing,
    moves: Vec<Move>,
}

impl Default for ScrollNudge {
    fn default() -> Self {
        Self::new(Duration::from_millis(200), 5.0, Easing::default())
    }
}

impl ScrollNudge {
    pub fn new(duration: Duration, step: f32, easing: Easing) -> Self {
        Self { duration, step, easing, moves: Vec::new() }
    }

    /// Queue a move for a wheel gesture. Positive `wheel` (scrolling up/away)
    /// moves the camera forward (towards -Z); zero is ignored.
    pub fn on_wheel(&mut self, wheel: f32, now: Instant) {
        if wheel == 0.0 || !wheel.is_finite() {
            return;
        }
        let amount = -wheel.signum() * self.step;
        self.moves.push(Move {
            started: now,
            scroll: SmoothScroll::new(self.easing, self.duration, amount as f64),
        });
    }

    pub fn is_active(&self) -> bool {
        !self.moves.is_empty()
    }

    /// Z displacement accumulated since the previous call. Finished moves are
    /// retired after contributing their remainder.
    pub fn advance(&mut self, now: Instant) -> f32 {
        let mut delta = 0.0_f64;
        for m in &mut self.moves {
            delta += m.scroll.step(now.saturating_duration_since(m.started));
        }
        self.moves.retain(|m| !m.scroll.is_finished());
        delta as f32
    }

    /// Advance and apply the displacement to the camera position.
    pub fn apply(&mut self, camera: &mut Camera, now: Instant) -> f32 {
        let dz = self.advance(now);
        camera.position.z += dz;
        dz
    }
}
