// ── Smooth-scroll easing ──────────────────────────────────────────────────────
//
// Progress of a time-driven scroll as a function of elapsed time. Math is done
// in f64 so a given (curve, duration, run_time) always yields the same bits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Control values of the scroll easing curve.
///
/// [`progress`] evaluates
/// ```text
/// p(t) = 1 - (x1·t³ + y1·3t²(1-t) + x2·3t(1-t)² + y2·(1-t)³)
/// ```
/// so `p(0) = 1 - y2` and `p(1) = 1 - x1`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CubicBezier {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Default for CubicBezier {
    /// Smoothstep: starts at 0, ends at 1, flat at both ends.
    fn default() -> Self {
        Self { x1: 0.0, y1: 0.0, x2: 1.0, y2: 1.0 }
    }
}

impl CubicBezier {
    pub fn validate(&self) -> Result<(), Error> {
        let values = [self.x1, self.y1, self.x2, self.y2];
        if values.iter().any(|v| v.is_nan()) {
            return Err(Error::Configuration(format!("easing curve has NaN control values: {self:?}")));
        }
        if self.x1 < 0.0 || self.x2 < 0.0 {
            return Err(Error::Configuration(format!("easing curve x1/x2 must be non-negative: {self:?}")));
        }
        Ok(())
    }

    /// Evaluate at normalised time `t` (not clamped).
    pub fn at(&self, t: f64) -> f64 {
        let b1 = t.powi(3);
        let b2 = 3.0 * t * t * (1.0 - t);
        let b3 = 3.0 * t * (1.0 - t).powi(2);
        let b4 = (1.0 - t).powi(3);
        1.0 - (self.x1 * b1 + self.y1 * b2 + self.x2 * b3 + self.y2 * b4)
    }
}

/// Named easing functions usable instead of a curve.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transition {
    Linear,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutCubic,
}

impl Transition {
    pub fn at(self, t: f64) -> f64 {
        match self {
            Transition::Linear => t,
            Transition::EaseInQuad => t * t,
            Transition::EaseOutQuad => t * (2.0 - t),
            Transition::EaseInOutCubic => {
                if t < 0.5 { 4.0 * t * t * t } else { 1.0 - (-2.0 * t + 2.0).powi(3) / 2.0 }
            }
        }
    }
}

/// How a scroll animation maps time to progress.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    Curve(CubicBezier),
    Transition(Transition),
}

impl Easing {
    /// Reject curves [`progress`] would treat as zero progress.
    pub fn validate(&self) -> Result<(), Error> {
        match self {
            Easing::Curve(curve) => curve.validate(),
            Easing::Transition(_) => Ok(()),
        }
    }
}

impl Default for Easing {
    fn default() -> Self {
        Easing::Curve(CubicBezier::default())
    }
}

/// Scroll progress after `run_time` of an animation lasting `duration`.
///
/// Invalid parameters (NaN or negative curve x-values, zero duration) are
/// logged and count as zero progress.
pub fn progress(easing: &Easing, duration: Duration, run_time: Duration) -> f64 {
    if duration.is_zero() {
        log::error!("easing: zero duration");
        return 0.0;
    }
    let t = run_time.as_secs_f64() / duration.as_secs_f64();
    match easing {
        Easing::Transition(transition) => transition.at(t),
        Easing::Curve(curve) => match curve.validate() {
            Ok(()) => curve.at(t),
            Err(e) => {
                log::error!("easing: {e}");
                0.0
            }
        },
    }
}

// ── SmoothScroll ─────────────────────────────────────────────────────────────

/// Scrolls a scalar by `amount` over `duration`, one delta per tick.
///
/// Deltas are driven by elapsed time, not tick count, so a slow frame simply
/// produces a bigger step.
#[derive(Clone, Debug)]
pub struct SmoothScroll {
    pub easing: Easing,
    pub duration: Duration,
    pub amount: f64,
    applied: f64,
    finished: bool,
}

impl SmoothScroll {
    /// An invalid easing or a zero duration is logged and the scroll starts
    /// finished, so it never moves anything.
    pub fn new(easing: Easing, duration: Duration, amount: f64) -> Self {
        let invalid = match easing.validate() {
            Err(e) => Some(e.to_string()),
            Ok(()) if duration.is_zero() => Some("zero duration".into()),
            Ok(()) => None,
        };
        if let Some(reason) = &invalid {
            log::error!("easing: scroll of {amount} dropped: {reason}");
        }
        Self { easing, duration, amount, applied: 0.0, finished: invalid.is_some() }
    }

    /// Delta to apply for a tick at `run_time` since the scroll started.
    ///
    /// Once `run_time` reaches the duration the remainder is returned so the
    /// total applied is exactly `amount`; afterwards the delta is zero.
    pub fn step(&mut self, run_time: Duration) -> f64 {
        if self.finished {
            return 0.0;
        }
        let target = if run_time >= self.duration {
            self.finished = true;
            self.amount
        } else {
            progress(&self.easing, self.duration, run_time) * self.amount
        };
        let delta = target - self.applied;
        self.applied = target;
        delta
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn applied(&self) -> f64 {
        self.applied
    }
}
