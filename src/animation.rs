//! Time-driven animation state: continuous spin plus a bouncing oscillator.

use rand::Rng;
use std::f32::consts::TAU;
use std::time::Instant;

use crate::params::{AnimationParams, ConfigError};

/// Largest f32 strictly below 1.0
const BELOW_ONE: f32 = 1.0 - f32::EPSILON / 2.0;

/// Per-frame animation values
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnimationState {
    /// Spin angle in radians, always in `[0, 2π)`
    pub rotation_angle: f32,

    /// Triangle-wave oscillator in `[0, 1)`
    pub bounce_value: f32,
}

/// Fold `v` into a triangle wave: rises 0→1 over `[0, 1)`, falls back over `[1, 2)`
pub fn triangle_wave(v: f64) -> f32 {
    let t = v.rem_euclid(2.0);
    let folded = if t >= 1.0 { 2.0 - t } else { t };
    (folded as f32).clamp(0.0, BELOW_ONE)
}

/// Reduce an angle into `[0, 2π)`
pub fn reduce_angle(angle: f32) -> f32 {
    let reduced = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if reduced >= TAU || !reduced.is_finite() {
        0.0
    } else {
        reduced
    }
}

/// Triangle-wave oscillator with a phase and speed fixed at construction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BouncingNumber {
    phase: f64,
    speed: f64,
}

impl BouncingNumber {
    /// `speed` is in wave units per millisecond
    pub fn new(phase: f64, speed: f64) -> Self {
        Self { phase, speed }
    }

    /// Draw phase from `[0, 1)` and speed from `speed_range`
    pub fn random<R: Rng>(rng: &mut R, speed_range: (f64, f64)) -> Result<Self, ConfigError> {
        let (min, max) = speed_range;
        if !(min > 0.0 && min <= max && max.is_finite()) {
            return Err(ConfigError::BounceSpeed { min, max });
        }
        Ok(Self {
            phase: rng.random::<f64>(),
            speed: rng.random_range(min..=max),
        })
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Oscillator value at `wall_ms` milliseconds of wall-clock time
    pub fn value_at(&self, wall_ms: f64) -> f32 {
        triangle_wave(self.phase + self.speed * wall_ms)
    }
}

/// Produces the rotation angle and bounce value for each frame.
///
/// Created once at startup and never reset; the rotation angle is kept
/// reduced so precision does not degrade over long runs.
pub struct AnimationClock {
    rotation_angle: f32,
    bounce: BouncingNumber,
    epoch: Instant,
}

impl AnimationClock {
    /// Clock with a bounce oscillator seeded from the thread RNG
    pub fn new(params: &AnimationParams) -> Result<Self, ConfigError> {
        Self::with_rng(params, &mut rand::rng())
    }

    pub fn with_rng<R: Rng>(params: &AnimationParams, rng: &mut R) -> Result<Self, ConfigError> {
        params.validate()?;
        let bounce = BouncingNumber::random(rng, params.bounce_speed_range)?;
        Ok(Self::with_bounce(bounce))
    }

    pub fn with_bounce(bounce: BouncingNumber) -> Self {
        Self {
            rotation_angle: 0.0,
            bounce,
            epoch: Instant::now(),
        }
    }

    /// Advance by `elapsed_s` seconds and sample the bounce at the current wall time
    pub fn tick(&mut self, elapsed_s: f32, rotation_speed: f32) -> AnimationState {
        let wall_ms = self.epoch.elapsed().as_secs_f64() * 1000.0;
        self.tick_at(elapsed_s, rotation_speed, wall_ms)
    }

    /// Advance by `elapsed_s` seconds with an explicit wall-clock time
    pub fn tick_at(&mut self, elapsed_s: f32, rotation_speed: f32, wall_ms: f64) -> AnimationState {
        let step = rotation_speed * elapsed_s;
        if step.is_finite() {
            self.rotation_angle = reduce_angle(self.rotation_angle + step);
        }

        AnimationState {
            rotation_angle: self.rotation_angle,
            bounce_value: self.bounce.value_at(wall_ms.max(0.0)),
        }
    }
}
