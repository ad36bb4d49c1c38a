//! Damped spin animation for clicked markers.

use serde::{Deserialize, Serialize};

/// Fraction of the remaining angle pulled into the velocity each frame.
const PULL: f64 = 0.0872;

/// Velocity carry-over between frames.
const DECAY: f64 = 0.5;

/// Velocity below this snaps to zero, leaving only the pull term active.
const REST_EPSILON: f64 = 0.1;

/// Eased rotation of one marker's content toward an accumulating target.
///
/// `step` advances the fixed-tuning damped update
/// `v += (target - current) * PULL; current += v` with the velocity halved
/// each frame and snapped to zero once it drops under the rest threshold.
/// The angle approaches the target smoothly and never overshoots it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpinState {
    target: f64,
    current: f64,
    velocity: f64,
}

impl SpinState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target angle in radians the content is easing toward.
    pub fn target(&self) -> f64 {
        self.target
    }

    /// Current eased angle in radians, applied to the content every frame.
    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Queue one extra full revolution.
    pub fn add_turn(&mut self) {
        self.target += std::f64::consts::TAU;
    }

    /// Full revolutions queued so far.
    pub fn turns(&self) -> u32 {
        (self.target / std::f64::consts::TAU).round() as u32
    }

    /// Advance the animation by one frame and return the new angle.
    pub fn step(&mut self) -> f64 {
        self.velocity += (self.target - self.current) * PULL;
        self.current += self.velocity;
        self.velocity = if self.velocity < REST_EPSILON {
            0.0
        } else {
            self.velocity * DECAY
        };
        self.current
    }
}
