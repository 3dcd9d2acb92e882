//! Dead-reckoned pose estimate
//!
//! The pose is an open-loop integration of commanded velocities over
//! time. It is never corrected from sensors and is allowed to drift;
//! what matters is that the integration is reproducible.

use serde::{Deserialize, Serialize};

/// 2D position plus heading, in meters and radians
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Self { x, y, heading }
    }

    /// Integrate a commanded body-frame velocity over `dt` seconds.
    ///
    /// Heading is advanced first, but the position update uses the
    /// heading at the start of the step. This ordering is part of the
    /// contract: trajectories must be reproducible across runs.
    pub fn integrate(&mut self, vx: f64, vy: f64, vyaw: f64, dt: f64) {
        let h0 = self.heading;
        self.heading = wrap_angle(self.heading + vyaw * dt);
        self.x += (vx * h0.cos() - vy * h0.sin()) * dt;
        self.y += (vx * h0.sin() + vy * h0.cos()) * dt;
    }

    /// Planar distance to a target point
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        (x - self.x).hypot(y - self.y)
    }
}

impl std::fmt::Display for Pose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:.3}, {:.3}, {:.3} rad)",
            self.x, self.y, self.heading
        )
    }
}

/// Normalize an angle into `(-π, π]`
pub fn wrap_angle(angle: f64) -> f64 {
    use std::f64::consts::PI;
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a <= -PI {
        a += 2.0 * PI;
    }
    a
}
