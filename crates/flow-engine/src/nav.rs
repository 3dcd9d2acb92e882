//! Open-loop motion planning for rotate and move-to actions
//!
//! The navigator turns a target into a short list of constant-velocity
//! segments. Plans are computed once from the current pose estimate and
//! executed blind; there is no feedback loop and no replanning.

use flow_types::{wrap_angle, Pose};

/// Tunables for open-loop navigation
#[derive(Clone, Copy, Debug)]
pub struct NavConfig {
    /// Targets closer than this are already reached, in meters
    pub close_enough_radius: f64,
    /// Heading errors below this skip the turn phase, in radians
    pub heading_tolerance: f64,
    /// Angular speed used for turn segments, in rad/s
    pub turn_speed: f64,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            close_enough_radius: 0.1,
            heading_tolerance: 0.2,
            turn_speed: 0.5,
        }
    }
}

/// One constant-velocity command held for a fixed duration
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionSegment {
    pub vx: f64,
    pub vy: f64,
    pub vyaw: f64,
    pub duration: f64,
}

impl MotionSegment {
    pub fn turn(vyaw: f64, duration: f64) -> Self {
        Self {
            vx: 0.0,
            vy: 0.0,
            vyaw,
            duration,
        }
    }

    pub fn forward(vx: f64, duration: f64) -> Self {
        Self {
            vx,
            vy: 0.0,
            vyaw: 0.0,
            duration,
        }
    }
}

/// A move-to destination in the world frame
#[derive(Clone, Copy, Debug)]
pub struct NavTarget {
    pub x: f64,
    pub y: f64,
    /// Heading to assume after arrival; `None` keeps whatever heading
    /// the approach leg ends with
    pub heading: Option<f64>,
    /// Forward speed for the approach leg, in m/s
    pub speed: f64,
}

/// Plans constant-velocity segment sequences from the current pose
#[derive(Clone, Copy, Debug, Default)]
pub struct Navigator {
    config: NavConfig,
}

impl Navigator {
    pub fn new(config: NavConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    /// Plan an in-place rotation by `angle` radians at `speed` rad/s.
    ///
    /// Returns `None` when there is nothing to do: a zero angle, or a
    /// speed that cannot produce motion.
    pub fn plan_rotation(&self, angle: f64, speed: f64) -> Option<MotionSegment> {
        if angle == 0.0 || !speed.is_finite() || speed <= 0.0 {
            return None;
        }
        let duration = angle.abs() / speed;
        Some(MotionSegment::turn(angle.signum() * speed, duration))
    }

    /// Plan a route from `pose` to `target`: turn toward the target if
    /// the heading error exceeds the tolerance, drive the straight-line
    /// distance, then optionally turn to the requested final heading.
    ///
    /// An empty plan means the target is already reached and no final
    /// heading adjustment is needed.
    pub fn plan_route(&self, pose: &Pose, target: &NavTarget) -> Vec<MotionSegment> {
        let mut segments = Vec::new();
        if !target.speed.is_finite() || target.speed <= 0.0 {
            return segments;
        }

        let distance = pose.distance_to(target.x, target.y);
        let mut heading = pose.heading;

        if distance > self.config.close_enough_radius {
            let bearing = (target.y - pose.y).atan2(target.x - pose.x);
            if let Some(turn) = self.turn_to(heading, bearing) {
                segments.push(turn);
                heading = bearing;
            }
            segments.push(MotionSegment::forward(
                target.speed,
                distance / target.speed,
            ));
        }

        if let Some(goal) = target.heading {
            if let Some(turn) = self.turn_to(heading, goal) {
                segments.push(turn);
            }
        }

        segments
    }

    /// Turn segment from `from` to `to`, or `None` when the error is
    /// within tolerance. Always takes the short way around.
    fn turn_to(&self, from: f64, to: f64) -> Option<MotionSegment> {
        let error = wrap_angle(to - from);
        if error.abs() <= self.config.heading_tolerance {
            return None;
        }
        let duration = error.abs() / self.config.turn_speed;
        Some(MotionSegment::turn(
            error.signum() * self.config.turn_speed,
            duration,
        ))
    }
}
