//! Loop Racer - deterministic race simulation for grid-built circuits
//!
//! Core modules:
//! - `sim`: Deterministic simulation (loop building, kinematics, overtaking, collisions)
//! - `engine`: Frame driver with injected clock, pose publishing and finish callback
//! - `config`: Data-driven race setup and tuning
//! - `results`: Ranked finish results and leaderboard feed

pub mod config;
pub mod engine;
pub mod error;
pub mod results;
pub mod sim;

pub use config::{RaceConfig, RaceSeed, SeatConfig, TrackSource, Tuning};
pub use engine::{ManualClock, RaceEngine, SubscriptionId, SystemClock, TimeSource};
pub use error::{ConfigError, RaceError, TrackError};
pub use results::{RaceResult, RaceSnapshot, Standing};

/// Race configuration constants
pub mod consts {
    /// Hard cap on cars in one race (bounds the per-car lock stacks)
    pub const MAX_FIELD: usize = 16;
    /// Default field size for hosted races
    pub const DEFAULT_FIELD_SIZE: usize = 10;
    /// Longest frame gap integrated in one step (seconds)
    pub const MAX_FRAME_DT: f32 = 0.033;
    /// Default pose publish rate (Hz), independent of the tick rate
    pub const DEFAULT_PUBLISH_HZ: f32 = 30.0;
    /// Default pixel size of one grid cell
    pub const DEFAULT_CELL_SIZE: f32 = 32.0;
    /// Default lap target
    pub const DEFAULT_LAP_TARGET: u32 = 3;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> glam::Vec2 {
    glam::Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Interpolate between two angles along the shortest way round
#[inline]
pub fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    let delta = normalize_angle(to - from);
    normalize_angle(from + delta * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_normalize_angle_wraps() {
        assert!((normalize_angle(3.0 * PI) - (-PI)).abs() < 1e-5);
        assert!((normalize_angle(-FRAC_PI_2) + FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_lerp_angle_takes_short_way() {
        // 170° -> -170° should pass through 180°, not 0°
        let from = 170.0_f32.to_radians();
        let to = -170.0_f32.to_radians();
        let mid = lerp_angle(from, to, 0.5);
        assert!(mid.abs() > 3.1, "got {mid}");
    }
}
