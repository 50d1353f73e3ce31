//! Corner arc geometry
//!
//! A corner cell is driven as a quarter circle of radius half a cell, pivoting
//! on the cell corner shared by the entry and exit edges. The car comes in at
//! the entry edge midpoint and leaves at the exit edge midpoint.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::track::Segment;
use crate::{lerp_angle, normalize_angle, polar_to_cartesian};

/// Quarter-circle centerline through one corner cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CornerArc {
    /// Pivot point (pixels)
    pub center: Vec2,
    pub radius: f32,
    /// Angle of the entry point around the pivot (radians, [-π, π))
    pub theta_start: f32,
    /// Angle of the exit point around the pivot (radians, [-π, π))
    pub theta_end: f32,
}

impl CornerArc {
    /// Arc for a corner segment whose cell is centered at `cell_center`
    pub fn for_segment(segment: &Segment, cell_center: Vec2, cell_size: f32) -> Self {
        let half = cell_size * 0.5;
        let (entry, exit) = (segment.entry.vec(), segment.exit.vec());
        let start = -exit;
        Self {
            center: cell_center + (exit - entry) * half,
            radius: half,
            theta_start: normalize_angle(start.y.atan2(start.x)),
            theta_end: normalize_angle(entry.y.atan2(entry.x)),
        }
    }

    /// Signed sweep from start to end, ±π/2 for a grid corner
    #[inline]
    pub fn angular_span(&self) -> f32 {
        normalize_angle(self.theta_end - self.theta_start)
    }

    /// Centerline point at fraction `t` through the corner
    pub fn point_at(&self, t: f32) -> Vec2 {
        let theta = lerp_angle(self.theta_start, self.theta_end, t.clamp(0.0, 1.0));
        self.center + polar_to_cartesian(self.radius, theta)
    }

    /// Direction of travel at fraction `t` (tangent to the arc)
    pub fn heading_at(&self, t: f32) -> f32 {
        let theta = lerp_angle(self.theta_start, self.theta_end, t.clamp(0.0, 1.0));
        let turn = self.angular_span().signum() * std::f32::consts::FRAC_PI_2;
        normalize_angle(theta + turn)
    }
}
