//! Pose projection: arc-length + lane offset to pixel placement
//!
//! Pure functions of the race state. Nothing here feeds back into physics.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::arc::CornerArc;
use super::state::RaceState;
use super::track::TrackLoop;

/// Renderable pose of one car, laid out for direct upload to a host renderer
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct CarPose {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub heading_deg: f32,
    pub lap_count: u32,
    /// Laps times loop length plus position
    pub progress: f32,
    /// RGBA
    pub color_tag: u32,
}

/// Centerline point and heading (radians) at arc-length `s`
pub fn centerline(track: &TrackLoop, cell_size: f32, s: f32) -> (Vec2, f32) {
    let (k, frac) = track.locate(s);
    let segment = track.segment(k);
    let center = track.cell_center(segment.cell, cell_size);

    if segment.is_corner() {
        let arc = CornerArc::for_segment(segment, center, cell_size);
        return (arc.point_at(frac), arc.heading_at(frac));
    }

    let half = cell_size * 0.5;
    let from = center - segment.entry.vec() * half;
    let to = center + segment.exit.vec() * half;
    (from.lerp(to, frac), segment.exit.angle())
}

/// Left-hand normal of a heading; +lane is to the right of travel in screen space
#[inline]
pub fn lane_normal(heading: f32) -> Vec2 {
    Vec2::new(-heading.sin(), heading.cos())
}

/// Pixel position and heading of one car, lane offset applied
pub fn project(state: &RaceState, car: usize) -> (Vec2, f32) {
    let (point, heading) = centerline(&state.track, state.cell_size, state.s[car]);
    let offset = state.lane[car] * state.tuning.lane_width * state.cell_size;
    (point + lane_normal(heading) * offset, heading)
}

/// Recompute every car's render placement from `s` and lane
pub fn refresh(state: &mut RaceState) {
    for car in 0..state.len() {
        let (pos, heading) = project(state, car);
        state.pos[car] = pos;
        state.heading[car] = heading;
    }
}

/// Copy the current placement of every car into `out`, in slot order
pub fn publish_into(state: &RaceState, out: &mut Vec<CarPose>) {
    out.clear();
    out.extend((0..state.len()).map(|car| CarPose {
        id: state.ids[car],
        x: state.pos[car].x,
        y: state.pos[car].y,
        heading_deg: state.heading[car].to_degrees(),
        lap_count: state.laps[car],
        progress: state.progress(car),
        color_tag: state.colors[car],
    }));
    log::trace!("Published {} poses at tick {}", out.len(), state.time_ticks);
}
