//! Car-to-car overlap and push-apart
//!
//! Each car is an oriented rectangle around its render position. Overlaps are
//! found with the separating axis test on the two boxes' four edge normals and
//! resolved along the axis of least overlap. Only render positions move; the
//! arc-length state is never touched.

use glam::Vec2;

use super::state::RaceState;

/// Result of an overlap check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether the boxes overlap
    pub hit: bool,
    /// Unit separation direction, pointing from the first box to the second
    pub normal: Vec2,
    /// Overlap along `normal` (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Oriented bounding box of one car (pixels)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarBox {
    pub center: Vec2,
    /// Unit vector along the direction of travel
    pub axis: Vec2,
    pub half_length: f32,
    pub half_width: f32,
}

impl CarBox {
    pub fn new(center: Vec2, heading: f32, half_length: f32, half_width: f32) -> Self {
        Self {
            center,
            axis: Vec2::from_angle(heading),
            half_length,
            half_width,
        }
    }

    #[inline]
    pub fn normal(&self) -> Vec2 {
        self.axis.perp()
    }

    /// Half extent of the box projected onto a unit direction
    #[inline]
    pub fn project_radius(&self, dir: Vec2) -> f32 {
        self.half_length * self.axis.dot(dir).abs() + self.half_width * self.normal().dot(dir).abs()
    }
}

/// Separating axis test between two boxes
pub fn obb_overlap(a: &CarBox, b: &CarBox) -> CollisionResult {
    let d = b.center - a.center;
    let mut best = CollisionResult::miss();
    best.penetration = f32::INFINITY;

    for axis in [a.axis, a.normal(), b.axis, b.normal()] {
        let dist = d.dot(axis);
        let overlap = a.project_radius(axis) + b.project_radius(axis) - dist.abs();
        if overlap <= 0.0 {
            return CollisionResult::miss();
        }
        if overlap < best.penetration {
            best.penetration = overlap;
            best.normal = if dist >= 0.0 { axis } else { -axis };
        }
    }

    best.hit = true;
    best
}

/// Car body dimensions and push cap in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyParams {
    pub half_length: f32,
    pub half_width: f32,
    /// Largest correction applied to one pair in one pass
    pub max_push: f32,
}

impl BodyParams {
    pub fn from_state(state: &RaceState) -> Self {
        let t = &state.tuning;
        Self {
            half_length: t.car_length * state.cell_size * 0.5,
            half_width: t.car_width * state.cell_size * 0.5,
            max_push: t.collision_max_push * state.cell_size,
        }
    }

    pub fn body(&self, center: Vec2, heading: f32) -> CarBox {
        CarBox::new(center, heading, self.half_length, self.half_width)
    }
}

/// Push two overlapping boxes apart, half the correction each.
/// Returns the penetration found before the push.
pub fn separate(a: &mut CarBox, b: &mut CarBox, max_push: f32) -> f32 {
    let hit = obb_overlap(a, b);
    if !hit.hit {
        return 0.0;
    }
    let push = hit.normal * hit.penetration.min(max_push) * 0.5;
    a.center -= push;
    b.center += push;
    hit.penetration
}

/// Iteratively separate nearby cars' render positions
///
/// Each car is checked against the next few cars in track order. Within a
/// pair the lower id is always the first box, so results do not depend on
/// slot order.
pub fn separate_cars(state: &mut RaceState) {
    let n = state.len();
    if n < 2 {
        return;
    }
    let params = BodyParams::from_state(state);
    let window = state.tuning.collision_window.min(n - 1);

    for _ in 0..state.tuning.collision_iterations {
        let mut moved = false;
        for k in 0..n {
            for w in 1..=window {
                // Pair already visited from the other end
                let back = n - w;
                if back < w || (back == w && k >= w) {
                    continue;
                }

                let (mut first, mut second) = (state.order[k], state.order[(k + w) % n]);
                if state.ids[second] < state.ids[first] {
                    std::mem::swap(&mut first, &mut second);
                }
                let mut a = params.body(state.pos[first], state.heading[first]);
                let mut b = params.body(state.pos[second], state.heading[second]);
                if separate(&mut a, &mut b, params.max_push) > 0.0 {
                    state.pos[first] = a.center;
                    state.pos[second] = b.center;
                    moved = true;
                }
            }
        }
        if !moved {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tuning;
    use crate::sim::pose;
    use crate::sim::state::CarSetup;
    use crate::sim::track::{TrackGrid, TrackLoop};
    use proptest::prelude::*;
    use std::f32::consts::FRAC_PI_2;

    fn pair_penetrations(state: &RaceState) -> Vec<f32> {
        let params = BodyParams::from_state(state);
        let mut out = Vec::new();
        for i in 0..state.len() {
            for j in (i + 1)..state.len() {
                let a = params.body(state.pos[i], state.heading[i]);
                let b = params.body(state.pos[j], state.heading[j]);
                out.push(obb_overlap(&a, &b).penetration);
            }
        }
        out
    }

    fn total_penetration(state: &RaceState) -> f32 {
        pair_penetrations(state).iter().sum()
    }

    fn ring() -> TrackLoop {
        TrackLoop::build(&TrackGrid::ring(12, 10)).unwrap()
    }

    fn params() -> BodyParams {
        let t = Tuning::default();
        BodyParams {
            half_length: t.car_length * 16.0,
            half_width: t.car_width * 16.0,
            max_push: t.collision_max_push * 32.0,
        }
    }

    #[test]
    fn test_obb_overlap_side_by_side() {
        let p = params();
        let a = p.body(Vec2::ZERO, 0.0);
        let b = p.body(Vec2::new(0.0, 6.0), 0.0);
        let hit = obb_overlap(&a, &b);
        assert!(hit.hit);
        assert!((hit.penetration - (2.0 * p.half_width - 6.0)).abs() < 1e-4);
        assert!(hit.normal.distance(Vec2::Y) < 1e-5);
    }

    #[test]
    fn test_obb_miss() {
        let p = params();
        let a = p.body(Vec2::ZERO, 0.0);
        let b = p.body(Vec2::new(30.0, 0.0), FRAC_PI_2);
        assert!(!obb_overlap(&a, &b).hit);

        // Exactly touching counts as apart
        let c = p.body(Vec2::new(0.0, 2.0 * p.half_width), 0.0);
        assert!(!obb_overlap(&a, &c).hit);
    }

    #[test]
    fn test_coincident_boxes_push_along_first_axis() {
        let p = params();
        let a = p.body(Vec2::ZERO, 0.0);
        let hit = obb_overlap(&a, &a);
        assert!(hit.hit);
        // Least overlap is across the width, pointing along +normal
        assert!(hit.normal.distance(a.normal()) < 1e-5);
    }

    #[test]
    fn test_separate_splits_evenly() {
        let p = params();
        let mut a = p.body(Vec2::ZERO, 0.0);
        let mut b = p.body(Vec2::new(0.0, 6.0), 0.0);
        let pen = separate(&mut a, &mut b, p.max_push);
        assert!(pen > 0.0);
        assert!((a.center.y + pen * 0.5).abs() < 1e-4);
        assert!((b.center.y - 6.0 - pen * 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_separate_cars_clears_pileup() {
        let cars = vec![
            CarSetup::new(1, 3.0, 3.0),
            CarSetup::new(2, 3.0, 3.1),
            CarSetup::new(3, 3.0, 3.2),
            CarSetup::new(4, 3.0, 3.3),
        ];
        let mut state = RaceState::with_cars(ring(), Tuning::default(), 32.0, 3, cars);
        let s_before = state.s.clone();
        assert!(total_penetration(&state) > 0.0);

        separate_cars(&mut state);
        let tolerance = 0.01 * state.tuning.car_width * state.cell_size;
        for pen in pair_penetrations(&state) {
            assert!(pen < tolerance, "left {pen}px");
        }
        assert_eq!(state.s, s_before, "push-apart never moves arc length");
    }

    proptest! {
        #[test]
        fn prop_one_pass_separates_a_pair(
            bx in -12.0f32..12.0,
            by in -12.0f32..12.0,
            ha in -3.2f32..3.2,
            hb in -3.2f32..3.2,
        ) {
            let p = params();
            let mut a = p.body(Vec2::ZERO, ha);
            let mut b = p.body(Vec2::new(bx, by), hb);
            separate(&mut a, &mut b, p.max_push);
            let after = obb_overlap(&a, &b);
            prop_assert!(!after.hit || after.penetration < 1e-3, "left {}", after.penetration);
        }

        #[test]
        fn prop_window_cars_end_apart(
            spots in proptest::collection::vec((3.0f32..3.6, -1.0f32..1.0), 2..=4),
            start in prop::sample::select(vec![3.0f32, 11.2, 20.1]),
        ) {
            // At most window + 1 cars, so every pair is checked
            let cars = spots
                .iter()
                .enumerate()
                .map(|(i, &(s, _))| CarSetup::new(i as u32 + 1, 3.0, s - 3.0 + start))
                .collect();
            let mut state = RaceState::with_cars(ring(), Tuning::default(), 32.0, 3, cars);
            for (car, &(_, lane)) in spots.iter().enumerate() {
                state.lane[car] = lane;
            }
            pose::refresh(&mut state);

            separate_cars(&mut state);
            let tolerance = 0.01 * state.tuning.car_width * state.cell_size;
            for pen in pair_penetrations(&state) {
                prop_assert!(pen < tolerance, "left {}px", pen);
            }
        }
    }
}
