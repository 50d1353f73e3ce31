//! Lane targets and easing
//!
//! Passing cars want their passing side, everyone else the centerline. When
//! two cars close together along the loop want the same lane, one of them
//! yields to another lane that is clear.

use super::kinematics::ease_factor;
use super::overtake::preferred_side;
use super::state::RaceState;

/// No other car near `car` along the loop is aiming for `lane`
fn lane_is_clear(state: &RaceState, car: usize, lane: i8) -> bool {
    let gap = state.tuning.lane_conflict_gap;
    (0..state.len()).filter(|&other| other != car).all(|other| {
        state.lane_target[other] != lane
            || state.track.signed_offset(state.s[other], state.s[car]).abs() >= gap
    })
}

/// Move `car` off a contested lane. Returns false when nothing is free.
fn yield_lane(state: &mut RaceState, car: usize) -> bool {
    let current = state.lane_target[car];

    if state.phase[car].is_passing() {
        // Mid-pass: only the other passing side will do
        let flipped = if current == 0 { -state.side[car] } else { -current };
        if flipped != 0 && lane_is_clear(state, car, flipped) {
            state.lane_target[car] = flipped;
            state.side[car] = flipped;
            return true;
        }
        return false;
    }

    let pref = preferred_side(state.ids[car]);
    let choice = [0, pref, -pref]
        .into_iter()
        .filter(|&lane| lane != current)
        .find(|&lane| lane_is_clear(state, car, lane));
    match choice {
        Some(lane) => {
            state.lane_target[car] = lane;
            true
        }
        None => false,
    }
}

/// The car already passing keeps its lane; with neither passing the follower does
fn yielder(state: &RaceState, follower: usize, leader: usize) -> usize {
    if state.phase[leader].is_passing() && !state.phase[follower].is_passing() {
        follower
    } else {
        leader
    }
}

/// Pick lane targets, settle conflicts between neighbors, then ease lanes
pub fn resolve_lanes(state: &mut RaceState, dt: f32) {
    let n = state.len();
    for car in 0..n {
        state.lane_target[car] = if state.phase[car].is_passing() {
            state.side[car]
        } else {
            0
        };
    }

    // Two cars share a single adjacent pair, not two
    let pairs = match n {
        0 | 1 => 0,
        2 => 1,
        _ => n,
    };
    for k in 0..pairs {
        let (mut follower, mut leader) = (state.order[k], state.order[(k + 1) % n]);
        let mut gap = state.track.forward_gap(state.s[follower], state.s[leader]);
        if n == 2 {
            // The lone pair may be nose to tail across the start line
            let across = state.track.forward_gap(state.s[leader], state.s[follower]);
            if across < gap {
                std::mem::swap(&mut follower, &mut leader);
                gap = across;
            }
        }
        if gap >= state.tuning.lane_conflict_gap
            || state.lane_target[follower] != state.lane_target[leader]
        {
            continue;
        }

        let car = yielder(state, follower, leader);
        if !yield_lane(state, car) {
            let other = if car == leader { follower } else { leader };
            log::trace!(
                "Car {} found no free lane near car {}",
                state.ids[car],
                state.ids[other]
            );
        }
    }

    let t = &state.tuning;
    for car in 0..n {
        let target = state.lane_target[car] as f32;
        let lane = state.lane[car];
        let rate = if target.abs() > lane.abs() {
            t.lane_ease_out
        } else {
            t.lane_ease_back
        };
        state.lane[car] = lane + (target - lane) * ease_factor(rate, dt);
    }
}
