//! Overtake arbitration
//!
//! Each car runs a small state machine (None -> Out -> Hold -> Back -> None).
//! A follower locks the car it is passing onto its lock stack; passing
//! several cars in a row pushes each new target. A leader can be passed on
//! both sides at once, one follower per side.

use super::state::{OvertakePhase, RaceState};
use crate::consts::MAX_FIELD;

const RIGHT: u8 = 0b01;
const LEFT: u8 = 0b10;

/// Occupancy bit for a passing side
#[inline]
fn side_bit(side: i8) -> u8 {
    if side >= 0 { RIGHT } else { LEFT }
}

/// Even ids pass on the right by default, odd ids on the left
#[inline]
pub fn preferred_side(id: u32) -> i8 {
    if id % 2 == 0 { 1 } else { -1 }
}

/// Pick a side that nobody is using on the leader yet
fn choose_side(id: u32, taken: u8) -> Option<i8> {
    let pref = preferred_side(id);
    [pref, -pref]
        .into_iter()
        .find(|&side| taken & side_bit(side) == 0)
}

/// A car can be targeted only while it is not in a maneuver of its own
#[inline]
fn is_free(state: &RaceState, car: usize) -> bool {
    state.phase[car] == OvertakePhase::None && state.locks[car].is_empty()
}

/// Which sides of each car are occupied by an active pass
fn occupied_sides(state: &RaceState) -> [u8; MAX_FIELD] {
    let mut sides = [0u8; MAX_FIELD];
    for car in 0..state.len() {
        if !state.phase[car].is_passing() {
            continue;
        }
        if let Some(target) = state.locks[car].top() {
            sides[target] |= side_bit(state.side[car]);
        }
    }
    sides
}

/// Clear lock stacks that point past the end of the field
fn drop_dangling_locks(state: &mut RaceState) {
    let n = state.len();
    for car in 0..n {
        let dangling = state.locks[car].as_slice().iter().any(|&c| c as usize >= n);
        if !dangling {
            continue;
        }
        log::warn!(
            "Car {} held a lock on a missing car ({:?}), clearing",
            state.ids[car],
            state.locks[car].as_slice()
        );
        state.locks[car].clear();
        if state.phase[car].is_passing() {
            state.phase[car] = OvertakePhase::Back;
        }
    }
}

fn abort(state: &mut RaceState, car: usize, sides: &mut [u8; MAX_FIELD]) {
    if let Some(target) = state.locks[car].top() {
        sides[target] &= !side_bit(state.side[car]);
    }
    log::warn!(
        "Car {} overtake timed out after {:.2}s in {:?}, returning to line",
        state.ids[car],
        state.overtake_time[car],
        state.phase[car]
    );
    state.locks[car].clear();
    state.phase[car] = OvertakePhase::Back;
}

/// NONE -> OUT when closing fast on a free car ahead
fn try_start(state: &mut RaceState, car: usize, sides: &mut [u8; MAX_FIELD]) {
    let t = &state.tuning;
    let Some((ahead, gap)) = state.car_ahead(car) else {
        return;
    };
    if gap >= t.overtake_trigger_gap
        || state.v[car] - state.v[ahead] <= t.overtake_min_advantage
        || sides[car] != 0
        || !is_free(state, ahead)
    {
        return;
    }
    let Some(side) = choose_side(state.ids[car], sides[ahead]) else {
        return;
    };
    if !state.locks[car].push(ahead) {
        return;
    }

    sides[ahead] |= side_bit(side);
    state.phase[car] = OvertakePhase::Out;
    state.side[car] = side;
    state.overtake_time[car] = 0.0;
    log::debug!(
        "Car {} pulls out to pass car {} on side {:+} (gap {:.2})",
        state.ids[car],
        state.ids[ahead],
        side,
        gap
    );
}

/// HOLD: once clear of the target, chain onto the next car or head back
fn hold(state: &mut RaceState, car: usize, sides: &mut [u8; MAX_FIELD]) {
    let t = &state.tuning;
    let Some(target) = state.locks[car].top() else {
        state.phase[car] = OvertakePhase::Back;
        return;
    };
    let cleared = state.track.signed_offset(state.s[car], state.s[target]) > t.car_length;
    if !cleared {
        return;
    }

    let bit = side_bit(state.side[car]);
    let ahead = state.car_ahead(car);
    if let Some((next, gap)) = ahead {
        let chain = gap < t.overtake_trigger_gap
            && !state.locks[car].contains(next)
            && is_free(state, next)
            && sides[next] & bit == 0;
        if chain {
            sides[target] &= !bit;
            if state.locks[car].push(next) {
                sides[next] |= bit;
                log::debug!(
                    "Car {} cleared car {}, chaining onto car {}",
                    state.ids[car],
                    state.ids[target],
                    state.ids[next]
                );
            } else {
                state.phase[car] = OvertakePhase::Back;
            }
            return;
        }
        if gap <= t.overtake_clear_margin {
            return;
        }
    }

    sides[target] &= !bit;
    state.phase[car] = OvertakePhase::Back;
    log::debug!(
        "Car {} cleared car {}, moving back",
        state.ids[car],
        state.ids[target]
    );
}

/// BACK -> NONE once near the centerline and no longer alongside the last target
fn settle(state: &mut RaceState, car: usize) {
    let t = &state.tuning;
    let alongside = state.locks[car].top().is_some_and(|target| {
        state.track.signed_offset(state.s[car], state.s[target]).abs() < t.car_length
    });
    if state.lane[car].abs() < t.overtake_settle_lane && !alongside {
        finish_maneuver(state, car);
    }
}

fn finish_maneuver(state: &mut RaceState, car: usize) {
    log::debug!(
        "Car {} back on the line after {:.2}s",
        state.ids[car],
        state.overtake_time[car]
    );
    state.phase[car] = OvertakePhase::None;
    state.locks[car].clear();
    state.side[car] = 0;
    state.overtake_time[car] = 0.0;
}

/// Advance every car's overtake state machine by one tick
pub fn arbitrate(state: &mut RaceState, dt: f32) {
    drop_dangling_locks(state);
    let mut sides = occupied_sides(state);
    let max = state.tuning.overtake_max_duration;
    let out_limit = max - state.tuning.overtake_back_grace;

    for car in 0..state.len() {
        if state.phase[car] != OvertakePhase::None {
            state.overtake_time[car] += dt;
        }

        match state.phase[car] {
            OvertakePhase::None => try_start(state, car, &mut sides),
            OvertakePhase::Out | OvertakePhase::Hold if state.overtake_time[car] > out_limit => {
                abort(state, car, &mut sides);
            }
            OvertakePhase::Out => {
                let reached = state.lane[car] * state.side[car] as f32;
                if reached >= state.tuning.overtake_hold_fraction {
                    state.phase[car] = OvertakePhase::Hold;
                    log::debug!("Car {} alongside, holding", state.ids[car]);
                }
            }
            OvertakePhase::Hold => hold(state, car, &mut sides),
            OvertakePhase::Back if state.overtake_time[car] > max => {
                log::warn!(
                    "Car {} stuck returning to line for {:.2}s, forcing settle",
                    state.ids[car],
                    state.overtake_time[car]
                );
                finish_maneuver(state, car);
            }
            OvertakePhase::Back => settle(state, car),
        }
    }
}
