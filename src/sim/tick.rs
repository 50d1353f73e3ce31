//! Simulation tick
//!
//! Advances a race deterministically: overtake decisions, speed and position,
//! track order, lanes, render placement, push-apart, then the finish check.

use super::state::{RaceState, RaceStatus};
use super::{collision, kinematics, lane, overtake, pose};

/// What a tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to advance (finished, empty, or zero dt)
    Idle,
    Running,
    /// This tick ended the race
    Finished,
}

/// Advance the race by `dt` seconds (clamped to `max_dt`)
pub fn tick(state: &mut RaceState, dt: f32) -> TickOutcome {
    if state.is_finished() || state.is_empty() || state.track.is_empty() || !(dt > 0.0) {
        return TickOutcome::Idle;
    }
    let dt = dt.min(state.tuning.max_dt);
    state.time_ticks += 1;
    state.elapsed += dt;

    overtake::arbitrate(state, dt);
    kinematics::advance(state, dt);
    state.update_order();
    lane::resolve_lanes(state, dt);
    pose::refresh(state);
    collision::separate_cars(state);

    if check_finish(state) {
        TickOutcome::Finished
    } else {
        TickOutcome::Running
    }
}

/// Freeze the race once any car starts lap `lap_target + 1`
fn check_finish(state: &mut RaceState) -> bool {
    let goal = state.lap_target + 1;
    if !state.laps.iter().any(|&laps| laps >= goal) {
        return false;
    }
    for car in 0..state.len() {
        state.finished[car] = state.laps[car] >= goal;
    }
    state.status = RaceStatus::Finished;

    if let Some(winner) = (0..state.len()).max_by(|&a, &b| {
        state
            .progress(a)
            .total_cmp(&state.progress(b))
            .then(state.ids[b].cmp(&state.ids[a]))
    }) {
        log::info!(
            "Race finished after {:.2}s ({} ticks), car {} leads",
            state.elapsed,
            state.time_ticks,
            state.ids[winner]
        );
    }
    true
}
