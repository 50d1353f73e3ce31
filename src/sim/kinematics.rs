//! Speed model and arc-length integration
//!
//! Each car chases a target speed built from its base pace and the shape of
//! the track around it. Velocity eases toward the target exponentially, so a
//! large dt never overshoots.

use super::state::{NO_STREAK_MARK, RaceState};

/// Acceleration bonus for a streak count
#[inline]
pub fn streak_bonus(streak: u8, streak_max: u8, bonus_max: f32) -> f32 {
    if streak_max == 0 {
        return 0.0;
    }
    streak.min(streak_max) as f32 / streak_max as f32 * bonus_max
}

/// Fraction of the remaining gap closed by exponential easing over dt
#[inline]
pub fn ease_factor(rate: f32, dt: f32) -> f32 {
    1.0 - (-rate * dt).exp()
}

/// Target speed for one car at its current position
pub fn target_speed(state: &RaceState, car: usize) -> f32 {
    let t = &state.tuning;
    let (k, frac) = state.track.locate(state.s[car]);
    let on_corner = state.track.segment(k).is_corner();
    let base = state.base_speed[car];

    let mut target = base * (1.0 + streak_bonus(state.streak[car], t.streak_max, t.accel_bonus_max));

    if on_corner {
        target *= t.corner_factor;
    }
    if state.track.next_segment(k).is_corner() && frac > t.brake_point {
        target *= t.pre_brake_factor;
    }
    if state.phase[car].is_passing() {
        target *= 1.0 + t.overtake_boost;
    }
    let drafting = state
        .car_ahead(car)
        .is_some_and(|(_, gap)| gap < t.slipstream_gap);
    if !on_corner && drafting {
        target *= 1.0 + t.slipstream_bonus;
    }
    target = target.clamp(base * t.min_speed_factor, base * t.max_speed_factor);

    // Outside the clamp so the penalty is exact everywhere on the loop
    if state.seats[car].contract_expired(state.now_ms()) {
        target *= t.expiry_penalty;
    }
    target
}

/// Credit or reset the acceleration streak for a car's current segment
fn update_streak(state: &mut RaceState, car: usize) {
    let (k, frac) = state.track.locate(state.s[car]);
    if state.track.segment(k).is_corner() {
        state.streak[car] = 0;
        state.streak_mark[car] = NO_STREAK_MARK;
    } else if frac >= state.tuning.streak_zone && state.streak_mark[car] != k as u32 {
        state.streak[car] = state.streak[car].saturating_add(1).min(state.tuning.streak_max);
        state.streak_mark[car] = k as u32;
    }
}

/// Advance every car by dt. Targets are chosen from the positions at the
/// start of the tick, then all cars move.
pub fn advance(state: &mut RaceState, dt: f32) {
    let n = state.len();
    let length = state.track.length();
    let ease = ease_factor(state.tuning.speed_ease_rate, dt);

    for car in 0..n {
        update_streak(state, car);
        state.target_speed[car] = target_speed(state, car);
    }

    for car in 0..n {
        if state.finished[car] {
            continue;
        }
        state.v[car] += (state.target_speed[car] - state.v[car]) * ease;

        let mut s = state.s[car] + state.v[car] * dt;
        while s >= length {
            s -= length;
            state.laps[car] += 1;
        }
        state.s[car] = state.track.wrap(s);
    }
}
