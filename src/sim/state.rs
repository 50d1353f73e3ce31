//! Race state and core simulation types
//!
//! Per-car data lives in flat parallel arrays indexed by car slot. Everything
//! that must match between two runs of the same seed lives here.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::pose;
use super::roster::{self, SeatKind};
use super::track::TrackLoop;
use crate::config::{RaceConfig, Tuning};
use crate::consts::MAX_FIELD;
use crate::error::RaceError;

/// Whether the race is still running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceStatus {
    Racing,
    /// A car reached the lap goal; nothing moves any more
    Finished,
}

/// Progress of one car through a passing maneuver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OvertakePhase {
    /// On the racing line
    #[default]
    None = 0,
    /// Moving out to the passing side
    Out = 1,
    /// Alongside, driving past the locked target
    Hold = 2,
    /// Returning to the racing line
    Back = 3,
}

impl OvertakePhase {
    /// Out or Hold: the car is actively passing
    #[inline]
    pub fn is_passing(self) -> bool {
        matches!(self, OvertakePhase::Out | OvertakePhase::Hold)
    }
}

/// Fixed-capacity stack of locked overtake targets (car slots)
///
/// Chained passes push the next car; the top is the car currently being passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LockStack {
    slots: [u8; MAX_FIELD],
    len: u8,
}

impl LockStack {
    /// Returns false when full
    pub fn push(&mut self, car: usize) -> bool {
        let len = self.len as usize;
        if len >= MAX_FIELD || car >= MAX_FIELD {
            return false;
        }
        self.slots[len] = car as u8;
        self.len += 1;
        true
    }

    pub fn top(&self) -> Option<usize> {
        self.as_slice().last().map(|&c| c as usize)
    }

    pub fn contains(&self, car: usize) -> bool {
        self.as_slice().iter().any(|&c| c as usize == car)
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.slots[..self.len as usize]
    }
}

/// Explicit starting state for one car, bypassing field generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarSetup {
    pub id: u32,
    pub base_speed: f32,
    /// Starting arc-length position
    pub s: f32,
    pub seat: SeatKind,
    pub color: u32,
    pub rating: f32,
}

impl CarSetup {
    pub fn new(id: u32, base_speed: f32, s: f32) -> Self {
        Self {
            id,
            base_speed,
            s,
            seat: SeatKind::Competitor,
            color: roster::PALETTE[id as usize % roster::PALETTE.len()],
            rating: 0.0,
        }
    }
}

/// Complete race state (deterministic, serializable)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceState {
    pub track: TrackLoop,
    pub tuning: Tuning,
    /// Pixel size of one grid cell
    pub cell_size: f32,
    pub lap_target: u32,
    /// Hashed race seed
    pub seed: u32,
    pub status: RaceStatus,
    /// Simulated seconds since the start
    pub elapsed: f32,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Race clock at the start (ms)
    pub start_time_ms: f64,

    // Identity
    pub ids: Vec<u32>,
    pub seats: Vec<SeatKind>,
    pub colors: Vec<u32>,
    pub ratings: Vec<f32>,

    // Kinematics
    pub s: Vec<f32>,
    pub v: Vec<f32>,
    pub base_speed: Vec<f32>,
    /// Target speed chosen on the last tick
    pub target_speed: Vec<f32>,
    pub streak: Vec<u8>,
    /// Segment where the streak was last credited
    pub streak_mark: Vec<u32>,

    // Lanes and overtaking
    pub lane: Vec<f32>,
    pub lane_target: Vec<i8>,
    pub phase: Vec<OvertakePhase>,
    /// Passing side, -1 or +1 while overtaking
    pub side: Vec<i8>,
    pub locks: Vec<LockStack>,
    /// Seconds spent in the current maneuver
    pub overtake_time: Vec<f32>,

    // Progress
    pub laps: Vec<u32>,
    pub finished: Vec<bool>,

    // Render placement (after collision push-apart)
    pub pos: Vec<Vec2>,
    pub heading: Vec<f32>,

    /// Car slots sorted by arc-length position (ascending, ties by id)
    pub order: Vec<usize>,
    /// Inverse of `order`
    pub rank: Vec<usize>,
}

pub const NO_STREAK_MARK: u32 = u32::MAX;

impl RaceState {
    /// Build the field from a config: generate competitors, shuffle the grid,
    /// bake each car's speed variation
    pub fn new(config: &RaceConfig) -> Result<Self, RaceError> {
        config.validate()?;
        let track = config.track.build()?;
        let seed = config.seed.to_u32();

        let field = roster::entrants(config, seed);
        let grid = roster::grid_order(seed, field.len());
        let variation = roster::variations(seed, field.len(), config.tuning.variation);

        let mut cars = vec![None; field.len()];
        for (slot, &entrant) in grid.iter().enumerate() {
            let e = &field[entrant];
            cars[entrant] = Some(CarSetup {
                id: e.id,
                base_speed: roster::base_speed(e.rating, variation[entrant], &config.tuning),
                s: roster::grid_position(slot, field.len(), track.length(), &config.tuning),
                seat: e.seat,
                color: e.color,
                rating: e.rating,
            });
        }
        let cars: Vec<CarSetup> = cars.into_iter().flatten().collect();

        log::info!(
            "Race seed {} on a {}-cell loop: {} cars, {} laps",
            seed,
            track.len(),
            cars.len(),
            config.lap_target
        );

        let mut state = Self::with_cars(
            track,
            config.tuning.clone(),
            config.cell_size,
            config.lap_target,
            cars,
        );
        state.seed = seed;
        state.start_time_ms = config.start_time_ms;
        Ok(state)
    }

    /// Build a race with explicit cars, as given
    pub fn with_cars(
        track: TrackLoop,
        tuning: Tuning,
        cell_size: f32,
        lap_target: u32,
        cars: Vec<CarSetup>,
    ) -> Self {
        let cars: Vec<CarSetup> = cars.into_iter().take(MAX_FIELD).collect();
        let n = cars.len();
        let s = cars.iter().map(|c| track.wrap(c.s)).collect();

        let mut state = Self {
            cell_size,
            lap_target,
            seed: 0,
            status: RaceStatus::Racing,
            elapsed: 0.0,
            time_ticks: 0,
            start_time_ms: 0.0,
            ids: cars.iter().map(|c| c.id).collect(),
            seats: cars.iter().map(|c| c.seat).collect(),
            colors: cars.iter().map(|c| c.color).collect(),
            ratings: cars.iter().map(|c| c.rating).collect(),
            s,
            v: vec![0.0; n],
            base_speed: cars.iter().map(|c| c.base_speed).collect(),
            target_speed: vec![0.0; n],
            streak: vec![0; n],
            streak_mark: vec![NO_STREAK_MARK; n],
            lane: vec![0.0; n],
            lane_target: vec![0; n],
            phase: vec![OvertakePhase::None; n],
            side: vec![0; n],
            locks: vec![LockStack::default(); n],
            overtake_time: vec![0.0; n],
            laps: vec![0; n],
            finished: vec![false; n],
            pos: vec![Vec2::ZERO; n],
            heading: vec![0.0; n],
            order: (0..n).collect(),
            rank: (0..n).collect(),
            track,
            tuning,
        };

        state.update_order();
        pose::refresh(&mut state);
        state
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.status == RaceStatus::Finished
    }

    /// Race-relative wall clock (ms)
    #[inline]
    pub fn now_ms(&self) -> f64 {
        self.start_time_ms + self.elapsed as f64 * 1000.0
    }

    /// Laps times loop length plus position
    #[inline]
    pub fn progress(&self, car: usize) -> f32 {
        self.laps[car] as f32 * self.track.length() + self.s[car]
    }

    /// Slot of the car with this id
    pub fn slot_of(&self, id: u32) -> Option<usize> {
        self.ids.iter().position(|&i| i == id)
    }

    /// Next car along the loop and the forward gap to it
    pub fn car_ahead(&self, car: usize) -> Option<(usize, f32)> {
        let n = self.len();
        if n < 2 {
            return None;
        }
        let ahead = self.order[(self.rank[car] + 1) % n];
        Some((ahead, self.track.forward_gap(self.s[car], self.s[ahead])))
    }

    /// Previous car along the loop and the forward gap from it
    pub fn car_behind(&self, car: usize) -> Option<(usize, f32)> {
        let n = self.len();
        if n < 2 {
            return None;
        }
        let behind = self.order[(self.rank[car] + n - 1) % n];
        Some((behind, self.track.forward_gap(self.s[behind], self.s[car])))
    }

    /// Re-sort `order` by position. Insertion sort: the order barely changes per tick.
    pub fn update_order(&mut self) {
        let (s, ids) = (&self.s, &self.ids);
        let key = |c: usize| (s[c], ids[c]);
        for i in 1..self.order.len() {
            let mut j = i;
            while j > 0 {
                let (a, b) = (key(self.order[j - 1]), key(self.order[j]));
                let before = a.0 > b.0 || (a.0 == b.0 && a.1 > b.1);
                if !before {
                    break;
                }
                self.order.swap(j - 1, j);
                j -= 1;
            }
        }
        for (k, &car) in self.order.iter().enumerate() {
            self.rank[car] = k;
        }
    }
}
