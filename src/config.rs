//! Race configuration and tuning
//!
//! Everything a host hands over at construction time. All of it is immutable
//! for the lifetime of a race. Loaded from JSON with every field defaulted.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{ConfigError, TrackError};
use crate::sim::rng::hash_seed;
use crate::sim::track::{TrackGrid, TrackLoop};

/// Race seed, either a number or text hashed to a number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RaceSeed {
    Number(u32),
    Text(String),
}

impl RaceSeed {
    pub fn to_u32(&self) -> u32 {
        match self {
            RaceSeed::Number(n) => *n,
            RaceSeed::Text(text) => hash_seed(text),
        }
    }
}

impl Default for RaceSeed {
    fn default() -> Self {
        RaceSeed::Number(1)
    }
}

impl From<u32> for RaceSeed {
    fn from(n: u32) -> Self {
        RaceSeed::Number(n)
    }
}

impl From<&str> for RaceSeed {
    fn from(text: &str) -> Self {
        RaceSeed::Text(text.to_string())
    }
}

/// Where the circuit comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackSource {
    /// ASCII rows: `#` track, `i` infield, `.` open
    Grid { rows: Vec<String> },
    /// Already-ordered loop of cell indices
    Loop { cells: Vec<usize>, grid_width: usize },
}

impl TrackSource {
    pub fn build(&self) -> Result<TrackLoop, TrackError> {
        match self {
            TrackSource::Grid { rows } => TrackLoop::build(&TrackGrid::from_rows(rows)?),
            TrackSource::Loop { cells, grid_width } => {
                TrackLoop::from_cells(cells.clone(), *grid_width)
            }
        }
    }
}

impl Default for TrackSource {
    fn default() -> Self {
        let grid = TrackGrid::ring(12, 10);
        let rows = grid
            .cells
            .chunks(grid.width)
            .map(|row| {
                row.iter()
                    .map(|c| match c {
                        crate::sim::track::CellKind::Track => '#',
                        crate::sim::track::CellKind::Infield => 'i',
                        crate::sim::track::CellKind::Open => '.',
                    })
                    .collect()
            })
            .collect();
        TrackSource::Grid { rows }
    }
}

/// Contract state of a team driver
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContractTerm {
    #[default]
    Open,
    /// Lapses at this timestamp (ms, same clock as `start_time_ms`)
    ExpiresAt { at_ms: f64 },
}

impl ContractTerm {
    /// Strictly before `now_ms`
    pub fn expired_at(&self, now_ms: f64) -> bool {
        match self {
            ContractTerm::Open => false,
            ContractTerm::ExpiresAt { at_ms } => *at_ms < now_ms,
        }
    }
}

/// One of the player's own seats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatConfig {
    /// Effective rating (driver and car averaged)
    pub rating: f32,
    #[serde(default)]
    pub contract: ContractTerm,
    /// RGBA color tag, palette pick when absent
    #[serde(default)]
    pub color: Option<u32>,
}

/// Numeric constants of the simulation
///
/// Distances are in cells (one loop segment = 1.0), speeds in cells per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Integration ===
    /// Longest dt integrated in one step (seconds)
    pub max_dt: f32,
    /// Exponential easing rate of velocity toward target (1/s)
    pub speed_ease_rate: f32,

    // === Base speed ===
    pub base_speed_floor: f32,
    pub speed_per_rating: f32,
    /// Per-car variation, +/- this fraction
    pub variation: f32,
    pub min_speed_factor: f32,
    pub max_speed_factor: f32,

    // === Track shape ===
    pub corner_factor: f32,
    pub pre_brake_factor: f32,
    /// Fraction through the segment before a corner where braking starts
    pub brake_point: f32,
    pub streak_max: u8,
    /// Fraction through a straight where the streak is credited
    pub streak_zone: f32,
    /// Bonus at full streak
    pub accel_bonus_max: f32,

    // === Traffic ===
    pub slipstream_gap: f32,
    pub slipstream_bonus: f32,
    pub overtake_boost: f32,
    pub overtake_trigger_gap: f32,
    pub overtake_min_advantage: f32,
    /// Gap ahead required before returning to the racing line
    pub overtake_clear_margin: f32,
    /// Lane fraction of the side offset that counts as "out"
    pub overtake_hold_fraction: f32,
    /// Lane magnitude that counts as back on the line
    pub overtake_settle_lane: f32,
    /// Longest a whole maneuver may last, chains and return included (s).
    /// A car still out when only `overtake_back_grace` remains is sent back.
    pub overtake_max_duration: f32,
    pub overtake_back_grace: f32,

    // === Lanes ===
    pub lane_ease_out: f32,
    pub lane_ease_back: f32,
    pub lane_conflict_gap: f32,
    /// Lateral displacement of lane 1.0, in cells
    pub lane_width: f32,

    // === Car body / collisions ===
    pub car_length: f32,
    pub car_width: f32,
    pub collision_window: usize,
    /// Push-apart passes per tick. With up to `collision_window + 1` cars in a
    /// knot, the default leaves under 1% of the car width of overlap.
    pub collision_iterations: u32,
    /// Largest push per pair per iteration, in cells
    pub collision_max_push: f32,

    // === Misc ===
    pub expiry_penalty: f32,
    /// Spacing between grid slots, in cells
    pub grid_spacing: f32,
    /// Standard deviation of generated competitor ratings
    pub rating_spread: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            max_dt: MAX_FRAME_DT,
            speed_ease_rate: 3.0,

            base_speed_floor: 2.0,
            speed_per_rating: 0.4,
            variation: 0.10,
            min_speed_factor: 0.4,
            max_speed_factor: 1.5,

            corner_factor: 0.7,
            pre_brake_factor: 0.85,
            brake_point: 0.5,
            streak_max: 5,
            streak_zone: 0.85,
            accel_bonus_max: 0.15,

            slipstream_gap: 1.5,
            slipstream_bonus: 0.05,
            overtake_boost: 0.08,
            overtake_trigger_gap: 1.0,
            overtake_min_advantage: 0.05,
            overtake_clear_margin: 0.5,
            overtake_hold_fraction: 0.9,
            overtake_settle_lane: 0.05,
            overtake_max_duration: 5.0,
            overtake_back_grace: 1.5,

            lane_ease_out: 6.0,
            lane_ease_back: 3.0,
            lane_conflict_gap: 0.8,
            lane_width: 0.3,

            car_length: 0.6,
            car_width: 0.3,
            collision_window: 3,
            collision_iterations: 16,
            collision_max_push: 0.6,

            expiry_penalty: 0.5,
            grid_spacing: 0.9,
            rating_spread: 0.5,
        }
    }
}

impl Tuning {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("max_dt", self.max_dt),
            ("speed_ease_rate", self.speed_ease_rate),
            ("base_speed_floor", self.base_speed_floor),
            ("lane_ease_out", self.lane_ease_out),
            ("lane_ease_back", self.lane_ease_back),
            ("car_length", self.car_length),
            ("car_width", self.car_width),
            ("collision_max_push", self.collision_max_push),
            ("overtake_max_duration", self.overtake_max_duration),
            ("grid_spacing", self.grid_spacing),
        ];
        for (field, value) in positive {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigError::NotPositive { field, value });
            }
        }

        let ranged = [
            ("variation", self.variation, 0.0, 0.5),
            ("min_speed_factor", self.min_speed_factor, 0.0, self.max_speed_factor),
            ("corner_factor", self.corner_factor, 0.0, 1.0),
            ("pre_brake_factor", self.pre_brake_factor, 0.0, 1.0),
            ("brake_point", self.brake_point, 0.0, 1.0),
            ("streak_zone", self.streak_zone, 0.0, 1.0),
            ("overtake_hold_fraction", self.overtake_hold_fraction, 0.0, 1.0),
            ("overtake_settle_lane", self.overtake_settle_lane, 0.0, 1.0),
            (
                "overtake_back_grace",
                self.overtake_back_grace,
                0.0,
                self.overtake_max_duration,
            ),
            ("expiry_penalty", self.expiry_penalty, 0.0, 1.0),
        ];
        for (field, value, min, max) in ranged {
            if !(min..=max).contains(&value) {
                return Err(ConfigError::RangeViolation {
                    field,
                    min,
                    max,
                    value,
                });
            }
        }

        Ok(())
    }
}

/// Everything needed to build one race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    pub track: TrackSource,
    /// Pixel size of one grid cell
    pub cell_size: f32,
    pub lap_target: u32,
    pub seed: RaceSeed,
    /// Total cars, team seats first, generated competitors fill the rest
    pub field_size: usize,
    pub my_team: Vec<SeatConfig>,
    pub competitor_mean_rating: f32,
    /// Race clock at the start line (ms), compared against contract expiry
    pub start_time_ms: f64,
    pub publish_hz: f32,
    pub tuning: Tuning,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            track: TrackSource::default(),
            cell_size: DEFAULT_CELL_SIZE,
            lap_target: DEFAULT_LAP_TARGET,
            seed: RaceSeed::default(),
            field_size: DEFAULT_FIELD_SIZE,
            my_team: Vec::new(),
            competitor_mean_rating: 2.0,
            start_time_ms: 0.0,
            publish_hz: DEFAULT_PUBLISH_HZ,
            tuning: Tuning::default(),
        }
    }
}

impl RaceConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.field_size > MAX_FIELD {
            return Err(ConfigError::FieldTooLarge {
                size: self.field_size,
                cap: MAX_FIELD,
            });
        }
        if self.my_team.len() > self.field_size {
            return Err(ConfigError::TooManySeats {
                seats: self.my_team.len(),
                field: self.field_size,
            });
        }
        if self.lap_target == 0 {
            return Err(ConfigError::ZeroLaps);
        }
        for (field, value) in [("cell_size", self.cell_size), ("publish_hz", self.publish_hz)] {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        if !(0.5..=5.0).contains(&self.competitor_mean_rating) {
            return Err(ConfigError::RangeViolation {
                field: "competitor_mean_rating",
                min: 0.5,
                max: 5.0,
                value: self.competitor_mean_rating,
            });
        }
        self.tuning.validate()
    }
}
