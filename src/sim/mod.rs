//! Deterministic simulation module
//!
//! All race logic lives here. This module must be pure and deterministic:
//! - Caller-supplied dt only, no clocks
//! - Seeded RNG only
//! - Stable iteration order (by slot, pairs by id)
//! - No rendering or platform dependencies

pub mod arc;
pub mod collision;
pub mod kinematics;
pub mod lane;
pub mod overtake;
pub mod pose;
pub mod rng;
pub mod roster;
pub mod state;
pub mod tick;
pub mod track;

pub use arc::CornerArc;
pub use collision::{BodyParams, CarBox, CollisionResult, obb_overlap, separate, separate_cars};
pub use pose::{CarPose, centerline, project};
pub use rng::{RaceRng, Stream, hash_seed};
pub use roster::{Entrant, SeatKind};
pub use state::{CarSetup, LockStack, OvertakePhase, RaceState, RaceStatus};
pub use tick::{TickOutcome, tick};
pub use track::{CellKind, Direction, Segment, TrackGrid, TrackLoop};
