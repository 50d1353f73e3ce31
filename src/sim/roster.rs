//! Field generation: who races, how fast, and from where
//!
//! Every draw comes from a named RNG stream of the race seed, so the same
//! config always produces the same field, grid and per-car variation.

use serde::{Deserialize, Serialize};

use super::rng::{RaceRng, Stream};
use crate::config::{ContractTerm, RaceConfig, Tuning};

/// Rating bounds for generated competitors
pub const MIN_RATING: f32 = 0.5;
pub const MAX_RATING: f32 = 5.0;

/// Default RGBA color tags, by car id
pub const PALETTE: [u32; 16] = [
    0xE6194BFF, 0x3CB44BFF, 0xFFE119FF, 0x4363D8FF, 0xF58231FF, 0x911EB4FF, 0x46F0F0FF,
    0xF032E6FF, 0xBCF60CFF, 0xFABEBEFF, 0x008080FF, 0xE6BEFFFF, 0x9A6324FF, 0xFFFAC8FF,
    0x800000FF, 0xAAFFC3FF,
];

/// Who occupies a seat
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeatKind {
    /// One of the player's cars
    MyTeam { contract: ContractTerm },
    /// Generated opponent
    Competitor,
}

impl SeatKind {
    pub fn is_my_team(&self) -> bool {
        matches!(self, SeatKind::MyTeam { .. })
    }

    /// Only team drivers hold contracts that can lapse
    pub fn contract_expired(&self, now_ms: f64) -> bool {
        match self {
            SeatKind::MyTeam { contract } => contract.expired_at(now_ms),
            SeatKind::Competitor => false,
        }
    }
}

/// One car entered in the race, before it is placed on the grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entrant {
    pub id: u32,
    pub rating: f32,
    pub seat: SeatKind,
    pub color: u32,
}

/// Normally distributed opponent ratings around `mean`,
/// clamped to [0.5, min(2 * mean, 5.0)]
pub fn competitor_ratings(seed: u32, count: usize, mean: f32, spread: f32) -> Vec<f32> {
    let mut rng = RaceRng::stream(seed, Stream::Ratings);
    let hi = (2.0 * mean).min(MAX_RATING).max(MIN_RATING) as f64;
    (0..count)
        .map(|_| {
            let rating = mean as f64 + rng.normal() * spread as f64;
            rating.clamp(MIN_RATING as f64, hi) as f32
        })
        .collect()
}

/// Team seats take ids 1..=m, generated competitors the rest
pub fn entrants(config: &RaceConfig, seed: u32) -> Vec<Entrant> {
    let team = config.my_team.len();
    let competitors = config.field_size.saturating_sub(team);
    let ratings = competitor_ratings(
        seed,
        competitors,
        config.competitor_mean_rating,
        config.tuning.rating_spread,
    );

    let team_iter = config.my_team.iter().map(|seat| {
        (
            seat.rating.clamp(MIN_RATING, MAX_RATING),
            SeatKind::MyTeam {
                contract: seat.contract,
            },
            seat.color,
        )
    });
    let rival_iter = ratings
        .into_iter()
        .map(|rating| (rating, SeatKind::Competitor, None));

    team_iter
        .chain(rival_iter)
        .enumerate()
        .map(|(i, (rating, seat, color))| Entrant {
            id: i as u32 + 1,
            rating,
            seat,
            color: color.unwrap_or(PALETTE[i % PALETTE.len()]),
        })
        .collect()
}

/// Shuffled starting order: `order[slot]` is the entrant index on that slot
pub fn grid_order(seed: u32, count: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..count).collect();
    RaceRng::stream(seed, Stream::Grid).shuffle(&mut order);
    order
}

/// Fixed per-car speed multipliers in [1 - v, 1 + v), one per entrant
pub fn variations(seed: u32, count: usize, variation: f32) -> Vec<f32> {
    let mut rng = RaceRng::stream(seed, Stream::Variation);
    let v = variation as f64;
    (0..count).map(|_| rng.range(1.0 - v, 1.0 + v) as f32).collect()
}

/// Cruising speed for a rating, before corner and traffic effects
#[inline]
pub fn base_speed(rating: f32, variation: f32, tuning: &Tuning) -> f32 {
    (tuning.base_speed_floor + rating * tuning.speed_per_rating) * variation
}

/// Arc-length position of a grid slot, pole just behind the line
pub fn grid_position(slot: usize, count: usize, loop_length: f32, tuning: &Tuning) -> f32 {
    let spacing = tuning.grid_spacing.min(loop_length / count.max(1) as f32);
    let s = loop_length - (slot as f32 + 0.5) * spacing;
    s.rem_euclid(loop_length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeatConfig;
    use crate::sim::rng::hash_seed;

    #[test]
    fn test_ratings_repeat_for_text_seed() {
        let seed = hash_seed("race_42");
        let a = competitor_ratings(seed, 8, 2.0, 0.5);
        let b = competitor_ratings(seed, 8, 2.0, 0.5);
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
        assert!(a.iter().all(|r| (0.5..=4.0).contains(r)), "{a:?}");
    }

    #[test]
    fn test_ratings_clamp_to_double_mean() {
        let ratings = competitor_ratings(11, 200, 1.0, 3.0);
        assert!(ratings.iter().all(|r| (0.5..=2.0).contains(r)));
        assert!(ratings.contains(&2.0));
        assert!(ratings.contains(&0.5));
    }

    #[test]
    fn test_entrants_team_first() {
        let config = RaceConfig {
            field_size: 5,
            my_team: vec![SeatConfig {
                rating: 3.0,
                contract: ContractTerm::ExpiresAt { at_ms: 10.0 },
                color: Some(0x112233FF),
            }],
            ..Default::default()
        };
        let field = entrants(&config, 9);
        assert_eq!(field.len(), 5);
        assert_eq!(field[0].id, 1);
        assert!(field[0].seat.is_my_team());
        assert_eq!(field[0].color, 0x112233FF);
        assert!(field[1..].iter().all(|e| e.seat == SeatKind::Competitor));
        assert_eq!(field[4].id, 5);
        assert!(field[0].seat.contract_expired(11.0));
        assert!(!field[1].seat.contract_expired(11.0));
    }

    #[test]
    fn test_grid_order_is_permutation() {
        let mut order = grid_order(123, 10);
        assert_eq!(order, grid_order(123, 10));
        order.sort_unstable();
        assert_eq!(order, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_variation_bounds() {
        let v = variations(5, 100, 0.1);
        assert!(v.iter().all(|x| (0.9..=1.1).contains(x)));
    }

    #[test]
    fn test_grid_slots_behind_line() {
        let tuning = Tuning::default();
        let pole = grid_position(0, 10, 40.0, &tuning);
        let second = grid_position(1, 10, 40.0, &tuning);
        assert!((pole - 39.55).abs() < 1e-4);
        assert!((pole - second - tuning.grid_spacing).abs() < 1e-4);

        // Crowded short loop compresses spacing instead of wrapping onto the pole
        let last = grid_position(15, 16, 8.0, &tuning);
        assert!(last > 0.0 && last < pole);
    }
}
