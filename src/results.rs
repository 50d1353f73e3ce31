//! Race standings and finish results
//!
//! Ranking is by cumulative progress (laps times loop length plus position),
//! highest first; equal progress is broken by ascending car id.

use serde::{Deserialize, Serialize};

use crate::sim::state::{RaceState, RaceStatus};

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub id: u32,
    pub laps: u32,
    /// Cumulative progress
    pub progress: f32,
    pub is_my_team: bool,
    /// RGBA
    pub color: u32,
}

/// Final placing of one car, as handed to the finish callback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub participant_id: u32,
    /// 1-based
    pub position: u32,
    pub laps: u32,
    pub final_progress: f32,
    pub is_my_team: bool,
}

/// Archivable summary of a race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub seed: u32,
    pub lap_target: u32,
    pub loop_length: u32,
    /// Simulated seconds
    pub elapsed: f32,
    pub ticks: u64,
    pub status: RaceStatus,
    pub standings: Vec<Standing>,
    /// Empty until the race has finished
    pub results: Vec<RaceResult>,
}

/// Car slots ranked best first
fn ranked_slots(state: &RaceState) -> Vec<usize> {
    let mut slots: Vec<usize> = (0..state.len()).collect();
    slots.sort_by(|&a, &b| {
        state
            .progress(b)
            .total_cmp(&state.progress(a))
            .then(state.ids[a].cmp(&state.ids[b]))
    });
    slots
}

/// Live leaderboard, best first
pub fn standings(state: &RaceState) -> Vec<Standing> {
    ranked_slots(state)
        .into_iter()
        .map(|car| Standing {
            id: state.ids[car],
            laps: state.laps[car],
            progress: state.progress(car),
            is_my_team: state.seats[car].is_my_team(),
            color: state.colors[car],
        })
        .collect()
}

/// Ranked results with 1-based positions
pub fn results(state: &RaceState) -> Vec<RaceResult> {
    ranked_slots(state)
        .into_iter()
        .enumerate()
        .map(|(i, car)| RaceResult {
            participant_id: state.ids[car],
            position: i as u32 + 1,
            laps: state.laps[car],
            final_progress: state.progress(car),
            is_my_team: state.seats[car].is_my_team(),
        })
        .collect()
}

impl RaceSnapshot {
    pub fn capture(state: &RaceState) -> Self {
        Self {
            seed: state.seed,
            lap_target: state.lap_target,
            loop_length: state.track.len() as u32,
            elapsed: state.elapsed,
            ticks: state.time_ticks,
            status: state.status,
            standings: standings(state),
            results: if state.is_finished() {
                results(state)
            } else {
                Vec::new()
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ContractTerm, Tuning};
    use crate::sim::roster::SeatKind;
    use crate::sim::state::CarSetup;
    use crate::sim::track::{TrackGrid, TrackLoop};

    fn race() -> RaceState {
        let track = TrackLoop::build(&TrackGrid::ring(12, 10)).unwrap();
        let mut team = CarSetup::new(3, 3.0, 10.0);
        team.seat = SeatKind::MyTeam {
            contract: ContractTerm::Open,
        };
        let cars = vec![
            CarSetup::new(1, 3.0, 5.0),
            CarSetup::new(2, 3.0, 10.0),
            team,
            CarSetup::new(4, 3.0, 30.0),
        ];
        RaceState::with_cars(track, Tuning::default(), 32.0, 3, cars)
    }

    #[test]
    fn test_ranked_by_progress_then_id() {
        let mut state = race();
        state.laps[0] = 1;
        let rows = standings(&state);
        let ids: Vec<u32> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 4, 2, 3]);
        assert_eq!(rows[0].progress, 45.0);
        assert!(rows[3].is_my_team);
    }

    #[test]
    fn test_results_positions() {
        let state = race();
        let res = results(&state);
        let positions: Vec<u32> = res.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 4]);
        assert_eq!(res[0].participant_id, 4);
        assert_eq!(res[1].participant_id, 2);
        assert_eq!(res[2].participant_id, 3);
    }

    #[test]
    fn test_snapshot_json() {
        let state = race();
        let snapshot = RaceSnapshot::capture(&state);
        assert!(snapshot.results.is_empty(), "no results before the finish");
        let json = snapshot.to_json().unwrap();
        let back: RaceSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
        assert!(json.contains("\"standings\""));
    }
}
