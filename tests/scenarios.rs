//! End-to-end race scenarios through the public API

use loop_racer::config::{ContractTerm, RaceConfig, RaceSeed, Tuning};
use loop_racer::sim::kinematics::target_speed;
use loop_racer::sim::roster::{SeatKind, competitor_ratings};
use loop_racer::sim::{
    CarSetup, OvertakePhase, RaceState, TickOutcome, TrackGrid, TrackLoop, hash_seed, tick,
};
use loop_racer::{ManualClock, RaceEngine};

const DT: f32 = 1.0 / 60.0;

fn ring_40() -> TrackLoop {
    let track = TrackLoop::build(&TrackGrid::ring(12, 10)).unwrap();
    assert_eq!(track.length(), 40.0);
    track
}

#[test]
fn faster_car_overtakes_and_settles() {
    let cars = vec![CarSetup::new(1, 4.0, 1.0), CarSetup::new(2, 3.0, 1.3)];
    let mut state = RaceState::with_cars(ring_40(), Tuning::default(), 32.0, 5, cars);
    let (a, b) = (0, 1);
    let tuning = state.tuning.clone();

    // Close in until the pass is allowed; it must start on that very tick
    let mut started = None;
    for _ in 0..600 {
        let gap = state.track.forward_gap(state.s[a], state.s[b]);
        let eligible = gap < tuning.overtake_trigger_gap
            && state.v[a] - state.v[b] > tuning.overtake_min_advantage;
        tick(&mut state, DT);
        if eligible {
            assert_eq!(state.phase[a], OvertakePhase::Out);
            started = Some(state.elapsed);
            break;
        }
    }
    let started = started.expect("A never became eligible to pass");

    let mut settled = None;
    while state.elapsed - started <= tuning.overtake_max_duration {
        tick(&mut state, DT);
        if state.phase[a] == OvertakePhase::None {
            settled = Some(state.elapsed);
            break;
        }
    }
    assert!(settled.is_some(), "A still mid-pass after the max duration");

    for _ in 0..60 {
        tick(&mut state, DT);
    }
    assert!(state.progress(a) > state.progress(b));
}

#[test]
fn text_seed_ratings_repeat() {
    let seed = hash_seed("race_42");
    let first = competitor_ratings(seed, 8, 2.0, Tuning::default().rating_spread);
    let second = competitor_ratings(seed, 8, 2.0, Tuning::default().rating_spread);
    assert_eq!(first, second);

    let config = RaceConfig {
        seed: RaceSeed::Text("race_42".into()),
        field_size: 8,
        competitor_mean_rating: 2.0,
        ..Default::default()
    };
    let one = RaceState::new(&config).unwrap();
    let two = RaceState::new(&config).unwrap();
    assert_eq!(one.ratings, two.ratings);
    assert_eq!(one.ids, two.ids);
}

#[test]
fn expired_contract_halves_target_speed() {
    let build = |contract: ContractTerm, s: f32| {
        let mut car = CarSetup::new(1, 3.0, s);
        car.seat = SeatKind::MyTeam { contract };
        let mut state =
            RaceState::with_cars(ring_40(), Tuning::default(), 32.0, 3, vec![car]);
        state.start_time_ms = 1_000.0;
        state
    };

    // A straight and the top-right corner
    for s in [3.0, 11.5] {
        let mut fresh = build(ContractTerm::Open, s);
        let mut lapsed = build(ContractTerm::ExpiresAt { at_ms: 999.0 }, s);

        tick(&mut fresh, DT);
        tick(&mut lapsed, DT);
        assert_eq!(
            lapsed.target_speed[0],
            fresh.target_speed[0] * lapsed.tuning.expiry_penalty,
            "s={s}"
        );
    }

    // A contract that lapses exactly now is still valid
    let on_time = build(ContractTerm::ExpiresAt { at_ms: 1_000.0 }, 3.0);
    assert_eq!(
        target_speed(&on_time, 0),
        target_speed(&build(ContractTerm::Open, 3.0), 0)
    );
}

#[test]
fn full_race_is_reproducible() {
    let config = RaceConfig::from_json(
        r#"{
            "seed": "grand-prix",
            "lap_target": 2,
            "field_size": 6,
            "my_team": [
                { "rating": 3.5 },
                { "rating": 2.0, "contract": { "kind": "expires_at", "at_ms": 5000.0 } }
            ]
        }"#,
    )
    .unwrap();

    let run = || {
        let clock = ManualClock::new();
        let mut engine = RaceEngine::new(&config, clock.clone()).unwrap();
        engine.start();
        let mut outcome = TickOutcome::Running;
        for _ in 0..60 * 300 {
            clock.advance(1000.0 / 60.0);
            outcome = engine.frame();
            if outcome == TickOutcome::Finished {
                break;
            }
        }
        assert_eq!(outcome, TickOutcome::Finished);
        engine.snapshot()
    };

    let first = run();
    let second = run();
    assert_eq!(first, second);
    assert_eq!(first.results.len(), 6);
    assert_eq!(first.results.iter().filter(|r| r.is_my_team).count(), 2);
    assert!(first.results[0].laps >= 3);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}
