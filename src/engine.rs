//! Frame driver around the deterministic simulation
//!
//! The engine owns one race, reads wall time from an injected clock, and
//! hands the host rate-limited pose updates plus a one-shot finish callback.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use crate::config::RaceConfig;
use crate::error::RaceError;
use crate::results::{self, RaceResult, RaceSnapshot, Standing};
use crate::sim::pose::{self, CarPose};
use crate::sim::state::RaceState;
use crate::sim::tick::{TickOutcome, tick};

/// Wall-clock source in milliseconds
pub trait TimeSource {
    fn now_ms(&self) -> f64;
}

/// Monotonic process clock
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-driven clock for tests and headless runs. Clones share one time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }
}

impl TimeSource for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// Handle returned by [`RaceEngine::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type PoseListener = Box<dyn FnMut(&[CarPose])>;
type FinishListener = Box<dyn FnOnce(&[RaceResult])>;

/// One race driven by frames
pub struct RaceEngine<C: TimeSource = SystemClock> {
    state: RaceState,
    clock: C,
    running: bool,
    last_ms: f64,
    /// Seconds between pose publishes
    publish_interval: f32,
    publish_accumulator: f32,
    poses: Vec<CarPose>,
    listeners: Vec<(SubscriptionId, PoseListener)>,
    next_subscription: u64,
    on_finish: Option<FinishListener>,
    results: Vec<RaceResult>,
}

impl<C: TimeSource> RaceEngine<C> {
    pub fn new(config: &RaceConfig, clock: C) -> Result<Self, RaceError> {
        let state = RaceState::new(config)?;
        Ok(Self::from_state(state, config.publish_hz, clock))
    }

    /// Drive an already-built race
    pub fn from_state(state: RaceState, publish_hz: f32, clock: C) -> Self {
        let mut poses = Vec::with_capacity(state.len());
        pose::publish_into(&state, &mut poses);
        Self {
            state,
            clock,
            running: false,
            last_ms: 0.0,
            publish_interval: 1.0 / publish_hz.max(f32::EPSILON),
            publish_accumulator: 0.0,
            poses,
            listeners: Vec::new(),
            next_subscription: 0,
            on_finish: None,
            results: Vec::new(),
        }
    }

    /// Begin consuming wall time. No-op while running.
    pub fn start(&mut self) {
        if self.running || self.state.is_finished() {
            return;
        }
        self.last_ms = self.clock.now_ms();
        self.running = true;
        log::debug!("Race engine started at {:.1}ms", self.last_ms);
    }

    /// Stop consuming wall time. No-op while stopped.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        log::debug!("Race engine stopped after {} ticks", self.state.time_ticks);
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Advance by the wall time since the last frame
    pub fn frame(&mut self) -> TickOutcome {
        if !self.running {
            return TickOutcome::Idle;
        }
        let now = self.clock.now_ms();
        let dt = ((now - self.last_ms) / 1000.0) as f32;
        self.last_ms = now;
        self.step(dt)
    }

    /// Advance by an explicit dt, publishing poses at the configured rate
    pub fn step(&mut self, dt: f32) -> TickOutcome {
        let outcome = tick(&mut self.state, dt);
        match outcome {
            TickOutcome::Idle => {}
            TickOutcome::Running => {
                self.publish_accumulator += dt.min(self.state.tuning.max_dt);
                if self.publish_accumulator >= self.publish_interval {
                    self.publish_accumulator -= self.publish_interval;
                    // Too far behind: drop the backlog rather than burst
                    if self.publish_accumulator > self.publish_interval {
                        self.publish_accumulator = 0.0;
                    }
                    self.publish();
                }
            }
            TickOutcome::Finished => {
                self.publish_accumulator = 0.0;
                self.publish();
                self.finish();
            }
        }
        outcome
    }

    fn publish(&mut self) {
        pose::publish_into(&self.state, &mut self.poses);
        for (_, listener) in self.listeners.iter_mut() {
            listener(&self.poses);
        }
    }

    fn finish(&mut self) {
        self.running = false;
        self.results = results::results(&self.state);
        for r in &self.results {
            log::info!(
                "P{} car {} ({} laps, {:.2}){}",
                r.position,
                r.participant_id,
                r.laps,
                r.final_progress,
                if r.is_my_team { " [team]" } else { "" }
            );
        }
        if let Some(callback) = self.on_finish.take() {
            callback(&self.results);
        }
    }

    /// Receive every published pose batch until unsubscribed
    pub fn subscribe(&mut self, listener: impl FnMut(&[CarPose]) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if the id was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }

    /// Called once with the ranked results. Runs immediately if the race is
    /// already over; otherwise replaces any callback still pending.
    pub fn on_finish(&mut self, callback: impl FnOnce(&[RaceResult]) + 'static) {
        if self.state.is_finished() {
            if self.results.is_empty() {
                self.results = results::results(&self.state);
            }
            callback(&self.results);
        } else {
            self.on_finish = Some(Box::new(callback));
        }
    }

    /// Last published poses
    pub fn poses(&self) -> &[CarPose] {
        &self.poses
    }

    /// Last published poses as raw bytes, for direct GPU or FFI upload
    pub fn pose_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.poses)
    }

    pub fn standings(&self) -> Vec<Standing> {
        results::standings(&self.state)
    }

    /// Ranked results; empty until the race finishes
    pub fn results(&self) -> &[RaceResult] {
        &self.results
    }

    pub fn snapshot(&self) -> RaceSnapshot {
        RaceSnapshot::capture(&self.state)
    }

    pub fn state(&self) -> &RaceState {
        &self.state
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }
}
