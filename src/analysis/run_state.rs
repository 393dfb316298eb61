//! Run-State Machine - IDLE / RUN / PAUSE / SLEEP / LOCKED
//!
//! Driven by logical interaction signals once per tick. The inactivity
//! timer runs on the monotonic wall clock, not on sample elapsed time;
//! `update_at` takes the instant explicitly so tests can simulate time.

use std::time::{Duration, Instant};
use tracing::info;

use crate::types::{InteractionSignals, RunState};

#[derive(Debug, Clone)]
pub struct RunStateMachine {
    state: RunState,
    last_interaction: Instant,
    sleep_timeout: Duration,
}

impl RunStateMachine {
    pub fn new(sleep_timeout: Duration) -> Self {
        Self::starting_at(sleep_timeout, Instant::now())
    }

    /// Machine in IDLE whose inactivity timer starts at `now`.
    pub fn starting_at(sleep_timeout: Duration, now: Instant) -> Self {
        Self {
            state: RunState::Idle,
            last_interaction: now,
            sleep_timeout,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state == RunState::Locked
    }

    pub fn update(&mut self, signals: &InteractionSignals) -> RunState {
        self.update_at(signals, Instant::now())
    }

    /// Apply one tick of signals observed at `now`.
    pub fn update_at(&mut self, signals: &InteractionSignals, now: Instant) -> RunState {
        let previous = self.state;
        self.state = self.next_state(signals, now);
        if self.state != previous {
            info!(from = %previous, to = %self.state, "Oven state changed");
        }
        self.state
    }

    fn next_state(&mut self, signals: &InteractionSignals, now: Instant) -> RunState {
        if self.state == RunState::Locked {
            if signals.unlock_combo {
                self.last_interaction = now;
                return RunState::Idle;
            }
            return RunState::Locked;
        }

        if signals.lock_combo {
            return RunState::Locked;
        }

        let mut state = self.state;
        if signals.any_interaction() {
            self.last_interaction = now;
            if state == RunState::Sleep {
                state = RunState::Idle;
            }
        }

        if now.saturating_duration_since(self.last_interaction) > self.sleep_timeout {
            return RunState::Sleep;
        }

        match state {
            RunState::Idle if signals.start_pressed && !signals.door_open => RunState::Run,
            RunState::Run if signals.door_open => RunState::Pause,
            RunState::Run if signals.cancel_pressed => RunState::Idle,
            RunState::Pause if !signals.door_open && signals.start_pressed => RunState::Run,
            RunState::Pause if signals.cancel_pressed => RunState::Idle,
            RunState::Sleep if signals.any_interaction() => RunState::Idle,
            other => other,
        }
    }
}

impl Default for RunStateMachine {
    fn default() -> Self {
        Self::new(Duration::from_secs(crate::config::defaults::SLEEP_TIMEOUT_SECS))
    }
}
