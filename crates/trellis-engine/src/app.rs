//! Application - tick counter and timer state

use std::time::{Duration, Instant};

/// Application state advanced once per host-driven tick
#[derive(Debug)]
pub struct Application {
    started: Instant,
    ticks: u64,
    last_tick: Option<Instant>,
    last_delta: Duration,
    wakeups: u64,
}

impl Application {
    pub(crate) fn new() -> Self {
        Self {
            started: Instant::now(),
            ticks: 0,
            last_tick: None,
            last_delta: Duration::ZERO,
            wakeups: 0,
        }
    }

    /// Advance by one step. `now` earlier than the previous tick counts as
    /// a zero delta.
    pub(crate) fn advance(&mut self, now: Instant) {
        self.last_delta = self
            .last_tick
            .map_or(Duration::ZERO, |prev| now.saturating_duration_since(prev));
        self.last_tick = Some(now);
        self.ticks = self.ticks.wrapping_add(1);
    }

    pub(crate) fn record_wake_up(&mut self) {
        self.wakeups = self.wakeups.wrapping_add(1);
    }

    /// Number of completed ticks
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Time between the last two ticks
    pub fn last_delta(&self) -> Duration {
        self.last_delta
    }

    /// Time since the application was initialized
    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Number of wake-up requests received
    pub fn wakeups(&self) -> u64 {
        self.wakeups
    }
}
