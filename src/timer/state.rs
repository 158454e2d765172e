use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::Instant;

use super::countdown::{Countdown, CountdownStep};

pub const INITIAL_DELAY_MS: f64 = 1000.0;
pub const GROWTH_FACTOR: f64 = 1.05;
pub const DEFAULT_COUNTDOWN_SECS: u32 = 10;

/// Fixed pacing of a session. Only the countdown length is user-facing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub initial_delay_ms: f64,
    pub growth_factor: f64,
    pub countdown_secs: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: INITIAL_DELAY_MS,
            growth_factor: GROWTH_FACTOR,
            countdown_secs: DEFAULT_COUNTDOWN_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    CountingDown,
    Active,
    Stopped,
}

/// The one mutable record of a meditation run. Only the session task writes
/// it; everything else reads copies.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub status: SessionStatus,
    pub session_id: Option<String>,
    pub delay_ms: f64,
    pub growth_factor: f64,
    pub countdown: Option<Countdown>,
    pub ticks: u64,
    pub elapsed_ms: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub running_anchor: Option<Instant>,
}

impl SessionRecord {
    pub fn new(growth_factor: f64) -> Self {
        Self {
            status: SessionStatus::Idle,
            session_id: None,
            delay_ms: 0.0,
            growth_factor,
            countdown: None,
            ticks: 0,
            elapsed_ms: 0.0,
            started_at: None,
            running_anchor: None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(
            self.status,
            SessionStatus::CountingDown | SessionStatus::Active
        )
    }

    /// Idle/Stopped -> CountingDown.
    pub fn begin_countdown(&mut self, start_secs: u32) -> bool {
        if self.is_running() {
            return false;
        }
        self.status = SessionStatus::CountingDown;
        self.countdown = Some(Countdown::new(start_secs));
        true
    }

    /// One countdown second elapsed. `None` when not counting down.
    pub fn countdown_tick(&mut self) -> Option<CountdownStep> {
        if self.status != SessionStatus::CountingDown {
            return None;
        }
        self.countdown.as_mut().map(Countdown::tick)
    }

    /// Any non-active state -> Active. Returns the delay to arm the first
    /// cue with, or `None` if a session is already active.
    pub fn activate(
        &mut self,
        initial_delay_ms: f64,
        session_id: String,
        start_at: DateTime<Utc>,
        now: Instant,
    ) -> Option<Duration> {
        if self.status == SessionStatus::Active {
            return None;
        }
        *self = Self {
            status: SessionStatus::Active,
            session_id: Some(session_id),
            delay_ms: initial_delay_ms,
            growth_factor: self.growth_factor,
            countdown: None,
            ticks: 0,
            elapsed_ms: 0.0,
            started_at: Some(start_at),
            running_anchor: Some(now),
        };
        Some(self.current_delay())
    }

    /// A cue fired. Grows the gap and refreshes elapsed time; returns the
    /// delay to arm the next cue with. `None` once the session is no longer
    /// active, which ends the loop.
    pub fn on_tick(&mut self, now: Instant) -> Option<Duration> {
        if self.status != SessionStatus::Active {
            return None;
        }
        self.delay_ms *= self.growth_factor;
        self.ticks += 1;
        if let Some(anchor) = self.running_anchor {
            self.elapsed_ms = now.saturating_duration_since(anchor).as_secs_f64() * 1000.0;
        }
        Some(self.current_delay())
    }

    /// Counting down or active -> Stopped. Elapsed time keeps the value of
    /// the last tick. Returns whether anything changed.
    pub fn deactivate(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.status = SessionStatus::Stopped;
        self.countdown = None;
        self.running_anchor = None;
        true
    }

    pub fn current_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay_ms / 1000.0).unwrap_or(Duration::MAX)
    }
}
