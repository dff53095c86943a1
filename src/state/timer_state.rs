//! Countdown state machine and pause accounting
//!
//! Everything in here is pure: transitions take the current wall-clock time as
//! an argument and never touch storage or audio. The shell in
//! [`super::app_state`] applies the side effects.

/// Default focus session length (25 minutes)
pub const DEFAULT_DURATION_SECONDS: u64 = 25 * 60;

/// Step used by the add/subtract five minutes commands
pub const ADJUST_STEP_SECONDS: i64 = 5 * 60;

/// Allowed window for the configured duration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationBounds {
    pub min_seconds: u64,
    pub max_seconds: u64,
}

impl DurationBounds {
    pub fn from_minutes(min_minutes: u64, max_minutes: u64) -> Self {
        let min_seconds = min_minutes * 60;
        let max_seconds = (max_minutes * 60).max(min_seconds);
        Self {
            min_seconds,
            max_seconds,
        }
    }

    pub fn clamp(&self, seconds: u64) -> u64 {
        seconds.clamp(self.min_seconds, self.max_seconds)
    }
}

impl Default for DurationBounds {
    fn default() -> Self {
        Self::from_minutes(5, 120)
    }
}

/// Milliseconds spent running since `started_at_ms`, excluding folded pauses.
/// Saturates instead of overflowing on nonsense timestamps.
pub fn running_elapsed_ms(started_at_ms: i64, paused_total_ms: i64, now_ms: i64) -> i64 {
    now_ms
        .saturating_sub(started_at_ms)
        .saturating_sub(paused_total_ms)
        .max(0)
}

/// Fold a finished pause into the cumulative paused total.
/// Only called when resuming.
pub fn fold_pause(paused_total_ms: i64, paused_at_ms: i64, now_ms: i64) -> i64 {
    paused_total_ms.saturating_add(now_ms.saturating_sub(paused_at_ms).max(0))
}

/// Phase of the countdown. Paused-while-not-running cannot be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Running {
        started_at_ms: i64,
        paused_total_ms: i64,
        /// Remaining seconds at the anchor of this run
        budget_seconds: u64,
    },
    Paused {
        started_at_ms: i64,
        paused_total_ms: i64,
        paused_at_ms: i64,
        budget_seconds: u64,
    },
}

/// Result of a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running, or no whole second elapsed since the last tick
    Unchanged,
    Ticked,
    /// Countdown reached zero; reported once per run
    Completed,
}

/// Countdown timer state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    pub remaining_seconds: u64,
    pub duration_seconds: u64,
    pub phase: TimerPhase,
}

impl TimerState {
    /// Create an idle timer with the given duration
    pub fn new(duration_seconds: u64) -> Self {
        Self {
            remaining_seconds: duration_seconds,
            duration_seconds,
            phase: TimerPhase::Idle,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, TimerPhase::Idle)
    }

    /// Running in the broad sense: counting down or paused mid-run
    pub fn is_running(&self) -> bool {
        !self.is_idle()
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.phase, TimerPhase::Paused { .. })
    }

    /// Actively counting down
    pub fn is_ticking(&self) -> bool {
        matches!(self.phase, TimerPhase::Running { .. })
    }

    pub fn started_at_ms(&self) -> Option<i64> {
        match self.phase {
            TimerPhase::Idle => None,
            TimerPhase::Running { started_at_ms, .. } | TimerPhase::Paused { started_at_ms, .. } => {
                Some(started_at_ms)
            }
        }
    }

    pub fn paused_at_ms(&self) -> Option<i64> {
        match self.phase {
            TimerPhase::Paused { paused_at_ms, .. } => Some(paused_at_ms),
            _ => None,
        }
    }

    pub fn paused_total_ms(&self) -> i64 {
        match self.phase {
            TimerPhase::Idle => 0,
            TimerPhase::Running { paused_total_ms, .. } | TimerPhase::Paused { paused_total_ms, .. } => {
                paused_total_ms
            }
        }
    }

    /// Remaining seconds computed from the wall clock. Frozen while paused.
    pub fn remaining_at(&self, now_ms: i64) -> u64 {
        match self.phase {
            TimerPhase::Idle | TimerPhase::Paused { .. } => self.remaining_seconds,
            TimerPhase::Running {
                started_at_ms,
                paused_total_ms,
                budget_seconds,
            } => {
                let elapsed = running_elapsed_ms(started_at_ms, paused_total_ms, now_ms) / 1000;
                budget_seconds.saturating_sub(elapsed as u64)
            }
        }
    }

    /// Idle -> Running
    pub fn start(&mut self, now_ms: i64) -> bool {
        if !self.is_idle() {
            return false;
        }
        if self.remaining_seconds == 0 {
            self.remaining_seconds = self.duration_seconds;
        }
        self.phase = TimerPhase::Running {
            started_at_ms: now_ms,
            paused_total_ms: 0,
            budget_seconds: self.remaining_seconds,
        };
        true
    }

    /// Running -> Paused
    pub fn pause(&mut self, now_ms: i64) -> bool {
        let TimerPhase::Running {
            started_at_ms,
            paused_total_ms,
            budget_seconds,
        } = self.phase
        else {
            return false;
        };

        self.remaining_seconds = self.remaining_at(now_ms);
        self.phase = TimerPhase::Paused {
            started_at_ms,
            paused_total_ms,
            paused_at_ms: now_ms,
            budget_seconds,
        };
        true
    }

    /// Paused -> Running
    pub fn resume(&mut self, now_ms: i64) -> bool {
        let TimerPhase::Paused {
            started_at_ms,
            paused_total_ms,
            paused_at_ms,
            budget_seconds,
        } = self.phase
        else {
            return false;
        };

        self.phase = TimerPhase::Running {
            started_at_ms,
            paused_total_ms: fold_pause(paused_total_ms, paused_at_ms, now_ms),
            budget_seconds,
        };
        true
    }

    /// Any state -> Idle with the configured duration restored
    pub fn reset(&mut self) {
        self.phase = TimerPhase::Idle;
        self.remaining_seconds = self.duration_seconds;
    }

    /// Shift the duration while idle, clamped to `bounds`
    pub fn adjust(&mut self, delta_seconds: i64, bounds: DurationBounds) -> bool {
        if !self.is_idle() {
            return false;
        }
        let shifted = (self.remaining_seconds as i64 + delta_seconds).max(0) as u64;
        let clamped = bounds.clamp(shifted);
        let changed = clamped != self.remaining_seconds || clamped != self.duration_seconds;
        self.remaining_seconds = clamped;
        self.duration_seconds = clamped;
        changed
    }

    /// Recompute remaining time from the wall clock
    pub fn tick(&mut self, now_ms: i64) -> TickOutcome {
        if !self.is_ticking() {
            return TickOutcome::Unchanged;
        }

        let remaining = self.remaining_at(now_ms);
        if remaining == 0 {
            self.phase = TimerPhase::Idle;
            self.remaining_seconds = self.duration_seconds;
            return TickOutcome::Completed;
        }

        if remaining == self.remaining_seconds {
            return TickOutcome::Unchanged;
        }
        self.remaining_seconds = remaining;
        TickOutcome::Ticked
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION_SECONDS)
    }
}

/// Format seconds as `MM:SS`, or `H:MM:SS` past an hour
pub fn format_clock(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}
