//! Timer state codec
//!
//! Maps [`TimerState`] to the durable JSON record and back. Loading corrects a
//! running timer for the wall-clock time that passed while nothing was
//! ticking. Every storage fault is logged and absorbed here.

use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::store::KeyValueStore;
use crate::{
    clock::Clock,
    state::timer_state::{running_elapsed_ms, DurationBounds, TimerPhase, TimerState},
};

pub const STATE_KEY: &str = "focus_timer_state";
pub const TIMER_CANCELLED_KEY: &str = "timer_cancelled";
pub const AUDIO_CANCELLED_KEY: &str = "audio_cancelled";

/// Minimum spacing between throttled writes of a running timer
pub const SAVE_THROTTLE_MS: i64 = 500;

/// How far ahead of the local clock a stored timestamp may be
pub const MAX_CLOCK_SKEW_MS: i64 = 24 * 60 * 60 * 1000;

const NEVER_WRITTEN: i64 = i64::MIN;

/// On-disk shape of the timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedTimer {
    pub time_remaining: u64,
    pub is_running: bool,
    pub is_paused: bool,
    pub started_at: Option<i64>,
    pub paused_at: Option<i64>,
    #[serde(default)]
    pub total_paused_time: i64,
    pub last_saved_time: Option<i64>,
    pub last_saved_time_remaining: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
}

impl PersistedTimer {
    /// Snapshot `state` as of `now_ms`
    pub fn capture(state: &TimerState, now_ms: i64) -> Self {
        let remaining = state.remaining_at(now_ms);
        Self {
            time_remaining: remaining,
            is_running: state.is_running(),
            is_paused: state.is_paused(),
            started_at: state.started_at_ms(),
            paused_at: state.paused_at_ms(),
            total_paused_time: state.paused_total_ms(),
            last_saved_time: Some(now_ms),
            last_saved_time_remaining: remaining,
            duration_seconds: Some(state.duration_seconds),
        }
    }

    /// Rebuild a timer as of `now_ms`.
    ///
    /// A running record is corrected from its save snapshot:
    /// `lastSavedTimeRemaining - whole seconds since lastSavedTime`. The run is
    /// then re-anchored so live ticking continues from that value. Returns
    /// `None` for records that cannot be interpreted, including second counts
    /// above `max_seconds` and timestamps before the epoch or far in the future.
    pub fn restore(
        &self,
        now_ms: i64,
        default_duration_seconds: u64,
        max_seconds: u64,
    ) -> Option<TimerState> {
        if !self.is_plausible(now_ms, max_seconds) {
            return None;
        }

        let duration = self
            .duration_seconds
            .filter(|d| *d > 0)
            .unwrap_or(default_duration_seconds);
        let mut state = TimerState::new(duration);

        if !self.is_running {
            if self.time_remaining > 0 {
                state.remaining_seconds = self.time_remaining;
            }
            return Some(state);
        }

        if self.is_paused {
            if self.time_remaining == 0 {
                return Some(state);
            }
            let paused_at_ms = self.paused_at.or(self.last_saved_time).unwrap_or(now_ms);
            let started_at_ms = self.started_at.unwrap_or(paused_at_ms);
            let paused_total_ms = self.total_paused_time.max(0);
            let elapsed = running_elapsed_ms(started_at_ms, paused_total_ms, paused_at_ms) / 1000;

            state.remaining_seconds = self.time_remaining;
            state.phase = TimerPhase::Paused {
                started_at_ms,
                paused_total_ms,
                paused_at_ms,
                budget_seconds: self.time_remaining.checked_add(elapsed as u64)?,
            };
            return Some(state);
        }

        let saved_at = self.last_saved_time?;
        let away_secs = (now_ms.checked_sub(saved_at)?.max(0) / 1000) as u64;
        let remaining = self.last_saved_time_remaining.saturating_sub(away_secs);
        if remaining == 0 {
            info!("Timer completed while the service was down");
            return Some(state);
        }

        let started_at_ms = self.started_at.filter(|s| *s <= now_ms).unwrap_or(now_ms);
        let paused_total_ms = self.total_paused_time.max(0);
        let elapsed = running_elapsed_ms(started_at_ms, paused_total_ms, now_ms) / 1000;

        state.remaining_seconds = remaining;
        state.phase = TimerPhase::Running {
            started_at_ms,
            paused_total_ms,
            budget_seconds: remaining.checked_add(elapsed as u64)?,
        };
        Some(state)
    }

    fn is_plausible(&self, now_ms: i64, max_seconds: u64) -> bool {
        let latest = now_ms.saturating_add(MAX_CLOCK_SKEW_MS);
        let timestamp_ok = |ts: Option<i64>| ts.map_or(true, |ts| (0..=latest).contains(&ts));

        self.time_remaining <= max_seconds
            && self.last_saved_time_remaining <= max_seconds
            && self.duration_seconds.map_or(true, |d| d <= max_seconds)
            && timestamp_ok(self.started_at)
            && timestamp_ok(self.paused_at)
            && timestamp_ok(self.last_saved_time)
    }
}

/// Best-effort persistence of the timer and its cancellation flags
pub struct StateCodec {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    default_duration_seconds: u64,
    max_duration_seconds: u64,
    last_write_ms: AtomicI64,
}

impl StateCodec {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        default_duration_seconds: u64,
    ) -> Self {
        Self {
            store,
            clock,
            default_duration_seconds,
            max_duration_seconds: DurationBounds::default().max_seconds,
            last_write_ms: AtomicI64::new(NEVER_WRITTEN),
        }
    }

    /// Records holding more seconds than this are discarded on load
    pub fn with_max_duration_seconds(mut self, max_seconds: u64) -> Self {
        self.max_duration_seconds = max_seconds;
        self
    }

    /// Read and wall-clock-correct the stored timer.
    /// `None` when nothing usable is stored or the timer was cancelled.
    pub fn load(&self) -> Option<TimerState> {
        if self.is_timer_cancelled() {
            debug!("Timer cancellation flag set, ignoring stored state");
            return None;
        }

        let raw = match self.store.get(STATE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read timer state: {}", e);
                return None;
            }
        };

        let record: PersistedTimer = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!("Discarding unreadable timer state: {}", e);
                return None;
            }
        };

        let restored = record.restore(
            self.clock.now_ms(),
            self.default_duration_seconds,
            self.max_duration_seconds,
        );
        if restored.is_none() {
            warn!("Discarding uninterpretable timer state");
        }
        restored
    }

    /// Throttled save. Returns whether a write happened.
    pub fn save(&self, state: &TimerState) -> bool {
        let now = self.clock.now_ms();
        let last = self.last_write_ms.load(Ordering::SeqCst);
        if state.is_running() && last != NEVER_WRITTEN && now - last < SAVE_THROTTLE_MS {
            return false;
        }
        self.write(state, now)
    }

    /// Unthrottled save, used after state transitions
    pub fn save_now(&self, state: &TimerState) -> bool {
        self.write(state, self.clock.now_ms())
    }

    fn write(&self, state: &TimerState, now_ms: i64) -> bool {
        let record = PersistedTimer::capture(state, now_ms);
        let json = match serde_json::to_string(&record) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize timer state: {}", e);
                return false;
            }
        };

        match self.store.set(STATE_KEY, &json) {
            Ok(()) => {
                self.last_write_ms.store(now_ms, Ordering::SeqCst);
                true
            }
            Err(e) => {
                warn!("Failed to persist timer state: {}", e);
                false
            }
        }
    }

    /// Drop the stored timer, leaving the cancellation flags alone
    pub fn remove(&self) {
        if let Err(e) = self.store.remove(STATE_KEY) {
            warn!("Failed to remove timer state: {}", e);
        }
        self.last_write_ms.store(NEVER_WRITTEN, Ordering::SeqCst);
    }

    /// Drop the stored timer and mark both timer and audio as cancelled
    pub fn clear(&self) {
        self.remove();
        self.set_flag(TIMER_CANCELLED_KEY, true);
        self.set_flag(AUDIO_CANCELLED_KEY, true);
        debug!("Timer state cleared and cancellation flags set");
    }

    pub fn clear_flags(&self) {
        self.set_flag(TIMER_CANCELLED_KEY, false);
        self.set_flag(AUDIO_CANCELLED_KEY, false);
    }

    pub fn is_timer_cancelled(&self) -> bool {
        self.flag(TIMER_CANCELLED_KEY)
    }

    pub fn is_audio_cancelled(&self) -> bool {
        self.flag(AUDIO_CANCELLED_KEY)
    }

    #[cfg(test)]
    pub(crate) fn set_audio_cancelled(&self, cancelled: bool) {
        self.set_flag(AUDIO_CANCELLED_KEY, cancelled);
    }

    fn flag(&self, key: &str) -> bool {
        match self.store.get(key) {
            Ok(value) => value.as_deref().map(str::trim) == Some("true"),
            Err(e) => {
                warn!("Failed to read {} flag: {}", key, e);
                false
            }
        }
    }

    fn set_flag(&self, key: &str, value: bool) {
        let result = if value {
            self.store.set(key, "true")
        } else {
            self.store.remove(key)
        };
        if let Err(e) = result {
            warn!("Failed to update {} flag: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::{
        clock::ManualClock,
        persistence::store::{MemoryStore, StoreError},
    };

    const T0: i64 = 1_700_000_000_000;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Io {
                key: key.to_string(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "private mode"),
            })
        }

        fn set(&self, key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Io {
                key: key.to_string(),
                source: io::Error::new(io::ErrorKind::Other, "quota exceeded"),
            })
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.set(key, "")
        }
    }

    fn codec() -> (StateCodec, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(T0));
        let codec = StateCodec::new(store.clone(), clock.clone(), 1500);
        (codec, store, clock)
    }

    #[test]
    fn record_uses_documented_field_names() {
        let mut timer = TimerState::new(1500);
        timer.start(T0);
        let value = serde_json::to_value(PersistedTimer::capture(&timer, T0 + 2_000)).unwrap();

        for key in [
            "timeRemaining",
            "isRunning",
            "isPaused",
            "startedAt",
            "pausedAt",
            "totalPausedTime",
            "lastSavedTime",
            "lastSavedTimeRemaining",
        ] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(value["timeRemaining"], 1498);
        assert_eq!(value["pausedAt"], serde_json::Value::Null);
    }

    #[test]
    fn reload_subtracts_elapsed_whole_seconds() {
        let (codec, _store, clock) = codec();
        let mut timer = TimerState::new(1500);
        timer.start(clock.now_ms());
        clock.advance_secs(10);
        timer.tick(clock.now_ms());
        assert!(codec.save_now(&timer));

        clock.advance_ms(25_700);
        let restored = codec.load().unwrap();
        assert!(restored.is_ticking());
        assert_eq!(restored.remaining_seconds, 1490 - 25);
        assert_eq!(restored.remaining_at(clock.now_ms()), 1465);

        clock.advance_secs(5);
        let mut live = restored.clone();
        live.tick(clock.now_ms());
        assert_eq!(live.remaining_seconds, 1460);
    }

    #[test]
    fn reload_ignores_started_at_drift() {
        let (codec, store, clock) = codec();
        // startedAt disagrees with the snapshot; the snapshot wins
        let record = PersistedTimer {
            time_remaining: 1000,
            is_running: true,
            is_paused: false,
            started_at: Some(T0 - 3_600_000),
            paused_at: None,
            total_paused_time: 0,
            last_saved_time: Some(T0),
            last_saved_time_remaining: 1000,
            duration_seconds: Some(1500),
        };
        store
            .set(STATE_KEY, &serde_json::to_string(&record).unwrap())
            .unwrap();

        clock.advance_secs(100);
        let restored = codec.load().unwrap();
        assert_eq!(restored.remaining_seconds, 900);
        assert_eq!(restored.remaining_at(clock.now_ms()), 900);
    }

    #[test]
    fn completed_while_away_restores_idle() {
        let (codec, _store, clock) = codec();
        let mut timer = TimerState::new(600);
        timer.start(clock.now_ms());
        codec.save_now(&timer);

        clock.advance_secs(601);
        let restored = codec.load().unwrap();
        assert!(restored.is_idle());
        assert_eq!(restored.remaining_seconds, 600);
        assert_eq!(restored.duration_seconds, 600);
    }

    #[test]
    fn paused_state_is_frozen_across_reload() {
        let (codec, _store, clock) = codec();
        let mut timer = TimerState::new(1500);
        timer.start(clock.now_ms());
        clock.advance_secs(5);
        timer.pause(clock.now_ms());
        codec.save_now(&timer);

        clock.advance_secs(3_000);
        let mut restored = codec.load().unwrap();
        assert!(restored.is_paused());
        assert_eq!(restored.remaining_seconds, 1495);

        restored.resume(clock.now_ms());
        clock.advance_secs(10);
        restored.tick(clock.now_ms());
        assert_eq!(restored.remaining_seconds, 1485);
    }

    #[test]
    fn corrupt_record_is_absence() {
        let (codec, store, _clock) = codec();
        store.set(STATE_KEY, "{not json").unwrap();
        assert_eq!(codec.load(), None);

        store
            .set(STATE_KEY, r#"{"timeRemaining":-5,"isRunning":true}"#)
            .unwrap();
        assert_eq!(codec.load(), None);
    }

    #[test]
    fn running_record_without_snapshot_is_absence() {
        let (codec, store, _clock) = codec();
        store
            .set(
                STATE_KEY,
                r#"{"timeRemaining":900,"isRunning":true,"isPaused":false,"startedAt":null,
                    "pausedAt":null,"totalPausedTime":0,"lastSavedTime":null,"lastSavedTimeRemaining":900}"#,
            )
            .unwrap();
        assert_eq!(codec.load(), None);
    }

    fn running_record(saved_at: i64, remaining: u64) -> PersistedTimer {
        PersistedTimer {
            time_remaining: remaining,
            is_running: true,
            is_paused: false,
            started_at: Some(saved_at),
            paused_at: None,
            total_paused_time: 0,
            last_saved_time: Some(saved_at),
            last_saved_time_remaining: remaining,
            duration_seconds: Some(1500),
        }
    }

    #[test]
    fn extreme_values_are_absence() {
        let (codec, store, _clock) = codec();
        let store_record = |record: &PersistedTimer| {
            store
                .set(STATE_KEY, &serde_json::to_string(record).unwrap())
                .unwrap();
        };

        store_record(&running_record(i64::MIN, 900));
        assert_eq!(codec.load(), None);

        store_record(&running_record(i64::MAX, 900));
        assert_eq!(codec.load(), None);

        store_record(&running_record(T0 + MAX_CLOCK_SKEW_MS + 1, 900));
        assert_eq!(codec.load(), None);

        let mut paused = running_record(T0, u64::MAX);
        paused.is_paused = true;
        paused.paused_at = Some(T0);
        store_record(&paused);
        assert_eq!(codec.load(), None);

        let mut overlong = running_record(T0, 900);
        overlong.duration_seconds = Some(u64::MAX);
        store_record(&overlong);
        assert_eq!(codec.load(), None);

        let mut idle = running_record(T0, 7201);
        idle.is_running = false;
        store_record(&idle);
        assert_eq!(codec.load(), None);

        let mut drained = running_record(T0, 900);
        drained.total_paused_time = i64::MAX;
        store_record(&drained);
        assert_eq!(codec.load().unwrap().remaining_seconds, 900);
    }

    #[test]
    fn max_duration_follows_configured_bounds() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(T0));
        let codec = StateCodec::new(store.clone(), clock, 1500).with_max_duration_seconds(1200);
        store
            .set(
                STATE_KEY,
                &serde_json::to_string(&running_record(T0, 1300)).unwrap(),
            )
            .unwrap();
        assert_eq!(codec.load(), None);
    }

    #[test]
    fn clear_makes_stale_running_state_inert() {
        let (codec, store, clock) = codec();
        let mut timer = TimerState::new(1500);
        timer.start(clock.now_ms());
        codec.save_now(&timer);
        let stale = store.get(STATE_KEY).unwrap().unwrap();

        codec.clear();
        assert!(codec.is_timer_cancelled());
        assert!(codec.is_audio_cancelled());

        // another holder writes its stale copy back
        store.set(STATE_KEY, &stale).unwrap();
        assert_eq!(codec.load(), None);

        codec.clear_flags();
        assert!(codec.load().unwrap().is_ticking());
    }

    #[test]
    fn remove_keeps_flags() {
        let (codec, _store, _clock) = codec();
        codec.save_now(&TimerState::new(1500));
        codec.remove();
        assert_eq!(codec.load(), None);
        assert!(!codec.is_timer_cancelled());
    }

    #[test]
    fn running_saves_are_throttled() {
        let (codec, _store, clock) = codec();
        let mut timer = TimerState::new(1500);
        timer.start(clock.now_ms());

        assert!(codec.save(&timer));
        clock.advance_ms(200);
        assert!(!codec.save(&timer));
        clock.advance_ms(300);
        assert!(codec.save(&timer));

        timer.reset();
        clock.advance_ms(10);
        assert!(codec.save(&timer));
        assert!(codec.save(&timer));
    }

    #[test]
    fn broken_store_is_absorbed() {
        let clock = Arc::new(ManualClock::new(T0));
        let codec = StateCodec::new(Arc::new(BrokenStore), clock, 1500);
        let mut timer = TimerState::new(1500);
        timer.start(T0);

        assert!(!codec.save_now(&timer));
        assert_eq!(codec.load(), None);
        codec.clear();
        assert!(!codec.is_timer_cancelled());
    }
}
