// src/practice/timer.rs

use std::{sync::Arc, time::Duration};

use tokio::time::{MissedTickBehavior, interval};

use crate::{
    config::URGENT_THRESHOLD_SECONDS,
    practice::storage::{SnapshotStorage, StorageKey, TimerSnapshot},
};

/// Result of advancing the countdown by one second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Running(u32),
    /// Reached zero on this tick.
    Expired,
    /// Already expired, or the attempt ended; nothing happened.
    Stopped,
}

/// Remaining-seconds counter that expires exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
    expired: bool,
}

impl Countdown {
    pub fn new(seconds: u32) -> Self {
        Self {
            remaining: seconds,
            expired: false,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Cosmetic: the caller switches to its warning style.
    pub fn is_urgent(&self) -> bool {
        self.remaining < URGENT_THRESHOLD_SECONDS
    }

    /// Mount-time check: true (once) when the clock starts at zero.
    pub fn check_expiry(&mut self) -> bool {
        if self.remaining == 0 && !self.expired {
            self.expired = true;
            return true;
        }
        false
    }

    pub fn tick(&mut self) -> Tick {
        if self.expired {
            return Tick::Stopped;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.expired = true;
            Tick::Expired
        } else {
            Tick::Running(self.remaining)
        }
    }
}

/// Writes timer snapshots under one storage key.
#[derive(Clone)]
pub struct SnapshotWriter {
    storage: Arc<dyn SnapshotStorage>,
    key: StorageKey,
}

impl SnapshotWriter {
    pub fn new(storage: Arc<dyn SnapshotStorage>, key: StorageKey) -> Self {
        Self { storage, key }
    }

    pub fn key(&self) -> &StorageKey {
        &self.key
    }

    /// A failed write is logged; the attempt goes on in memory and only
    /// resume-after-reload is lost.
    pub fn write(&self, snapshot: &TimerSnapshot) {
        if let Err(e) = snapshot.save(self.storage.as_ref(), &self.key) {
            tracing::warn!(storage_key = self.key.as_str(), "Failed to persist timer snapshot: {}", e);
        }
    }
}

/// Countdown that persists the attempt to local storage on every tick.
///
/// The persist closure runs at tick time with the remaining seconds and the
/// writer. It reads the live state and writes it in one go, and returns
/// `false` once the attempt is over, which stops the timer without a write.
pub struct Timer {
    countdown: Countdown,
    writer: SnapshotWriter,
}

impl Timer {
    pub fn new(seconds: u32, storage: Arc<dyn SnapshotStorage>, key: StorageKey) -> Self {
        Self {
            countdown: Countdown::new(seconds),
            writer: SnapshotWriter::new(storage, key),
        }
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    /// One second elapsed: persist through `persist`, then decrement.
    pub fn step<P>(&mut self, persist: P) -> Tick
    where
        P: FnOnce(u32, &SnapshotWriter) -> bool,
    {
        if self.countdown.is_expired() {
            return Tick::Stopped;
        }

        let remaining = self.countdown.remaining().saturating_sub(1);
        if !persist(remaining, &self.writer) {
            return Tick::Stopped;
        }
        self.countdown.tick()
    }

    /// Runs until expiry or until `persist` reports the attempt ended.
    ///
    /// * `on_tick` receives the remaining seconds after each decrement.
    /// * `on_expire` is called exactly once, after the final (zero) snapshot
    ///   was written; a timer mounted at zero expires without ticking.
    ///
    /// Storage is written synchronously on this task. `FileStorage` writes
    /// one small file per tick, so run the clock on a runtime where a short
    /// blocking call per second is acceptable, or wrap a slower storage in
    /// one that hands writes off to `tokio::task::spawn_blocking`.
    pub async fn run<P, T, E>(mut self, persist: P, mut on_tick: T, on_expire: E)
    where
        P: Fn(u32, &SnapshotWriter) -> bool,
        T: FnMut(u32, bool),
        E: FnOnce(),
    {
        if self.countdown.check_expiry() {
            on_expire();
            return;
        }

        let mut clock = interval(Duration::from_secs(1));
        clock.set_missed_tick_behavior(MissedTickBehavior::Burst);
        // The first tick completes immediately.
        clock.tick().await;

        loop {
            clock.tick().await;
            match self.step(&persist) {
                Tick::Running(remaining) => on_tick(remaining, self.countdown.is_urgent()),
                Tick::Expired => {
                    on_tick(0, true);
                    on_expire();
                    return;
                }
                Tick::Stopped => {
                    tracing::debug!(storage_key = self.writer.key().as_str(), "Timer stopped");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::practice::{
        error::StorageError,
        paper::AnswerKey,
        storage::MemoryStorage,
    };
    use std::{
        collections::BTreeMap,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };

    struct FailingStorage;

    impl SnapshotStorage for FailingStorage {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }
        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }
    }

    fn key() -> StorageKey {
        StorageKey::for_paper("mock-1").unwrap()
    }

    #[test]
    fn countdown_expires_once() {
        let mut countdown = Countdown::new(2);
        assert_eq!(countdown.tick(), Tick::Running(1));
        assert_eq!(countdown.tick(), Tick::Expired);
        assert_eq!(countdown.tick(), Tick::Stopped);
        assert_eq!(countdown.remaining(), 0);
    }

    #[test]
    fn countdown_mounted_at_zero_expires_immediately() {
        let mut countdown = Countdown::new(0);
        assert!(countdown.check_expiry());
        assert!(!countdown.check_expiry());
        assert_eq!(countdown.tick(), Tick::Stopped);
    }

    #[test]
    fn urgent_below_threshold() {
        assert!(!Countdown::new(300).is_urgent());
        assert!(Countdown::new(299).is_urgent());
    }

    #[test]
    fn snapshot_reads_live_state_at_tick_time() {
        let storage = Arc::new(MemoryStorage::new());
        let live: Arc<Mutex<BTreeMap<AnswerKey, usize>>> = Arc::default();
        let mut timer = Timer::new(10, storage.clone(), key());

        let source = |remaining: u32, writer: &SnapshotWriter| {
            writer.write(&TimerSnapshot {
                answers: live.lock().unwrap().clone(),
                review: BTreeMap::new(),
                time_left: remaining,
            });
            true
        };

        timer.step(source);
        live.lock().unwrap().insert(AnswerKey::new("s1", 1), 2);
        timer.step(source);
        live.lock().unwrap().insert(AnswerKey::new("s1", 2), 0);
        assert_eq!(timer.step(source), Tick::Running(7));

        let saved = TimerSnapshot::load(storage.as_ref(), &key()).unwrap().unwrap();
        assert_eq!(saved.time_left, 7);
        assert_eq!(saved.answers, *live.lock().unwrap());
        assert_eq!(saved.answers.len(), 2);
    }

    #[test]
    fn storage_failure_does_not_stop_the_clock() {
        let mut timer = Timer::new(3, Arc::new(FailingStorage), key());
        let source = |remaining, writer: &SnapshotWriter| {
            writer.write(&TimerSnapshot {
                time_left: remaining,
                ..Default::default()
            });
            true
        };
        assert_eq!(timer.step(source), Tick::Running(2));
        assert_eq!(timer.step(source), Tick::Running(1));
        assert_eq!(timer.step(source), Tick::Expired);
    }

    #[test]
    fn ended_attempt_stops_without_writing() {
        let storage = Arc::new(MemoryStorage::new());
        let mut timer = Timer::new(5, storage.clone(), key());
        assert_eq!(timer.step(|_, _| false), Tick::Stopped);
        assert_eq!(timer.countdown().remaining(), 5);
        assert_eq!(storage.get(key().as_str()).unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn run_ticks_every_second_and_expires_once() {
        let storage = Arc::new(MemoryStorage::new());
        let timer = Timer::new(3, storage.clone(), key());
        let expiries = AtomicUsize::new(0);
        let mut seen = Vec::new();

        timer
            .run(
                |remaining, writer: &SnapshotWriter| {
                    writer.write(&TimerSnapshot {
                        time_left: remaining,
                        ..Default::default()
                    });
                    true
                },
                |remaining, _urgent| seen.push(remaining),
                || {
                    expiries.fetch_add(1, Ordering::SeqCst);
                },
            )
            .await;

        assert_eq!(seen, vec![2, 1, 0]);
        assert_eq!(expiries.load(Ordering::SeqCst), 1);
        let saved = TimerSnapshot::load(storage.as_ref(), &key()).unwrap().unwrap();
        assert_eq!(saved.time_left, 0);
    }
}
