// src/practice/runner.rs

use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicU32, Ordering},
};

use crate::practice::{
    error::PracticeError,
    paper::{AnswerKey, PracticePaper},
    state::{AssessmentState, Cursor, Mode, PracticeResult, Step},
    storage::{SnapshotStorage, StorageKey, TimerSnapshot},
    timer::{SnapshotWriter, Timer},
};

/// One practice attempt on one device.
///
/// Owns the live [`AssessmentState`] behind a shared lock. User actions and
/// the timer both go through that lock, so every snapshot the timer writes
/// reflects the state at the instant of the tick.
pub struct PracticeSession {
    paper: Arc<PracticePaper>,
    state: Arc<Mutex<AssessmentState>>,
    storage: Arc<dyn SnapshotStorage>,
    key: StorageKey,
    time_left: Arc<AtomicU32>,
}

impl PracticeSession {
    /// Validates the paper and resumes from the stored snapshot if one exists.
    /// An unreadable snapshot is discarded and the attempt starts fresh.
    pub fn open(paper: PracticePaper, storage: Arc<dyn SnapshotStorage>) -> Result<Self, PracticeError> {
        paper.check()?;
        let key = StorageKey::for_paper(&paper.slug)?;

        let (state, time_left) = match TimerSnapshot::load(storage.as_ref(), &key) {
            Ok(Some(snapshot)) => {
                tracing::info!(storage_key = key.as_str(), time_left = snapshot.time_left, "Resuming practice attempt");
                let state = AssessmentState::restore(&paper, snapshot.answers, snapshot.review);
                (state, snapshot.time_left.min(paper.duration_seconds))
            }
            Ok(None) => (AssessmentState::new(), paper.duration_seconds),
            Err(e) => {
                tracing::warn!(storage_key = key.as_str(), "Ignoring unreadable snapshot: {}", e);
                (AssessmentState::new(), paper.duration_seconds)
            }
        };

        Ok(Self {
            paper: Arc::new(paper),
            state: Arc::new(Mutex::new(state)),
            storage,
            key,
            time_left: Arc::new(AtomicU32::new(time_left)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, AssessmentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn paper(&self) -> &PracticePaper {
        &self.paper
    }

    pub fn storage_key(&self) -> &StorageKey {
        &self.key
    }

    /// Copy of the current state.
    pub fn state(&self) -> AssessmentState {
        self.lock().clone()
    }

    pub fn time_left(&self) -> u32 {
        self.time_left.load(Ordering::SeqCst)
    }

    pub fn select(&self, key: &AnswerKey, option: usize) -> Result<(), PracticeError> {
        self.lock().select(&self.paper, key, option)
    }

    pub fn clear(&self, key: &AnswerKey) -> Result<(), PracticeError> {
        self.lock().clear(key)
    }

    pub fn toggle_mark(&self, key: &AnswerKey) -> Result<bool, PracticeError> {
        self.lock().toggle_mark(&self.paper, key)
    }

    pub fn go_to(&self, session: usize, question: usize) -> Result<Cursor, PracticeError> {
        self.lock().go_to(&self.paper, session, question)
    }

    pub fn switch_session(&self, session: usize) -> Result<Cursor, PracticeError> {
        self.lock().switch_session(&self.paper, session)
    }

    pub fn next(&self) -> Result<Step, PracticeError> {
        let mut state = self.lock();
        let step = state.next(&self.paper)?;
        self.after(step);
        Ok(step)
    }

    pub fn previous(&self) -> Result<Step, PracticeError> {
        self.lock().previous(&self.paper)
    }

    pub fn finish(&self) -> Result<Step, PracticeError> {
        let mut state = self.lock();
        let step = state.finish(&self.paper)?;
        self.after(step);
        Ok(step)
    }

    pub fn review_submit(&self) -> Result<Step, PracticeError> {
        let mut state = self.lock();
        let step = state.review_submit(&self.paper)?;
        self.after(step);
        Ok(step)
    }

    /// Time is up: submit at once, ignoring the review gate.
    pub fn expire(&self) -> PracticeResult {
        let mut state = self.lock();
        if state.mode() != Mode::Submitted {
            tracing::info!(storage_key = self.key.as_str(), "Practice time expired, submitting");
            let step = state.expire();
            self.after(step);
        }
        self.time_left.store(0, Ordering::SeqCst);
        state.result(&self.paper)
    }

    /// Local result; meaningful once submitted.
    pub fn result(&self) -> PracticeResult {
        self.lock().result(&self.paper)
    }

    /// Runs with the state lock held, so a timer tick can never write the
    /// snapshot back after it was removed.
    fn after(&self, step: Step) {
        if step != Step::Submitted {
            return;
        }
        // The snapshot only exists to resume an unfinished attempt.
        if let Err(e) = self.storage.remove(self.key.as_str()) {
            tracing::warn!(storage_key = self.key.as_str(), "Failed to clear practice snapshot: {}", e);
        }
    }

    /// Writes the live state for the timer while holding the state lock.
    /// Returns `false` once the attempt is submitted.
    fn persist(&self, time_left: u32, writer: &SnapshotWriter) -> bool {
        let state = self.lock();
        if state.mode() == Mode::Submitted {
            return false;
        }
        self.time_left.store(time_left, Ordering::SeqCst);
        writer.write(&TimerSnapshot {
            answers: state.answers().clone(),
            review: state.review().clone(),
            time_left,
        });
        true
    }

    /// Drives the countdown until expiry or submission.
    /// `on_tick` gets the remaining seconds and whether the urgent style applies.
    pub async fn run_clock<T>(self: Arc<Self>, on_tick: T)
    where
        T: FnMut(u32, bool),
    {
        let timer = Timer::new(self.time_left(), self.storage.clone(), self.key.clone());
        let ticking = self.clone();
        let expiring = self.clone();

        timer
            .run(
                move |time_left, writer: &SnapshotWriter| ticking.persist(time_left, writer),
                on_tick,
                move || {
                    expiring.expire();
                },
            )
            .await;
    }
}
