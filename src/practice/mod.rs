// src/practice/mod.rs

//! Client-side practice test runner: a timed, locally persisted attempt over
//! a session -> subject -> question paper, scored on the device.

pub mod error;
pub mod paper;
pub mod runner;
pub mod state;
pub mod storage;
pub mod timer;

pub use error::{PracticeError, StorageError};
pub use paper::{AnswerKey, PracticePaper};
pub use runner::PracticeSession;
pub use state::{AssessmentState, Cursor, Mode, PracticeResult, Step};
pub use storage::{FileStorage, MemoryStorage, SnapshotStorage, StorageKey, TimerSnapshot};
pub use timer::{Countdown, SnapshotWriter, Tick, Timer};
