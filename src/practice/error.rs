// src/practice/error.rs

use std::fmt;

/// Failure of the local key-value storage.
#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Serde(serde_json::Error),
    Unavailable(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "storage io error: {e}"),
            StorageError::Serde(e) => write!(f, "corrupt snapshot: {e}"),
            StorageError::Unavailable(msg) => write!(f, "storage unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            StorageError::Serde(e) => Some(e),
            StorageError::Unavailable(_) => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serde(err)
    }
}

/// Errors of the practice runner.
#[derive(Debug)]
pub enum PracticeError {
    /// The paper breaks a structural rule (empty session, mismatched options...).
    InvalidPaper(String),

    /// A session, question or option index outside the paper.
    OutOfRange(String),

    /// An answer key that does not belong to the paper.
    UnknownQuestion(String),

    /// The attempt was already submitted and is read-only.
    Locked,

    InvalidStorageKey(String),

    Storage(StorageError),
}

impl fmt::Display for PracticeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PracticeError::InvalidPaper(msg) => write!(f, "invalid paper: {msg}"),
            PracticeError::OutOfRange(msg) => write!(f, "out of range: {msg}"),
            PracticeError::UnknownQuestion(key) => write!(f, "unknown question '{key}'"),
            PracticeError::Locked => write!(f, "attempt already submitted"),
            PracticeError::InvalidStorageKey(slug) => write!(f, "invalid storage key '{slug}'"),
            PracticeError::Storage(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PracticeError {}

impl From<StorageError> for PracticeError {
    fn from(err: StorageError) -> Self {
        PracticeError::Storage(err)
    }
}

impl From<validator::ValidationErrors> for PracticeError {
    fn from(err: validator::ValidationErrors) -> Self {
        PracticeError::InvalidPaper(err.to_string())
    }
}
