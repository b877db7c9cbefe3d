// src/practice/paper.rs

use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::practice::error::PracticeError;

/// Text (or list of texts) in both supported languages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bilingual<T> {
    pub en: T,
    pub hi: T,
}

/// Joins UI state and persisted storage: `<sessionId>-<questionId>`.
/// Derived from the paper, so it stays the same for the whole attempt.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerKey(String);

impl AnswerKey {
    pub fn new(session_id: &str, question_id: i64) -> Self {
        AnswerKey(format!("{session_id}-{question_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnswerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PracticeQuestion {
    pub id: i64,
    pub prompt: Bilingual<String>,

    #[validate(custom(function = validate_options))]
    pub options: Bilingual<Vec<String>>,

    /// Index of the correct option. One index serves every language, so the
    /// correct position cannot differ between them.
    #[serde(default)]
    pub answer: Option<usize>,
}

impl PracticeQuestion {
    pub fn option_count(&self) -> usize {
        self.options.en.len()
    }
}

/// Option lists of every language must be non-empty and index-aligned.
fn validate_options(options: &Bilingual<Vec<String>>) -> Result<(), validator::ValidationError> {
    if options.en.is_empty() {
        return Err(validator::ValidationError::new("options_cannot_be_empty"));
    }
    if options.en.len() != options.hi.len() {
        return Err(validator::ValidationError::new("options_length_mismatch"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Subject {
    pub name: String,
    #[validate(nested)]
    pub questions: Vec<PracticeQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Session {
    #[validate(length(min = 1, max = 64))]
    pub id: String,
    pub name: String,
    #[validate(length(min = 1), nested)]
    pub subjects: Vec<Subject>,
}

impl Session {
    /// Questions of every subject, in subject order.
    pub fn questions(&self) -> impl Iterator<Item = &PracticeQuestion> {
        self.subjects.iter().flat_map(|s| s.questions.iter())
    }

    pub fn question_count(&self) -> usize {
        self.subjects.iter().map(|s| s.questions.len()).sum()
    }
}

/// A practice exam as served to the client.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PracticePaper {
    /// Sub-exam identifier; the timer snapshot is stored under `practice_<slug>`.
    pub slug: String,
    #[validate(range(min = 1))]
    pub duration_seconds: u32,
    #[validate(length(min = 1), nested)]
    pub sessions: Vec<Session>,
}

impl PracticePaper {
    /// Field validation plus the cross-field rules that keep answer keys unique.
    pub fn check(&self) -> Result<(), PracticeError> {
        self.validate()?;

        let mut session_ids = HashSet::new();
        for session in &self.sessions {
            if !session_ids.insert(session.id.as_str()) {
                return Err(PracticeError::InvalidPaper(format!(
                    "duplicate session id '{}'",
                    session.id
                )));
            }
            if session.question_count() == 0 {
                return Err(PracticeError::InvalidPaper(format!(
                    "session '{}' has no questions",
                    session.id
                )));
            }

            let mut question_ids = HashSet::new();
            for question in session.questions() {
                if !question_ids.insert(question.id) {
                    return Err(PracticeError::InvalidPaper(format!(
                        "duplicate question id {} in session '{}'",
                        question.id, session.id
                    )));
                }
                if question.answer.is_some_and(|a| a >= question.option_count()) {
                    return Err(PracticeError::InvalidPaper(format!(
                        "answer index of question {} is out of range",
                        question.id
                    )));
                }
            }
        }

        // Distinct (session, question) pairs can still spell the same key,
        // e.g. "a" with -2 and "a-" with 2.
        let mut keys = HashSet::new();
        for (_, _, key, _) in self.positions() {
            if !keys.insert(key.clone()) {
                return Err(PracticeError::InvalidPaper(format!(
                    "answer key '{key}' is used by more than one question"
                )));
            }
        }
        Ok(())
    }

    pub fn question_count(&self, session: usize) -> usize {
        self.sessions.get(session).map_or(0, Session::question_count)
    }

    pub fn total_questions(&self) -> usize {
        self.sessions.iter().map(Session::question_count).sum()
    }

    pub fn question(&self, session: usize, question: usize) -> Option<&PracticeQuestion> {
        self.sessions.get(session)?.questions().nth(question)
    }

    pub fn key_at(&self, session: usize, question: usize) -> Option<AnswerKey> {
        let s = self.sessions.get(session)?;
        let q = s.questions().nth(question)?;
        Some(AnswerKey::new(&s.id, q.id))
    }

    /// Every question with its position and key, sessions first then questions.
    pub fn positions(&self) -> Vec<(usize, usize, AnswerKey, &PracticeQuestion)> {
        self.sessions
            .iter()
            .enumerate()
            .flat_map(|(si, s)| {
                s.questions()
                    .enumerate()
                    .map(move |(qi, q)| (si, qi, AnswerKey::new(&s.id, q.id), q))
            })
            .collect()
    }

    /// Question addressed by `key`.
    pub fn lookup(&self, key: &AnswerKey) -> Option<&PracticeQuestion> {
        self.positions()
            .into_iter()
            .find(|(_, _, k, _)| k == key)
            .map(|(_, _, _, q)| q)
    }
}
