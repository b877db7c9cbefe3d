// src/models/submission.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

/// Lifecycle of a quiz submission. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "submission_status", rename_all = "snake_case")]
pub enum SubmissionStatus {
    InProgress,
    Submitted,
    Evaluated,
}

impl SubmissionStatus {
    /// Whether a submission in this status may move to `next`.
    /// Answers are taken in before scoring, so `InProgress` only leads to
    /// `Submitted`. Staying in `Submitted` or `Evaluated` is allowed so intake
    /// and evaluation can be retried.
    pub fn can_transition_to(self, next: SubmissionStatus) -> bool {
        use SubmissionStatus::*;
        matches!(
            (self, next),
            (InProgress, Submitted) | (Submitted, Submitted) | (Submitted, Evaluated) | (Evaluated, Evaluated)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionStatus::InProgress => "in_progress",
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::Evaluated => "evaluated",
        }
    }
}

/// One stored answer. Identifiers that could not be normalized are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub question_id: Option<i64>,
    pub selected_option_id: Option<i64>,
    pub answer_text: Option<String>,

    /// Filled in by evaluation.
    pub is_correct: Option<bool>,
    pub marks_awarded: Option<i32>,
}

impl SubmittedAnswer {
    pub fn is_attempted(&self) -> bool {
        self.selected_option_id.is_some() || self.answer_text.is_some()
    }
}

/// Represents the 'quiz_submissions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSubmission {
    pub id: i64,
    pub user_id: String,
    pub quiz_id: i64,
    pub attempt_number: i32,
    pub status: SubmissionStatus,
    pub answers: Json<Vec<SubmittedAnswer>>,
    pub total_marks_maximum: i32,
    pub total_marks_obtained: i32,
    pub correct_answers_count: i32,
    pub wrong_answers_count: i32,
    pub unattempted_count: i32,
    pub percentage_score: f64,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub time_spent_seconds: i64,

    #[serde(skip)]
    pub is_deleted: bool,
}

/// Scored fields computed by evaluation, persisted together with status `evaluated`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub answers: Vec<SubmittedAnswer>,
    pub total_marks_obtained: i32,
    pub correct_answers_count: i32,
    pub wrong_answers_count: i32,
    pub unattempted_count: i32,
    pub percentage_score: f64,
    pub time_spent_seconds: i64,
}

/// One answer as received from the client.
/// Identifiers arrive as numbers or strings and are normalized on intake.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnswerInput {
    #[serde(default)]
    pub question_id: Option<serde_json::Value>,
    #[serde(default)]
    pub selected_option_id: Option<serde_json::Value>,
    #[validate(length(max = 5000))]
    #[serde(default)]
    pub answer_text: Option<String>,
}

/// DTO for submitting the answers of an attempt.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswersRequest {
    #[validate(length(max = 500), nested)]
    pub answers: Vec<AnswerInput>,
}

/// DTO returned when an attempt starts: the new submission plus the paper to answer.
#[derive(Debug, Serialize, Deserialize)]
pub struct StartAttemptResponse {
    pub submission: QuizSubmission,
    pub quiz: crate::models::quiz::QuizPaper,
}
