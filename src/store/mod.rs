// src/store/mod.rs

//! Persistence seam of the quiz engine.
//!
//! Handlers and services only talk to [`QuizStore`]; production runs on
//! [`postgres::PgQuizStore`], tests and embedders can use [`memory::MemoryStore`].

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        quiz::{Quiz, QuizQuestion},
        submission::{EvaluationResult, QuizSubmission, SubmittedAnswer},
    },
};

pub use memory::MemoryStore;
pub use postgres::PgQuizStore;

#[async_trait]
pub trait QuizStore: Send + Sync {
    async fn find_quiz(&self, quiz_id: i64) -> Result<Option<Quiz>, AppError>;

    /// Questions of a quiz ordered by position.
    async fn list_questions(&self, quiz_id: i64) -> Result<Vec<QuizQuestion>, AppError>;

    /// Inserts a new `in_progress` submission whose attempt number is the count
    /// of the user's non-deleted submissions for this quiz plus one.
    /// Counting and inserting must not interleave with another creation.
    async fn create_submission(
        &self,
        user_id: &str,
        quiz_id: i64,
        total_marks_maximum: i32,
        started_at: DateTime<Utc>,
    ) -> Result<QuizSubmission, AppError>;

    async fn find_submission(&self, submission_id: i64) -> Result<Option<QuizSubmission>, AppError>;

    async fn list_submissions(
        &self,
        user_id: &str,
        quiz_id: i64,
    ) -> Result<Vec<QuizSubmission>, AppError>;

    /// Stores answers and moves the submission to `submitted`.
    /// Returns `None` when the submission is missing or already evaluated.
    async fn save_answers(
        &self,
        submission_id: i64,
        answers: Vec<SubmittedAnswer>,
        submitted_at: DateTime<Utc>,
    ) -> Result<Option<QuizSubmission>, AppError>;

    /// Stores evaluation results and moves the submission to `evaluated`.
    async fn save_evaluation(
        &self,
        submission_id: i64,
        result: &EvaluationResult,
    ) -> Result<Option<QuizSubmission>, AppError>;
}
