// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, types::Json};

use crate::{
    config::ATTEMPT_INSERT_RETRIES,
    error::AppError,
    models::{
        quiz::{Quiz, QuizQuestion},
        submission::{EvaluationResult, QuizSubmission, SubmissionStatus, SubmittedAnswer},
    },
    store::QuizStore,
};

const SUBMISSION_COLUMNS: &str = "id, user_id, quiz_id, attempt_number, status, answers, \
     total_marks_maximum, total_marks_obtained, correct_answers_count, wrong_answers_count, \
     unattempted_count, percentage_score, started_at, submitted_at, time_spent_seconds, is_deleted";

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgQuizStore {
    pool: PgPool,
}

impl PgQuizStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuizStore for PgQuizStore {
    async fn find_quiz(&self, quiz_id: i64) -> Result<Option<Quiz>, AppError> {
        let quiz = sqlx::query_as::<_, Quiz>(
            "SELECT id, title, total_marks, duration_minutes, created_at FROM quizzes WHERE id = $1",
        )
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch quiz {}: {:?}", quiz_id, e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(quiz)
    }

    async fn list_questions(&self, quiz_id: i64) -> Result<Vec<QuizQuestion>, AppError> {
        let questions = sqlx::query_as::<_, QuizQuestion>(
            r#"
            SELECT id, quiz_id, content, options, marks, position
            FROM quiz_questions
            WHERE quiz_id = $1
            ORDER BY position, id
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch questions of quiz {}: {:?}", quiz_id, e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(questions)
    }

    async fn create_submission(
        &self,
        user_id: &str,
        quiz_id: i64,
        total_marks_maximum: i32,
        started_at: DateTime<Utc>,
    ) -> Result<QuizSubmission, AppError> {
        // Numbering continues after the highest live attempt, so a soft-deleted
        // attempt in the middle never yields a number that is still in use.
        // The partial unique index on (user_id, quiz_id, attempt_number)
        // rejects a concurrent duplicate.
        let sql = format!(
            r#"
            INSERT INTO quiz_submissions
                (user_id, quiz_id, attempt_number, status, answers, total_marks_maximum, started_at)
            SELECT $1, $2, COALESCE(MAX(attempt_number), 0) + 1, $3, '[]'::JSONB, $4, $5
            FROM quiz_submissions
            WHERE user_id = $1 AND quiz_id = $2 AND NOT is_deleted
            RETURNING {SUBMISSION_COLUMNS}
            "#
        );

        let mut attempt = 0;
        loop {
            let result = sqlx::query_as::<_, QuizSubmission>(&sql)
                .bind(user_id)
                .bind(quiz_id)
                .bind(SubmissionStatus::InProgress)
                .bind(total_marks_maximum)
                .bind(started_at)
                .fetch_one(&self.pool)
                .await;

            match result {
                Ok(submission) => return Ok(submission),
                Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                    attempt += 1;
                    if attempt > ATTEMPT_INSERT_RETRIES {
                        return Err(AppError::Conflict(
                            "Another attempt was started at the same time, please retry".to_string(),
                        ));
                    }
                    tracing::warn!(
                        quiz_id,
                        "Attempt number collision, retrying ({}/{})",
                        attempt,
                        ATTEMPT_INSERT_RETRIES
                    );
                }
                Err(e) => {
                    tracing::error!("Failed to create submission: {:?}", e);
                    return Err(AppError::InternalServerError(e.to_string()));
                }
            }
        }
    }

    async fn find_submission(&self, submission_id: i64) -> Result<Option<QuizSubmission>, AppError> {
        let sql = format!(
            "SELECT {SUBMISSION_COLUMNS} FROM quiz_submissions WHERE id = $1 AND NOT is_deleted"
        );

        let submission = sqlx::query_as::<_, QuizSubmission>(&sql)
            .bind(submission_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(submission)
    }

    async fn list_submissions(
        &self,
        user_id: &str,
        quiz_id: i64,
    ) -> Result<Vec<QuizSubmission>, AppError> {
        let sql = format!(
            r#"
            SELECT {SUBMISSION_COLUMNS}
            FROM quiz_submissions
            WHERE user_id = $1 AND quiz_id = $2 AND NOT is_deleted
            ORDER BY attempt_number
            "#
        );

        let submissions = sqlx::query_as::<_, QuizSubmission>(&sql)
            .bind(user_id)
            .bind(quiz_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(submissions)
    }

    async fn save_answers(
        &self,
        submission_id: i64,
        answers: Vec<SubmittedAnswer>,
        submitted_at: DateTime<Utc>,
    ) -> Result<Option<QuizSubmission>, AppError> {
        let sql = format!(
            r#"
            UPDATE quiz_submissions
            SET answers = $2, submitted_at = $3, status = $4
            WHERE id = $1 AND status <> $5 AND NOT is_deleted
            RETURNING {SUBMISSION_COLUMNS}
            "#
        );

        let submission = sqlx::query_as::<_, QuizSubmission>(&sql)
            .bind(submission_id)
            .bind(Json(answers))
            .bind(submitted_at)
            .bind(SubmissionStatus::Submitted)
            .bind(SubmissionStatus::Evaluated)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to save answers of submission {}: {:?}", submission_id, e);
                AppError::InternalServerError(e.to_string())
            })?;

        Ok(submission)
    }

    async fn save_evaluation(
        &self,
        submission_id: i64,
        result: &EvaluationResult,
    ) -> Result<Option<QuizSubmission>, AppError> {
        let sql = format!(
            r#"
            UPDATE quiz_submissions
            SET answers = $2,
                total_marks_obtained = $3,
                correct_answers_count = $4,
                wrong_answers_count = $5,
                unattempted_count = $6,
                percentage_score = $7,
                time_spent_seconds = $8,
                status = $9
            WHERE id = $1 AND NOT is_deleted
            RETURNING {SUBMISSION_COLUMNS}
            "#
        );

        let submission = sqlx::query_as::<_, QuizSubmission>(&sql)
            .bind(submission_id)
            .bind(Json(result.answers.clone()))
            .bind(result.total_marks_obtained)
            .bind(result.correct_answers_count)
            .bind(result.wrong_answers_count)
            .bind(result.unattempted_count)
            .bind(result.percentage_score)
            .bind(result.time_spent_seconds)
            .bind(SubmissionStatus::Evaluated)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to save evaluation of submission {}: {:?}", submission_id, e);
                AppError::InternalServerError(e.to_string())
            })?;

        Ok(submission)
    }
}
