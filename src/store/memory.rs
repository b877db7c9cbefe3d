// src/store/memory.rs

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;

use crate::{
    error::AppError,
    models::{
        quiz::{Quiz, QuizQuestion},
        submission::{EvaluationResult, QuizSubmission, SubmissionStatus, SubmittedAnswer},
    },
    store::QuizStore,
};

#[derive(Default)]
struct Inner {
    quizzes: HashMap<i64, Quiz>,
    questions: Vec<QuizQuestion>,
    submissions: BTreeMap<i64, QuizSubmission>,
    next_submission_id: i64,
}

/// In-process store. Every operation runs under one lock, so attempt
/// numbering (highest live number + 1) is atomic without any retry.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds (or replaces) a quiz together with its question bank.
    pub fn insert_quiz(&self, quiz: Quiz, questions: Vec<QuizQuestion>) {
        let mut inner = self.lock();
        inner.questions.retain(|q| q.quiz_id != quiz.id);
        inner.questions.extend(questions);
        inner.quizzes.insert(quiz.id, quiz);
    }

    /// Soft-deletes a submission. Returns `false` if it did not exist.
    pub fn delete_submission(&self, submission_id: i64) -> bool {
        let mut inner = self.lock();
        match inner.submissions.get_mut(&submission_id) {
            Some(submission) if !submission.is_deleted => {
                submission.is_deleted = true;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl QuizStore for MemoryStore {
    async fn find_quiz(&self, quiz_id: i64) -> Result<Option<Quiz>, AppError> {
        Ok(self.lock().quizzes.get(&quiz_id).cloned())
    }

    async fn list_questions(&self, quiz_id: i64) -> Result<Vec<QuizQuestion>, AppError> {
        let mut questions: Vec<QuizQuestion> = self
            .lock()
            .questions
            .iter()
            .filter(|q| q.quiz_id == quiz_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| (q.position, q.id));
        Ok(questions)
    }

    async fn create_submission(
        &self,
        user_id: &str,
        quiz_id: i64,
        total_marks_maximum: i32,
        started_at: DateTime<Utc>,
    ) -> Result<QuizSubmission, AppError> {
        let mut inner = self.lock();

        let latest = inner
            .submissions
            .values()
            .filter(|s| s.user_id == user_id && s.quiz_id == quiz_id && !s.is_deleted)
            .map(|s| s.attempt_number)
            .max()
            .unwrap_or(0);

        inner.next_submission_id += 1;
        let submission = QuizSubmission {
            id: inner.next_submission_id,
            user_id: user_id.to_string(),
            quiz_id,
            attempt_number: latest + 1,
            status: SubmissionStatus::InProgress,
            answers: Json(Vec::new()),
            total_marks_maximum,
            total_marks_obtained: 0,
            correct_answers_count: 0,
            wrong_answers_count: 0,
            unattempted_count: 0,
            percentage_score: 0.0,
            started_at,
            submitted_at: None,
            time_spent_seconds: 0,
            is_deleted: false,
        };
        inner.submissions.insert(submission.id, submission.clone());

        Ok(submission)
    }

    async fn find_submission(&self, submission_id: i64) -> Result<Option<QuizSubmission>, AppError> {
        Ok(self
            .lock()
            .submissions
            .get(&submission_id)
            .filter(|s| !s.is_deleted)
            .cloned())
    }

    async fn list_submissions(
        &self,
        user_id: &str,
        quiz_id: i64,
    ) -> Result<Vec<QuizSubmission>, AppError> {
        let mut submissions: Vec<QuizSubmission> = self
            .lock()
            .submissions
            .values()
            .filter(|s| s.user_id == user_id && s.quiz_id == quiz_id && !s.is_deleted)
            .cloned()
            .collect();
        submissions.sort_by_key(|s| s.attempt_number);
        Ok(submissions)
    }

    async fn save_answers(
        &self,
        submission_id: i64,
        answers: Vec<SubmittedAnswer>,
        submitted_at: DateTime<Utc>,
    ) -> Result<Option<QuizSubmission>, AppError> {
        let mut inner = self.lock();
        let Some(submission) = inner
            .submissions
            .get_mut(&submission_id)
            .filter(|s| !s.is_deleted && s.status != SubmissionStatus::Evaluated)
        else {
            return Ok(None);
        };

        submission.answers = Json(answers);
        submission.submitted_at = Some(submitted_at);
        submission.status = SubmissionStatus::Submitted;
        Ok(Some(submission.clone()))
    }

    async fn save_evaluation(
        &self,
        submission_id: i64,
        result: &EvaluationResult,
    ) -> Result<Option<QuizSubmission>, AppError> {
        let mut inner = self.lock();
        let Some(submission) = inner
            .submissions
            .get_mut(&submission_id)
            .filter(|s| !s.is_deleted)
        else {
            return Ok(None);
        };

        submission.answers = Json(result.answers.clone());
        submission.total_marks_obtained = result.total_marks_obtained;
        submission.correct_answers_count = result.correct_answers_count;
        submission.wrong_answers_count = result.wrong_answers_count;
        submission.unattempted_count = result.unattempted_count;
        submission.percentage_score = result.percentage_score;
        submission.time_spent_seconds = result.time_spent_seconds;
        submission.status = SubmissionStatus::Evaluated;
        Ok(Some(submission.clone()))
    }
}
