// src/services/attempt.rs

use chrono::Utc;
use serde_json::Value;

use crate::{
    error::AppError,
    models::{
        quiz::{PublicQuestion, QuizPaper, total_marks_for},
        submission::{AnswerInput, QuizSubmission, SubmissionStatus, SubmittedAnswer},
    },
    store::QuizStore,
};

/// Converts a client-supplied identifier into a bank id.
/// Accepts positive integers given as JSON numbers or numeric strings.
pub fn normalize_id(value: Option<&Value>) -> Option<i64> {
    let id = match value? {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    (id > 0).then_some(id)
}

/// Maps raw answers to stored answers. A malformed identifier only unsets
/// that field; the rest of the batch is kept.
pub fn normalize_answers(inputs: Vec<AnswerInput>) -> Vec<SubmittedAnswer> {
    inputs
        .into_iter()
        .map(|input| {
            let question_id = normalize_id(input.question_id.as_ref());
            if question_id.is_none() {
                tracing::debug!(raw = ?input.question_id, "Dropping malformed question id");
            }

            SubmittedAnswer {
                question_id,
                selected_option_id: normalize_id(input.selected_option_id.as_ref()),
                answer_text: input
                    .answer_text
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty()),
                is_correct: None,
                marks_awarded: None,
            }
        })
        .collect()
}

/// Builds the paper a client answers: the quiz and its questions without
/// correctness flags.
pub async fn quiz_paper(store: &dyn QuizStore, quiz_id: i64) -> Result<QuizPaper, AppError> {
    let quiz = store
        .find_quiz(quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;
    let questions = store.list_questions(quiz_id).await?;

    Ok(QuizPaper {
        id: quiz.id,
        title: quiz.title.clone(),
        duration_minutes: quiz.duration_minutes,
        total_marks: total_marks_for(&quiz, &questions),
        questions: questions.into_iter().map(PublicQuestion::from).collect(),
    })
}

/// Creates the next numbered attempt of `user_id` on `quiz_id`.
///
/// No limit on the number of attempts is enforced here.
pub async fn start_attempt(
    store: &dyn QuizStore,
    user_id: &str,
    quiz_id: i64,
    total_marks_maximum: i32,
) -> Result<QuizSubmission, AppError> {
    let submission = store
        .create_submission(user_id, quiz_id, total_marks_maximum, Utc::now())
        .await?;

    tracing::info!(
        submission_id = submission.id,
        quiz_id,
        attempt = submission.attempt_number,
        "Quiz attempt started"
    );

    Ok(submission)
}

/// Stores the answers of an attempt and marks it `submitted`. Does not score.
pub async fn submit_answers(
    store: &dyn QuizStore,
    submission_id: i64,
    answers: Vec<AnswerInput>,
) -> Result<QuizSubmission, AppError> {
    let current = store
        .find_submission(submission_id)
        .await?
        .ok_or(AppError::NotFound("Submission not found".to_string()))?;

    if !current.status.can_transition_to(SubmissionStatus::Submitted) {
        return Err(AppError::Conflict(format!(
            "Submission is already {}",
            current.status.as_str()
        )));
    }

    let answers = normalize_answers(answers);
    let count = answers.len();

    // The store re-checks the status so a concurrent evaluation cannot be undone.
    let submission = store
        .save_answers(submission_id, answers, Utc::now())
        .await?
        .ok_or(AppError::Conflict("Submission is already evaluated".to_string()))?;

    tracing::info!(submission_id, answers = count, "Answers submitted");

    Ok(submission)
}

/// Loads a submission and checks that it belongs to `user_id`.
/// Someone else's submission is reported as missing.
pub async fn owned_submission(
    store: &dyn QuizStore,
    submission_id: i64,
    user_id: &str,
) -> Result<QuizSubmission, AppError> {
    store
        .find_submission(submission_id)
        .await?
        .filter(|s| s.user_id == user_id)
        .ok_or(AppError::NotFound("Submission not found".to_string()))
}
