// src/handlers/quiz.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::submission::StartAttemptResponse,
    services::attempt,
    store::QuizStore,
    utils::jwt::Claims,
};

/// Returns the quiz paper: metadata and questions without correct answers.
pub async fn get_quiz(
    State(store): State<Arc<dyn QuizStore>>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let paper = attempt::quiz_paper(store.as_ref(), quiz_id).await?;
    Ok(Json(paper))
}

/// Starts a new attempt for the authenticated user.
///
/// * Fails with 404 if the quiz does not exist.
/// * The maximum marks are frozen into the submission at this point.
/// * Returns 201 Created with the submission and the paper to answer.
pub async fn start_quiz(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let paper = attempt::quiz_paper(store.as_ref(), quiz_id).await?;

    let submission =
        attempt::start_attempt(store.as_ref(), &claims.sub, quiz_id, paper.total_marks).await?;

    Ok((
        StatusCode::CREATED,
        Json(StartAttemptResponse {
            submission,
            quiz: paper,
        }),
    ))
}

/// Lists the authenticated user's attempts on a quiz, oldest first.
pub async fn list_attempts(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempts = store.list_submissions(&claims.sub, quiz_id).await?;
    Ok(Json(attempts))
}
