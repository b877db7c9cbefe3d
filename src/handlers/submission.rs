// src/handlers/submission.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::submission::SubmitAnswersRequest,
    services::{attempt, evaluation},
    store::QuizStore,
    utils::jwt::Claims,
};

/// Returns one of the authenticated user's submissions.
pub async fn get_submission(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(claims): Extension<Claims>,
    Path(submission_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let submission = attempt::owned_submission(store.as_ref(), submission_id, &claims.sub).await?;
    Ok(Json(submission))
}

/// Submits the answers of an attempt and scores it.
///
/// * Stores the answers (status `submitted`).
/// * Evaluates them against the quiz bank (status `evaluated`).
/// * Any failure is returned to the caller; the attempt is never reported as
///   complete unless evaluation succeeded.
pub async fn submit_submission(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(claims): Extension<Claims>,
    Path(submission_id): Path<i64>,
    Json(req): Json<SubmitAnswersRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    attempt::owned_submission(store.as_ref(), submission_id, &claims.sub).await?;
    attempt::submit_answers(store.as_ref(), submission_id, req.answers).await?;

    let evaluated = evaluation::evaluate(store.as_ref(), submission_id)
        .await
        .map_err(|e| {
            tracing::error!(submission_id, "Evaluation after submit failed: {}", e);
            e
        })?;

    Ok(Json(evaluated))
}

/// Re-runs evaluation of a submission. Idempotent.
pub async fn evaluate_submission(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(claims): Extension<Claims>,
    Path(submission_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    attempt::owned_submission(store.as_ref(), submission_id, &claims.sub).await?;
    let evaluated = evaluation::evaluate(store.as_ref(), submission_id).await?;
    Ok(Json(evaluated))
}
