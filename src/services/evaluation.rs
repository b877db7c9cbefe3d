// src/services/evaluation.rs

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        quiz::QuizQuestion,
        submission::{EvaluationResult, QuizSubmission, SubmissionStatus, SubmittedAnswer},
    },
    store::QuizStore,
};

/// Outcome of scoring a single answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Correct(i32),
    Wrong,
    Unattempted,
}

fn judge(answer: &SubmittedAnswer, question: Option<&QuizQuestion>) -> Verdict {
    if !answer.is_attempted() {
        return Verdict::Unattempted;
    }

    let Some(question) = question else {
        // An attempted answer that cannot be matched to the bank is never
        // credited.
        tracing::warn!(
            question_id = ?answer.question_id,
            "Answer references a question outside the quiz bank, scoring as wrong"
        );
        return Verdict::Wrong;
    };

    let correct = match answer.selected_option_id {
        Some(option_id) => question
            .options
            .iter()
            .find(|o| o.id == option_id)
            .is_some_and(|o| o.is_correct),
        None => answer.answer_text.as_deref().is_some_and(|text| {
            let text = text.trim();
            question
                .options
                .iter()
                .any(|o| o.is_correct && o.text.trim().eq_ignore_ascii_case(text))
        }),
    };

    if correct {
        Verdict::Correct(question.marks_or_default())
    } else {
        Verdict::Wrong
    }
}

/// `obtained / maximum * 100`, or 0 when the maximum is not positive.
pub fn percentage(obtained: i32, maximum: i32) -> f64 {
    if maximum <= 0 {
        return 0.0;
    }
    f64::from(obtained) / f64::from(maximum) * 100.0
}

/// Whole seconds between start and submission, 0 when not yet submitted.
pub fn time_spent(started_at: DateTime<Utc>, submitted_at: Option<DateTime<Utc>>) -> i64 {
    submitted_at
        .map(|end| (end - started_at).num_seconds().max(0))
        .unwrap_or(0)
}

/// Scores stored answers against the question bank of the quiz.
///
/// Only the answer identifiers and texts are read, never earlier verdicts, so
/// scoring the same submission twice yields the same result. Bank questions
/// without an attempted answer count as unattempted, so that count never
/// exceeds the bank size. When several answers name the same question only
/// the first one is scored.
pub fn score_answers(
    answers: &[SubmittedAnswer],
    bank: &[QuizQuestion],
    total_marks_maximum: i32,
    started_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
) -> EvaluationResult {
    let by_id: HashMap<i64, &QuizQuestion> = bank.iter().map(|q| (q.id, q)).collect();
    let mut seen: HashSet<i64> = HashSet::new();

    let mut obtained = 0;
    let mut correct_count = 0;
    let mut wrong_count = 0;
    let mut unattempted_count = 0;
    let mut scored = Vec::with_capacity(answers.len());

    for answer in answers {
        let mut answer = answer.clone();

        if let Some(id) = answer.question_id {
            if !seen.insert(id) {
                tracing::debug!(question_id = id, "Ignoring duplicate answer");
                answer.is_correct = Some(false);
                answer.marks_awarded = Some(0);
                scored.push(answer);
                continue;
            }
        }

        let question = answer.question_id.and_then(|id| by_id.get(&id).copied());
        let (is_correct, marks) = match judge(&answer, question) {
            Verdict::Correct(marks) => {
                correct_count += 1;
                obtained += marks;
                (true, marks)
            }
            Verdict::Wrong => {
                wrong_count += 1;
                (false, 0)
            }
            // Only bank questions are tallied as unattempted; an empty entry
            // pointing nowhere is kept but not counted.
            Verdict::Unattempted if question.is_none() => (false, 0),
            Verdict::Unattempted => {
                unattempted_count += 1;
                (false, 0)
            }
        };

        answer.is_correct = Some(is_correct);
        answer.marks_awarded = Some(marks);
        scored.push(answer);
    }

    unattempted_count += bank.iter().filter(|q| !seen.contains(&q.id)).count() as i32;

    EvaluationResult {
        answers: scored,
        total_marks_obtained: obtained,
        correct_answers_count: correct_count,
        wrong_answers_count: wrong_count,
        unattempted_count,
        percentage_score: percentage(obtained, total_marks_maximum),
        time_spent_seconds: time_spent(started_at, submitted_at),
    }
}

/// Loads a submission and its quiz bank, scores it and persists the result
/// with status `evaluated`. Safe to call repeatedly once answers were
/// submitted; an attempt still in progress is a `Conflict`.
pub async fn evaluate(store: &dyn QuizStore, submission_id: i64) -> Result<QuizSubmission, AppError> {
    let submission = store
        .find_submission(submission_id)
        .await?
        .ok_or(AppError::NotFound("Submission not found".to_string()))?;

    if !submission.status.can_transition_to(SubmissionStatus::Evaluated) {
        return Err(AppError::Conflict(format!(
            "Submission is still {}, submit answers first",
            submission.status.as_str()
        )));
    }

    let bank = store.list_questions(submission.quiz_id).await?;
    if bank.is_empty() && store.find_quiz(submission.quiz_id).await?.is_none() {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    let result = score_answers(
        &submission.answers.0,
        &bank,
        submission.total_marks_maximum,
        submission.started_at,
        submission.submitted_at,
    );

    let evaluated = store
        .save_evaluation(submission_id, &result)
        .await?
        .ok_or(AppError::NotFound("Submission not found".to_string()))?;

    tracing::info!(
        submission_id,
        obtained = evaluated.total_marks_obtained,
        maximum = evaluated.total_marks_maximum,
        "Submission evaluated"
    );

    Ok(evaluated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz::QuizOption;
    use chrono::{Duration, TimeZone};
    use sqlx::types::Json;

    fn question(id: i64, marks: Option<i32>) -> QuizQuestion {
        QuizQuestion {
            id,
            quiz_id: 1,
            content: format!("Question {id}"),
            options: Json(vec![
                QuizOption {
                    id: id * 10 + 1,
                    text: "Right".to_string(),
                    is_correct: true,
                },
                QuizOption {
                    id: id * 10 + 2,
                    text: "Wrong".to_string(),
                    is_correct: false,
                },
            ]),
            marks,
            position: id as i32,
        }
    }

    fn answer(question_id: i64, option_id: Option<i64>) -> SubmittedAnswer {
        SubmittedAnswer {
            question_id: Some(question_id),
            selected_option_id: option_id,
            ..Default::default()
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn half_marks_with_one_unattempted() {
        let bank = vec![question(1, Some(5)), question(2, Some(5))];
        let answers = vec![answer(1, Some(11)), answer(2, None)];

        let result = score_answers(&answers, &bank, 10, start(), None);

        assert_eq!(result.total_marks_obtained, 5);
        assert_eq!(result.correct_answers_count, 1);
        assert_eq!(result.wrong_answers_count, 0);
        assert_eq!(result.unattempted_count, 1);
        assert_eq!(result.percentage_score, 50.0);
    }

    #[test]
    fn question_without_answer_entry_is_unattempted() {
        let bank = vec![question(1, Some(5)), question(2, Some(5))];
        let answers = vec![answer(1, Some(11))];

        let result = score_answers(&answers, &bank, 10, start(), None);

        assert_eq!(result.unattempted_count, 1);
        assert_eq!(result.percentage_score, 50.0);
    }

    #[test]
    fn zero_maximum_gives_zero_percentage() {
        let bank = vec![question(1, None)];
        let answers = vec![answer(1, Some(11))];

        let result = score_answers(&answers, &bank, 0, start(), None);

        assert_eq!(result.total_marks_obtained, 1);
        assert_eq!(result.percentage_score, 0.0);
    }

    #[test]
    fn wrong_option_scores_nothing() {
        let bank = vec![question(1, Some(4))];
        let result = score_answers(&[answer(1, Some(12))], &bank, 4, start(), None);

        assert_eq!(result.wrong_answers_count, 1);
        assert_eq!(result.total_marks_obtained, 0);
        assert_eq!(result.answers[0].is_correct, Some(false));
        assert_eq!(result.answers[0].marks_awarded, Some(0));
    }

    #[test]
    fn unknown_option_scores_as_wrong() {
        let bank = vec![question(1, None)];
        let result = score_answers(&[answer(1, Some(999))], &bank, 1, start(), None);

        assert_eq!(result.wrong_answers_count, 1);
    }

    #[test]
    fn missing_question_reference_is_not_credited() {
        let bank = vec![question(1, None)];
        let answers = vec![
            answer(42, Some(421)),
            SubmittedAnswer {
                question_id: None,
                selected_option_id: Some(11),
                ..Default::default()
            },
        ];

        let result = score_answers(&answers, &bank, 1, start(), None);

        assert_eq!(result.total_marks_obtained, 0);
        assert_eq!(result.wrong_answers_count, 2);
        // Question 1 itself was never answered.
        assert_eq!(result.unattempted_count, 1);
    }

    #[test]
    fn empty_entries_outside_the_bank_are_not_tallied() {
        let bank = vec![question(1, Some(5)), question(2, Some(5))];
        let answers = vec![
            answer(1, Some(11)),
            answer(42, None),
            SubmittedAnswer::default(),
        ];

        let result = score_answers(&answers, &bank, 10, start(), None);

        assert_eq!(result.unattempted_count, 1);
        assert_eq!(result.wrong_answers_count, 0);
        assert_eq!(result.correct_answers_count, 1);
        assert_eq!(result.answers.len(), 3);
        assert_eq!(result.answers[2].marks_awarded, Some(0));
    }

    #[test]
    fn free_text_matches_correct_option_text() {
        let bank = vec![question(1, Some(2))];
        let answers = vec![SubmittedAnswer {
            question_id: Some(1),
            answer_text: Some("  right ".to_string()),
            ..Default::default()
        }];

        let result = score_answers(&answers, &bank, 2, start(), None);

        assert_eq!(result.correct_answers_count, 1);
        assert_eq!(result.total_marks_obtained, 2);
    }

    #[test]
    fn duplicate_answers_are_scored_once() {
        let bank = vec![question(1, Some(3)), question(2, Some(3))];
        let answers = vec![answer(1, Some(11)), answer(1, Some(11)), answer(1, Some(12))];

        let result = score_answers(&answers, &bank, 6, start(), None);

        assert_eq!(result.total_marks_obtained, 3);
        assert_eq!(result.correct_answers_count, 1);
        assert_eq!(result.wrong_answers_count, 0);
        assert_eq!(result.unattempted_count, 1);
        assert_eq!(result.answers[1].marks_awarded, Some(0));
    }

    #[test]
    fn rescoring_ignores_previous_verdicts() {
        let bank = vec![question(1, Some(5)), question(2, Some(5))];
        let answers = vec![answer(1, Some(11)), answer(2, Some(22))];
        let submitted = Some(start() + Duration::seconds(95));

        let first = score_answers(&answers, &bank, 10, start(), submitted);
        let second = score_answers(&first.answers, &bank, 10, start(), submitted);

        assert_eq!(first, second);
    }

    #[test]
    fn time_spent_uses_submission_time() {
        assert_eq!(time_spent(start(), None), 0);
        assert_eq!(time_spent(start(), Some(start() + Duration::milliseconds(61_900))), 61);
    }
}
