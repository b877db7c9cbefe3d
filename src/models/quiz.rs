// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

use crate::config::DEFAULT_QUESTION_MARKS;

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: i64,
    pub title: String,

    /// Maximum obtainable marks. When unset, the sum of question marks is used.
    pub total_marks: Option<i32>,

    pub duration_minutes: i32,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A single answer option of a bank question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOption {
    pub id: i64,
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// Represents the 'quiz_questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: i64,
    pub quiz_id: i64,
    pub content: String,

    /// Stored as a JSON array in the database.
    pub options: Json<Vec<QuizOption>>,

    pub marks: Option<i32>,

    /// Display order inside the quiz.
    pub position: i32,
}

impl QuizQuestion {
    pub fn marks_or_default(&self) -> i32 {
        self.marks.unwrap_or(DEFAULT_QUESTION_MARKS)
    }
}

/// Sum of question marks, used when the quiz carries no explicit total.
pub fn total_marks_for(quiz: &Quiz, questions: &[QuizQuestion]) -> i32 {
    quiz.total_marks
        .unwrap_or_else(|| questions.iter().map(QuizQuestion::marks_or_default).sum())
}

/// Option as sent to the client (correctness flag stripped).
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicOption {
    pub id: i64,
    pub text: String,
}

/// DTO for sending a question to the client.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: i64,
    pub content: String,
    pub options: Vec<PublicOption>,
    pub marks: i32,
}

impl From<QuizQuestion> for PublicQuestion {
    fn from(q: QuizQuestion) -> Self {
        let marks = q.marks_or_default();
        PublicQuestion {
            id: q.id,
            content: q.content,
            options: q
                .options
                .0
                .into_iter()
                .map(|o| PublicOption {
                    id: o.id,
                    text: o.text,
                })
                .collect(),
            marks,
        }
    }
}

/// DTO for returning a quiz paper.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizPaper {
    pub id: i64,
    pub title: String,
    pub duration_minutes: i32,
    pub total_marks: i32,
    pub questions: Vec<PublicQuestion>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: i64, marks: Option<i32>) -> QuizQuestion {
        QuizQuestion {
            id,
            quiz_id: 1,
            content: format!("Q{id}"),
            options: Json(vec![QuizOption {
                id: 1,
                text: "A".to_string(),
                is_correct: true,
            }]),
            marks,
            position: id as i32,
        }
    }

    fn quiz(total_marks: Option<i32>) -> Quiz {
        Quiz {
            id: 1,
            title: "Mock".to_string(),
            total_marks,
            duration_minutes: 30,
            created_at: None,
        }
    }

    #[test]
    fn explicit_total_marks_win() {
        let questions = vec![question(1, Some(5)), question(2, None)];
        assert_eq!(total_marks_for(&quiz(Some(20)), &questions), 20);
    }

    #[test]
    fn total_marks_fall_back_to_question_sum() {
        let questions = vec![question(1, Some(5)), question(2, None)];
        assert_eq!(total_marks_for(&quiz(None), &questions), 6);
    }

    #[test]
    fn public_question_hides_correctness() {
        let public = PublicQuestion::from(question(1, None));
        let json = serde_json::to_value(&public).unwrap();
        assert!(json["options"][0].get("isCorrect").is_none());
        assert_eq!(json["marks"], 1);
    }
}
