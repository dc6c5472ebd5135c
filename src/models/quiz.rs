// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Question type tags, stored as plain strings inside the embedded
/// question documents. Unknown tags grade as incorrect instead of
/// failing deserialization.
pub mod question_types {
    pub const MULTIPLE_CHOICE: &str = "MULTIPLE_CHOICE";
    pub const TRUE_FALSE: &str = "TRUE_FALSE";
    pub const FILL_IN_THE_BLANK: &str = "FILL_IN_THE_BLANK";
}

/// A question embedded in a quiz document.
///
/// Owned exclusively by its quiz; there is no standalone questions table.
/// The flattened `extra` map carries any additional fields the client
/// stores on a question (prompt text, choices, ...) so partial updates
/// never drop them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(default)]
    pub id: String,

    /// One of MULTIPLE_CHOICE, TRUE_FALSE, FILL_IN_THE_BLANK.
    #[serde(default)]
    pub question_type: String,

    /// Missing points count as 0 when grading and summing totals.
    /// (Creation defaults a missing value to 10 — see create_question.)
    #[serde(default)]
    pub points: i64,

    /// Single correct answer for MULTIPLE_CHOICE / TRUE_FALSE.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,

    /// Accepted answers for FILL_IN_THE_BLANK.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answers: Option<Vec<String>>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Represents the 'quizzes' table in the database.
/// `points` is derived: always the sum of the embedded questions' points.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: String,
    pub course: String,
    pub title: String,
    pub description: Option<String>,
    pub points: i64,
    pub is_published: bool,
    pub multiple_attempts: bool,
    pub how_many_attempts: i32,
    pub questions: Json<Vec<Question>>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Quiz {
    /// Maximum number of submissions the attempt policy allows.
    pub fn max_attempts(&self) -> i32 {
        if self.multiple_attempts {
            self.how_many_attempts
        } else {
            1
        }
    }
}

/// DTO for creating a new quiz. Everything is optional; defaults mirror
/// a freshly created quiz (unpublished, zero points, no questions).
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub multiple_attempts: Option<bool>,
    #[validate(range(min = 1, message = "howManyAttempts must be at least 1."))]
    pub how_many_attempts: Option<i32>,
}

/// DTO for updating quiz details. Fields are optional; `points` is
/// deliberately absent — the total is derived, never hand-set.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub multiple_attempts: Option<bool>,
    #[validate(range(min = 1, message = "howManyAttempts must be at least 1."))]
    pub how_many_attempts: Option<i32>,
}

/// DTO for the publish toggle.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub is_published: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_wire_format_is_camel_case() {
        let json = serde_json::json!({
            "id": "q1",
            "questionType": "FILL_IN_THE_BLANK",
            "points": 5,
            "correctAnswers": ["Paris"],
            "prompt": "Capital of France?"
        });
        let q: Question = serde_json::from_value(json).unwrap();
        assert_eq!(q.question_type, question_types::FILL_IN_THE_BLANK);
        assert_eq!(q.points, 5);
        assert_eq!(q.correct_answers.as_deref(), Some(&["Paris".to_string()][..]));
        // Unknown fields survive the round trip via the flattened map.
        let back = serde_json::to_value(&q).unwrap();
        assert_eq!(back["prompt"], "Capital of France?");
    }

    #[test]
    fn question_missing_points_defaults_to_zero() {
        let q: Question = serde_json::from_value(serde_json::json!({
            "id": "q1",
            "questionType": "TRUE_FALSE",
            "correctAnswer": "True"
        }))
        .unwrap();
        assert_eq!(q.points, 0);
    }

    #[test]
    fn attempt_count_must_be_positive() {
        let zero: CreateQuizRequest = serde_json::from_value(serde_json::json!({
            "title": "Retakeable",
            "multipleAttempts": true,
            "howManyAttempts": 0
        }))
        .unwrap();
        assert!(zero.validate().is_err());

        let negative: UpdateQuizRequest =
            serde_json::from_value(serde_json::json!({ "howManyAttempts": -2 })).unwrap();
        assert!(negative.validate().is_err());

        let absent: UpdateQuizRequest =
            serde_json::from_value(serde_json::json!({ "title": "Renamed" })).unwrap();
        assert!(absent.validate().is_ok());
    }

    #[test]
    fn max_attempts_policy() {
        let mut quiz = Quiz {
            id: "q".into(),
            course: "c".into(),
            title: "New Quiz".into(),
            description: None,
            points: 0,
            is_published: true,
            multiple_attempts: false,
            how_many_attempts: 3,
            questions: Json(vec![]),
            created_at: None,
        };
        // Single-attempt quizzes cap at 1 regardless of how_many_attempts.
        assert_eq!(quiz.max_attempts(), 1);
        quiz.multiple_attempts = true;
        assert_eq!(quiz.max_attempts(), 3);
    }
}
