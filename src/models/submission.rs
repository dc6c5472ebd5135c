// src/models/submission.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

/// One answer as submitted by the student.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub question_id: String,
    /// Absent answers are never correct.
    #[serde(default)]
    pub student_answer: Option<String>,
}

/// A submitted answer annotated with its grading result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedAnswer {
    pub question_id: String,
    pub student_answer: Option<String>,
    pub is_correct: bool,
}

/// Represents the 'quiz_submissions' table in the database.
///
/// Identity is deterministic ("{quiz}-{student}-{attempt}") and rows are
/// immutable once created; a retake supersedes with a higher attempt
/// number rather than mutating an existing row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub quiz: String,
    pub student: String,
    pub attempt_number: i32,
    pub score: i64,
    pub submitted: bool,
    pub answers: Json<Vec<GradedAnswer>>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for the submit endpoint.
#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    #[serde(default)]
    pub answers: Vec<SubmittedAnswer>,
}
