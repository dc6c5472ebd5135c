// src/models/assignment.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'assignments' table in the database.
/// Dates are kept as opaque strings supplied by the client.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: String,
    pub course: String,
    pub title: String,
    pub description: Option<String>,
    pub points: i64,
    pub due_date: Option<String>,
    pub available_from: Option<String>,
    pub available_until: Option<String>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new assignment.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignmentRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    pub points: Option<i64>,
    pub due_date: Option<String>,
    pub available_from: Option<String>,
    pub available_until: Option<String>,
}

/// DTO for updating an assignment. Fields are optional.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssignmentRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub points: Option<i64>,
    pub due_date: Option<String>,
    pub available_from: Option<String>,
    pub available_until: Option<String>,
}
