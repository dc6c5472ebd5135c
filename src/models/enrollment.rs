// src/models/enrollment.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'enrollments' table, linking users to courses.
/// Unique per (user, course) pair.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: String,
    #[serde(rename = "user")]
    pub user_id: String,
    #[serde(rename = "course")]
    pub course_id: String,
    #[serde(rename = "createdAt")]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}
