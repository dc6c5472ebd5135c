// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

pub mod roles {
    pub const STUDENT: &str = "STUDENT";
    pub const FACULTY: &str = "FACULTY";
    pub const ADMIN: &str = "ADMIN";
    /// Legacy alias for FACULTY still present in older user rows.
    pub const INSTRUCTOR: &str = "INSTRUCTOR";
}

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,

    /// Unique username.
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,

    /// User role: 'STUDENT', 'FACULTY' or 'ADMIN'.
    pub role: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl User {
    /// Faculty and admins share the instructor-side privileges
    /// (course/quiz/question mutation, publish toggle).
    pub fn is_faculty_or_admin(&self) -> bool {
        matches!(
            self.role.as_str(),
            roles::FACULTY | roles::ADMIN | roles::INSTRUCTOR
        )
    }

    pub fn is_admin(&self) -> bool {
        self.role == roles::ADMIN
    }

    pub fn is_student(&self) -> bool {
        self.role == roles::STUDENT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_role(role: &str) -> User {
        User {
            id: "u1".into(),
            username: "alice".into(),
            password: "hash".into(),
            first_name: None,
            last_name: None,
            email: None,
            role: role.to_string(),
            created_at: None,
        }
    }

    #[test]
    fn instructor_side_roles() {
        for role in [roles::FACULTY, roles::ADMIN, roles::INSTRUCTOR] {
            assert!(user_with_role(role).is_faculty_or_admin(), "{role}");
        }
        assert!(!user_with_role(roles::STUDENT).is_faculty_or_admin());
        assert!(!user_with_role("TA").is_faculty_or_admin());
    }

    #[test]
    fn admin_and_student_checks() {
        assert!(user_with_role(roles::ADMIN).is_admin());
        assert!(!user_with_role(roles::FACULTY).is_admin());
        assert!(user_with_role(roles::STUDENT).is_student());
        assert!(!user_with_role(roles::INSTRUCTOR).is_student());
    }
}

/// DTO for signup. Role defaults to STUDENT when omitted.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub role: Option<String>,
}

/// DTO for signin.
#[derive(Debug, Deserialize, Validate)]
pub struct SigninRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for admin-created users (role can be specified directly).
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(length(min = 4, max = 128))]
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub role: Option<String>,
}

/// DTO for updating a user. Fields are optional.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}
