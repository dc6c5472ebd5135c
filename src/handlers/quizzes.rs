// src/handlers/quizzes.rs
//
// Quiz CRUD, embedded question mutation with point recalculation, and
// the student submission flow (attempt tracking + grading).

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::{Value, json};
use sqlx::{PgPool, types::Json as Jsonb};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    grading::grade_quiz,
    models::{
        quiz::{CreateQuizRequest, PublishRequest, Quiz, UpdateQuizRequest},
        submission::{SubmitQuizRequest, Submission},
        user::User,
    },
    utils::session::CurrentUser,
};

const QUIZ_COLUMNS: &str = "id, course, title, description, points, \
    is_published, multiple_attempts, how_many_attempts, questions, created_at";

const SUBMISSION_COLUMNS: &str =
    "id, quiz, student, attempt_number, score, submitted, answers, created_at";

fn require_faculty(user: &User) -> Result<(), AppError> {
    if user.is_faculty_or_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Faculty privilege required.".to_string(),
        ))
    }
}

async fn fetch_quiz(pool: &PgPool, quiz_id: &str) -> Result<Option<Quiz>, AppError> {
    let quiz =
        sqlx::query_as::<_, Quiz>(&format!("SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = $1"))
            .bind(quiz_id)
            .fetch_optional(pool)
            .await?;
    Ok(quiz)
}

/// Recomputes a quiz's total points from its embedded question list and
/// stores the sum, all in one statement. The write bypasses every other
/// code path that touches quizzes and never loads the document. Returns
/// 0 without error when the quiz no longer exists: the question mutation
/// that triggered the recalculation is already committed, so there is
/// nothing left to fix.
async fn recalculate_points(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<i64, AppError> {
    let total = sqlx::query_scalar::<_, i64>(
        "UPDATE quizzes \
         SET points = COALESCE(( \
             SELECT SUM(COALESCE((q->>'points')::BIGINT, 0)) \
             FROM jsonb_array_elements(questions) AS q), 0) \
         WHERE id = $1 \
         RETURNING points",
    )
    .bind(quiz_id)
    .fetch_optional(executor)
    .await?;

    Ok(total.unwrap_or(0))
}

/// Highest-attempt submission for a quiz + student pair, if any.
async fn find_last_submission_for_user(
    pool: &PgPool,
    quiz_id: &str,
    student_id: &str,
) -> Result<Option<Submission>, AppError> {
    let submission = sqlx::query_as::<_, Submission>(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM quiz_submissions \
         WHERE quiz = $1 AND student = $2 \
         ORDER BY attempt_number DESC \
         LIMIT 1"
    ))
    .bind(quiz_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await?;
    Ok(submission)
}

/// Question point values must be non-negative integers when supplied.
fn validate_question_points(payload: &serde_json::Map<String, Value>) -> Result<(), AppError> {
    match payload.get("points") {
        None | Some(Value::Null) => Ok(()),
        Some(value) if value.as_i64().is_some_and(|p| p >= 0) => Ok(()),
        Some(_) => Err(AppError::BadRequest(
            "points must be a non-negative integer".to_string(),
        )),
    }
}

/// Merges the supplied fields into the embedded question matching
/// `question_id`. Only the supplied keys are touched, sibling fields of
/// the question survive, and the id itself is immutable. Returns false
/// when no question matches.
fn merge_question_updates(
    questions: &mut [Value],
    question_id: &str,
    updates: &serde_json::Map<String, Value>,
) -> bool {
    for question in questions.iter_mut() {
        let matches = question.get("id").and_then(Value::as_str) == Some(question_id);
        if !matches {
            continue;
        }
        if let Some(fields) = question.as_object_mut() {
            for (key, value) in updates {
                if key != "id" {
                    fields.insert(key.clone(), value.clone());
                }
            }
            return true;
        }
    }
    false
}

// --- Quiz CRUD (Faculty/Admin) ---

/// Creates a new quiz in a course. Defaults: title "New Quiz", zero
/// points, unpublished, no questions.
pub async fn create_quiz_for_course(
    State(pool): State<PgPool>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(course_id): Path<String>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_faculty(&current)?;

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let quiz = sqlx::query_as::<_, Quiz>(&format!(
        "INSERT INTO quizzes \
            (id, course, title, description, multiple_attempts, how_many_attempts) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {QUIZ_COLUMNS}"
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(&course_id)
    .bind(payload.title.unwrap_or_else(|| "New Quiz".to_string()))
    .bind(payload.description)
    .bind(payload.multiple_attempts.unwrap_or(false))
    .bind(payload.how_many_attempts.unwrap_or(1))
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("foreign key") {
            AppError::NotFound("Course not found".to_string())
        } else {
            tracing::error!("Failed to create quiz: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Updates quiz details with field-level partial updates. The derived
/// `points` total is not updatable here.
pub async fn update_quiz(
    State(pool): State<PgPool>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(quiz_id): Path<String>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_faculty(&current)?;

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let quiz = sqlx::query_as::<_, Quiz>(&format!(
        "UPDATE quizzes SET \
            title = COALESCE($1, title), \
            description = COALESCE($2, description), \
            multiple_attempts = COALESCE($3, multiple_attempts), \
            how_many_attempts = COALESCE($4, how_many_attempts) \
         WHERE id = $5 \
         RETURNING {QUIZ_COLUMNS}"
    ))
    .bind(payload.title)
    .bind(payload.description)
    .bind(payload.multiple_attempts)
    .bind(payload.how_many_attempts)
    .bind(&quiz_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(quiz))
}

/// Deletes a quiz together with every submission referencing it, in one
/// transaction so a failure cannot strand orphaned submissions.
pub async fn delete_quiz(
    State(pool): State<PgPool>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(quiz_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    require_faculty(&current)?;

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM quiz_submissions WHERE quiz = $1")
        .bind(&quiz_id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
        .bind(&quiz_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Toggles the publish flag.
pub async fn update_quiz_publish_status(
    State(pool): State<PgPool>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(quiz_id): Path<String>,
    Json(payload): Json<PublishRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_faculty(&current)?;

    let quiz = sqlx::query_as::<_, Quiz>(&format!(
        "UPDATE quizzes SET is_published = $1 WHERE id = $2 RETURNING {QUIZ_COLUMNS}"
    ))
    .bind(payload.is_published)
    .bind(&quiz_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(quiz))
}

// --- Quiz Retrieval (Faculty/Student) ---

/// Lists the quizzes of a course. Faculty sees everything; everyone
/// else only published quizzes, and students get their last score
/// attached to each entry.
pub async fn find_quizzes_for_course(
    State(pool): State<PgPool>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let is_faculty = current.is_faculty_or_admin();

    let quizzes = if is_faculty {
        sqlx::query_as::<_, Quiz>(&format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE course = $1 ORDER BY created_at"
        ))
        .bind(&course_id)
        .fetch_all(&pool)
        .await?
    } else {
        sqlx::query_as::<_, Quiz>(&format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes \
             WHERE course = $1 AND is_published = TRUE \
             ORDER BY created_at"
        ))
        .bind(&course_id)
        .fetch_all(&pool)
        .await?
    };

    if !current.is_student() {
        return Ok(Json(quizzes).into_response());
    }

    // Enrich each quiz with the student's last score.
    let mut enriched = Vec::with_capacity(quizzes.len());
    for quiz in quizzes {
        let last_score = sqlx::query_scalar::<_, i64>(
            "SELECT score FROM quiz_submissions \
             WHERE quiz = $1 AND student = $2 \
             ORDER BY attempt_number DESC \
             LIMIT 1",
        )
        .bind(&quiz.id)
        .bind(&current.id)
        .fetch_optional(&pool)
        .await?;

        let mut value = serde_json::to_value(&quiz)?;
        value["lastScore"] = json!(last_score);
        enriched.push(value);
    }

    Ok(Json(enriched).into_response())
}

/// Fetches a single quiz. Faculty sees the full document including the
/// answer keys; students only get published quizzes with the
/// correctAnswer/correctAnswers fields stripped from every question,
/// plus their last submission.
pub async fn find_quiz_by_id(
    State(pool): State<PgPool>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(quiz_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, &quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let is_faculty = current.is_faculty_or_admin();

    if !is_faculty && !quiz.is_published {
        return Err(AppError::Forbidden(
            "This quiz is not published.".to_string(),
        ));
    }

    if !current.is_student() {
        return Ok(Json(quiz).into_response());
    }

    let last_submission = find_last_submission_for_user(&pool, &quiz_id, &current.id).await?;

    let mut value = serde_json::to_value(&quiz)?;
    if let Some(questions) = value.get_mut("questions").and_then(Value::as_array_mut) {
        for question in questions {
            if let Some(fields) = question.as_object_mut() {
                fields.remove("correctAnswer");
                fields.remove("correctAnswers");
            }
        }
    }
    value["lastSubmission"] = serde_json::to_value(&last_submission)?;

    Ok(Json(value).into_response())
}

// --- Embedded Question Management (Faculty/Admin) ---

/// Appends a new question to the quiz's embedded list and recomputes
/// the total. A missing point value defaults to 10 at creation (grading
/// treats missing points as 0; the two defaults are deliberate and
/// distinct).
pub async fn create_question(
    State(pool): State<PgPool>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(quiz_id): Path<String>,
    Json(mut payload): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    require_faculty(&current)?;

    let question = payload
        .as_object_mut()
        .ok_or(AppError::BadRequest("Question must be an object".to_string()))?;

    validate_question_points(question)?;

    question.insert("id".to_string(), json!(Uuid::new_v4().to_string()));
    if !matches!(question.get("points"), Some(Value::Number(_))) {
        question.insert("points".to_string(), json!(10));
    }

    let result = sqlx::query("UPDATE quizzes SET questions = questions || $2 WHERE id = $1")
        .bind(&quiz_id)
        .bind(Jsonb(&payload))
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    recalculate_points(&pool, &quiz_id).await?;

    Ok((StatusCode::CREATED, Json(payload)))
}

/// Applies a field-level partial update to one embedded question, then
/// recomputes the total. Fields not present in the payload are left
/// untouched.
///
/// The read, merge and write-back run in one transaction with the quiz
/// row locked, so a concurrent question append or edit cannot be
/// clobbered by this rewrite of the questions array.
pub async fn update_question(
    State(pool): State<PgPool>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path((quiz_id, question_id)): Path<(String, String)>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    require_faculty(&current)?;

    let updates = payload
        .as_object()
        .ok_or(AppError::BadRequest("Question updates must be an object".to_string()))?;

    validate_question_points(updates)?;

    let mut tx = pool.begin().await?;

    let questions = sqlx::query_scalar::<_, Jsonb<Value>>(
        "SELECT questions FROM quizzes WHERE id = $1 FOR UPDATE",
    )
    .bind(&quiz_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let mut questions = questions.0;
    let found = questions
        .as_array_mut()
        .map(|list| merge_question_updates(list, &question_id, updates))
        .unwrap_or(false);

    if !found {
        return Err(AppError::NotFound("Quiz or Question not found".to_string()));
    }

    sqlx::query("UPDATE quizzes SET questions = $2 WHERE id = $1")
        .bind(&quiz_id)
        .bind(Jsonb(&questions))
        .execute(&mut *tx)
        .await?;

    recalculate_points(&mut *tx, &quiz_id).await?;

    tx.commit().await?;

    // Return the updated quiz so the client can refresh its points.
    let quiz = fetch_quiz(&pool, &quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(quiz))
}

/// Removes a question from the embedded list in a single statement and
/// recomputes the total. Deleting an already-absent question is not an
/// error as long as the quiz exists.
pub async fn delete_question(
    State(pool): State<PgPool>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path((quiz_id, question_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    require_faculty(&current)?;

    let result = sqlx::query(
        "UPDATE quizzes \
         SET questions = COALESCE(( \
             SELECT jsonb_agg(q) FROM jsonb_array_elements(questions) AS q \
             WHERE COALESCE(q->>'id', '') <> $2), '[]'::jsonb) \
         WHERE id = $1",
    )
    .bind(&quiz_id)
    .bind(&question_id)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    recalculate_points(&pool, &quiz_id).await?;

    let quiz = fetch_quiz(&pool, &quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(quiz))
}

// --- Submissions (Student) ---

/// Grades and records a quiz attempt.
///
/// The attempt limit is checked before any grading happens, so a
/// rejected request has no side effects. Attempt-number assignment and
/// the limit are enforced again inside a single INSERT statement, which
/// together with the unique (quiz, student, attempt_number) index keeps
/// concurrent submissions from minting duplicate attempt numbers or
/// sneaking past the limit.
pub async fn submit_quiz(
    State(pool): State<PgPool>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(quiz_id): Path<String>,
    Json(payload): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !current.is_student() {
        return Err(AppError::Forbidden(
            "Only students can submit a quiz.".to_string(),
        ));
    }

    let quiz = fetch_quiz(&pool, &quiz_id).await?;
    let quiz = match quiz {
        Some(quiz) if quiz.is_published => quiz,
        _ => {
            return Err(AppError::NotFound(
                "Quiz not found or not available.".to_string(),
            ));
        }
    };

    let max_attempts = quiz.max_attempts();
    let last = find_last_submission_for_user(&pool, &quiz_id, &current.id).await?;
    let current_attempts = last.map(|s| s.attempt_number).unwrap_or(0);

    if current_attempts >= max_attempts {
        return Err(AppError::Forbidden(format!(
            "You have exhausted your attempts. Max attempts: {}.",
            max_attempts
        )));
    }

    let outcome = grade_quiz(&quiz.questions.0, &payload.answers);

    let submission = sqlx::query_as::<_, Submission>(&format!(
        "WITH next_attempt AS ( \
             SELECT COALESCE(MAX(attempt_number), 0) + 1 AS n \
             FROM quiz_submissions WHERE quiz = $1 AND student = $2 \
         ) \
         INSERT INTO quiz_submissions \
             (id, quiz, student, attempt_number, score, submitted, answers) \
         SELECT $1 || '-' || $2 || '-' || n::TEXT, $1, $2, n, $3, TRUE, $4 \
         FROM next_attempt \
         WHERE n <= $5 \
         RETURNING {SUBMISSION_COLUMNS}"
    ))
    .bind(&quiz_id)
    .bind(&current.id)
    .bind(outcome.score)
    .bind(Jsonb(&outcome.answers))
    .bind(max_attempts)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        // A concurrent duplicate attempt trips the unique index (23505).
        if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
            AppError::Conflict("Submission already recorded for this attempt".to_string())
        } else {
            tracing::error!("Failed to record submission: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?
    .ok_or_else(|| {
        AppError::Forbidden(format!(
            "You have exhausted your attempts. Max attempts: {}.",
            max_attempts
        ))
    })?;

    Ok(Json(submission))
}

/// Returns the student's most recent submission for a quiz.
pub async fn find_last_submission(
    State(pool): State<PgPool>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(quiz_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !current.is_student() {
        return Err(AppError::Forbidden(
            "Only students can view their own last submission.".to_string(),
        ));
    }

    let submission = find_last_submission_for_user(&pool, &quiz_id, &current.id)
        .await?
        .ok_or(AppError::NotFound(
            "No submission found for this quiz.".to_string(),
        ))?;

    Ok(Json(submission))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_updates_only_supplied_fields() {
        let mut questions = vec![
            json!({"id": "q1", "questionType": "TRUE_FALSE", "points": 10, "correctAnswer": "True"}),
            json!({"id": "q2", "questionType": "MULTIPLE_CHOICE", "points": 5, "correctAnswer": "B", "prompt": "Pick B"}),
        ];
        let updates = json!({"points": 20, "id": "evil"});
        let found = merge_question_updates(
            &mut questions,
            "q2",
            updates.as_object().unwrap(),
        );

        assert!(found);
        // Supplied field updated, siblings untouched, id immutable.
        assert_eq!(questions[1]["points"], 20);
        assert_eq!(questions[1]["correctAnswer"], "B");
        assert_eq!(questions[1]["prompt"], "Pick B");
        assert_eq!(questions[1]["id"], "q2");
        // The other question is untouched entirely.
        assert_eq!(questions[0]["points"], 10);
    }

    #[test]
    fn merge_reports_missing_question() {
        let mut questions = vec![json!({"id": "q1", "points": 10})];
        let updates = json!({"points": 1});
        assert!(!merge_question_updates(
            &mut questions,
            "nope",
            updates.as_object().unwrap(),
        ));
    }

    #[test]
    fn question_points_validation() {
        let ok = json!({"points": 10});
        assert!(validate_question_points(ok.as_object().unwrap()).is_ok());

        let absent = json!({"title": "x"});
        assert!(validate_question_points(absent.as_object().unwrap()).is_ok());

        for bad in [json!({"points": -1}), json!({"points": 2.5}), json!({"points": "ten"})] {
            assert!(validate_question_points(bad.as_object().unwrap()).is_err());
        }
    }
}
