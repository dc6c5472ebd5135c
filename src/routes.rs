// src/routes.rs

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{assignments, auth, courses, modules, quizzes, users},
    state::AppState,
    utils::session,
};

async fn health() -> &'static str {
    "Kambaz backend is running"
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let mut origins = vec!["http://localhost:5173".parse().expect("valid origin")];
    if let Ok(origin) = state.config.client_url.parse() {
        origins.push(origin);
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .allow_credentials(true)
}

pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(health))
        .route("/api/users/signup", post(auth::signup))
        .route("/api/users/signin", post(auth::signin))
        .route("/api/users/signout", post(auth::signout));

    let protected_routes = Router::new()
        // Session + user administration
        .route("/api/users/profile", post(auth::profile))
        .route("/api/users", get(users::find_all_users))
        .route("/api/users", post(users::create_user))
        .route("/api/users/{user_id}", get(users::find_user_by_id))
        .route("/api/users/{user_id}", put(users::update_user))
        .route("/api/users/{user_id}", delete(users::delete_user))
        // Enrollments, addressed from the user side
        .route(
            "/api/users/{user_id}/courses",
            get(courses::find_courses_for_user),
        )
        .route(
            "/api/users/{user_id}/courses/{course_id}",
            post(users::enroll_user_in_course),
        )
        .route(
            "/api/users/{user_id}/courses/{course_id}",
            delete(users::unenroll_user_from_course),
        )
        // Courses
        .route("/api/courses", get(courses::find_all_courses))
        .route("/api/courses", post(courses::create_course))
        .route("/api/courses/{course_id}", put(courses::update_course))
        .route("/api/courses/{course_id}", delete(courses::delete_course))
        .route(
            "/api/courses/{course_id}/users",
            get(courses::find_users_for_course),
        )
        // Modules
        .route(
            "/api/courses/{course_id}/modules",
            get(modules::find_modules_for_course),
        )
        .route(
            "/api/courses/{course_id}/modules",
            post(modules::create_module_for_course),
        )
        .route("/api/modules/{module_id}", put(modules::update_module))
        .route("/api/modules/{module_id}", delete(modules::delete_module))
        // Assignments
        .route(
            "/api/courses/{course_id}/assignments",
            get(assignments::find_assignments_for_course),
        )
        .route(
            "/api/courses/{course_id}/assignments",
            post(assignments::create_assignment_for_course),
        )
        .route(
            "/api/assignments/{assignment_id}",
            put(assignments::update_assignment),
        )
        .route(
            "/api/assignments/{assignment_id}",
            delete(assignments::delete_assignment),
        )
        // Quizzes and their embedded questions
        .route(
            "/api/courses/{course_id}/quizzes",
            get(quizzes::find_quizzes_for_course),
        )
        .route(
            "/api/courses/{course_id}/quizzes",
            post(quizzes::create_quiz_for_course),
        )
        .route("/api/quizzes/{quiz_id}", get(quizzes::find_quiz_by_id))
        .route("/api/quizzes/{quiz_id}", put(quizzes::update_quiz))
        .route("/api/quizzes/{quiz_id}", delete(quizzes::delete_quiz))
        .route(
            "/api/quizzes/{quiz_id}/publish",
            put(quizzes::update_quiz_publish_status),
        )
        .route(
            "/api/quizzes/{quiz_id}/questions",
            post(quizzes::create_question),
        )
        .route(
            "/api/quizzes/{quiz_id}/questions/{question_id}",
            put(quizzes::update_question),
        )
        .route(
            "/api/quizzes/{quiz_id}/questions/{question_id}",
            delete(quizzes::delete_question),
        )
        // Submissions
        .route("/api/quizzes/{quiz_id}/submit", post(quizzes::submit_quiz))
        .route(
            "/api/quizzes/{quiz_id}/submissions/last",
            get(quizzes::find_last_submission),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state))
        .with_state(state)
}
