// src/handlers/mod.rs

pub mod assignments;
pub mod auth;
pub mod courses;
pub mod modules;
pub mod quizzes;
pub mod users;
