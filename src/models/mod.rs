// src/models/mod.rs

pub mod assignment;
pub mod course;
pub mod course_module;
pub mod enrollment;
pub mod quiz;
pub mod submission;
pub mod user;
