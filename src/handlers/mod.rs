// src/handlers/mod.rs

pub mod attempts;
pub mod auth;
pub mod exam;
pub mod exam_modules;
pub mod levels;
pub mod students;
