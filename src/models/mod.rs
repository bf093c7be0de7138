// src/models/mod.rs

pub mod admin;
pub mod exam_attempt;
pub mod exam_module;
pub mod level;
pub mod question;
pub mod student;
pub mod student_answer;
