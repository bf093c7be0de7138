// src/services/mod.rs

pub mod answers;
pub mod attempts;
pub mod catalog;
pub mod registry;
pub mod sweeper;
