// src/cli/handlers/mod.rs

// One module per command; `commons` holds the plumbing they share.

pub mod build;
pub mod clean;
pub mod commons;
pub mod create;
pub mod package;
pub mod task;
