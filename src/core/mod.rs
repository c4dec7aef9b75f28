// src/core/mod.rs

pub mod arguments;
pub mod catalog;
pub mod commons;
pub mod debug_resolver;
pub mod project;
pub mod prompter;
pub mod state_store;
pub mod task_execution;
pub mod task_file;
