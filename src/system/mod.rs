//! # System Interaction Layer
//!
//! This module is the boundary between the build logic and the processes it starts.
//!
//! ## Modules
//!
//! - **`output`**: Destinations for captured process output. `ConsoleSink` holds output
//!   back until a run reveals it; `MemorySink` keeps it for inspection.
//! - **`session`**: The `ProcessSession`, which owns at most one captured build at a time,
//!   streams its output, and can kill it. Also hosts the buffered and progress variants.
//! - **`terminal`**: Runs commands through the platform shell with inherited stdio, for
//!   users who want to answer the CLI's own prompts.

pub mod output;
pub mod session;
pub mod terminal;
