// src/system/output.rs

use colored::Colorize;
use std::io::Write;
use std::sync::{
    Mutex, PoisonError,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

/// Severity of a message shown to the user alongside captured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Info,
    Error,
}

/// Append-only destination for the stdout/stderr of captured runs.
pub trait OutputSink: Send + Sync {
    fn clear(&self);
    fn append(&self, text: &str);
    /// Makes the captured output visible to the user.
    fn reveal(&self);
    fn notify(&self, notice: Notice, message: &str);
}

/// Sink for the terminal. Output is held back until the sink is revealed, then
/// streamed straight through.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    pending: Mutex<String>,
    revealed: AtomicBool,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputSink for ConsoleSink {
    fn clear(&self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.revealed.store(false, Ordering::SeqCst);
    }

    fn append(&self, text: &str) {
        if self.revealed.load(Ordering::SeqCst) {
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(text.as_bytes());
            let _ = stdout.flush();
        } else {
            self.pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_str(text);
        }
    }

    fn reveal(&self) {
        if self.revealed.swap(true, Ordering::SeqCst) {
            return;
        }
        let pending = std::mem::take(
            &mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(pending.as_bytes());
        let _ = stdout.flush();
    }

    fn notify(&self, notice: Notice, message: &str) {
        match notice {
            Notice::Info => println!("{}", message.yellow()),
            Notice::Error => eprintln!("{}: {}", "Error".red().bold(), message),
        }
    }
}

/// Sink that keeps everything in memory; lets embedding hosts and tests inspect a run.
#[derive(Debug, Default)]
pub struct MemorySink {
    text: Mutex<String>,
    reveals: AtomicUsize,
    notices: Mutex<Vec<(Notice, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.text.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn reveal_count(&self) -> usize {
        self.reveals.load(Ordering::SeqCst)
    }

    pub fn notices(&self) -> Vec<(Notice, String)> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl OutputSink for MemorySink {
    fn clear(&self) {
        self.text.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn append(&self, text: &str) {
        self.text
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_str(text);
    }

    fn reveal(&self) {
        self.reveals.fetch_add(1, Ordering::SeqCst);
    }

    fn notify(&self, notice: Notice, message: &str) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((notice, message.to_string()));
    }
}
