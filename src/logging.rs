//! Logging and progress reporting.
//!
//! Mirrors the teacher's console/log/silent handler trio and global
//! `OnceLock` handler, retargeted at the six-phase translation loop's
//! observer callbacks instead of extraction progress.

use std::sync::Arc;

use crate::state::{ChunkOutcome, RepairType};

/// Progress event types emitted during translation.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A translation run has started.
    RunStarted { total_chunks: usize, preset: String },
    /// One of the six per-chunk phases has begun.
    Step { chunk_index: usize, phase: &'static str },
    /// A chunk finished its round with a terminal quality outcome.
    ChunkOutcome {
        chunk_index: usize,
        outcome: ChunkOutcome,
        chars_out: usize,
    },
    /// A repair action was applied to a chunk.
    Repair {
        chunk_index: usize,
        repair_type: RepairType,
        description: String,
    },
    /// Overall quality flags changed.
    QualityFlags {
        completed: usize,
        failed: usize,
        total: usize,
    },
    /// Cost/performance stats changed.
    CostStats {
        total_calls: u32,
        total_cost: f64,
        total_tokens: u64,
    },
    /// A provider call is retried after failure.
    RetryAttempt {
        chunk_index: usize,
        attempt: usize,
        max_attempts: usize,
    },
    /// An unrecoverable or per-chunk error occurred.
    Error { operation: String, error: String },
    /// Run completed.
    RunCompleted { success_chunks: usize, error_chunks: usize, duration_ms: u64 },
    /// Debug information.
    Debug { operation: String, details: String },
}

/// Trait for handling progress events.
pub trait ProgressHandler: Send + Sync {
    fn handle_progress(&self, event: ProgressEvent);
}

/// Console progress handler.
pub struct ConsoleProgressHandler {
    pub show_progress: bool,
    pub show_debug: bool,
}

impl ConsoleProgressHandler {
    pub fn new() -> Self {
        Self {
            show_progress: true,
            show_debug: false,
        }
    }

    pub fn quiet() -> Self {
        Self {
            show_progress: false,
            show_debug: false,
        }
    }

    pub fn verbose() -> Self {
        Self {
            show_progress: true,
            show_debug: true,
        }
    }

    fn format_message(&self, tag: &str, message: &str) -> String {
        format!("[{tag}] {message}")
    }
}

impl Default for ConsoleProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressHandler for ConsoleProgressHandler {
    fn handle_progress(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::RunStarted { total_chunks, preset } => {
                if self.show_progress {
                    println!("{}", self.format_message("run", &format!("{preset} preset, {total_chunks} chunks")));
                }
            }
            ProgressEvent::Step { chunk_index, phase } => {
                if self.show_debug {
                    println!("{}", self.format_message("step", &format!("chunk {chunk_index}: {phase}")));
                }
            }
            ProgressEvent::ChunkOutcome { chunk_index, outcome, chars_out } => {
                if self.show_progress {
                    println!("{}", self.format_message("chunk", &format!("{chunk_index} -- {outcome:?} ({chars_out} chars)")));
                }
            }
            ProgressEvent::Repair { chunk_index, repair_type, description } => {
                if self.show_progress {
                    println!("{}", self.format_message("repair", &format!("chunk {chunk_index}: {repair_type:?} -- {description}")));
                }
            }
            ProgressEvent::QualityFlags { completed, failed, total } => {
                if self.show_debug {
                    println!("{}", self.format_message("quality", &format!("{completed}/{total} completed, {failed} failed")));
                }
            }
            ProgressEvent::CostStats { total_calls, total_cost, total_tokens } => {
                if self.show_debug {
                    println!("{}", self.format_message("cost", &format!("{total_calls} calls, {total_tokens} tokens, ${total_cost:.4}")));
                }
            }
            ProgressEvent::RetryAttempt { chunk_index, attempt, max_attempts } => {
                if self.show_progress {
                    println!("{}", self.format_message("retry", &format!("chunk {chunk_index} attempt {attempt}/{max_attempts}")));
                }
            }
            ProgressEvent::Error { operation, error } => {
                eprintln!("{}", self.format_message("error", &format!("{operation}: {error}")));
            }
            ProgressEvent::RunCompleted { success_chunks, error_chunks, duration_ms } => {
                if self.show_progress {
                    println!("{}", self.format_message("done", &format!("{success_chunks} succeeded, {error_chunks} failed, {duration_ms}ms")));
                }
            }
            ProgressEvent::Debug { operation, details } => {
                if self.show_debug {
                    println!("{}", self.format_message("debug", &format!("{operation}: {details}")));
                }
            }
        }
    }
}

/// Silent progress handler that does nothing.
pub struct SilentProgressHandler;

impl ProgressHandler for SilentProgressHandler {
    fn handle_progress(&self, _event: ProgressEvent) {}
}

/// Logger that integrates with the standard `log` crate.
pub struct LogProgressHandler;

impl ProgressHandler for LogProgressHandler {
    fn handle_progress(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::RunStarted { total_chunks, preset } => {
                log::info!("starting translation: {preset} preset, {total_chunks} chunks");
            }
            ProgressEvent::Step { chunk_index, phase } => {
                log::trace!("chunk {chunk_index}: {phase}");
            }
            ProgressEvent::ChunkOutcome { chunk_index, outcome, chars_out } => {
                log::debug!("chunk {chunk_index}: {outcome:?} ({chars_out} chars)");
            }
            ProgressEvent::Repair { chunk_index, repair_type, description } => {
                log::warn!("chunk {chunk_index} repaired via {repair_type:?}: {description}");
            }
            ProgressEvent::QualityFlags { completed, failed, total } => {
                log::debug!("quality: {completed}/{total} completed, {failed} failed");
            }
            ProgressEvent::CostStats { total_calls, total_cost, total_tokens } => {
                log::debug!("cost: {total_calls} calls, {total_tokens} tokens, ${total_cost:.4}");
            }
            ProgressEvent::RetryAttempt { chunk_index, attempt, max_attempts } => {
                log::warn!("chunk {chunk_index} retry {attempt}/{max_attempts}");
            }
            ProgressEvent::Error { operation, error } => {
                log::error!("{operation}: {error}");
            }
            ProgressEvent::RunCompleted { success_chunks, error_chunks, duration_ms } => {
                log::info!("translation completed: {success_chunks} succeeded, {error_chunks} failed, {duration_ms}ms");
            }
            ProgressEvent::Debug { operation, details } => {
                log::debug!("{operation}: {details}");
            }
        }
    }
}

static PROGRESS_HANDLER: std::sync::OnceLock<Arc<dyn ProgressHandler>> = std::sync::OnceLock::new();

/// Initialize the global progress handler. Subsequent calls are
/// ignored (first writer wins), matching `OnceLock` semantics.
pub fn init_progress_handler(handler: Arc<dyn ProgressHandler>) {
    let _ = PROGRESS_HANDLER.set(handler);
}

fn get_progress_handler() -> Arc<dyn ProgressHandler> {
    PROGRESS_HANDLER.get_or_init(|| Arc::new(ConsoleProgressHandler::new())).clone()
}

pub fn report_progress(event: ProgressEvent) {
    get_progress_handler().handle_progress(event);
}

#[macro_export]
macro_rules! progress_info {
    ($($arg:tt)*) => {
        $crate::logging::report_progress($crate::logging::ProgressEvent::Debug {
            operation: "info".to_string(),
            details: format!($($arg)*),
        });
    };
}

#[macro_export]
macro_rules! progress_error {
    ($operation:expr, $($arg:tt)*) => {
        $crate::logging::report_progress($crate::logging::ProgressEvent::Error {
            operation: $operation.to_string(),
            error: format!($($arg)*),
        });
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_handler_formats_with_tag() {
        let handler = ConsoleProgressHandler::new();
        let message = handler.format_message("run", "test message");
        assert!(message.contains("[run]"));
        assert!(message.contains("test message"));
    }

    #[test]
    fn quiet_handler_does_not_panic_on_any_event() {
        let handler = ConsoleProgressHandler::quiet();
        handler.handle_progress(ProgressEvent::RunStarted {
            total_chunks: 3,
            preset: "general".to_string(),
        });
        handler.handle_progress(ProgressEvent::Error {
            operation: "test".to_string(),
            error: "boom".to_string(),
        });
    }

    #[test]
    fn silent_handler_is_a_true_no_op() {
        SilentProgressHandler.handle_progress(ProgressEvent::RunCompleted {
            success_chunks: 1,
            error_chunks: 0,
            duration_ms: 10,
        });
    }
}
