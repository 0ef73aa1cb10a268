//! Per-attempt extraction context and its log line format
//!
//! Log lines keep a fixed field order so aggregators can rely on it:
//! message, searcher record, attachment, path, content type, elapsed time,
//! memory usage, memory usage diff, then the error when there is one.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use ftsearch_common::{ErrorChain, memory_usage};
use ftsearch_extraction::ExtractionError;

/// Tracing target of every text extraction event
pub const LOG_TARGET: &str = "ftsearch::text_extract";

const LOG_PREFIX: &str = "[full-text-search][text-extract]";

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;
const BYTES_PER_GIB: f64 = BYTES_PER_MIB * 1024.0;

/// State of one extraction attempt, discarded afterwards
#[derive(Debug, Clone)]
pub struct ExtractionContext {
    pub searcher_record_id: i64,
    pub attachment_id: i64,
    pub path: PathBuf,
    /// Effective content type after resolution
    pub content_type: String,
    pub max_size: u64,
    started_at: Instant,
    /// Resident memory in bytes, 0 when unknown
    pub memory_usage: u64,
    pub memory_usage_diff: Option<i64>,
    pub elapsed_time: Option<Duration>,
}

impl ExtractionContext {
    /// Start an attempt, sampling memory before any work
    pub fn begin(
        searcher_record_id: i64,
        attachment_id: i64,
        path: PathBuf,
        content_type: String,
        max_size: u64,
    ) -> Self {
        Self {
            searcher_record_id,
            attachment_id,
            path,
            content_type,
            max_size,
            started_at: Instant::now(),
            memory_usage: memory_usage(),
            memory_usage_diff: None,
            elapsed_time: None,
        }
    }

    /// Record elapsed time and the memory delta since [`Self::begin`]
    pub fn finish(&mut self) {
        self.elapsed_time = Some(self.started_at.elapsed());
        let after = memory_usage();
        if self.memory_usage > 0 && after > 0 {
            let before = i64::try_from(self.memory_usage).unwrap_or(i64::MAX);
            let after_signed = i64::try_from(after).unwrap_or(i64::MAX);
            self.memory_usage_diff = Some(after_signed.saturating_sub(before));
        }
        self.memory_usage = after;
    }

    /// Render a log line for this attempt
    pub fn format_message(&self, message: &str, error: Option<&ExtractionError>) -> String {
        let mut line = format!(
            "{LOG_PREFIX} {message}: SearcherRecord: {}: Attachment: {}: path: <{}>: content-type: <{}>",
            self.searcher_record_id,
            self.attachment_id,
            self.path.display(),
            self.content_type
        );

        if let Some(elapsed) = self.elapsed_time {
            let _ = write!(line, ": elapsed time: <{}>", format_elapsed(elapsed));
        }

        if self.memory_usage > 0 {
            let _ = write!(
                line,
                ": memory usage: <{}>",
                format_gib(self.memory_usage)
            );
            if let Some(diff) = self.memory_usage_diff {
                let _ = write!(line, ": memory usage diff: <{}>", format_mib(diff));
            }
        }

        if let Some(error) = error {
            let _ = write!(
                line,
                ": {}: {}: {}",
                error.kind(),
                error.class_name(),
                ErrorChain(error)
            );
            let backtrace = Backtrace::capture();
            if backtrace.status() == BacktraceStatus::Captured {
                let _ = write!(line, "\n{backtrace}");
            }
        }

        line
    }
}

/// Format a duration by magnitude: milliseconds, seconds, then minutes
pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs_f64();
    if seconds < 1.0 {
        format!("{:.2}ms", seconds * 1000.0)
    } else if seconds < 60.0 {
        format!("{seconds:.2}s")
    } else {
        format!("{:.2}min", seconds / 60.0)
    }
}

#[allow(clippy::cast_precision_loss)]
fn format_gib(bytes: u64) -> String {
    format!("{:.2}GiB", bytes as f64 / BYTES_PER_GIB)
}

#[allow(clippy::cast_precision_loss)]
fn format_mib(bytes: i64) -> String {
    format!("{:.2}MiB", bytes as f64 / BYTES_PER_MIB)
}
