//! Throughput and ETA logging for long matching passes.

use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Records between two progress lines.
pub const REPORT_INTERVAL: usize = 100;

/// Point-in-time view of matching progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub processed: usize,
    pub total: usize,
    pub percent: f64,
    pub average: Duration,
    pub remaining: Duration,
}

impl ProgressSnapshot {
    /// Derive percentage, per-record average and ETA from the time spent so far.
    pub fn compute(processed: usize, total: usize, elapsed: Duration) -> Self {
        let percent = if total == 0 {
            100.0
        } else {
            processed as f64 / total as f64 * 100.0
        };
        let average = match u32::try_from(processed) {
            Ok(n) if n > 0 => elapsed / n,
            _ => Duration::ZERO,
        };
        let left = u32::try_from(total.saturating_sub(processed)).unwrap_or(u32::MAX);

        Self {
            processed,
            total,
            percent,
            average,
            remaining: average.saturating_mul(left),
        }
    }
}

/// Emits a progress line every [`REPORT_INTERVAL`] records.
///
/// Purely observational: nothing in the pipeline depends on it.
#[derive(Debug)]
pub struct ProgressReporter {
    total: usize,
    started: Instant,
    last: Instant,
}

impl ProgressReporter {
    pub fn new(total: usize) -> Self {
        let now = Instant::now();
        Self {
            total,
            started: now,
            last: now,
        }
    }

    /// Note that `processed` records are done. Returns the snapshot that
    /// was logged, if this tick hit the reporting interval.
    pub fn tick(&mut self, processed: usize) -> Option<ProgressSnapshot> {
        let now = Instant::now();
        debug!(
            target: "library::sync",
            last_ms = now.duration_since(self.last).as_millis() as u64,
            "Record processed"
        );
        self.last = now;

        if processed == 0 || processed % REPORT_INTERVAL != 0 {
            return None;
        }

        let snapshot = ProgressSnapshot::compute(processed, self.total, now.duration_since(self.started));
        info!(
            target: "library::sync",
            "Track matching: {} of {} - {:.2}% - average per track: {}ms - remaining: {}",
            snapshot.processed,
            snapshot.total,
            snapshot.percent,
            snapshot.average.as_millis(),
            format_duration(snapshot.remaining)
        );
        Some(snapshot)
    }
}

/// Format a duration as `1h 02m 03s`, `2m 05s` or `45s`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);

    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}
