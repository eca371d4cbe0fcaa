use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

/// Cross-cutting logger for batch orchestration events.
///
/// Decouples the use case from specific output mechanisms so callers can
/// observe the batch without changing the orchestration code.
pub trait PipelineLogger: Send {
    /// Report that file `current` of `total` is about to be processed.
    fn progress(&mut self, current: usize, total: usize, path: &Path);

    /// Record how long a named stage took for one file.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record whether a file made it through the pipeline.
    fn outcome(&mut self, path: &Path, succeeded: bool);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-batch summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize, _path: &Path) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn outcome(&mut self, _path: &Path, _succeeded: bool) {}
    fn info(&mut self, _message: &str) {}
}

/// CLI-oriented logger that prints per-file progress, tracks per-stage
/// timing, and reports success/failure counts at the end of the batch.
pub struct StdoutPipelineLogger {
    timings: HashMap<String, Vec<f64>>,
    start_time: Instant,
    total_files: usize,
    succeeded: usize,
    failed: usize,
    messages: Vec<String>,
}

impl StdoutPipelineLogger {
    pub fn new() -> Self {
        Self {
            timings: HashMap::new(),
            start_time: Instant::now(),
            total_files: 0,
            succeeded: 0,
            failed: 0,
            messages: Vec::new(),
        }
    }

    /// Returns the formatted summary string, or `None` if nothing ran.
    pub fn summary_string(&self) -> Option<String> {
        let files = self.succeeded + self.failed;
        if files == 0 && self.timings.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = Vec::new();

        lines.push(format!(
            "Batch summary ({files} of {} files, {:.1}s total):",
            self.total_files,
            elapsed_ms / 1000.0
        ));
        lines.push(format!(
            "  Succeeded: {}  Failed: {}",
            self.succeeded, self.failed
        ));

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = if durations.is_empty() {
                0.0
            } else {
                total_ms / durations.len() as f64
            };
            let pct = if elapsed_ms > 0.0 {
                total_ms / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "  {stage:10}: avg {avg_ms:7.1}ms  total {total_ms:8.0}ms  ({pct:4.1}%)"
            ));
        }

        if files > 0 && elapsed_ms > 0.0 {
            let rate = files as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {rate:.2} files/s"));
        }

        Some(lines.join("\n"))
    }

    /// Returns the timing data for a given stage.
    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn counts(&self) -> (usize, usize) {
        (self.succeeded, self.failed)
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize, path: &Path) {
        self.total_files = total;
        log::info!("[{current}/{total}] {}", path.display());
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn outcome(&mut self, path: &Path, succeeded: bool) {
        if succeeded {
            self.succeeded += 1;
        } else {
            self.failed += 1;
            log::warn!("Failed: {}", path.display());
        }
    }

    fn info(&mut self, message: &str) {
        self.messages.push(message.to_string());
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
