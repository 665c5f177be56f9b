use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

/// Per-frame stages the redaction loop times.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Decode,
    Detect,
    Redact,
    Encode,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Decode, Stage::Detect, Stage::Redact, Stage::Encode];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Decode => "decode",
            Stage::Detect => "detect",
            Stage::Redact => "redact",
            Stage::Encode => "encode",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observer for redaction runs.
///
/// Keeps progress and profiling output out of the orchestration code so
/// tests can run silently and the CLI can report through `log`.
pub trait PipelineLogger: Send {
    /// Report frame-level progress. `total` is 0 when the container does
    /// not advertise a frame count.
    fn progress(&mut self, current: usize, total: usize);

    /// Record how long one stage took for one frame.
    fn timing(&mut self, stage: Stage, duration_ms: f64);

    /// Record a point-in-time metric (e.g. faces in a frame).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: Stage, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// CLI logger: throttled progress lines plus per-stage timing and metric
/// aggregates, reported through `log::info!`.
pub struct StdoutPipelineLogger {
    throttle_frames: usize,
    timings: BTreeMap<Stage, Vec<f64>>,
    metrics: BTreeMap<String, Vec<f64>>,
    start_time: Instant,
    frames_seen: usize,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            start_time: Instant::now(),
            frames_seen: 0,
        }
    }

    /// Returns the formatted summary string, or `None` if no data recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.frames_seen;
        let mut lines = vec![format!(
            "Redaction summary ({frames} frames, {:.1}s total):",
            elapsed_ms / 1000.0
        )];

        for (stage, durations) in &self.timings {
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = mean(durations);
            let pct = if elapsed_ms > 0.0 {
                total_ms / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "  {:8}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms  ({pct:4.1}%)",
                stage.as_str()
            ));
        }

        for (name, values) in &self.metrics {
            let sum: f64 = values.iter().sum();
            lines.push(format!("  {name}: avg {:.1}  sum {sum:.0}", mean(values)));
        }

        if frames > 0 && elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: Stage) -> Option<&[f64]> {
        self.timings.get(&stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }

    /// Whether the `current`-th frame gets a progress line.
    fn should_report(&self, current: usize, total: usize) -> bool {
        current % self.throttle_frames == 0 || (total > 0 && current == total)
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(10)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.frames_seen = self.frames_seen.max(current);
        if !self.should_report(current, total) {
            return;
        }
        if total > 0 {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Processing: {current}/{total} frames ({pct:.1}%)");
        } else {
            log::info!("Processing: {current} frames");
        }
    }

    fn timing(&mut self, stage: Stage, duration_ms: f64) {
        self.timings.entry(stage).or_default().push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullPipelineLogger;
        logger.progress(1, 10);
        logger.timing(Stage::Detect, 5.0);
        logger.metric("faces", 3.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_records_values_per_stage() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing(Stage::Detect, 20.0);
        logger.timing(Stage::Detect, 30.0);
        logger.timing(Stage::Redact, 5.0);

        assert_eq!(logger.timings_for(Stage::Detect).unwrap(), &[20.0, 30.0]);
        assert_eq!(logger.timings_for(Stage::Redact).unwrap(), &[5.0]);
        assert!(logger.timings_for(Stage::Encode).is_none());
    }

    #[test]
    fn test_metric_records_values() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.metric("faces", 3.0);
        logger.metric("faces", 4.0);

        let values = logger.metrics_for("faces").unwrap();
        assert_relative_eq!(mean(values), 3.5);
    }

    #[test]
    fn test_summary_lists_stages_in_pipeline_order() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.progress(10, 10);
        logger.timing(Stage::Encode, 2.0);
        logger.timing(Stage::Decode, 1.0);
        logger.timing(Stage::Detect, 20.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Redaction summary (10 frames"));
        let decode = summary.find("decode").unwrap();
        let detect = summary.find("detect").unwrap();
        let encode = summary.find("encode").unwrap();
        assert!(decode < detect && detect < encode);
        assert!(summary.contains("fps"));
    }

    #[test]
    fn test_summary_includes_metrics() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.metric("faces", 3.0);
        logger.metric("faces", 4.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("faces: avg 3.5  sum 7"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(StdoutPipelineLogger::new(10).summary_string().is_none());
    }

    #[rstest]
    #[case::throttled(3, 20, false)]
    #[case::on_interval(10, 20, true)]
    #[case::last_frame(17, 17, true)]
    #[case::unknown_total(7, 0, false)]
    #[case::unknown_total_interval(20, 0, true)]
    fn test_progress_throttle(#[case] current: usize, #[case] total: usize, #[case] shown: bool) {
        let logger = StdoutPipelineLogger::new(10);
        assert_eq!(logger.should_report(current, total), shown);
    }

    #[test]
    fn test_progress_tracks_frames_without_total() {
        let mut logger = StdoutPipelineLogger::new(10);
        for i in 1..=7 {
            logger.progress(i, 0);
        }
        logger.timing(Stage::Decode, 1.0);
        assert!(logger.summary_string().unwrap().contains("(7 frames"));
    }

    #[test]
    fn test_stage_names() {
        let names: Vec<_> = Stage::ALL.iter().map(Stage::to_string).collect();
        assert_eq!(names, ["decode", "detect", "redact", "encode"]);
    }
}
