use std::collections::BTreeMap;
use std::time::Instant;

/// Cross-cutting sink for pipeline telemetry.
///
/// Decouples the event loop from how statistics are reported, so the CLI
/// can print a run summary while tests discard everything.
pub trait PipelineLogger: Send {
    /// Record how long one unit of work took (e.g. a detector call).
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time value (e.g. frames per second).
    fn metric(&mut self, name: &str, value: f64);

    /// Increment a named counter.
    fn count(&mut self, name: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn count(&mut self, _name: &str) {}
}

/// Aggregates timings, metrics and counters and logs a summary when the
/// run ends.
pub struct StatsPipelineLogger {
    timings: BTreeMap<String, Vec<f64>>,
    metrics: BTreeMap<String, Vec<f64>>,
    counters: BTreeMap<String, u64>,
    start_time: Instant,
}

impl StatsPipelineLogger {
    pub fn new() -> Self {
        Self {
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            counters: BTreeMap::new(),
            start_time: Instant::now(),
        }
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() && self.counters.is_empty() {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!("Pipeline summary ({elapsed_s:.1}s):")];

        for (stage, durations) in &self.timings {
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = average(durations);
            let max_ms = durations.iter().cloned().fold(0.0, f64::max);
            lines.push(format!(
                "  {stage:16}: avg {avg_ms:6.1}ms  max {max_ms:6.1}ms  total {total_ms:7.0}ms  (n={})",
                durations.len()
            ));
        }

        for (name, values) in &self.metrics {
            lines.push(format!("  {name}: avg {:.1}", average(values)));
        }

        for (name, count) in &self.counters {
            lines.push(format!("  {name}: {count}"));
        }

        Some(lines.join("\n"))
    }
}

fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl Default for StatsPipelineLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineLogger for StatsPipelineLogger {
    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn count(&mut self, name: &str) {
        *self.counters.entry(name.to_string()).or_default() += 1;
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
