use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::detection::domain::detector::{Detector, DetectorError};
use crate::shared::frame::Frame;

#[derive(Deserialize)]
struct RecordedLine {
    timestamp_ms: u64,
    result: Value,
}

/// Replays pre-recorded detector output by capture timestamp.
///
/// Each recording line is `{"timestamp_ms": <u64>, "result": <payload>}`.
/// A frame receives the latest record at or before its timestamp, so a
/// recording made at a different frame rate still lines up. With a loop
/// period set, timestamps wrap so a looping source replays the recording.
pub struct RecordedDetector {
    records: Arc<BTreeMap<u64, Value>>,
    loop_period_ms: Option<u64>,
}

impl RecordedDetector {
    pub fn new(records: Arc<BTreeMap<u64, Value>>) -> Self {
        Self {
            records,
            loop_period_ms: None,
        }
    }

    pub fn with_loop_period(mut self, period_ms: u64) -> Self {
        self.loop_period_ms = (period_ms > 0).then_some(period_ms);
        self
    }

    /// Loads a JSON-lines recording. Blank lines are skipped.
    pub fn load(path: &Path) -> Result<Arc<BTreeMap<u64, Value>>, DetectorError> {
        let file = File::open(path)
            .map_err(|e| DetectorError::Load(format!("{}: {e}", path.display())))?;
        Self::parse(BufReader::new(file))
    }

    pub fn parse(reader: impl BufRead) -> Result<Arc<BTreeMap<u64, Value>>, DetectorError> {
        let mut records = BTreeMap::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| DetectorError::Load(e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            let parsed: RecordedLine = serde_json::from_str(&line)
                .map_err(|e| DetectorError::Load(format!("line {}: {e}", line_no + 1)))?;
            records.insert(parsed.timestamp_ms, parsed.result);
        }
        Ok(Arc::new(records))
    }
}

impl Detector for RecordedDetector {
    fn detect(&mut self, _frame: &Frame, timestamp_ms: u64) -> Result<Value, DetectorError> {
        let key = match self.loop_period_ms {
            Some(period) => timestamp_ms % period,
            None => timestamp_ms,
        };
        self.records
            .range(..=key)
            .next_back()
            .map(|(_, result)| result.clone())
            .ok_or_else(|| DetectorError::Inference {
                timestamp_ms,
                message: "no recorded result at or before this timestamp".to_string(),
            })
    }
}
