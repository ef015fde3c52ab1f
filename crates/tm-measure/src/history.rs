use serde::Serialize;

use crate::measure::MeasurementResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub sequence: u64,
    /// Free-form origin, e.g. an image path or `"guide-lines"`.
    pub source: String,
    pub result: MeasurementResult,
}

/// Append-only record of performed measurements.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct MeasurementHistory {
    entries: Vec<HistoryEntry>,
}

impl MeasurementHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `result` and returns its sequence number, starting at 1.
    pub fn record(&mut self, source: impl Into<String>, result: MeasurementResult) -> u64 {
        let sequence = self.entries.len() as u64 + 1;
        self.entries.push(HistoryEntry {
            sequence,
            source: source.into(),
            result,
        });
        sequence
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
