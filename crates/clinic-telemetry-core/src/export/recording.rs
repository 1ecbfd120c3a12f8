//! Recording download as a two-column CSV.

use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{escape_csv, write_artifact};
use crate::protocol::RecordingDownload;

/// A downloaded recording, one sample list per channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordingExport {
    pub diagnosis_file_id: i32,
    pub exported_on: NaiveDate,
    /// Samples are kept as text so no precision is lost
    pub ecg: Vec<String>,
    pub eda: Vec<String>,
}

/// Split a channel payload on commas and whitespace.
fn samples(payload: &str) -> Vec<String> {
    payload
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl RecordingExport {
    pub fn from_download(
        diagnosis_file_id: i32,
        exported_on: NaiveDate,
        download: &RecordingDownload,
    ) -> Self {
        Self {
            diagnosis_file_id,
            exported_on,
            ecg: samples(&download.ecg),
            eda: samples(&download.eda),
        }
    }

    /// `recording_<id>_<yyyy-mm-dd>.csv`
    pub fn file_name(&self) -> String {
        format!("recording_{}_{}.csv", self.diagnosis_file_id, self.exported_on)
    }

    pub fn row_count(&self) -> usize {
        self.ecg.len().max(self.eda.len())
    }

    /// Export to CSV; the shorter channel is padded with empty cells.
    pub fn to_csv(&self) -> String {
        let mut csv = String::from("ECG,EDA\n");
        for row in 0..self.row_count() {
            let cell = |channel: &[String]| channel.get(row).map(|s| escape_csv(s)).unwrap_or_default();
            csv.push_str(&format!("{},{}\n", cell(&self.ecg), cell(&self.eda)));
        }
        csv
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the CSV into `dir`, returning its path.
    pub fn write_to(&self, dir: &Path) -> io::Result<PathBuf> {
        write_artifact(dir, &self.file_name(), &self.to_csv())
    }
}
