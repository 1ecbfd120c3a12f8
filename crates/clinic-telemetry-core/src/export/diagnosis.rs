//! Diagnosis file download.

use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::write_artifact;

/// A downloaded diagnosis file, saved as plain text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiagnosisExport {
    pub diagnosis_file_id: i32,
    /// Day the download happened
    pub exported_on: NaiveDate,
    /// Text exactly as the server sent it
    pub content: String,
}

impl DiagnosisExport {
    pub fn new(diagnosis_file_id: i32, exported_on: NaiveDate, content: String) -> Self {
        Self {
            diagnosis_file_id,
            exported_on,
            content,
        }
    }

    /// `diagnosis_<id>_<yyyy-mm-dd>.txt`
    pub fn file_name(&self) -> String {
        format!("diagnosis_{}_{}.txt", self.diagnosis_file_id, self.exported_on)
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the text file into `dir`, returning its path.
    pub fn write_to(&self, dir: &Path) -> io::Result<PathBuf> {
        write_artifact(dir, &self.file_name(), &self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_and_contents() {
        let export = DiagnosisExport::new(
            14,
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            "Diagnosis: sinus tachycardia\nMedication: none".into(),
        );
        assert_eq!(export.file_name(), "diagnosis_14_2024-05-01.txt");

        let dir = tempfile::tempdir().unwrap();
        let path = export.write_to(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("diagnosis_14_2024-05-01.txt"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), export.content);
    }

    #[test]
    fn test_json() {
        let export = DiagnosisExport::new(1, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), "x".into());
        let json = export.to_json().unwrap();
        assert!(json.contains("\"exported_on\": \"2024-01-02\""));
    }
}
