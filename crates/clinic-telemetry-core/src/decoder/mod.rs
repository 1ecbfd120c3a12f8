//! Record text decoder.
//!
//! Turns the server's `Patient{...}` / `MedicalRecord{...}` text into typed
//! entities. Decoding never fails as a whole: unbalanced records are skipped,
//! and individual fields that do not convert are kept raw. Everything that
//! went wrong is listed in [`Decoded::issues`].

mod assemble;
pub(crate) mod scanner;

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::coerce::RawValue;
use crate::models::{sort_by_date_desc, DiagnosisFile, Patient};

pub const PATIENT_RECORD: &str = "Patient";
pub const DIAGNOSIS_FILE_RECORD: &str = "MedicalRecord";

/// A recovered problem found while decoding.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeIssue {
    #[error("{record} record at offset {offset} has unbalanced braces; skipped")]
    UnbalancedRecord { record: String, offset: usize },

    #[error("{record} field is not key=value: {text:?}")]
    MalformedField { record: String, text: String },

    #[error("{record}.{field} kept as raw value {value}")]
    FieldLeftRaw {
        record: String,
        field: String,
        value: RawValue,
    },

    #[error("{record}.{field} is not a known field")]
    UnknownField { record: String, field: String },
}

/// Entities decoded from one payload, plus what had to be recovered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decoded<T> {
    pub records: Vec<T>,
    pub issues: Vec<DecodeIssue>,
}

impl<T> Decoded<T> {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn first(&self) -> Option<&T> {
        self.records.first()
    }

    pub fn into_first(self) -> Option<T> {
        self.records.into_iter().next()
    }
}

fn log_issues(issues: &[DecodeIssue]) {
    for issue in issues {
        warn!(%issue, "record decode issue");
    }
}

/// Decode every `Patient{...}` record in `text`.
pub fn decode_patients(text: &str) -> Decoded<Patient> {
    let mut issues = Vec::new();
    let records = scanner::find_records(text, PATIENT_RECORD, &mut issues)
        .into_iter()
        .map(|span| assemble::assemble_patient(span.body, &mut issues))
        .collect();
    log_issues(&issues);
    Decoded { records, issues }
}

/// Decode every `MedicalRecord{...}` in `text`, newest first.
pub fn decode_diagnosis_files(text: &str) -> Decoded<DiagnosisFile> {
    let mut issues = Vec::new();
    let records = decode_files_unlogged(text, &mut issues);
    log_issues(&issues);
    Decoded { records, issues }
}

fn decode_files_unlogged(text: &str, issues: &mut Vec<DecodeIssue>) -> Vec<DiagnosisFile> {
    let spans = scanner::find_records(text, DIAGNOSIS_FILE_RECORD, issues);
    let mut files: Vec<_> = spans
        .into_iter()
        .map(|span| assemble::assemble_diagnosis_file(span.body, issues))
        .collect();
    sort_by_date_desc(&mut files);
    files
}
