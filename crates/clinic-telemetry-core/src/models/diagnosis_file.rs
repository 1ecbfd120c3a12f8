//! Diagnosis file models.

use std::cmp::Ordering;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::coerce::Coerced;

/// A diagnosis file as decoded from a `MedicalRecord{...}` record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DiagnosisFile {
    pub id: Coerced<i32>,
    pub date: Coerced<NaiveDateTime>,
    /// Symptom labels, in the order the server listed them
    pub symptoms: Coerced<Vec<String>>,
    pub diagnosis: Coerced<String>,
    pub medication: Coerced<String>,
    pub patient_id: Coerced<i32>,
    /// Whether the doctor has completed this file
    pub status: Coerced<bool>,
}

impl DiagnosisFile {
    pub fn id(&self) -> Option<i32> {
        self.id.typed().copied()
    }

    pub fn date(&self) -> Option<NaiveDateTime> {
        self.date.typed().copied()
    }

    pub fn symptoms(&self) -> &[String] {
        self.symptoms.typed().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_completed(&self) -> bool {
        self.status.typed().copied().unwrap_or(false)
    }
}

/// Order by date, newest first. Files without a usable date go last and
/// keep their relative order.
pub fn sort_by_date_desc(files: &mut [DiagnosisFile]) {
    files.sort_by(|a, b| match (a.date(), b.date()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
