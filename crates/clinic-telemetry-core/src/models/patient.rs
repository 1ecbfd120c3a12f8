//! Patient models.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::DiagnosisFile;
use crate::coerce::{Coerced, FromRaw, RawValue};

/// Sex as the server names it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "MALE",
            Sex::Female => "FEMALE",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sex {
    type Err = String;

    /// Exact, case-sensitive match on the enum name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MALE" => Ok(Sex::Male),
            "FEMALE" => Ok(Sex::Female),
            other => Err(format!("unknown sex: {other}")),
        }
    }
}

impl FromRaw for Sex {
    fn from_raw(raw: &RawValue) -> Option<Self> {
        raw.as_scalar()?.parse().ok()
    }
}

/// A patient as decoded from a `Patient{...}` record.
///
/// Every scalar field records whether it was typed, left raw, or absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: Coerced<i32>,
    pub name: Coerced<String>,
    pub surname: Coerced<String>,
    /// National identity document (DNI/NIE)
    pub dni: Coerced<String>,
    pub date_of_birth: Coerced<NaiveDate>,
    pub sex: Coerced<Sex>,
    pub email: Coerced<String>,
    pub phone: Coerced<String>,
    /// Health insurance number (HIN), the search key
    pub health_insurance_number: Coerced<i32>,
    /// Always ordered by date descending, undated last
    pub diagnosis_files: Vec<DiagnosisFile>,
}

impl Patient {
    pub fn id(&self) -> Option<i32> {
        self.id.typed().copied()
    }

    pub fn health_insurance_number(&self) -> Option<i32> {
        self.health_insurance_number.typed().copied()
    }

    /// "Name Surname", skipping parts that are missing.
    pub fn full_name(&self) -> String {
        [self.name.display_text(), self.surname.display_text()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Look up one of this patient's diagnosis files.
    pub fn diagnosis_file(&self, id: i32) -> Option<&DiagnosisFile> {
        self.diagnosis_files.iter().find(|f| f.id() == Some(id))
    }
}

/// One row of the structured patient listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientSummary {
    pub id: i32,
    pub name: String,
    pub surname: String,
    pub dni: String,
}

impl PatientSummary {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }
}
