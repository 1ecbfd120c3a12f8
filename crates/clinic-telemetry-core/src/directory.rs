//! Patient directory filtering.
//!
//! Substring hits on "name surname" or the DNI always match. Everything else
//! is scored by fuzzy similarity so a misspelled name still finds the patient.

use serde::{Deserialize, Serialize};
use strsim::{jaro_winkler, normalized_levenshtein};

use crate::models::PatientSummary;

/// Minimum fuzzy score to be listed.
const MIN_FUZZY_SCORE: f64 = 0.75;

/// A listed patient and how well it matched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectoryMatch {
    pub patient: PatientSummary,
    /// 1.0 for substring hits, otherwise the fuzzy score
    pub score: f64,
}

/// The structured patient listing for one doctor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatientDirectory {
    patients: Vec<PatientSummary>,
}

impl PatientDirectory {
    pub fn new(patients: Vec<PatientSummary>) -> Self {
        Self { patients }
    }

    pub fn patients(&self) -> &[PatientSummary] {
        &self.patients
    }

    pub fn find_by_id(&self, id: i32) -> Option<&PatientSummary> {
        self.patients.iter().find(|p| p.id == id)
    }

    /// Patients matching `query`, best first.
    ///
    /// An empty query lists everyone in server order.
    pub fn filter(&self, query: &str) -> Vec<DirectoryMatch> {
        let query = query.trim().to_lowercase();

        let mut matches: Vec<DirectoryMatch> = self
            .patients
            .iter()
            .filter_map(|patient| {
                let score = score_patient(patient, &query);
                (score >= MIN_FUZZY_SCORE).then(|| DirectoryMatch {
                    patient: patient.clone(),
                    score,
                })
            })
            .collect();

        // Stable, so equal scores keep server order
        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches
    }
}

fn score_patient(patient: &PatientSummary, query: &str) -> f64 {
    if query.is_empty() {
        return 1.0;
    }

    let full_name = patient.full_name().to_lowercase();
    if full_name.contains(query) || patient.dni.to_lowercase().contains(query) {
        return 1.0;
    }

    let name = patient.name.to_lowercase();
    let surname = patient.surname.to_lowercase();
    [full_name.as_str(), name.as_str(), surname.as_str()]
        .iter()
        .map(|candidate| fuzzy_match(query, candidate))
        .fold(0.0, f64::max)
}

/// Jaro-Winkler favours shared prefixes; Levenshtein keeps overall shape.
fn fuzzy_match(a: &str, b: &str) -> f64 {
    jaro_winkler(a, b) * 0.6 + normalized_levenshtein(a, b) * 0.4
}
