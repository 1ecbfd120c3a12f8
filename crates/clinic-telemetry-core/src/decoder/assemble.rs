//! Typed assembly of scanned records.
//!
//! Each entity has one explicit mapping from key to struct field. Keys are
//! matched case-insensitively; a later duplicate key overwrites an earlier one.

use super::scanner::{self, Field, FieldValue};
use super::{decode_files_unlogged, DecodeIssue, DIAGNOSIS_FILE_RECORD, PATIENT_RECORD};
use crate::coerce::{coerce, Coerced, FromRaw, RawValue};
use crate::models::{DiagnosisFile, Patient};

fn assign<T: FromRaw>(
    slot: &mut Coerced<T>,
    record: &str,
    field: &Field<'_>,
    issues: &mut Vec<DecodeIssue>,
) {
    let raw = match &field.value {
        FieldValue::Null => {
            *slot = Coerced::Absent;
            return;
        }
        FieldValue::Scalar(s) => RawValue::Scalar(s.clone()),
        FieldValue::List(items) => RawValue::List(items.clone()),
    };

    *slot = coerce(raw);
    if let Coerced::Raw(value) = slot {
        issues.push(DecodeIssue::FieldLeftRaw {
            record: record.to_string(),
            field: field.key.to_string(),
            value: value.clone(),
        });
    }
}

fn unknown(record: &str, field: &Field<'_>, issues: &mut Vec<DecodeIssue>) {
    issues.push(DecodeIssue::UnknownField {
        record: record.to_string(),
        field: field.key.to_string(),
    });
}

pub(super) fn assemble_patient(body: &str, issues: &mut Vec<DecodeIssue>) -> Patient {
    let mut patient = Patient::default();

    for field in scanner::parse_fields(PATIENT_RECORD, body, issues) {
        let p = &mut patient;
        match field.key.to_ascii_lowercase().as_str() {
            "idpatient" => assign(&mut p.id, PATIENT_RECORD, &field, issues),
            "namepatient" => assign(&mut p.name, PATIENT_RECORD, &field, issues),
            "surnamepatient" => assign(&mut p.surname, PATIENT_RECORD, &field, issues),
            "dnipatient" => assign(&mut p.dni, PATIENT_RECORD, &field, issues),
            "dobpatient" => assign(&mut p.date_of_birth, PATIENT_RECORD, &field, issues),
            "sexpatient" => assign(&mut p.sex, PATIENT_RECORD, &field, issues),
            "emailpatient" => assign(&mut p.email, PATIENT_RECORD, &field, issues),
            "phonepatient" => assign(&mut p.phone, PATIENT_RECORD, &field, issues),
            "healthinsurancenumberpatient" => {
                assign(&mut p.health_insurance_number, PATIENT_RECORD, &field, issues)
            }
            "diagnosislist" | "diagnosisfile" | "diagnosisfiles" => {
                p.diagnosis_files = match field.value {
                    FieldValue::Null => Vec::new(),
                    _ => decode_files_unlogged(field.text, issues),
                };
            }
            _ => unknown(PATIENT_RECORD, &field, issues),
        }
    }

    patient
}

pub(super) fn assemble_diagnosis_file(body: &str, issues: &mut Vec<DecodeIssue>) -> DiagnosisFile {
    let mut file = DiagnosisFile::default();

    for mut field in scanner::parse_fields(DIAGNOSIS_FILE_RECORD, body, issues) {
        let f = &mut file;
        match field.key.to_ascii_lowercase().as_str() {
            "id" => assign(&mut f.id, DIAGNOSIS_FILE_RECORD, &field, issues),
            "date" => assign(&mut f.date, DIAGNOSIS_FILE_RECORD, &field, issues),
            "symptoms" => {
                field.value = symptom_labels(field.value, issues);
                assign(&mut f.symptoms, DIAGNOSIS_FILE_RECORD, &field, issues)
            }
            "diagnosis" => assign(&mut f.diagnosis, DIAGNOSIS_FILE_RECORD, &field, issues),
            "medication" => assign(&mut f.medication, DIAGNOSIS_FILE_RECORD, &field, issues),
            "patientid" => assign(&mut f.patient_id, DIAGNOSIS_FILE_RECORD, &field, issues),
            "status" => assign(&mut f.status, DIAGNOSIS_FILE_RECORD, &field, issues),
            _ => unknown(DIAGNOSIS_FILE_RECORD, &field, issues),
        }
    }

    file
}

/// Symptom list entries may be nested records; each contributes its `name`
/// field, or its first field when it has no name.
fn symptom_labels(value: FieldValue, issues: &mut Vec<DecodeIssue>) -> FieldValue {
    let items = match value {
        FieldValue::List(items) => items,
        other => return other,
    };

    let labels = items
        .into_iter()
        .filter_map(|item| match scanner::as_record(&item) {
            None => Some(item),
            Some((name, body)) => {
                let fields = scanner::parse_fields(name, body, issues);
                let chosen = fields
                    .iter()
                    .find(|f| f.key.eq_ignore_ascii_case("name"))
                    .or_else(|| fields.first());
                match chosen.map(|f| &f.value) {
                    Some(FieldValue::Scalar(label)) => Some(label.clone()),
                    _ => None,
                }
            }
        })
        .collect();

    FieldValue::List(labels)
}
