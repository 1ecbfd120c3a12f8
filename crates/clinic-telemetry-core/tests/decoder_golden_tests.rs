//! Golden tests for the record decoder.
//!
//! Payloads are shaped like what the server sends for patient and diagnosis
//! file views.

use chrono::{NaiveDate, NaiveDateTime};
use clinic_telemetry_core::coerce::{Coerced, RawValue};
use clinic_telemetry_core::models::{DiagnosisFile, Patient, Sex};
use clinic_telemetry_core::{decode_diagnosis_files, decode_patients, DecodeIssue};
use proptest::prelude::*;

/// Test case from golden payloads.
struct GoldenCase {
    id: &'static str,
    payload: &'static str,
    expected_patients: usize,
    expected_file_ids: &'static [i32],
    expected_issue_count: usize,
}

fn get_golden_cases() -> Vec<GoldenCase> {
    vec![
        GoldenCase {
            id: "single-patient-no-files",
            payload: "Patient{idPatient=7, namePatient='Ana', surnamePatient='Ruiz', \
                      sexPatient='FEMALE', healthInsuranceNumberPatient=12345, diagnosisList=[]}",
            expected_patients: 1,
            expected_file_ids: &[],
            expected_issue_count: 0,
        },
        GoldenCase {
            id: "files-sorted-newest-first",
            payload: "Patient{idPatient=1, diagnosisList=[\
                      MedicalRecord{id=1, date=2024-01-01T10:00}, \
                      MedicalRecord{id=2, date=null}, \
                      MedicalRecord{id=3, date=2024-05-01T08:30}]}",
            expected_patients: 1,
            expected_file_ids: &[3, 1, 2],
            expected_issue_count: 0,
        },
        GoldenCase {
            id: "braces-inside-quoted-diagnosis",
            payload: "Patient{idPatient=2, diagnosisList=[\
                      MedicalRecord{id=5, diagnosis='arrhythmia {suspected}, recheck', status=true}]}",
            expected_patients: 1,
            expected_file_ids: &[5],
            expected_issue_count: 0,
        },
        GoldenCase {
            id: "unconvertible-date-kept-raw",
            payload: "Patient{idPatient=3, dobPatient='not-a-date'}",
            expected_patients: 1,
            expected_file_ids: &[],
            expected_issue_count: 1,
        },
        GoldenCase {
            id: "two-patients",
            payload: "Patient{idPatient=4} Patient{idPatient=5}",
            expected_patients: 2,
            expected_file_ids: &[],
            expected_issue_count: 0,
        },
        GoldenCase {
            id: "unbalanced-record-skipped",
            payload: "Patient{idPatient=6, namePatient='Eva'",
            expected_patients: 0,
            expected_file_ids: &[],
            expected_issue_count: 1,
        },
    ]
}

#[test]
fn test_golden_cases() {
    for case in get_golden_cases() {
        let decoded = decode_patients(case.payload);

        assert_eq!(
            decoded.records.len(),
            case.expected_patients,
            "Case {}: patient count",
            case.id
        );
        assert_eq!(
            decoded.issues.len(),
            case.expected_issue_count,
            "Case {}: issues {:?}",
            case.id,
            decoded.issues
        );

        let file_ids: Vec<i32> = decoded
            .first()
            .map(|p| p.diagnosis_files.iter().filter_map(|f| f.id()).collect())
            .unwrap_or_default();
        assert_eq!(file_ids, case.expected_file_ids, "Case {}: file order", case.id);
    }
}

#[test]
fn test_full_patient_fields() {
    let decoded = decode_patients(
        "Patient{idPatient=7, namePatient='Ana', surnamePatient='Ruiz', dniPatient='12345678Z', \
         dobPatient=1990-03-15, sexPatient='FEMALE', emailPatient='ana@example.com', \
         phonePatient='600123123', healthInsuranceNumberPatient=12345, diagnosisList=[]}",
    );
    assert!(decoded.is_clean());

    let patient = decoded.into_first().unwrap();
    assert_eq!(patient.full_name(), "Ana Ruiz");
    assert_eq!(patient.dni, Coerced::Typed("12345678Z".to_string()));
    assert_eq!(
        patient.date_of_birth,
        Coerced::Typed(NaiveDate::from_ymd_opt(1990, 3, 15).unwrap())
    );
    assert_eq!(patient.sex, Coerced::Typed(Sex::Female));
    assert_eq!(patient.phone.typed().map(String::as_str), Some("600123123"));
    assert_eq!(patient.health_insurance_number(), Some(12345));
}

#[test]
fn test_raw_date_is_reported() {
    let decoded = decode_patients("Patient{idPatient=3, dobPatient='not-a-date'}");
    let patient = decoded.first().unwrap();

    assert_eq!(
        patient.date_of_birth.raw(),
        Some(&RawValue::Scalar("not-a-date".to_string()))
    );
    assert!(matches!(
        &decoded.issues[0],
        DecodeIssue::FieldLeftRaw { field, .. } if field == "dobPatient"
    ));
    // The rest of the record still decodes
    assert_eq!(patient.id(), Some(3));
}

#[test]
fn test_diagnosis_file_payload() {
    let decoded = decode_diagnosis_files(
        "MedicalRecord{id=9, date=2024-02-10T11:15:00, symptoms=[fever, cough], \
         diagnosis='flu', medication='rest, fluids', patientId=7, status=false}",
    );
    assert!(decoded.is_clean());

    let file = decoded.into_first().unwrap();
    assert_eq!(file.id(), Some(9));
    assert_eq!(
        file.date(),
        NaiveDateTime::parse_from_str("2024-02-10T11:15:00", "%Y-%m-%dT%H:%M:%S").ok()
    );
    assert_eq!(file.symptoms(), ["fever", "cough"]);
    assert_eq!(file.medication.typed().map(String::as_str), Some("rest, fluids"));
    assert_eq!(file.patient_id.typed(), Some(&7));
    assert!(!file.is_completed());
}

#[test]
fn test_quoted_braces_survive() {
    let decoded = decode_patients(
        "Patient{idPatient=2, diagnosisList=[\
         MedicalRecord{id=5, diagnosis='arrhythmia {suspected}, recheck', status=true}]}",
    );
    let patient = decoded.into_first().unwrap();
    let file = &patient.diagnosis_files[0];
    assert_eq!(
        file.diagnosis.typed().map(String::as_str),
        Some("arrhythmia {suspected}, recheck")
    );
    assert!(file.is_completed());
}

/// Render a diagnosis file the way the server does.
fn encode_file(id: i32, date: Option<NaiveDateTime>) -> String {
    let date = date
        .map(|d| d.format("%Y-%m-%dT%H:%M:%S").to_string())
        .unwrap_or_else(|| "null".to_string());
    format!("MedicalRecord{{id={}, date={}, status=false}}", id, date)
}

fn arb_date() -> impl Strategy<Value = Option<NaiveDateTime>> {
    prop::option::of((2000i32..2030, 1u32..=12, 1u32..=28, 0u32..24, 0u32..60)).prop_map(|parts| {
        parts.and_then(|(y, m, d, h, min)| {
            NaiveDate::from_ymd_opt(y, m, d).and_then(|date| date.and_hms_opt(h, min, 0))
        })
    })
}

proptest! {
    #[test]
    fn prop_files_are_newest_first(dates in prop::collection::vec(arb_date(), 0..12)) {
        let payload: Vec<String> = dates
            .iter()
            .enumerate()
            .map(|(i, date)| encode_file(i as i32, *date))
            .collect();
        let decoded = decode_diagnosis_files(&payload.join(", "));

        prop_assert!(decoded.is_clean());
        prop_assert_eq!(decoded.records.len(), dates.len());

        let decoded_dates: Vec<_> = decoded.records.iter().map(|f| f.date()).collect();
        let dated = decoded_dates.iter().take_while(|d| d.is_some()).count();
        prop_assert!(decoded_dates[dated..].iter().all(|d| d.is_none()));
        prop_assert!(decoded_dates[..dated].windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn prop_decoding_never_panics(text in ".{0,200}") {
        let _ = decode_patients(&text);
        let _ = decode_diagnosis_files(&text);
    }

    #[test]
    fn prop_names_survive_quoting(name in "[A-Za-z ]{1,20}", id in 1i32..100_000) {
        let payload = format!("Patient{{idPatient={}, namePatient='{}'}}", id, name);
        let patient = decode_patients(&payload).into_first().unwrap();

        prop_assert_eq!(patient.id(), Some(id));
        prop_assert_eq!(patient.name.typed().map(String::as_str), Some(name.as_str()));
    }
}

// =========================================================================
// Round trip through a test-only encoder
// =========================================================================

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn render_raw(raw: &RawValue) -> String {
    match raw {
        RawValue::Scalar(text) => quote(text),
        RawValue::List(items) => format!(
            "[{}]",
            items.iter().map(|i| quote(i)).collect::<Vec<_>>().join(", ")
        ),
    }
}

fn push_field<T>(out: &mut Vec<String>, key: &str, value: &Coerced<T>, render: impl Fn(&T) -> String) {
    match value {
        Coerced::Absent => {}
        Coerced::Typed(v) => out.push(format!("{}={}", key, render(v))),
        Coerced::Raw(raw) => out.push(format!("{}={}", key, render_raw(raw))),
    }
}

fn encode_diagnosis_file(file: &DiagnosisFile) -> String {
    let mut fields = Vec::new();
    push_field(&mut fields, "id", &file.id, |v| v.to_string());
    push_field(&mut fields, "date", &file.date, |v| quote(&v.to_string()));
    push_field(&mut fields, "symptoms", &file.symptoms, |v| {
        render_raw(&RawValue::List(v.clone()))
    });
    push_field(&mut fields, "diagnosis", &file.diagnosis, |v| quote(v));
    push_field(&mut fields, "medication", &file.medication, |v| quote(v));
    push_field(&mut fields, "patientId", &file.patient_id, |v| v.to_string());
    push_field(&mut fields, "status", &file.status, |v| v.to_string());
    format!("MedicalRecord{{{}}}", fields.join(", "))
}

fn encode_patient(patient: &Patient) -> String {
    let mut fields = Vec::new();
    push_field(&mut fields, "idPatient", &patient.id, |v| v.to_string());
    push_field(&mut fields, "namePatient", &patient.name, |v| quote(v));
    push_field(&mut fields, "surnamePatient", &patient.surname, |v| quote(v));
    push_field(&mut fields, "dniPatient", &patient.dni, |v| quote(v));
    push_field(&mut fields, "dobPatient", &patient.date_of_birth, |v| v.to_string());
    push_field(&mut fields, "sexPatient", &patient.sex, |v| quote(v.as_str()));
    push_field(&mut fields, "emailPatient", &patient.email, |v| quote(v));
    push_field(&mut fields, "phonePatient", &patient.phone, |v| quote(v));
    push_field(&mut fields, "healthInsuranceNumberPatient", &patient.health_insurance_number, |v| {
        v.to_string()
    });
    let files: Vec<String> = patient.diagnosis_files.iter().map(encode_diagnosis_file).collect();
    fields.push(format!("diagnosisList=[{}]", files.join(", ")));
    format!("Patient{{{}}}", fields.join(", "))
}

fn arb_file_text() -> impl Strategy<Value = String> {
    (
        0i32..1000,
        arb_date(),
        prop::collection::vec("[A-Za-z ]{1,8}", 0..4),
        "[A-Za-z {}',]{0,16}",
        any::<bool>(),
    )
        .prop_map(|(id, date, symptoms, diagnosis, status)| {
            let date = date
                .map(|d| quote(&d.to_string()))
                .unwrap_or_else(|| "null".to_string());
            let symptoms: Vec<String> = symptoms.iter().map(|s| quote(s)).collect();
            format!(
                "MedicalRecord{{id={}, date={}, symptoms=[{}], diagnosis={}, status={}}}",
                id,
                date,
                symptoms.join(", "),
                quote(&diagnosis),
                status
            )
        })
}

fn arb_patient_text() -> impl Strategy<Value = String> {
    (
        1i32..100_000,
        "[A-Za-z ]{1,12}",
        "[A-Za-z '{}]{0,12}",
        prop_oneof![Just("MALE"), Just("FEMALE"), Just("other")],
        prop::option::of(1i32..1_000_000),
        prop::collection::vec(arb_file_text(), 0..4),
    )
        .prop_map(|(id, name, surname, sex, hin, files)| {
            let hin = hin.map(|h| h.to_string()).unwrap_or_else(|| "null".to_string());
            format!(
                "Patient{{idPatient={}, namePatient={}, surnamePatient={}, sexPatient='{}', \
                 healthInsuranceNumberPatient={}, diagnosisList=[{}]}}",
                id,
                quote(&name),
                quote(&surname),
                sex,
                hin,
                files.join(", ")
            )
        })
}

proptest! {
    #[test]
    fn prop_reencoded_patient_decodes_identically(text in arb_patient_text()) {
        let first = decode_patients(&text).into_first().unwrap();
        let second = decode_patients(&encode_patient(&first)).into_first().unwrap();
        prop_assert_eq!(first, second);
    }
}
