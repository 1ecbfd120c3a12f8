//! Registration field validation.
//!
//! Checks run before any bytes are sent, so a rejected form never reaches
//! the server.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use thiserror::Error;

use crate::models::{DoctorRegistration, Sex};

/// Control letters for DNI numbers, indexed by `number % 23`.
const DNI_LETTERS: &[u8; 23] = b"TRWAGMYFPDXBNJZSQVHLCKE";

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9+_.-]+@[A-Za-z0-9.-]+$").unwrap());

/// Letters (any script) and spaces.
static NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\p{Alphabetic} ]+$").unwrap());

/// DNI is 8 digits, NIE is X/Y/Z and 7 digits; both end in a control letter.
static DNI_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[XYZ0-9][0-9]{7}[A-Z]$").unwrap());

static BIRTHDAY_DAY_FIRST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{2}-[0-9]{2}-[0-9]{4}$").unwrap());

static BIRTHDAY_YEAR_FIRST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").unwrap());

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Username must not be empty")]
    EmptyUsername,

    #[error("Password must be at least 6 characters")]
    PasswordTooShort,

    #[error("{field} must contain only letters and spaces")]
    InvalidName { field: &'static str },

    #[error("Invalid birthday {0:?}; use dd-MM-yyyy or yyyy-MM-dd")]
    InvalidBirthday(String),

    #[error("Sex must be MALE or FEMALE, got {0:?}")]
    InvalidSex(String),

    #[error("Invalid e-mail address {0:?}")]
    InvalidEmail(String),

    #[error("Invalid DNI/NIE {0:?}")]
    InvalidDni(String),
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Strip spaces and hyphens and upper-case.
pub fn normalize_dni(dni: &str) -> String {
    dni.chars()
        .filter(|c| *c != ' ' && *c != '-')
        .flat_map(char::to_uppercase)
        .collect()
}

/// Check a DNI (`12345678Z`) or NIE (`X1234567L`) control letter.
pub fn is_valid_dni(dni: &str) -> bool {
    let normalized = normalize_dni(dni);
    if !DNI_SHAPE.is_match(&normalized) {
        return false;
    }

    let digits = match normalized.as_bytes()[0] {
        b'X' => format!("0{}", &normalized[1..8]),
        b'Y' => format!("1{}", &normalized[1..8]),
        b'Z' => format!("2{}", &normalized[1..8]),
        _ => normalized[..8].to_string(),
    };
    let Ok(number) = digits.parse::<u32>() else {
        return false;
    };
    normalized.as_bytes()[8] == DNI_LETTERS[(number % 23) as usize]
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

fn is_valid_name(name: &str) -> bool {
    !name.trim().is_empty() && NAME.is_match(name)
}

/// Parse a birthday in `dd-MM-yyyy` or `yyyy-MM-dd` form.
pub fn parse_birthday(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if BIRTHDAY_DAY_FIRST.is_match(text) {
        NaiveDate::parse_from_str(text, "%d-%m-%Y").ok()
    } else if BIRTHDAY_YEAR_FIRST.is_match(text) {
        NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
    } else {
        None
    }
}

/// Validate a sign-up form, returning it with the DNI normalized.
pub fn validate_registration(form: &DoctorRegistration) -> ValidationResult<DoctorRegistration> {
    if form.username.trim().is_empty() {
        return Err(ValidationError::EmptyUsername);
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    if !is_valid_name(&form.name) {
        return Err(ValidationError::InvalidName { field: "Name" });
    }
    if !is_valid_name(&form.surname) {
        return Err(ValidationError::InvalidName { field: "Surname" });
    }
    if parse_birthday(&form.birthday).is_none() {
        return Err(ValidationError::InvalidBirthday(form.birthday.clone()));
    }
    if form.sex.parse::<Sex>().is_err() {
        return Err(ValidationError::InvalidSex(form.sex.clone()));
    }
    if !is_valid_email(&form.email) {
        return Err(ValidationError::InvalidEmail(form.email.clone()));
    }
    if !is_valid_dni(&form.dni) {
        return Err(ValidationError::InvalidDni(form.dni.clone()));
    }

    Ok(DoctorRegistration {
        dni: normalize_dni(&form.dni),
        ..form.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> DoctorRegistration {
        DoctorRegistration {
            username: "drgarcia".into(),
            password: "secret1".into(),
            name: "María José".into(),
            surname: "García".into(),
            birthday: "15-03-1980".into(),
            sex: "FEMALE".into(),
            email: "maria.garcia@hospital.es".into(),
            specialty: "Cardiology".into(),
            license_number: "28/123456".into(),
            dni: "12345678-z".into(),
        }
    }

    #[test]
    fn test_dni_and_nie() {
        assert!(is_valid_dni("12345678Z"));
        assert!(is_valid_dni("12 345 678-z"));
        assert!(!is_valid_dni("12345678A"));
        assert!(is_valid_dni("X1234567L"));
        assert!(is_valid_dni("Y1234567X"));
        assert!(!is_valid_dni("X1234567A"));
        assert!(!is_valid_dni("1234567Z"));
        assert!(!is_valid_dni("W1234567L"));
    }

    #[test]
    fn test_email() {
        assert!(is_valid_email("a+b_c.d-e@host-1.example"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("@host"));
        assert!(!is_valid_email("a@b@c"));
        assert!(!is_valid_email("a b@host"));
        assert!(!is_valid_email("ana@hospital.es "));
    }

    #[test]
    fn test_names_allow_accents_but_not_digits() {
        assert!(is_valid_name("María José"));
        assert!(is_valid_name("Núñez"));
        assert!(!is_valid_name("   "));
        assert!(!is_valid_name("R2D2"));
        assert!(!is_valid_name("O'Brien"));
    }

    #[test]
    fn test_birthday_forms() {
        assert_eq!(parse_birthday("15-03-1980"), NaiveDate::from_ymd_opt(1980, 3, 15));
        assert_eq!(parse_birthday("1980-03-15"), NaiveDate::from_ymd_opt(1980, 3, 15));
        assert_eq!(parse_birthday("31-02-1980"), None);
        assert_eq!(parse_birthday("1980/03/15"), None);
        assert_eq!(parse_birthday("5-3-1980"), None);
        assert_eq!(parse_birthday("15-03-80"), None);
    }

    #[test]
    fn test_valid_form_is_normalized() {
        let form = validate_registration(&valid_form()).unwrap();
        assert_eq!(form.dni, "12345678Z");
        assert_eq!(form.username, "drgarcia");
    }

    #[test]
    fn test_first_failure_is_reported() {
        let mut form = valid_form();
        form.password = "123".into();
        form.sex = "female".into();
        assert_eq!(validate_registration(&form), Err(ValidationError::PasswordTooShort));

        form.password = "123456".into();
        assert_eq!(
            validate_registration(&form),
            Err(ValidationError::InvalidSex("female".into()))
        );

        form.sex = "MALE".into();
        form.name = "R2D2".into();
        assert_eq!(
            validate_registration(&form),
            Err(ValidationError::InvalidName { field: "Name" })
        );
    }
}
