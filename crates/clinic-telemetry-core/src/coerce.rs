//! Type coercion for decoded record values.
//!
//! Decoded values arrive as text. Each typed field asks for a conversion and
//! gets back a [`Coerced`] value that says whether the conversion worked.
//! A failed conversion keeps the original text instead of raising, so one bad
//! field never costs the rest of the record.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// An untyped value as the decoder produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RawValue {
    Scalar(String),
    List(Vec<String>),
}

impl RawValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            RawValue::Scalar(s) => Some(s),
            RawValue::List(_) => None,
        }
    }
}

impl std::fmt::Display for RawValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawValue::Scalar(s) => f.write_str(s),
            RawValue::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

/// Outcome of coercing one field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Coerced<T> {
    /// The field was missing or `null`.
    Absent,
    /// The value converted to the field's type.
    Typed(T),
    /// Conversion failed; the original value is kept as-is.
    Raw(RawValue),
}

impl<T> Default for Coerced<T> {
    fn default() -> Self {
        Coerced::Absent
    }
}

impl<T> Coerced<T> {
    pub fn typed(&self) -> Option<&T> {
        match self {
            Coerced::Typed(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_typed(self) -> Option<T> {
        match self {
            Coerced::Typed(value) => Some(value),
            _ => None,
        }
    }

    pub fn raw(&self) -> Option<&RawValue> {
        match self {
            Coerced::Raw(raw) => Some(raw),
            _ => None,
        }
    }

    pub fn is_typed(&self) -> bool {
        matches!(self, Coerced::Typed(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Coerced::Absent)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Coerced<U> {
        match self {
            Coerced::Absent => Coerced::Absent,
            Coerced::Typed(value) => Coerced::Typed(f(value)),
            Coerced::Raw(raw) => Coerced::Raw(raw),
        }
    }
}

impl<T: std::fmt::Display> Coerced<T> {
    /// Text for display: the typed value, or the raw text it was left as.
    pub fn display_text(&self) -> Option<String> {
        match self {
            Coerced::Absent => None,
            Coerced::Typed(value) => Some(value.to_string()),
            Coerced::Raw(raw) => Some(raw.to_string()),
        }
    }
}

/// Types a raw decoded value can be converted into.
pub trait FromRaw: Sized {
    fn from_raw(raw: &RawValue) -> Option<Self>;
}

/// Convert `raw`, falling back to the unconverted value on failure.
pub fn coerce<T: FromRaw>(raw: RawValue) -> Coerced<T> {
    match T::from_raw(&raw) {
        Some(value) => Coerced::Typed(value),
        None => Coerced::Raw(raw),
    }
}

impl FromRaw for String {
    fn from_raw(raw: &RawValue) -> Option<Self> {
        raw.as_scalar().map(str::to_string)
    }
}

impl FromRaw for i32 {
    fn from_raw(raw: &RawValue) -> Option<Self> {
        raw.as_scalar()?.trim().parse().ok()
    }
}

impl FromRaw for i64 {
    fn from_raw(raw: &RawValue) -> Option<Self> {
        raw.as_scalar()?.trim().parse().ok()
    }
}

impl FromRaw for bool {
    fn from_raw(raw: &RawValue) -> Option<Self> {
        let text = raw.as_scalar()?.trim();
        if text.eq_ignore_ascii_case("true") {
            Some(true)
        } else if text.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }
}

const DATE_FORMAT: &str = "%Y-%m-%d";

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO date, or the date part of an ISO date-time.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .ok()
        .or_else(|| parse_date_time_only(text).map(|dt| dt.date()))
}

/// Parse an ISO date-time; a bare date means the start of that day.
pub fn parse_date_time(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    parse_date_time_only(text).or_else(|| {
        NaiveDate::parse_from_str(text, DATE_FORMAT)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    })
}

fn parse_date_time_only(text: &str) -> Option<NaiveDateTime> {
    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}

impl FromRaw for NaiveDate {
    fn from_raw(raw: &RawValue) -> Option<Self> {
        parse_date(raw.as_scalar()?)
    }
}

impl FromRaw for NaiveDateTime {
    fn from_raw(raw: &RawValue) -> Option<Self> {
        parse_date_time(raw.as_scalar()?)
    }
}

impl FromRaw for Vec<String> {
    fn from_raw(raw: &RawValue) -> Option<Self> {
        match raw {
            RawValue::List(items) => Some(items.clone()),
            RawValue::Scalar(text) => Some(
                text.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
        }
    }
}
