//! Domain models for the clinical telemetry client.

mod diagnosis_file;
mod patient;
mod registration;

pub use diagnosis_file::*;
pub use patient::*;
pub use registration::*;
