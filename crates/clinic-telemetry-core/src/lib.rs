//! Clinic Telemetry Core Library
//!
//! Client-side protocol engine for the clinical telemetry doctor client.
//!
//! # Architecture
//!
//! ```text
//!   caller (CLI / desktop front-end via FFI)
//!                  │
//!                  ▼
//!   ┌──────────────────────────────┐
//!   │           Session            │  identity, current patient / file
//!   └──────────────┬───────────────┘
//!                  │
//!     ┌────────────┼─────────────────────┐
//!     ▼            ▼                     ▼
//!  Dispatcher   FragmentSession      Directory / Export
//!  (opcodes)    (cursor, rollback)
//!     │            │
//!     ▼            │
//!  Connection ◄────┘        Decoder ──► Coercion
//!  (framing)                (record text → Patient / DiagnosisFile)
//! ```
//!
//! # Core Principle
//!
//! **One exchange at a time.** Every command is written, flushed and fully
//! answered before the next one starts; the session's `&mut self` (or the FFI
//! object's mutex) is what guarantees it.
//!
//! A front-end holds one [`DoctorClient`] for the life of the process. It owns
//! the only connection; switching servers goes through
//! [`DoctorClient::reconnect`] rather than a second client.
//!
//! # Modules
//!
//! - [`transport`]: connection, handshake and frame codec
//! - [`protocol`]: opcode catalog and request/response recipes
//! - [`decoder`]: record text decoder
//! - [`coerce`]: lenient type coercion for decoded fields
//! - [`fragment`]: recording pagination
//! - [`session`]: explicit session state
//! - [`models`]: domain types (Patient, DiagnosisFile, etc.)
//! - [`directory`], [`validation`], [`export`], [`config`]: supporting features

pub mod coerce;
pub mod config;
pub mod decoder;
pub mod directory;
pub mod export;
pub mod fragment;
pub mod models;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod validation;

// Re-export commonly used types
pub use coerce::{Coerced, RawValue};
pub use config::ClientConfig;
pub use decoder::{decode_diagnosis_files, decode_patients, DecodeIssue, Decoded};
pub use directory::{DirectoryMatch, PatientDirectory};
pub use export::{DiagnosisExport, RecordingExport};
pub use fragment::{Direction, FragmentCursor, FragmentSession, LoadedRecording};
pub use models::{DiagnosisFile, DoctorRegistration, Patient, PatientSummary, Sex};
pub use protocol::{Dispatcher, LoginOutcome, Opcode, PatientEntry, SignUpOutcome};
pub use session::{Session, SessionError};
pub use transport::{Connection, ConnectionError};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::path::Path;
use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ClientError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<SessionError> for ClientError {
    fn from(e: SessionError) -> Self {
        let message = e.to_string();
        match e {
            SessionError::Connection(_)
            | SessionError::Protocol(protocol::ProtocolError::Connection(_)) => {
                ClientError::ConnectionError(message)
            }
            SessionError::Protocol(_) | SessionError::Fragment(_) => {
                ClientError::ProtocolError(message)
            }
            SessionError::Validation(_) => ClientError::InvalidInput(message),
            SessionError::EmptyRecord
            | SessionError::NoPatient
            | SessionError::DiagnosisFileNotFound(_) => ClientError::NotFound(message),
        }
    }
}

impl From<config::ConfigError> for ClientError {
    fn from(e: config::ConfigError) -> Self {
        ClientError::InvalidInput(e.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::IoError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClientError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClientError::ConnectionError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Connect to a server and perform the doctor handshake.
#[uniffi::export]
pub fn connect_client(host: String, port: u16) -> Result<Arc<DoctorClient>, ClientError> {
    let config = ClientConfig {
        host,
        port,
        ..ClientConfig::default()
    };
    DoctorClient::open(&config)
}

/// Connect using a JSON config file, with environment overrides applied.
#[uniffi::export]
pub fn connect_client_from_config(path: String) -> Result<Arc<DoctorClient>, ClientError> {
    let config = ClientConfig::from_json_file(&path)?.with_env()?;
    DoctorClient::open(&config)
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe session wrapper for FFI.
///
/// The mutex is held for a whole request and reply, so calls from several
/// front-end threads are serialized. Each client owns exactly one connection.
#[derive(uniffi::Object)]
pub struct DoctorClient {
    session: Mutex<Session>,
}

impl DoctorClient {
    fn open(config: &ClientConfig) -> Result<Arc<Self>, ClientError> {
        let session = Session::connect(config)?;
        Ok(Arc::new(Self {
            session: Mutex::new(session),
        }))
    }
}

#[uniffi::export]
impl DoctorClient {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Log in. A rejected login is a normal result, not an error.
    pub fn login(&self, username: String, password: String) -> Result<FfiLoginResult, ClientError> {
        let mut session = self.session.lock()?;
        Ok(session.login(&username, &password)?.into())
    }

    /// Validate and submit a doctor registration.
    pub fn sign_up(&self, form: FfiRegistration) -> Result<FfiSignUpResult, ClientError> {
        let mut session = self.session.lock()?;
        Ok(session.sign_up(&form.into())?.into())
    }

    /// Current username, if logged in.
    pub fn username(&self) -> Result<Option<String>, ClientError> {
        let session = self.session.lock()?;
        Ok(session.username().map(str::to_string))
    }

    /// Log out and disconnect.
    pub fn log_out(&self) -> Result<(), ClientError> {
        let mut session = self.session.lock()?;
        Ok(session.log_out()?)
    }

    /// Disconnect without notifying the server.
    pub fn close(&self) -> Result<(), ClientError> {
        let mut session = self.session.lock()?;
        session.close();
        Ok(())
    }

    /// Drop the current connection and its state, then connect to `host`.
    ///
    /// If the new connection fails the client stays disconnected.
    pub fn reconnect(&self, host: String, port: u16) -> Result<(), ClientError> {
        let config = ClientConfig {
            host,
            port,
            ..ClientConfig::default()
        };
        let mut session = self.session.lock()?;
        session.close();
        *session = Session::connect(&config)?;
        Ok(())
    }

    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Patients assigned to this doctor, as listed by `SEARCH_PATIENT`.
    pub fn search_patient(&self) -> Result<Vec<FfiPatientEntry>, ClientError> {
        let mut session = self.session.lock()?;
        let entries = session.search_patient()?;
        Ok(entries.into_iter().map(|e| e.into()).collect())
    }

    /// Structured patient listing, filtered by name or DNI.
    pub fn list_patients(&self, query: Option<String>) -> Result<Vec<FfiPatientSummary>, ClientError> {
        let mut session = self.session.lock()?;
        let directory = session.list_patients()?;
        let matches = directory.filter(query.as_deref().unwrap_or(""));
        Ok(matches.into_iter().map(|m| m.patient.into()).collect())
    }

    /// Open a patient by health insurance number.
    pub fn view_patient(&self, hin: i32) -> Result<FfiPatient, ClientError> {
        let mut session = self.session.lock()?;
        let patient = session.view_patient(hin)?;
        Ok(patient.into())
    }

    /// Diagnosis files completed recently.
    pub fn recently_finished(&self) -> Result<Vec<FfiDiagnosisFile>, ClientError> {
        let mut session = self.session.lock()?;
        let decoded = session.recently_finished()?;
        Ok(decoded.records.iter().map(|f| f.into()).collect())
    }

    /// Save a diagnosis and medication for a diagnosis file.
    pub fn complete_diagnosis_file(
        &self,
        diagnosis_file_id: i32,
        diagnosis: String,
        medications: String,
    ) -> Result<(), ClientError> {
        let mut session = self.session.lock()?;
        Ok(session.complete_diagnosis_file(diagnosis_file_id, &diagnosis, &medications)?)
    }

    pub fn back_to_menu(&self) -> Result<(), ClientError> {
        let mut session = self.session.lock()?;
        Ok(session.back_to_menu()?)
    }

    pub fn back_to_search_patient(&self) -> Result<(), ClientError> {
        let mut session = self.session.lock()?;
        Ok(session.back_to_search_patient()?)
    }

    // =========================================================================
    // Recording Operations
    // =========================================================================

    /// Open a recording at its first fragment.
    pub fn view_recording(&self, diagnosis_file_id: i32) -> Result<FfiFragment, ClientError> {
        let mut session = self.session.lock()?;
        Ok(session.view_recording(diagnosis_file_id)?.into())
    }

    pub fn next_fragment(&self) -> Result<FfiFragment, ClientError> {
        let mut session = self.session.lock()?;
        Ok(session.change_fragment(Direction::Next)?.into())
    }

    pub fn previous_fragment(&self) -> Result<FfiFragment, ClientError> {
        let mut session = self.session.lock()?;
        Ok(session.change_fragment(Direction::Previous)?.into())
    }

    // =========================================================================
    // Download Operations
    // =========================================================================

    /// Download a diagnosis file into `dir`; returns the written path.
    pub fn download_diagnosis_file(&self, diagnosis_file_id: i32, dir: String) -> Result<String, ClientError> {
        let export = {
            let mut session = self.session.lock()?;
            session.download_diagnosis_file(diagnosis_file_id)?
        };
        let path = export.write_to(Path::new(&dir))?;
        Ok(path.display().to_string())
    }

    /// Download a recording as `ECG,EDA` CSV into `dir`; returns the written path.
    pub fn download_recording(&self, diagnosis_file_id: i32, dir: String) -> Result<String, ClientError> {
        let export = {
            let mut session = self.session.lock()?;
            session.download_recording(diagnosis_file_id)?
        };
        let path = export.write_to(Path::new(&dir))?;
        Ok(path.display().to_string())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe login result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiLoginResult {
    pub ok: bool,
    pub message: String,
}

impl From<LoginOutcome> for FfiLoginResult {
    fn from(outcome: LoginOutcome) -> Self {
        Self {
            ok: outcome.ok,
            message: outcome.message,
        }
    }
}

/// FFI-safe sign-up result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSignUpResult {
    pub accepted: bool,
    pub message: String,
}

impl From<SignUpOutcome> for FfiSignUpResult {
    fn from(outcome: SignUpOutcome) -> Self {
        Self {
            accepted: outcome.is_accepted(),
            message: outcome.message().to_string(),
        }
    }
}

/// FFI-safe registration form.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRegistration {
    pub username: String,
    pub password: String,
    pub name: String,
    pub surname: String,
    pub birthday: String,
    pub sex: String,
    pub email: String,
    pub specialty: String,
    pub license_number: String,
    pub dni: String,
}

impl From<FfiRegistration> for DoctorRegistration {
    fn from(form: FfiRegistration) -> Self {
        DoctorRegistration {
            username: form.username,
            password: form.password,
            name: form.name,
            surname: form.surname,
            birthday: form.birthday,
            sex: form.sex,
            email: form.email,
            specialty: form.specialty,
            license_number: form.license_number,
            dni: form.dni,
        }
    }
}

/// FFI-safe patient listing entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientEntry {
    pub label: String,
    pub hin: Option<i32>,
}

impl From<PatientEntry> for FfiPatientEntry {
    fn from(entry: PatientEntry) -> Self {
        Self {
            label: entry.label,
            hin: entry.hin,
        }
    }
}

/// FFI-safe patient summary.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientSummary {
    pub id: i32,
    pub name: String,
    pub surname: String,
    pub dni: String,
}

impl From<PatientSummary> for FfiPatientSummary {
    fn from(summary: PatientSummary) -> Self {
        Self {
            id: summary.id,
            name: summary.name,
            surname: summary.surname,
            dni: summary.dni,
        }
    }
}

/// FFI-safe patient. Text fields carry raw values when they did not convert.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: Option<i32>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub dni: Option<String>,
    pub date_of_birth: Option<String>,
    pub sex: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub health_insurance_number: Option<i32>,
    pub diagnosis_files: Vec<FfiDiagnosisFile>,
}

impl From<&Patient> for FfiPatient {
    fn from(patient: &Patient) -> Self {
        Self {
            id: patient.id(),
            name: patient.name.display_text(),
            surname: patient.surname.display_text(),
            dni: patient.dni.display_text(),
            date_of_birth: patient.date_of_birth.display_text(),
            sex: patient.sex.display_text(),
            email: patient.email.display_text(),
            phone: patient.phone.display_text(),
            health_insurance_number: patient.health_insurance_number(),
            diagnosis_files: patient.diagnosis_files.iter().map(|f| f.into()).collect(),
        }
    }
}

/// FFI-safe diagnosis file.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDiagnosisFile {
    pub id: Option<i32>,
    pub date: Option<String>,
    pub symptoms: Vec<String>,
    pub diagnosis: Option<String>,
    pub medication: Option<String>,
    pub patient_id: Option<i32>,
    pub completed: bool,
}

impl From<&DiagnosisFile> for FfiDiagnosisFile {
    fn from(file: &DiagnosisFile) -> Self {
        Self {
            id: file.id(),
            date: file.date.display_text(),
            symptoms: file.symptoms().to_vec(),
            diagnosis: file.diagnosis.display_text(),
            medication: file.medication.display_text(),
            patient_id: file.patient_id.typed().copied(),
            completed: file.is_completed(),
        }
    }
}

/// FFI-safe recording fragment.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiFragment {
    pub diagnosis_file_id: i32,
    pub index: u32,
    pub data: String,
    pub fragment_states: Vec<bool>,
}

impl From<&LoadedRecording> for FfiFragment {
    fn from(recording: &LoadedRecording) -> Self {
        let cursor = recording.cursor();
        Self {
            diagnosis_file_id: cursor.diagnosis_file_id,
            index: cursor.index,
            data: recording.data().to_string(),
            fragment_states: cursor.states.clone(),
        }
    }
}
