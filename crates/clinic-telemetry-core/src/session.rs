//! Doctor session.
//!
//! A [`Session`] owns the single connection and everything derived from it:
//! the logged-in identity, the patient and diagnosis file on screen, and the
//! recording being paged. All operations take `&mut self`, so two exchanges
//! can never interleave on the same connection.

use std::io::{Read, Write};
use std::net::TcpStream;

use chrono::{Local, NaiveDate};
use thiserror::Error;
use tracing::info;

use crate::config::ClientConfig;
use crate::decoder::Decoded;
use crate::directory::PatientDirectory;
use crate::export::{DiagnosisExport, RecordingExport};
use crate::fragment::{Direction, FragmentNavigationError, FragmentSession, LoadedRecording};
use crate::models::{DiagnosisFile, DoctorRegistration, Patient};
use crate::protocol::{Dispatcher, LoginOutcome, PatientEntry, ProtocolError, SignUpOutcome};
use crate::transport::{Connection, ConnectionError, PeerInfo};
use crate::validation::{validate_registration, ValidationError};

/// Session errors.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Fragment(#[from] FragmentNavigationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Server reply contained no patient record")]
    EmptyRecord,

    #[error("No patient is selected")]
    NoPatient,

    #[error("Diagnosis file {0} does not belong to the selected patient")]
    DiagnosisFileNotFound(i32),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// One doctor's connection and view state.
pub struct Session<R: Read = TcpStream, W: Write = TcpStream> {
    conn: Connection<R, W>,
    username: Option<String>,
    current_patient: Option<Patient>,
    current_diagnosis_file: Option<DiagnosisFile>,
    fragments: FragmentSession,
}

impl Session<TcpStream, TcpStream> {
    /// Connect and handshake.
    pub fn connect(config: &ClientConfig) -> SessionResult<Self> {
        Ok(Self::new(Connection::connect_with(config)?))
    }
}

impl<R: Read, W: Write> Session<R, W> {
    pub fn new(conn: Connection<R, W>) -> Self {
        Self {
            conn,
            username: None,
            current_patient: None,
            current_diagnosis_file: None,
            fragments: FragmentSession::new(),
        }
    }

    fn dispatcher(&mut self) -> Dispatcher<'_, R, W> {
        Dispatcher::new(&mut self.conn)
    }

    pub fn peer(&self) -> &PeerInfo {
        self.conn.peer()
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Logged-in username, if any.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn current_patient(&self) -> Option<&Patient> {
        self.current_patient.as_ref()
    }

    pub fn current_diagnosis_file(&self) -> Option<&DiagnosisFile> {
        self.current_diagnosis_file.as_ref()
    }

    pub fn fragments(&self) -> &FragmentSession {
        &self.fragments
    }

    /// Log in. Identity is only recorded when the server accepts.
    pub fn login(&mut self, username: &str, password: &str) -> SessionResult<LoginOutcome> {
        let outcome = self.dispatcher().login(username, password)?;
        if outcome.ok {
            info!(username, "logged in");
            self.username = Some(username.to_string());
        } else {
            info!(username, message = %outcome.message, "login rejected");
        }
        Ok(outcome)
    }

    /// Validate the form, then register it.
    pub fn sign_up(&mut self, form: &DoctorRegistration) -> SessionResult<SignUpOutcome> {
        let form = validate_registration(form)?;
        Ok(self.dispatcher().sign_up(&form)?)
    }

    pub fn search_patient(&mut self) -> SessionResult<Vec<PatientEntry>> {
        Ok(self.dispatcher().search_patient()?)
    }

    pub fn list_patients(&mut self) -> SessionResult<PatientDirectory> {
        Ok(PatientDirectory::new(self.dispatcher().list_patients()?))
    }

    /// Fetch a patient by HIN and make it the current patient.
    ///
    /// The previous patient, diagnosis file and recording are dropped.
    pub fn view_patient(&mut self, hin: i32) -> SessionResult<&Patient> {
        let patient = self
            .dispatcher()
            .view_patient(hin)?
            .into_first()
            .ok_or(SessionError::EmptyRecord)?;

        self.current_diagnosis_file = None;
        self.fragments.discard();
        Ok(self.current_patient.insert(patient))
    }

    /// Make one of the current patient's diagnosis files current.
    pub fn select_diagnosis_file(&mut self, diagnosis_file_id: i32) -> SessionResult<&DiagnosisFile> {
        let patient = self.current_patient.as_ref().ok_or(SessionError::NoPatient)?;
        let file = patient
            .diagnosis_file(diagnosis_file_id)
            .cloned()
            .ok_or(SessionError::DiagnosisFileNotFound(diagnosis_file_id))?;

        if self.fragments.cursor().map(|c| c.diagnosis_file_id) != Some(diagnosis_file_id) {
            self.fragments.discard();
        }
        Ok(self.current_diagnosis_file.insert(file))
    }

    /// Open a recording at its first fragment, replacing any other.
    pub fn view_recording(&mut self, diagnosis_file_id: i32) -> SessionResult<&LoadedRecording> {
        let file = self
            .current_patient
            .as_ref()
            .and_then(|p| p.diagnosis_file(diagnosis_file_id))
            .cloned();

        {
            let mut dispatcher = Dispatcher::new(&mut self.conn);
            self.fragments.load(&mut dispatcher, diagnosis_file_id)?;
        }

        // Only a delivered recording moves the selection.
        self.current_diagnosis_file = file;
        Ok(self
            .fragments
            .current()
            .ok_or(FragmentNavigationError::NoRecording)?)
    }

    /// Page the open recording.
    pub fn change_fragment(&mut self, direction: Direction) -> SessionResult<&LoadedRecording> {
        let mut dispatcher = Dispatcher::new(&mut self.conn);
        Ok(self.fragments.advance(&mut dispatcher, direction)?)
    }

    pub fn download_diagnosis_file(&mut self, diagnosis_file_id: i32) -> SessionResult<DiagnosisExport> {
        let content = self.dispatcher().download_diagnosis_file(diagnosis_file_id)?;
        Ok(DiagnosisExport::new(diagnosis_file_id, today(), content))
    }

    pub fn download_recording(&mut self, diagnosis_file_id: i32) -> SessionResult<RecordingExport> {
        let download = self.dispatcher().download_recording(diagnosis_file_id)?;
        Ok(RecordingExport::from_download(diagnosis_file_id, today(), &download))
    }

    pub fn recently_finished(&mut self) -> SessionResult<Decoded<DiagnosisFile>> {
        Ok(self.dispatcher().recently_finished()?)
    }

    pub fn complete_diagnosis_file(
        &mut self,
        diagnosis_file_id: i32,
        diagnosis: &str,
        medications: &str,
    ) -> SessionResult<()> {
        self.dispatcher()
            .complete_diagnosis_file(diagnosis_file_id, diagnosis, medications)?;
        info!(diagnosis_file_id, "diagnosis file completed");
        Ok(())
    }

    pub fn back_to_menu(&mut self) -> SessionResult<()> {
        self.dispatcher().back_to_menu()?;
        self.clear_view();
        Ok(())
    }

    pub fn back_to_search_patient(&mut self) -> SessionResult<()> {
        self.dispatcher().back_to_search_patient()?;
        self.clear_view();
        Ok(())
    }

    /// Log out and tear down the connection.
    ///
    /// Local state is cleared even if the server could not be told.
    pub fn log_out(&mut self) -> SessionResult<()> {
        let sent = self.dispatcher().log_out();
        if let Some(username) = self.username.take() {
            info!(%username, "logged out");
        }
        self.close();
        Ok(sent?)
    }

    /// Drop all state and release the connection. Safe to repeat.
    pub fn close(&mut self) {
        self.username = None;
        self.clear_view();
        self.conn.close();
    }

    fn clear_view(&mut self) {
        self.current_patient = None;
        self.current_diagnosis_file = None;
        self.fragments.discard();
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
