//! Request/response recipes for every opcode.
//!
//! Each method writes its command, then reads exactly the frames that
//! command's reply carries. A reply opcode other than the expected one is a
//! [`ProtocolError::UnexpectedOpcode`]; no fields are read past it.

use std::io::{Read, Write};
use std::net::TcpStream;

use tracing::debug;

use super::{
    reply, Command, LoginOutcome, Opcode, PatientEntry, ProtocolError, ProtocolResult,
    RecordingDownload, RecordingView, SignUpOutcome,
};
use crate::decoder::{self, Decoded};
use crate::models::{DiagnosisFile, DoctorRegistration, Patient, PatientSummary};
use crate::transport::Connection;

/// Issues commands on a borrowed connection.
pub struct Dispatcher<'c, R: Read = TcpStream, W: Write = TcpStream> {
    conn: &'c mut Connection<R, W>,
}

impl<'c, R: Read, W: Write> Dispatcher<'c, R, W> {
    pub fn new(conn: &'c mut Connection<R, W>) -> Self {
        Self { conn }
    }

    fn send(&mut self, command: Command) -> ProtocolResult<()> {
        command.write_to(self.conn)?;
        Ok(())
    }

    fn recv_opcode(&mut self, command: Opcode) -> ProtocolResult<String> {
        let token = self.conn.recv_string()?;
        debug!(%command, reply = %token, "received reply");
        Ok(token)
    }

    fn expect(&mut self, command: Opcode, expected: &str) -> ProtocolResult<()> {
        let received = self.recv_opcode(command)?;
        if received == expected {
            Ok(())
        } else {
            Err(ProtocolError::UnexpectedOpcode {
                command,
                expected: expected.to_string(),
                received,
            })
        }
    }

    /// `LOGIN user pass` → `LOGIN_RESULT ok msg`
    pub fn login(&mut self, username: &str, password: &str) -> ProtocolResult<LoginOutcome> {
        self.send(Command::new(Opcode::Login).str(username).str(password))?;
        self.expect(Opcode::Login, reply::LOGIN_RESULT)?;
        let ok = self.conn.recv_bool()?;
        let message = self.conn.recv_string()?;
        Ok(LoginOutcome { ok, message })
    }

    /// `SIGNUP` with ten string fields → `ACK msg` or `ERROR msg`
    pub fn sign_up(&mut self, form: &DoctorRegistration) -> ProtocolResult<SignUpOutcome> {
        let command = form
            .wire_fields()
            .into_iter()
            .fold(Command::new(Opcode::SignUp), |cmd, field| cmd.str(field));
        self.send(command)?;

        let received = self.recv_opcode(Opcode::SignUp)?;
        match received.as_str() {
            reply::ACK => Ok(SignUpOutcome::Accepted(self.conn.recv_string()?)),
            reply::ERROR => Ok(SignUpOutcome::Rejected(self.conn.recv_string()?)),
            _ => Err(ProtocolError::UnexpectedOpcode {
                command: Opcode::SignUp,
                expected: format!("{} or {}", reply::ACK, reply::ERROR),
                received,
            }),
        }
    }

    /// `SEARCH_PATIENT` → one comma-separated listing frame
    pub fn search_patient(&mut self) -> ProtocolResult<Vec<PatientEntry>> {
        self.send(Command::new(Opcode::SearchPatient))?;
        let listing = self.conn.recv_string()?;
        Ok(listing
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(PatientEntry::parse)
            .collect())
    }

    /// `SEARCH_PATIENTS` → `PATIENT_LIST n` then n × (id, name, surname, dni)
    pub fn list_patients(&mut self) -> ProtocolResult<Vec<PatientSummary>> {
        self.send(Command::new(Opcode::SearchPatients))?;
        self.expect(Opcode::SearchPatients, reply::PATIENT_LIST)?;

        let count = self.conn.recv_int()?;
        let count = usize::try_from(count).map_err(|_| ProtocolError::InvalidReply {
            command: Opcode::SearchPatients,
            reason: format!("negative patient count {count}"),
        })?;

        let mut patients = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            patients.push(PatientSummary {
                id: self.conn.recv_int()?,
                name: self.conn.recv_string()?,
                surname: self.conn.recv_string()?,
                dni: self.conn.recv_string()?,
            });
        }
        Ok(patients)
    }

    /// `VIEW_PATIENT hin` → `PATIENT_OVERVIEW_SENT record-text`
    pub fn view_patient(&mut self, hin: i32) -> ProtocolResult<Decoded<Patient>> {
        self.send(Command::new(Opcode::ViewPatient).int(hin))?;
        self.expect(Opcode::ViewPatient, reply::PATIENT_OVERVIEW_SENT)?;
        let text = self.conn.recv_string()?;
        Ok(decoder::decode_patients(&text))
    }

    /// `VIEW_RECORDING "id,index"` → data, fragment states
    pub fn view_recording(
        &mut self,
        diagnosis_file_id: i32,
        fragment_index: u32,
    ) -> ProtocolResult<RecordingView> {
        self.send(
            Command::new(Opcode::ViewRecording).str(format!("{diagnosis_file_id},{fragment_index}")),
        )?;
        let data = self.conn.recv_string()?;
        let fragment_states = self.conn.recv_string()?;
        Ok(RecordingView {
            data,
            fragment_states,
        })
    }

    /// `CHANGE_FRAGMENT "id,index"` → fragment data
    pub fn change_fragment(
        &mut self,
        diagnosis_file_id: i32,
        fragment_index: u32,
    ) -> ProtocolResult<String> {
        self.send(
            Command::new(Opcode::ChangeFragment).str(format!("{diagnosis_file_id},{fragment_index}")),
        )?;
        Ok(self.conn.recv_string()?)
    }

    /// `DOWNLOAD_DIAGNOSISFILE id` → `DOWNLOAD_DIAGNOSISFILE_STARTED content`
    pub fn download_diagnosis_file(&mut self, diagnosis_file_id: i32) -> ProtocolResult<String> {
        self.send(Command::new(Opcode::DownloadDiagnosisFile).str(diagnosis_file_id.to_string()))?;
        self.expect(Opcode::DownloadDiagnosisFile, reply::DOWNLOAD_DIAGNOSISFILE_STARTED)?;
        Ok(self.conn.recv_string()?)
    }

    /// `DOWNLOAD_RECORDING id` → `DOWNLOAD_RECORDING_STARTED ecg eda DOWNLOAD_FINISHED`
    pub fn download_recording(&mut self, diagnosis_file_id: i32) -> ProtocolResult<RecordingDownload> {
        self.send(Command::new(Opcode::DownloadRecording).str(diagnosis_file_id.to_string()))?;
        self.expect(Opcode::DownloadRecording, reply::DOWNLOAD_RECORDING_STARTED)?;
        let ecg = self.conn.recv_string()?;
        let eda = self.conn.recv_string()?;
        self.expect(Opcode::DownloadRecording, reply::DOWNLOAD_FINISHED)?;
        Ok(RecordingDownload { ecg, eda })
    }

    /// `RECENTLY_FINISH` → record-text frames until `RECENTLY_FINISHED`
    pub fn recently_finished(&mut self) -> ProtocolResult<Decoded<DiagnosisFile>> {
        self.send(Command::new(Opcode::RecentlyFinish))?;

        let mut frames = Vec::new();
        loop {
            let frame = self.conn.recv_string()?;
            if frame == reply::RECENTLY_FINISHED {
                break;
            }
            if frames.is_empty() && frame == reply::RECENTLY_FINISH_LIST {
                continue;
            }
            frames.push(frame);
        }
        debug!(frames = frames.len(), "recently finished stream complete");

        Ok(decoder::decode_diagnosis_files(&frames.join(" ")))
    }

    /// `COMPLETE_DIAGNOSISFILE id text medications` → `COMPLETE_DIAGNOSISFILE_SAVED`
    pub fn complete_diagnosis_file(
        &mut self,
        diagnosis_file_id: i32,
        diagnosis: &str,
        medications: &str,
    ) -> ProtocolResult<()> {
        self.send(
            Command::new(Opcode::CompleteDiagnosisFile)
                .str(diagnosis_file_id.to_string())
                .str(diagnosis)
                .str(medications),
        )?;
        self.expect(Opcode::CompleteDiagnosisFile, reply::COMPLETE_DIAGNOSISFILE_SAVED)
    }

    pub fn log_out(&mut self) -> ProtocolResult<()> {
        self.send(Command::new(Opcode::LogOut))
    }

    pub fn back_to_menu(&mut self) -> ProtocolResult<()> {
        self.send(Command::new(Opcode::BackToMenu))
    }

    pub fn back_to_search_patient(&mut self) -> ProtocolResult<()> {
        self.send(Command::new(Opcode::BackToSearchPatient))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::{scripted, sent_strings, ReplyBuilder};

    #[test]
    fn test_login_rejected() {
        let reply = ReplyBuilder::default()
            .str("LOGIN_RESULT")
            .bool(false)
            .str("bad credentials");
        let (mut conn, sent) = scripted(reply);

        let outcome = Dispatcher::new(&mut conn).login("doc", "wrong").unwrap();
        assert!(!outcome.ok);
        assert_eq!(outcome.message, "bad credentials");
        assert_eq!(sent_strings(&sent.bytes()), ["Doctor", "LOGIN", "doc", "wrong"]);
    }

    #[test]
    fn test_unexpected_opcode_stops_reading() {
        let reply = ReplyBuilder::default().str("ERROR").str("later frame");
        let (mut conn, _sent) = scripted(reply);

        let err = Dispatcher::new(&mut conn).login("doc", "pw").unwrap_err();
        match err {
            ProtocolError::UnexpectedOpcode { command, received, .. } => {
                assert_eq!(command, Opcode::Login);
                assert_eq!(received, "ERROR");
            }
            other => panic!("unexpected error: {other}"),
        }
        // The connection is still usable.
        assert_eq!(conn.recv_string().unwrap(), "later frame");
    }

    #[test]
    fn test_sign_up_error_is_an_outcome() {
        let reply = ReplyBuilder::default().str("ERROR").str("username taken");
        let (mut conn, sent) = scripted(reply);
        let form = DoctorRegistration {
            username: "doc".into(),
            ..DoctorRegistration::default()
        };

        let outcome = Dispatcher::new(&mut conn).sign_up(&form).unwrap();
        assert_eq!(outcome, SignUpOutcome::Rejected("username taken".into()));
        assert_eq!(sent_strings(&sent.bytes()).len(), 12);
    }

    #[test]
    fn test_search_patient_listing() {
        let reply = ReplyBuilder::default().str("12345 Ana Ruiz, 678 Luis Gil, ");
        let (mut conn, _sent) = scripted(reply);

        let entries = Dispatcher::new(&mut conn).search_patient().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].hin, Some(12345));
        assert_eq!(entries[1].label, "678 Luis Gil");
    }

    #[test]
    fn test_list_patients() {
        let reply = ReplyBuilder::default()
            .str("PATIENT_LIST")
            .int(2)
            .int(1)
            .str("Ana")
            .str("Ruiz")
            .str("12345678Z")
            .int(2)
            .str("Luis")
            .str("Gil")
            .str("X1234567L");
        let (mut conn, _sent) = scripted(reply);

        let patients = Dispatcher::new(&mut conn).list_patients().unwrap();
        assert_eq!(patients.len(), 2);
        assert_eq!(patients[1].full_name(), "Luis Gil");
    }

    #[test]
    fn test_list_patients_negative_count() {
        let reply = ReplyBuilder::default().str("PATIENT_LIST").int(-1);
        let (mut conn, _sent) = scripted(reply);
        assert!(matches!(
            Dispatcher::new(&mut conn).list_patients(),
            Err(ProtocolError::InvalidReply { .. })
        ));
    }

    #[test]
    fn test_view_recording_argument() {
        let reply = ReplyBuilder::default().str("1,2,3").str("[true, false]");
        let (mut conn, sent) = scripted(reply);

        let view = Dispatcher::new(&mut conn).view_recording(42, 0).unwrap();
        assert_eq!(view.data, "1,2,3");
        assert_eq!(view.fragment_states, "[true, false]");
        assert_eq!(sent_strings(&sent.bytes()), ["Doctor", "VIEW_RECORDING", "42,0"]);
    }

    #[test]
    fn test_download_recording_requires_finish() {
        let reply = ReplyBuilder::default()
            .str("DOWNLOAD_RECORDING_STARTED")
            .str("0.1,0.2")
            .str("5,6")
            .str("ERROR");
        let (mut conn, _sent) = scripted(reply);
        let err = Dispatcher::new(&mut conn).download_recording(3).unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedOpcode { received, .. } if received == "ERROR"));
    }

    #[test]
    fn test_recently_finished_skips_header() {
        let reply = ReplyBuilder::default()
            .str("RECENTLY_FINISH_LIST")
            .str("MedicalRecord{id=1, date=2024-01-01T08:00}")
            .str("MedicalRecord{id=2, date=2024-03-01T08:00}")
            .str("RECENTLY_FINISHED");
        let (mut conn, _sent) = scripted(reply);

        let decoded = Dispatcher::new(&mut conn).recently_finished().unwrap();
        let ids: Vec<_> = decoded.records.iter().map(|f| f.id().unwrap()).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_complete_diagnosis_file_sends_medications() {
        let reply = ReplyBuilder::default().str("COMPLETE_DIAGNOSISFILE_SAVED");
        let (mut conn, sent) = scripted(reply);

        Dispatcher::new(&mut conn)
            .complete_diagnosis_file(9, "Arrhythmia", "")
            .unwrap();
        assert_eq!(
            sent_strings(&sent.bytes()),
            ["Doctor", "COMPLETE_DIAGNOSISFILE", "9", "Arrhythmia", ""]
        );
    }
}
