//! Opcode catalog.

use std::fmt;

/// Every command the client can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Login,
    SignUp,
    SearchPatient,
    SearchPatients,
    ViewPatient,
    ViewRecording,
    ChangeFragment,
    DownloadDiagnosisFile,
    DownloadRecording,
    RecentlyFinish,
    CompleteDiagnosisFile,
    LogOut,
    BackToMenu,
    BackToSearchPatient,
}

impl Opcode {
    pub const ALL: [Opcode; 14] = [
        Opcode::Login,
        Opcode::SignUp,
        Opcode::SearchPatient,
        Opcode::SearchPatients,
        Opcode::ViewPatient,
        Opcode::ViewRecording,
        Opcode::ChangeFragment,
        Opcode::DownloadDiagnosisFile,
        Opcode::DownloadRecording,
        Opcode::RecentlyFinish,
        Opcode::CompleteDiagnosisFile,
        Opcode::LogOut,
        Opcode::BackToMenu,
        Opcode::BackToSearchPatient,
    ];

    /// Token written on the wire.
    pub fn token(&self) -> &'static str {
        match self {
            Opcode::Login => "LOGIN",
            Opcode::SignUp => "SIGNUP",
            Opcode::SearchPatient => "SEARCH_PATIENT",
            Opcode::SearchPatients => "SEARCH_PATIENTS",
            Opcode::ViewPatient => "VIEW_PATIENT",
            Opcode::ViewRecording => "VIEW_RECORDING",
            Opcode::ChangeFragment => "CHANGE_FRAGMENT",
            Opcode::DownloadDiagnosisFile => "DOWNLOAD_DIAGNOSISFILE",
            Opcode::DownloadRecording => "DOWNLOAD_RECORDING",
            Opcode::RecentlyFinish => "RECENTLY_FINISH",
            Opcode::CompleteDiagnosisFile => "COMPLETE_DIAGNOSISFILE",
            Opcode::LogOut => "LOG_OUT",
            Opcode::BackToMenu => "BACK_TO_MENU",
            Opcode::BackToSearchPatient => "BACK_TO_SEARCH_PATIENT",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.token() == token)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Reply tokens read back from the server.
pub mod reply {
    pub const LOGIN_RESULT: &str = "LOGIN_RESULT";
    pub const ACK: &str = "ACK";
    pub const ERROR: &str = "ERROR";
    pub const PATIENT_OVERVIEW_SENT: &str = "PATIENT_OVERVIEW_SENT";
    pub const PATIENT_LIST: &str = "PATIENT_LIST";
    pub const DOWNLOAD_DIAGNOSISFILE_STARTED: &str = "DOWNLOAD_DIAGNOSISFILE_STARTED";
    pub const DOWNLOAD_RECORDING_STARTED: &str = "DOWNLOAD_RECORDING_STARTED";
    pub const DOWNLOAD_FINISHED: &str = "DOWNLOAD_FINISHED";
    /// Terminates the recently-finished stream.
    pub const RECENTLY_FINISHED: &str = "RECENTLY_FINISHED";
    /// Optional header some servers send before the recently-finished stream.
    pub const RECENTLY_FINISH_LIST: &str = "RECENTLY_FINISH_LIST";
    pub const COMPLETE_DIAGNOSISFILE_SAVED: &str = "COMPLETE_DIAGNOSISFILE_SAVED";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_roundtrip() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_token(op.token()), Some(op));
        }
        assert_eq!(Opcode::from_token("login"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Opcode::DownloadDiagnosisFile.to_string(), "DOWNLOAD_DIAGNOSISFILE");
    }
}
