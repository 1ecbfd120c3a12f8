//! Command dispatcher: one opcode catalog, one round trip per call.

mod command;
mod dispatcher;
mod opcode;

pub use command::{Arg, Command};
pub use dispatcher::Dispatcher;
pub use opcode::{reply, Opcode};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transport::ConnectionError;

/// Protocol errors.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("{command}: expected {expected}, received {received:?}")]
    UnexpectedOpcode {
        command: Opcode,
        expected: String,
        received: String,
    },

    #[error("{command}: invalid reply: {reason}")]
    InvalidReply { command: Opcode, reason: String },
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Reply to `LOGIN`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginOutcome {
    pub ok: bool,
    pub message: String,
}

/// Reply to `SIGNUP`. Both variants are completed exchanges.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "result", content = "message", rename_all = "snake_case")]
pub enum SignUpOutcome {
    Accepted(String),
    Rejected(String),
}

impl SignUpOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SignUpOutcome::Accepted(_))
    }

    pub fn message(&self) -> &str {
        match self {
            SignUpOutcome::Accepted(m) | SignUpOutcome::Rejected(m) => m,
        }
    }
}

/// One entry of the `SEARCH_PATIENT` listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientEntry {
    /// The entry as the server wrote it
    pub label: String,
    /// First run of digits in the label
    pub hin: Option<i32>,
}

impl PatientEntry {
    pub fn parse(label: &str) -> Self {
        Self {
            label: label.to_string(),
            hin: extract_hin(label),
        }
    }
}

/// First run of ASCII digits in `text`, as an integer.
pub fn extract_hin(text: &str) -> Option<i32> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Reply to `VIEW_RECORDING`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordingView {
    pub data: String,
    pub fragment_states: String,
}

/// Reply to `DOWNLOAD_RECORDING`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordingDownload {
    pub ecg: String,
    pub eda: String,
}
