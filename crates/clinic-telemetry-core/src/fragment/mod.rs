//! Recording pagination.
//!
//! A recording is fetched one fragment at a time. [`FragmentSession`] tracks
//! which fragment is on screen and rolls the cursor back when a fetch fails,
//! so the index only ever names a fragment the server actually delivered.

mod states;

pub use states::parse_fragment_states;

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::protocol::{Dispatcher, ProtocolError, ProtocolResult};

/// Fragment navigation errors.
#[derive(Error, Debug)]
pub enum FragmentNavigationError {
    #[error("No recording is loaded")]
    NoRecording,

    #[error("Could not open recording {diagnosis_file_id}: {source}")]
    Open {
        diagnosis_file_id: i32,
        #[source]
        source: ProtocolError,
    },

    #[error("Could not load fragment {index}: {source}")]
    Failed {
        index: u32,
        #[source]
        source: ProtocolError,
    },
}

pub type FragmentResult<T> = Result<T, FragmentNavigationError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Previous,
    Next,
}

/// Position within one recording.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentCursor {
    pub diagnosis_file_id: i32,
    pub index: u32,
    /// Which fragments the server reports as materialized
    pub states: Vec<bool>,
}

/// One fetched page of samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentPage {
    pub data: String,
    /// Present when the reply carried a fresh fragment-states string
    pub states: Option<String>,
}

/// Something that can fetch recording fragments.
pub trait FragmentSource {
    /// Open a recording at fragment 0.
    fn open_recording(&mut self, diagnosis_file_id: i32) -> ProtocolResult<FragmentPage>;

    fn fetch_fragment(&mut self, diagnosis_file_id: i32, index: u32) -> ProtocolResult<FragmentPage>;
}

impl<R: Read, W: Write> FragmentSource for Dispatcher<'_, R, W> {
    fn open_recording(&mut self, diagnosis_file_id: i32) -> ProtocolResult<FragmentPage> {
        let view = self.view_recording(diagnosis_file_id, 0)?;
        Ok(FragmentPage {
            data: view.data,
            states: Some(view.fragment_states),
        })
    }

    fn fetch_fragment(&mut self, diagnosis_file_id: i32, index: u32) -> ProtocolResult<FragmentPage> {
        Ok(FragmentPage {
            data: self.change_fragment(diagnosis_file_id, index)?,
            states: None,
        })
    }
}

/// A recording with a fragment on screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedRecording {
    cursor: FragmentCursor,
    data: String,
    states_text: String,
}

impl LoadedRecording {
    pub fn cursor(&self) -> &FragmentCursor {
        &self.cursor
    }

    /// Samples of the current fragment, as sent by the server.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Last fragment-states string the server sent.
    pub fn states_text(&self) -> &str {
        &self.states_text
    }
}

/// Pagination state for at most one recording.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FragmentSession {
    #[default]
    Idle,
    Loaded(LoadedRecording),
}

impl FragmentSession {
    pub fn new() -> Self {
        Self::Idle
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, FragmentSession::Loaded(_))
    }

    pub fn current(&self) -> Option<&LoadedRecording> {
        match self {
            FragmentSession::Idle => None,
            FragmentSession::Loaded(recording) => Some(recording),
        }
    }

    pub fn cursor(&self) -> Option<&FragmentCursor> {
        self.current().map(LoadedRecording::cursor)
    }

    /// Load a recording at fragment 0, replacing whatever was loaded.
    pub fn load<S: FragmentSource>(
        &mut self,
        source: &mut S,
        diagnosis_file_id: i32,
    ) -> FragmentResult<&LoadedRecording> {
        self.discard();

        let page = source
            .open_recording(diagnosis_file_id)
            .map_err(|source| FragmentNavigationError::Open {
                diagnosis_file_id,
                source,
            })?;

        let states_text = page.states.unwrap_or_default();
        debug!(diagnosis_file_id, "recording loaded");
        *self = FragmentSession::Loaded(LoadedRecording {
            cursor: FragmentCursor {
                diagnosis_file_id,
                index: 0,
                states: parse_fragment_states(&states_text),
            },
            data: page.data,
            states_text,
        });
        self.current().ok_or(FragmentNavigationError::NoRecording)
    }

    /// Move one fragment in `direction`.
    ///
    /// The index is updated before the request (never below zero) and
    /// restored if the request fails; the displayed data is then unchanged.
    pub fn advance<S: FragmentSource>(
        &mut self,
        source: &mut S,
        direction: Direction,
    ) -> FragmentResult<&LoadedRecording> {
        let FragmentSession::Loaded(recording) = self else {
            return Err(FragmentNavigationError::NoRecording);
        };

        let previous = recording.cursor.index;
        let tentative = match direction {
            Direction::Next => previous.saturating_add(1),
            Direction::Previous => previous.saturating_sub(1),
        };
        recording.cursor.index = tentative;

        match source.fetch_fragment(recording.cursor.diagnosis_file_id, tentative) {
            Ok(page) => {
                recording.data = page.data;
                if let Some(states) = page.states {
                    recording.cursor.states = parse_fragment_states(&states);
                    recording.states_text = states;
                }
                debug!(index = tentative, "fragment loaded");
                Ok(recording)
            }
            Err(source) => {
                recording.cursor.index = previous;
                warn!(index = tentative, restored = previous, error = %source, "fragment change failed");
                Err(FragmentNavigationError::Failed {
                    index: tentative,
                    source,
                })
            }
        }
    }

    /// Forget the loaded recording.
    pub fn discard(&mut self) {
        *self = FragmentSession::Idle;
    }
}
