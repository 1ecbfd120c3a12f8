//! Property tests for recording pagination.

use clinic_telemetry_core::fragment::{FragmentPage, FragmentSource};
use clinic_telemetry_core::protocol::{ProtocolError, ProtocolResult};
use clinic_telemetry_core::{ConnectionError, Direction, FragmentSession};
use proptest::prelude::*;

/// Serves `f<index>` for every index; fails the next fetch when `fail_next`.
#[derive(Default)]
struct ScriptedSource {
    fail_next: bool,
}

impl FragmentSource for ScriptedSource {
    fn open_recording(&mut self, _diagnosis_file_id: i32) -> ProtocolResult<FragmentPage> {
        Ok(FragmentPage {
            data: "f0".to_string(),
            states: Some("[true, true]".to_string()),
        })
    }

    fn fetch_fragment(&mut self, _diagnosis_file_id: i32, index: u32) -> ProtocolResult<FragmentPage> {
        if std::mem::take(&mut self.fail_next) {
            return Err(ProtocolError::from(ConnectionError::PeerClosed));
        }
        Ok(FragmentPage {
            data: format!("f{}", index),
            states: None,
        })
    }
}

fn arb_step() -> impl Strategy<Value = (Direction, bool)> {
    (
        prop_oneof![Just(Direction::Previous), Just(Direction::Next)],
        any::<bool>(),
    )
}

proptest! {
    #[test]
    fn prop_index_tracks_delivered_fragments(steps in prop::collection::vec(arb_step(), 0..40)) {
        let mut source = ScriptedSource::default();
        let mut fragments = FragmentSession::new();
        fragments.load(&mut source, 4).unwrap();

        let mut expected_index = 0u32;
        for (direction, fail) in steps {
            source.fail_next = fail;
            let tentative = match direction {
                Direction::Next => expected_index + 1,
                Direction::Previous => expected_index.saturating_sub(1),
            };

            let failed = fragments.advance(&mut source, direction).is_err();
            prop_assert_eq!(failed, fail);
            if !fail {
                expected_index = tentative;
            }

            let current = fragments.current().unwrap();
            prop_assert_eq!(current.cursor().index, expected_index);
            prop_assert_eq!(current.data(), format!("f{}", expected_index));
            prop_assert_eq!(current.cursor().diagnosis_file_id, 4);
        }
    }
}

#[test]
fn test_previous_at_start_refetches_first_fragment() {
    let mut source = ScriptedSource::default();
    let mut fragments = FragmentSession::new();
    fragments.load(&mut source, 1).unwrap();

    let recording = fragments.advance(&mut source, Direction::Previous).unwrap();
    assert_eq!(recording.cursor().index, 0);
    assert_eq!(recording.data(), "f0");
}

#[test]
fn test_advance_without_recording() {
    let mut source = ScriptedSource::default();
    let mut fragments = FragmentSession::new();
    assert!(fragments.advance(&mut source, Direction::Next).is_err());
    assert!(!fragments.is_loaded());
}
