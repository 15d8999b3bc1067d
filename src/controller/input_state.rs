//! Last known value of every input the gamepad has reported
//!
//! Written only by the dispatcher, read by the mouse tick loop. Entries are
//! independent scalars in a sharded map, so a tick reading `ABS_X` never waits
//! behind a write to an unrelated button, and a reader sees the latest write
//! by the next tick at the latest.

use crate::device::ChannelKind;
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct InputState {
    values: DashMap<(ChannelKind, u16), i32>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the value for a code; entries are never removed
    pub fn record(&self, kind: ChannelKind, code: u16, value: i32) {
        self.values.insert((kind, code), value);
    }

    /// Last seen value, 0 for codes that never reported
    pub fn value(&self, kind: ChannelKind, code: u16) -> i32 {
        self.values
            .get(&(kind, code))
            .map(|entry| *entry.value())
            .unwrap_or(0)
    }

    pub fn axis(&self, code: u16) -> i32 {
        self.value(ChannelKind::Absolute, code)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::codes::{ABS_X, BTN_SOUTH};
    use std::sync::Arc;

    #[test]
    fn test_unseen_codes_read_zero() {
        let state = InputState::new();
        assert_eq!(state.axis(ABS_X), 0);
        assert_eq!(state.value(ChannelKind::Key, BTN_SOUTH), 0);
        assert!(state.is_empty());
    }

    #[test]
    fn test_latest_write_wins_per_kind() {
        let state = InputState::new();
        state.record(ChannelKind::Absolute, ABS_X, 1200);
        state.record(ChannelKind::Absolute, ABS_X, -300);
        // same numeric code on another channel is a separate entry
        state.record(ChannelKind::Key, ABS_X, 1);

        assert_eq!(state.axis(ABS_X), -300);
        assert_eq!(state.value(ChannelKind::Key, ABS_X), 1);
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_zero_values_are_kept() {
        let state = InputState::new();
        state.record(ChannelKind::Key, BTN_SOUTH, 1);
        state.record(ChannelKind::Key, BTN_SOUTH, 0);
        assert_eq!(state.value(ChannelKind::Key, BTN_SOUTH), 0);
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_concurrent_reader_sees_writes() {
        let state = Arc::new(InputState::new());
        let writer = {
            let state = state.clone();
            std::thread::spawn(move || {
                for value in 0..1000 {
                    state.record(ChannelKind::Absolute, ABS_X, value);
                }
            })
        };

        let mut last = 0;
        while last < 999 {
            let value = state.axis(ABS_X);
            assert!(value >= last, "values only grow in this test");
            last = value;
            if writer.is_finished() {
                last = state.axis(ABS_X);
            }
        }
        writer.join().unwrap();
        assert_eq!(state.axis(ABS_X), 999);
    }
}
