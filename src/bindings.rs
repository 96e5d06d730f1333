// Copyright (C) 2026 The faderdeck authors
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::collections::HashMap;

use tracing::warn;

use crate::{channel::Channel, error::ControlError, hotkeys::Hotkey};

/// Maps MIDI controls to channels and notes to hotkeys. Duplicate bindings
/// resolve last-write-wins with a warning.
#[derive(Debug, Default)]
pub struct BindingTable {
    controls: HashMap<u8, u32>,
    notes: HashMap<u8, u32>,
}

impl BindingTable {
    /// Builds the table from the configured channels and hotkeys.
    pub fn build(channels: &[Channel], hotkeys: &[Hotkey]) -> BindingTable {
        let mut table = BindingTable::default();
        for channel in channels {
            if let Some(control) = channel.midi_cc {
                table.bind_control(control, channel.id);
            }
        }
        for hotkey in hotkeys {
            if let Some(note) = hotkey.midi_note {
                table.bind_note(note, hotkey.id);
            }
        }
        table
    }

    /// Binds a control change number to a channel.
    pub fn bind_control(&mut self, control: u8, channel_id: u32) {
        if let Some(previous) = self.controls.insert(control, channel_id) {
            if previous != channel_id {
                let conflict = ControlError::BindingConflict {
                    kind: "control",
                    value: control,
                };
                warn!(
                    err = conflict.to_string(),
                    previous,
                    channel = channel_id,
                    "Replacing channel binding."
                );
            }
        }
    }

    /// Binds a note number to a hotkey.
    pub fn bind_note(&mut self, note: u8, hotkey_id: u32) {
        if let Some(previous) = self.notes.insert(note, hotkey_id) {
            if previous != hotkey_id {
                let conflict = ControlError::BindingConflict {
                    kind: "note",
                    value: note,
                };
                warn!(
                    err = conflict.to_string(),
                    previous,
                    hotkey = hotkey_id,
                    "Replacing hotkey binding."
                );
            }
        }
    }

    pub fn channel_for(&self, control: u8) -> Option<u32> {
        self.controls.get(&control).copied()
    }

    pub fn hotkey_for(&self, note: u8) -> Option<u32> {
        self.notes.get(&note).copied()
    }

    /// Removes any binding that points at the given channel before rebinding.
    pub fn unbind_channel(&mut self, channel_id: u32) {
        self.controls.retain(|_, id| *id != channel_id);
    }

    pub fn unbind_hotkey(&mut self, hotkey_id: u32) {
        self.notes.retain(|_, id| *id != hotkey_id);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lookup() {
        let mut table = BindingTable::default();
        table.bind_control(7, 1);
        table.bind_note(60, 3);

        assert_eq!(table.channel_for(7), Some(1));
        assert_eq!(table.channel_for(8), None);
        assert_eq!(table.hotkey_for(60), Some(3));
        assert_eq!(table.hotkey_for(61), None);
    }

    #[test]
    fn test_last_write_wins() {
        let mut table = BindingTable::default();
        table.bind_control(7, 1);
        table.bind_control(7, 2);
        assert_eq!(table.channel_for(7), Some(2));

        table.bind_note(60, 1);
        table.bind_note(60, 4);
        assert_eq!(table.hotkey_for(60), Some(4));
    }

    #[test]
    fn test_unbind() {
        let mut table = BindingTable::default();
        table.bind_control(7, 1);
        table.bind_control(8, 1);
        table.bind_control(9, 2);
        table.unbind_channel(1);

        assert_eq!(table.channel_for(7), None);
        assert_eq!(table.channel_for(8), None);
        assert_eq!(table.channel_for(9), Some(2));
    }

    #[test]
    fn test_build_from_config() {
        let mut channel = Channel::new(1, "Music", "Spotify");
        channel.midi_cc = Some(14);
        let hotkey = Hotkey {
            id: 9,
            name: "mute".to_string(),
            action: crate::hotkeys::Action::ToggleMute("Music".to_string()),
            mode: crate::hotkeys::Mode::Press,
            midi_note: Some(36),
        };

        let table = BindingTable::build(&[channel], &[hotkey]);
        assert_eq!(table.channel_for(14), Some(1));
        assert_eq!(table.hotkey_for(36), Some(9));
    }
}
