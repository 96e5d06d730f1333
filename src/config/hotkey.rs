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
use serde::{Deserialize, Serialize};

use crate::{error::ControlError, hotkeys};

/// The persisted shape of a hotkey. The action stays a string until runtime
/// so unknown actions survive a load/save round trip.
#[derive(Deserialize, Serialize, Clone)]
pub struct Hotkey {
    /// The display name of the hotkey.
    name: String,
    /// The action identifier, e.g. "play_sound".
    action: String,
    /// The action parameter, e.g. a file path or "channel:volume".
    #[serde(default)]
    parameter: String,
    /// Whether the hotkey fires once or holds until release.
    #[serde(default)]
    mode: Mode,
    /// The bound MIDI note number, if any.
    midi_note: Option<u8>,
}

#[derive(Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Press,
    Hold,
}

impl Hotkey {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Converts into the runtime hotkey, assigning the given id. Fails on
    /// unknown actions or bad parameters.
    pub fn to_hotkey(&self, id: u32) -> Result<hotkeys::Hotkey, ControlError> {
        Ok(hotkeys::Hotkey {
            id,
            name: self.name.clone(),
            action: hotkeys::Action::parse(&self.action, &self.parameter)?,
            mode: match self.mode {
                Mode::Press => hotkeys::Mode::Press,
                Mode::Hold => hotkeys::Mode::Hold,
            },
            midi_note: self.midi_note,
        })
    }

    /// Captures runtime state back into the persisted shape.
    pub fn update_from(&mut self, hotkey: &hotkeys::Hotkey) {
        self.midi_note = hotkey.midi_note;
    }
}

#[cfg(test)]
impl Hotkey {
    pub fn test(name: &str, action: &str, parameter: &str, midi_note: Option<u8>) -> Hotkey {
        Hotkey {
            name: name.to_string(),
            action: action.to_string(),
            parameter: parameter.to_string(),
            mode: Mode::Press,
            midi_note,
        }
    }
}
