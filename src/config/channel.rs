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

/// The persisted shape of a mixer channel.
#[derive(Deserialize, Serialize, Clone)]
pub struct Channel {
    /// The display name of the channel.
    name: String,
    /// The session name query the channel controls.
    source: String,
    /// The saved fader position.
    volume: Option<u8>,
    /// Whether the channel starts muted.
    #[serde(default)]
    muted: bool,
    /// The bound MIDI control change number, if any.
    midi_cc: Option<u8>,
}

impl Channel {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Converts into the runtime channel, assigning the given id.
    pub fn to_channel(&self, id: u32) -> crate::channel::Channel {
        let mut channel = crate::channel::Channel::new(id, &self.name, &self.source);
        if let Some(volume) = self.volume {
            channel.set_volume(volume);
        }
        channel.muted = self.muted;
        channel.midi_cc = self.midi_cc;
        channel
    }

    /// Captures runtime state back into the persisted shape.
    pub fn update_from(&mut self, channel: &crate::channel::Channel) {
        self.volume = Some(channel.volume);
        self.muted = channel.muted;
        self.midi_cc = channel.midi_cc;
    }
}

#[cfg(test)]
impl Channel {
    pub fn test(name: &str, source: &str, midi_cc: Option<u8>) -> Channel {
        Channel {
            name: name.to_string(),
            source: source.to_string(),
            volume: None,
            muted: false,
            midi_cc,
        }
    }
}
