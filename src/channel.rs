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
use crate::error::ControlError;

/// A user-configured mixer strip. Carries its own volume and mute state
/// independent of the underlying session; `source` is the session name query
/// that volume moves are forwarded to.
#[derive(Debug, Clone)]
pub struct Channel {
    pub id: u32,
    pub name: String,
    pub source: String,
    pub volume: u8,
    pub muted: bool,
    pub previewing: bool,
    pub midi_cc: Option<u8>,
}

impl Channel {
    pub fn new(id: u32, name: &str, source: &str) -> Channel {
        Channel {
            id,
            name: name.to_string(),
            source: source.to_string(),
            volume: 70,
            muted: false,
            previewing: false,
            midi_cc: None,
        }
    }

    /// Sets the volume, clamping to 0..=100.
    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
    }
}

/// All configured channels plus the master preview state.
#[derive(Debug, Default)]
pub struct ChannelBank {
    channels: Vec<Channel>,
    master_previewing: bool,
    master_volume: u8,
}

impl ChannelBank {
    pub fn new(channels: Vec<Channel>) -> ChannelBank {
        ChannelBank {
            channels,
            master_previewing: false,
            master_volume: 100,
        }
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn get(&self, id: u32) -> Option<&Channel> {
        self.channels.iter().find(|channel| channel.id == id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Channel> {
        self.channels.iter_mut().find(|channel| channel.id == id)
    }

    /// Finds a channel by its configured name, case-insensitively.
    pub fn by_name(&self, name: &str) -> Option<&Channel> {
        self.channels
            .iter()
            .find(|channel| channel.name.eq_ignore_ascii_case(name))
    }

    pub fn by_name_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.channels
            .iter_mut()
            .find(|channel| channel.name.eq_ignore_ascii_case(name))
    }

    /// Sets a channel's volume. Returns the channel's source query so the
    /// caller can forward the move to the backend.
    pub fn set_volume(&mut self, id: u32, volume: u8) -> Result<String, ControlError> {
        match self.get_mut(id) {
            Some(channel) => {
                channel.set_volume(volume);
                Ok(channel.source.clone())
            }
            None => Err(ControlError::SessionNotFound(format!("channel {}", id))),
        }
    }

    /// Toggles a channel's mute and returns (id, new state, source query).
    pub fn toggle_mute(&mut self, name: &str) -> Result<(u32, bool, String), ControlError> {
        match self.by_name_mut(name) {
            Some(channel) => {
                channel.muted = !channel.muted;
                Ok((channel.id, channel.muted, channel.source.clone()))
            }
            None => Err(ControlError::SessionNotFound(name.to_string())),
        }
    }

    /// Toggles a channel preview and returns (id, new state).
    pub fn toggle_preview(&mut self, name: &str) -> Result<(u32, bool), ControlError> {
        match self.by_name_mut(name) {
            Some(channel) => {
                channel.previewing = !channel.previewing;
                Ok((channel.id, channel.previewing))
            }
            None => Err(ControlError::SessionNotFound(name.to_string())),
        }
    }

    /// Toggles the master preview and returns the new state.
    pub fn toggle_master_preview(&mut self) -> bool {
        self.master_previewing = !self.master_previewing;
        self.master_previewing
    }

    pub fn master_previewing(&self) -> bool {
        self.master_previewing
    }

    pub fn master_volume(&self) -> u8 {
        self.master_volume
    }

    pub fn set_master_volume(&mut self, volume: u8) {
        self.master_volume = volume.min(100);
    }
}
