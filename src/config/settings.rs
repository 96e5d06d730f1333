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
use std::{error::Error, time::Duration};

use duration_string::DurationString;
use serde::{Deserialize, Serialize};

/// Engine-wide settings.
#[derive(Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    /// The MIDI input device name. Substring matched; a "mock" prefix selects
    /// the mock device.
    midi_device: Option<String>,
    /// The audio backend device name. A "mock" prefix selects the simulated
    /// backend.
    audio_device: Option<String>,
    /// Overrides the poll cadence, e.g. "100ms".
    poll_interval: Option<String>,
    /// The saved master volume.
    master_volume: Option<u8>,
}

impl Settings {
    pub fn midi_device(&self) -> Option<&str> {
        self.midi_device.as_deref()
    }

    pub fn audio_device(&self) -> &str {
        self.audio_device.as_deref().unwrap_or("mock")
    }

    /// Gets the configured poll interval override, if any.
    pub fn poll_interval(&self) -> Result<Option<Duration>, Box<dyn Error>> {
        match &self.poll_interval {
            Some(interval) => Ok(Some(DurationString::from_string(interval.clone())?.into())),
            None => Ok(None),
        }
    }

    pub fn master_volume(&self) -> u8 {
        self.master_volume.unwrap_or(100).min(100)
    }

    pub fn set_master_volume(&mut self, volume: u8) {
        self.master_volume = Some(volume.min(100));
    }
}

#[cfg(test)]
impl Settings {
    pub fn test(midi_device: Option<&str>, audio_device: Option<&str>) -> Settings {
        Settings {
            midi_device: midi_device.map(str::to_string),
            audio_device: audio_device.map(str::to_string),
            poll_interval: None,
            master_volume: None,
        }
    }
}
