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
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod registry;

/// Level changes below this threshold do not count as a session change.
pub const LEVEL_EPSILON: f32 = 0.01;

/// Identifies one controllable audio endpoint. The system output and the
/// microphone are always present; application sessions come and go with the
/// processes that own them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionId {
    System,
    Microphone,
    App(u32),
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionId::System => write!(f, "system"),
            SessionId::Microphone => write!(f, "microphone"),
            SessionId::App(id) => write!(f, "app_{}", id),
        }
    }
}

/// The kind of audio a session tends to produce. Selects the waveform
/// generator when levels are synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityCategory {
    Music,
    Voice,
    Web,
    Video,
    Gaming,
    Streaming,
    System,
}

/// One controllable audio endpoint as last observed by the registry.
#[derive(Debug, Clone)]
pub struct Session {
    /// The stable endpoint identifier.
    pub id: SessionId,
    /// The raw process or endpoint name, e.g. "Spotify.exe".
    pub name: String,
    /// The human-readable label.
    pub display_name: String,
    /// Volume percentage, always within 0..=100.
    pub volume: u8,
    pub muted: bool,
    /// Instantaneous output level in [0, 1].
    pub level: f32,
    /// Peak-hold level in [0, 1]; rises instantly, decays slowly.
    pub peak_level: f32,
    pub category: ActivityCategory,
}

impl Session {
    pub fn new(id: SessionId, name: &str, display_name: &str, category: ActivityCategory) -> Session {
        Session {
            id,
            name: name.to_string(),
            display_name: display_name.to_string(),
            volume: 0,
            muted: false,
            level: 0.0,
            peak_level: 0.0,
            category,
        }
    }

    /// Sets the volume, clamping to 0..=100.
    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
    }

    /// Returns true if the query matches the name or display name
    /// case-insensitively as a substring.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.name.to_lowercase().contains(&query)
            || self.display_name.to_lowercase().contains(&query)
    }
}

/// The result of one registry poll: which sessions appeared, vanished, or
/// changed since the previous snapshot.
#[derive(Debug, Clone, Default)]
pub struct SessionDiff {
    pub added: Vec<Session>,
    pub removed: Vec<Session>,
    pub changed: Vec<Session>,
    /// True when levels are synthesized rather than measured.
    pub simulated: bool,
    /// True when the backend query failed and the previous snapshot was kept.
    pub transient_error: bool,
}

impl SessionDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Clamps a level to the [0, 1] meter range.
pub fn clamp01(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}
