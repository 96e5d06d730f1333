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
use std::{
    error::Error,
    fmt,
    path::Path,
    sync::atomic::{AtomicU64, Ordering},
};

use tracing::info;

/// Plays sound files triggered by hotkeys. Playback is fire-and-forget; the
/// returned token is only needed to stop a looped sound.
pub trait SoundPlayer: fmt::Display + Send + Sync {
    /// Starts playing the file at the given volume (0.0 to 1.0). Returns a
    /// token for stopping looped playback.
    fn play(&self, path: &Path, volume: f32, looped: bool) -> Result<u64, Box<dyn Error>>;

    /// Stops the playback identified by the token. Stopping a finished or
    /// unknown token is a no-op.
    fn stop(&self, token: u64);
}

/// A sound player that logs instead of playing. Used when no audio output is
/// wired up and in tests.
#[derive(Default)]
pub struct NullPlayer {
    next_token: AtomicU64,
}

impl NullPlayer {
    pub fn new() -> NullPlayer {
        NullPlayer::default()
    }
}

impl SoundPlayer for NullPlayer {
    fn play(&self, path: &Path, volume: f32, looped: bool) -> Result<u64, Box<dyn Error>> {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        info!(
            path = format!("{}", path.display()),
            volume, looped, token, "Playing sound."
        );
        Ok(token)
    }

    fn stop(&self, token: u64) {
        info!(token, "Stopping sound.");
    }
}

impl fmt::Display for NullPlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "null sound player")
    }
}
