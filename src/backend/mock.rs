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
use std::{error::Error, fmt, sync::Mutex};

use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::debug;

use crate::session::{ActivityCategory, Session, SessionId};

/// A simulated backend. Populates a plausible set of desktop applications
/// and accepts volume/mute commands against them. Doesn't measure levels;
/// the registry synthesizes those.
pub struct Backend {
    name: String,
    sessions: Mutex<Vec<Session>>,
    system_volume: Mutex<u8>,
}

/// The applications the simulated backend can pretend to run.
const APP_PROFILES: &[(&str, &str, u8, ActivityCategory)] = &[
    ("Spotify.exe", "Spotify", 75, ActivityCategory::Music),
    ("Discord.exe", "Discord", 60, ActivityCategory::Voice),
    ("chrome.exe", "Google Chrome", 80, ActivityCategory::Web),
    ("firefox.exe", "Firefox", 70, ActivityCategory::Web),
    ("vlc.exe", "VLC Media Player", 85, ActivityCategory::Video),
    ("obs64.exe", "OBS Studio", 50, ActivityCategory::Streaming),
    ("steam.exe", "Steam", 40, ActivityCategory::Gaming),
    ("Teams.exe", "Microsoft Teams", 65, ActivityCategory::Voice),
    ("Zoom.exe", "Zoom", 70, ActivityCategory::Voice),
    ("notepad.exe", "Windows Sounds", 30, ActivityCategory::System),
];

impl Backend {
    /// Gets the given simulated backend with a random selection of
    /// applications.
    pub fn get(name: &str) -> Backend {
        Backend::with_seed(name, rand::thread_rng().gen())
    }

    /// Gets a simulated backend with a fixed seed for deterministic tests.
    pub fn with_seed(name: &str, seed: u64) -> Backend {
        let mut rng = StdRng::seed_from_u64(seed);

        // Run 4-7 of the known applications, with some volume scatter and an
        // occasional pre-muted one, the way a real desktop looks.
        let count = rng.gen_range(4..=7);
        let mut indices: Vec<usize> = (0..APP_PROFILES.len()).collect();
        for i in (1..indices.len()).rev() {
            indices.swap(i, rng.gen_range(0..=i));
        }

        let sessions = indices
            .into_iter()
            .take(count)
            .enumerate()
            .map(|(ordinal, profile_index)| {
                let (name, display_name, base_volume, category) = APP_PROFILES[profile_index];
                let mut session = Session::new(
                    SessionId::App(ordinal as u32 + 1),
                    name,
                    display_name,
                    category,
                );
                let scatter = rng.gen_range(-10i16..=10i16);
                session.set_volume((base_volume as i16 + scatter).clamp(0, 100) as u8);
                session.muted = rng.gen::<f32>() > 0.85;
                session
            })
            .collect();

        Backend {
            name: name.to_string(),
            sessions: Mutex::new(sessions),
            system_volume: Mutex::new(75),
        }
    }

    /// Replaces the simulated session set. Lets tests exercise session
    /// arrival and departure through the registry.
    #[cfg(test)]
    pub fn set_sessions(&self, sessions: Vec<Session>) {
        *self.sessions.lock().expect("unable to get session lock") = sessions;
    }
}

impl super::AudioBackend for Backend {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn supplies_levels(&self) -> bool {
        false
    }

    fn get_sessions(&self) -> Result<Vec<Session>, Box<dyn Error>> {
        Ok(self
            .sessions
            .lock()
            .expect("unable to get session lock")
            .clone())
    }

    fn set_application_volume(&self, name: &str, volume: u8) -> Result<bool, Box<dyn Error>> {
        let mut sessions = self.sessions.lock().expect("unable to get session lock");
        let mut matched = false;
        for session in sessions.iter_mut() {
            if session.matches(name) {
                session.set_volume(volume);
                matched = true;
            }
        }

        debug!(name = name, volume = volume, matched = matched, "Set application volume.");
        Ok(matched)
    }

    fn mute_application(&self, name: &str, mute: bool) -> Result<bool, Box<dyn Error>> {
        let mut sessions = self.sessions.lock().expect("unable to get session lock");
        let mut matched = false;
        for session in sessions.iter_mut() {
            if session.matches(name) {
                session.muted = mute;
                if mute {
                    session.level = 0.0;
                    session.peak_level = 0.0;
                }
                matched = true;
            }
        }

        debug!(name = name, mute = mute, matched = matched, "Set application mute.");
        Ok(matched)
    }

    fn get_system_volume(&self) -> Result<u8, Box<dyn Error>> {
        Ok(*self
            .system_volume
            .lock()
            .expect("unable to get system volume lock"))
    }

    fn set_system_volume(&self, volume: u8) -> Result<bool, Box<dyn Error>> {
        *self
            .system_volume
            .lock()
            .expect("unable to get system volume lock") = volume.min(100);
        Ok(true)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Simulated)", self.name)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::backend::AudioBackend;

    #[test]
    fn test_session_population() {
        let backend = Backend::with_seed("mock-backend", 42);
        let sessions = backend.get_sessions().expect("failed to get sessions");
        assert!((4..=7).contains(&sessions.len()));
        for session in &sessions {
            assert!(session.volume <= 100);
        }
    }

    #[test]
    fn test_volume_command_matches_substring() {
        let backend = Backend::with_seed("mock-backend", 1);
        backend.set_sessions(vec![Session::new(
            SessionId::App(1),
            "Spotify.exe",
            "Spotify",
            ActivityCategory::Music,
        )]);

        assert!(backend
            .set_application_volume("spotify", 33)
            .expect("volume command failed"));
        let sessions = backend.get_sessions().expect("failed to get sessions");
        assert_eq!(sessions[0].volume, 33);

        assert!(!backend
            .set_application_volume("discord", 10)
            .expect("volume command failed"));
    }

    #[test]
    fn test_mute_resets_levels() {
        let backend = Backend::with_seed("mock-backend", 1);
        let mut session = Session::new(
            SessionId::App(1),
            "vlc.exe",
            "VLC Media Player",
            ActivityCategory::Video,
        );
        session.level = 0.5;
        session.peak_level = 0.8;
        backend.set_sessions(vec![session]);

        assert!(backend.mute_application("vlc", true).expect("mute failed"));
        let sessions = backend.get_sessions().expect("failed to get sessions");
        assert!(sessions[0].muted);
        assert_eq!(sessions[0].level, 0.0);
        assert_eq!(sessions[0].peak_level, 0.0);
    }
}
