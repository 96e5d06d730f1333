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
use std::{collections::HashMap, sync::Arc, time::Duration};

use tracing::warn;

use crate::{
    backend::AudioBackend,
    error::ControlError,
    levels::LevelSynthesizer,
    session::{ActivityCategory, Session, SessionDiff, SessionId, LEVEL_EPSILON},
};

/// Poll cadence with a backend that measures real levels.
pub const NATIVE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Poll cadence when levels are synthesized. Fast updates buy little for
/// synthetic data.
pub const SIMULATED_POLL_INTERVAL: Duration = Duration::from_millis(125);

/// Owns the canonical set of audio sessions. Queries the backend on every
/// poll, merges the always-present system and microphone endpoints, and
/// diffs against the previous snapshot. All mutation happens on the engine
/// loop; consumers see state through snapshots and diffs.
pub struct Registry {
    backend: Arc<dyn AudioBackend>,
    synth: LevelSynthesizer,
    /// Snapshot in poll order: system, microphone, then applications as the
    /// backend reported them. Keys are composite (lowercased name plus an
    /// ordinal) because process identifiers may be reused.
    sessions: Vec<(String, Session)>,
    /// Microphone state is registry-owned; the backend contract has no
    /// microphone command surface.
    microphone_volume: u8,
    microphone_muted: bool,
    system_muted: bool,
}

impl Registry {
    pub fn new(backend: Arc<dyn AudioBackend>) -> Registry {
        Registry::with_synthesizer(backend, LevelSynthesizer::new())
    }

    pub fn with_synthesizer(backend: Arc<dyn AudioBackend>, synth: LevelSynthesizer) -> Registry {
        Registry {
            backend,
            synth,
            sessions: Vec::new(),
            microphone_volume: 60,
            microphone_muted: false,
            system_muted: false,
        }
    }

    /// Returns true when levels are synthesized rather than measured.
    pub fn simulated(&self) -> bool {
        !self.backend.supplies_levels()
    }

    /// The poll cadence appropriate for this registry's backend.
    pub fn poll_interval(&self) -> Duration {
        if self.simulated() {
            SIMULATED_POLL_INTERVAL
        } else {
            NATIVE_POLL_INTERVAL
        }
    }

    /// Polls the backend and reconciles the session set. Unchanged sessions
    /// never produce spurious change reports. On backend failure the previous
    /// snapshot is kept and the diff carries a transient-error flag; the next
    /// scheduled poll is the retry.
    pub fn poll(&mut self) -> SessionDiff {
        let simulated = self.simulated();

        let apps = match self.backend.get_sessions() {
            Ok(apps) => apps,
            Err(e) => {
                warn!(err = e.as_ref(), "Backend session query failed, keeping previous snapshot.");
                return SessionDiff {
                    simulated,
                    transient_error: true,
                    ..SessionDiff::default()
                };
            }
        };
        let system_volume = match self.backend.get_system_volume() {
            Ok(volume) => volume.min(100),
            Err(e) => {
                warn!(err = e.as_ref(), "Backend system volume query failed, keeping previous snapshot.");
                return SessionDiff {
                    simulated,
                    transient_error: true,
                    ..SessionDiff::default()
                };
            }
        };

        let mut next = Vec::with_capacity(apps.len() + 2);

        let mut system = Session::new(
            SessionId::System,
            "System Audio",
            "Desktop Audio",
            ActivityCategory::System,
        );
        system.set_volume(system_volume);
        system.muted = self.system_muted;
        next.push(("system".to_string(), system));

        let mut microphone = Session::new(
            SessionId::Microphone,
            "Microphone",
            "Default Microphone",
            ActivityCategory::Voice,
        );
        microphone.set_volume(self.microphone_volume);
        microphone.muted = self.microphone_muted;
        next.push(("microphone".to_string(), microphone));

        let mut ordinals: HashMap<String, u32> = HashMap::new();
        for mut session in apps {
            session.volume = session.volume.min(100);
            let name = session.name.to_lowercase();
            let ordinal = ordinals.entry(name.clone()).or_insert(0);
            next.push((format!("{}#{}", name, ordinal), session));
            *ordinal += 1;
        }

        if simulated {
            for (key, session) in next.iter_mut() {
                let prev_peak = self
                    .sessions
                    .iter()
                    .find(|(k, _)| k == key)
                    .map(|(_, s)| s.peak_level)
                    .unwrap_or(0.0);
                let (level, peak) = self.synth.tick(
                    key,
                    session.category,
                    session.volume,
                    session.muted,
                    prev_peak,
                );
                session.level = level;
                session.peak_level = peak;
            }
        }

        let mut diff = SessionDiff {
            simulated,
            ..SessionDiff::default()
        };
        for (key, session) in next.iter() {
            match self.sessions.iter().find(|(k, _)| k == key) {
                None => diff.added.push(session.clone()),
                Some((_, prev)) => {
                    if prev.volume != session.volume
                        || prev.muted != session.muted
                        || (prev.level - session.level).abs() > LEVEL_EPSILON
                    {
                        diff.changed.push(session.clone());
                    }
                }
            }
        }
        for (key, session) in self.sessions.iter() {
            if !next.iter().any(|(k, _)| k == key) {
                diff.removed.push(session.clone());
            }
        }

        let keys: Vec<String> = next.iter().map(|(k, _)| k.clone()).collect();
        self.synth.retain(&keys);
        self.sessions = next;

        diff
    }

    /// Finds the first session whose name or display name contains the query,
    /// case-insensitively, in registry iteration order.
    pub fn get_by_name(&self, query: &str) -> Option<&Session> {
        self.sessions
            .iter()
            .map(|(_, session)| session)
            .find(|session| session.matches(query))
    }

    /// All sessions in poll order.
    pub fn sessions(&self) -> Vec<&Session> {
        self.sessions.iter().map(|(_, session)| session).collect()
    }

    /// The composite keys of the current snapshot, in poll order.
    pub fn keys(&self) -> Vec<String> {
        self.sessions.iter().map(|(key, _)| key.clone()).collect()
    }

    /// Sets the volume of the first session matching the query. On failure
    /// no state is mutated.
    pub fn set_volume(&mut self, query: &str, volume: u8) -> Result<(), ControlError> {
        let volume = volume.min(100);
        let (id, name) = match self.get_by_name(query) {
            Some(session) => (session.id, session.name.clone()),
            None => return Err(ControlError::SessionNotFound(query.to_string())),
        };

        match id {
            SessionId::System => {
                self.backend
                    .set_system_volume(volume)
                    .map_err(|e| ControlError::BackendUnavailable(e.to_string()))?;
            }
            SessionId::Microphone => {
                self.microphone_volume = volume;
            }
            SessionId::App(_) => {
                let matched = self
                    .backend
                    .set_application_volume(&name, volume)
                    .map_err(|e| ControlError::BackendUnavailable(e.to_string()))?;
                if !matched {
                    return Err(ControlError::SessionNotFound(query.to_string()));
                }
            }
        }

        if let Some((_, session)) = self.sessions.iter_mut().find(|(_, s)| s.id == id) {
            session.set_volume(volume);
        }
        Ok(())
    }

    /// Toggles the mute state of the first session matching the query and
    /// returns the new state. On failure no state is mutated.
    pub fn toggle_mute(&mut self, query: &str) -> Result<bool, ControlError> {
        let (id, name, muted) = match self.get_by_name(query) {
            Some(session) => (session.id, session.name.clone(), session.muted),
            None => return Err(ControlError::SessionNotFound(query.to_string())),
        };
        let mute = !muted;

        match id {
            SessionId::System => self.system_muted = mute,
            SessionId::Microphone => self.microphone_muted = mute,
            SessionId::App(_) => {
                let matched = self
                    .backend
                    .mute_application(&name, mute)
                    .map_err(|e| ControlError::BackendUnavailable(e.to_string()))?;
                if !matched {
                    return Err(ControlError::SessionNotFound(query.to_string()));
                }
            }
        }

        if let Some((_, session)) = self.sessions.iter_mut().find(|(_, s)| s.id == id) {
            session.muted = mute;
            if mute {
                session.level = 0.0;
            }
        }
        Ok(mute)
    }
}

#[cfg(test)]
mod test {
    use std::{
        error::Error,
        fmt,
        sync::{Arc, Mutex},
    };

    use super::*;

    /// A scripted backend that reports exactly the sessions it's told to and
    /// measures its own levels, so registry diffs are deterministic.
    struct ScriptedBackend {
        sessions: Mutex<Vec<Session>>,
        fail: Mutex<bool>,
    }

    impl ScriptedBackend {
        fn new(sessions: Vec<Session>) -> ScriptedBackend {
            ScriptedBackend {
                sessions: Mutex::new(sessions),
                fail: Mutex::new(false),
            }
        }

        fn script(&self, sessions: Vec<Session>) {
            *self.sessions.lock().expect("lock") = sessions;
        }

        fn set_failing(&self, fail: bool) {
            *self.fail.lock().expect("lock") = fail;
        }
    }

    impl AudioBackend for ScriptedBackend {
        fn name(&self) -> String {
            "scripted".to_string()
        }

        fn supplies_levels(&self) -> bool {
            true
        }

        fn get_sessions(&self) -> Result<Vec<Session>, Box<dyn Error>> {
            if *self.fail.lock().expect("lock") {
                return Err("backend offline".into());
            }
            Ok(self.sessions.lock().expect("lock").clone())
        }

        fn set_application_volume(&self, name: &str, volume: u8) -> Result<bool, Box<dyn Error>> {
            let mut sessions = self.sessions.lock().expect("lock");
            let mut matched = false;
            for session in sessions.iter_mut() {
                if session.matches(name) {
                    session.set_volume(volume);
                    matched = true;
                }
            }
            Ok(matched)
        }

        fn mute_application(&self, name: &str, mute: bool) -> Result<bool, Box<dyn Error>> {
            let mut sessions = self.sessions.lock().expect("lock");
            let mut matched = false;
            for session in sessions.iter_mut() {
                if session.matches(name) {
                    session.muted = mute;
                    matched = true;
                }
            }
            Ok(matched)
        }

        fn get_system_volume(&self) -> Result<u8, Box<dyn Error>> {
            if *self.fail.lock().expect("lock") {
                return Err("backend offline".into());
            }
            Ok(75)
        }

        fn set_system_volume(&self, _: u8) -> Result<bool, Box<dyn Error>> {
            Ok(true)
        }
    }

    impl fmt::Display for ScriptedBackend {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "scripted (Test)")
        }
    }

    fn app(id: u32, name: &str, volume: u8) -> Session {
        let mut session = Session::new(
            SessionId::App(id),
            name,
            name.trim_end_matches(".exe"),
            ActivityCategory::Music,
        );
        session.set_volume(volume);
        session
    }

    #[test]
    fn test_poll_diff() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            app(1, "s1.exe", 50),
            app(2, "s2.exe", 60),
        ]));
        let mut registry = Registry::new(backend.clone());

        let diff = registry.poll();
        // system + microphone + two applications.
        assert_eq!(diff.added.len(), 4);
        assert!(diff.removed.is_empty());
        assert!(diff.changed.is_empty());
        assert!(!diff.simulated);

        // Idempotent: an unchanged backend produces an empty diff.
        let diff = registry.poll();
        assert!(diff.is_empty());

        // s1 goes away, s3 appears, s2's volume moves.
        let mut s2 = app(2, "s2.exe", 65);
        s2.set_volume(65);
        backend.script(vec![s2, app(3, "s3.exe", 70)]);

        let diff = registry.poll();
        assert_eq!(diff.added.len(), 1);
        assert_eq!(diff.added[0].name, "s3.exe");
        assert_eq!(diff.removed.len(), 1);
        assert_eq!(diff.removed[0].name, "s1.exe");
        assert_eq!(diff.changed.len(), 1);
        assert_eq!(diff.changed[0].name, "s2.exe");
        assert_eq!(diff.changed[0].volume, 65);
    }

    #[test]
    fn test_poll_survives_backend_failure() {
        let backend = Arc::new(ScriptedBackend::new(vec![app(1, "s1.exe", 50)]));
        let mut registry = Registry::new(backend.clone());
        registry.poll();
        assert_eq!(registry.sessions().len(), 3);

        backend.set_failing(true);
        let diff = registry.poll();
        assert!(diff.transient_error);
        assert!(diff.is_empty());
        // Previous snapshot is untouched.
        assert_eq!(registry.sessions().len(), 3);

        backend.set_failing(false);
        let diff = registry.poll();
        assert!(!diff.transient_error);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_duplicate_names_get_distinct_keys() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            app(1, "chrome.exe", 50),
            app(2, "chrome.exe", 60),
        ]));
        let mut registry = Registry::new(backend);
        registry.poll();

        let keys = registry.keys();
        assert!(keys.contains(&"chrome.exe#0".to_string()));
        assert!(keys.contains(&"chrome.exe#1".to_string()));
    }

    #[test]
    fn test_get_by_name() {
        let backend = Arc::new(ScriptedBackend::new(vec![app(1, "Spotify.exe", 50)]));
        let mut registry = Registry::new(backend);
        registry.poll();

        assert!(registry.get_by_name("SPOT").is_some());
        assert!(registry.get_by_name("desktop audio").is_some());
        assert!(registry.get_by_name("nope").is_none());
    }

    #[test]
    fn test_set_volume_unknown_session() {
        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let mut registry = Registry::new(backend);
        registry.poll();

        let err = registry.set_volume("ghost", 50).unwrap_err();
        assert!(matches!(err, ControlError::SessionNotFound(_)));
    }

    #[test]
    fn test_set_volume_clamps_and_applies() {
        let backend = Arc::new(ScriptedBackend::new(vec![app(1, "vlc.exe", 50)]));
        let mut registry = Registry::new(backend);
        registry.poll();

        registry.set_volume("vlc", 200).expect("set volume failed");
        assert_eq!(registry.get_by_name("vlc").expect("session").volume, 100);
    }

    #[test]
    fn test_toggle_mute_roundtrip() {
        let backend = Arc::new(ScriptedBackend::new(vec![app(1, "vlc.exe", 50)]));
        let mut registry = Registry::new(backend);
        registry.poll();

        assert!(registry.toggle_mute("vlc").expect("mute failed"));
        assert!(registry.get_by_name("vlc").expect("session").muted);
        assert!(!registry.toggle_mute("vlc").expect("mute failed"));
        assert!(!registry.get_by_name("vlc").expect("session").muted);
    }

    #[test]
    fn test_simulated_registry_synthesizes_levels() {
        let backend = Arc::new(crate::backend::mock::Backend::with_seed("mock", 9));
        let mut registry =
            Registry::with_synthesizer(backend, LevelSynthesizer::with_seed(9));
        assert!(registry.simulated());
        assert_eq!(registry.poll_interval(), SIMULATED_POLL_INTERVAL);

        registry.poll();
        for session in registry.sessions() {
            assert!((0.0..=1.0).contains(&session.level));
            assert!((0.0..=1.0).contains(&session.peak_level));
            assert!(session.peak_level >= session.level - f32::EPSILON);
        }
    }
}
