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
    collections::HashMap,
    path::PathBuf,
    sync::Arc,
};

use tracing::{info, warn};

use crate::{
    channel::ChannelBank,
    error::ControlError,
    scenes::SceneController,
    sound::SoundPlayer,
};

/// What a hotkey does when triggered. The parameter is baked in at parse
/// time.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    PlaySound(PathBuf),
    /// Raw `"name:value"` parameter; the value may be omitted, in which case
    /// the trigger velocity supplies it.
    SetChannelVolume(String),
    ToggleMute(String),
    ChangeOutputScene(String),
    /// None toggles the master preview.
    TogglePreview(Option<String>),
    TriggerEffect(String),
}

impl Action {
    /// Parses an action identifier and its parameter from configuration.
    pub fn parse(action: &str, parameter: &str) -> Result<Action, ControlError> {
        match action {
            "play_sound" => {
                if parameter.is_empty() {
                    return Err(ControlError::InvalidParameter(
                        "play_sound requires a file path".to_string(),
                    ));
                }
                Ok(Action::PlaySound(PathBuf::from(parameter)))
            }
            "set_channel_volume" => {
                if parameter.is_empty() {
                    return Err(ControlError::InvalidParameter(
                        "set_channel_volume requires a channel name".to_string(),
                    ));
                }
                Ok(Action::SetChannelVolume(parameter.to_string()))
            }
            "toggle_mute" => {
                if parameter.is_empty() {
                    return Err(ControlError::InvalidParameter(
                        "toggle_mute requires a channel name".to_string(),
                    ));
                }
                Ok(Action::ToggleMute(parameter.to_string()))
            }
            "change_output_scene" => {
                if parameter.is_empty() {
                    return Err(ControlError::InvalidParameter(
                        "change_output_scene requires a scene name".to_string(),
                    ));
                }
                Ok(Action::ChangeOutputScene(parameter.to_string()))
            }
            "toggle_preview" => {
                if parameter.is_empty() || parameter.eq_ignore_ascii_case("master") {
                    Ok(Action::TogglePreview(None))
                } else {
                    Ok(Action::TogglePreview(Some(parameter.to_string())))
                }
            }
            "trigger_effect" => {
                if parameter.is_empty() {
                    return Err(ControlError::InvalidParameter(
                        "trigger_effect requires an effect name".to_string(),
                    ));
                }
                Ok(Action::TriggerEffect(parameter.to_string()))
            }
            unknown => Err(ControlError::UnknownAction(unknown.to_string())),
        }
    }
}

/// Whether a hotkey fires once or stays active until released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Press,
    Hold,
}

/// A user-configured trigger bound to a MIDI note.
#[derive(Debug, Clone)]
pub struct Hotkey {
    pub id: u32,
    pub name: String,
    pub action: Action,
    pub mode: Mode,
    pub midi_note: Option<u8>,
}

/// What a hotkey did, so the engine can broadcast it.
#[derive(Debug, Clone, PartialEq)]
pub enum HotkeyEffect {
    VolumeSet {
        channel_id: u32,
        volume: u8,
        source: String,
    },
    MuteToggled {
        channel_id: u32,
        muted: bool,
        source: String,
    },
    PreviewToggled {
        channel_id: u32,
        previewing: bool,
    },
    MasterPreviewToggled(bool),
    SceneChanged(String),
    SoundStarted(u64),
    SoundStopped(u64),
}

/// Hold teardown state. Only sounds need stopping today.
struct ActiveHold {
    sound_token: Option<u64>,
}

/// Executes hotkey actions and tracks per-hotkey active state for hold mode.
pub struct HotkeyMachine {
    hotkeys: Vec<Hotkey>,
    active: HashMap<u32, ActiveHold>,
    sound: Arc<dyn SoundPlayer>,
    scenes: Arc<dyn SceneController>,
}

impl HotkeyMachine {
    pub fn new(
        hotkeys: Vec<Hotkey>,
        sound: Arc<dyn SoundPlayer>,
        scenes: Arc<dyn SceneController>,
    ) -> HotkeyMachine {
        HotkeyMachine {
            hotkeys,
            active: HashMap::new(),
            sound,
            scenes,
        }
    }

    pub fn hotkeys(&self) -> &[Hotkey] {
        &self.hotkeys
    }

    pub fn get(&self, id: u32) -> Option<&Hotkey> {
        self.hotkeys.iter().find(|hotkey| hotkey.id == id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Hotkey> {
        self.hotkeys.iter_mut().find(|hotkey| hotkey.id == id)
    }

    /// Handles a press. Hold-mode hotkeys go active; a second press while
    /// active is swallowed so a second loop never starts.
    pub fn press(
        &mut self,
        id: u32,
        velocity: u8,
        bank: &mut ChannelBank,
    ) -> Result<Vec<HotkeyEffect>, ControlError> {
        let hotkey = match self.get(id) {
            Some(hotkey) => hotkey.clone(),
            None => {
                warn!(hotkey = id, "Press for unknown hotkey, ignoring.");
                return Ok(Vec::new());
            }
        };

        if hotkey.mode == Mode::Hold && self.active.contains_key(&id) {
            return Ok(Vec::new());
        }

        info!(hotkey = hotkey.name, velocity, "Hotkey pressed.");
        let (effects, sound_token) = self.execute(&hotkey, velocity, bank)?;

        if hotkey.mode == Mode::Hold {
            self.active.insert(id, ActiveHold { sound_token });
        }

        Ok(effects)
    }

    /// Handles a release. Only a hold-mode hotkey in active state has a stop
    /// routine; everything else is a no-op.
    pub fn release(&mut self, id: u32) -> Vec<HotkeyEffect> {
        let hold = match self.active.remove(&id) {
            Some(hold) => hold,
            None => return Vec::new(),
        };

        let mut effects = Vec::new();
        if let Some(token) = hold.sound_token {
            self.sound.stop(token);
            effects.push(HotkeyEffect::SoundStopped(token));
        }
        effects
    }

    /// Runs the hotkey's action. Returns the effects plus the sound token
    /// when a sound was started, for hold teardown.
    fn execute(
        &self,
        hotkey: &Hotkey,
        velocity: u8,
        bank: &mut ChannelBank,
    ) -> Result<(Vec<HotkeyEffect>, Option<u64>), ControlError> {
        let mut effects = Vec::new();
        let mut sound_token = None;

        match &hotkey.action {
            Action::PlaySound(path) => {
                let volume = f32::from(velocity) / 127.0;
                let looped = hotkey.mode == Mode::Hold;
                match self.sound.play(path, volume, looped) {
                    Ok(token) => {
                        effects.push(HotkeyEffect::SoundStarted(token));
                        sound_token = Some(token);
                    }
                    Err(e) => {
                        warn!(
                            err = e.as_ref(),
                            path = format!("{}", path.display()),
                            "Unable to play sound."
                        );
                    }
                }
            }
            Action::SetChannelVolume(parameter) => {
                let (name, volume) = parse_volume_parameter(parameter, velocity);
                let channel_id = match bank.by_name(name) {
                    Some(channel) => channel.id,
                    None => return Err(ControlError::SessionNotFound(name.to_string())),
                };
                let source = bank.set_volume(channel_id, volume)?;
                effects.push(HotkeyEffect::VolumeSet {
                    channel_id,
                    volume,
                    source,
                });
            }
            Action::ToggleMute(name) => {
                let (channel_id, muted, source) = bank.toggle_mute(name)?;
                effects.push(HotkeyEffect::MuteToggled {
                    channel_id,
                    muted,
                    source,
                });
            }
            Action::ChangeOutputScene(name) => match self.scenes.set_scene(name) {
                Ok(true) => effects.push(HotkeyEffect::SceneChanged(name.clone())),
                Ok(false) => warn!(scene = name, "Scene change refused."),
                Err(e) => warn!(err = e.as_ref(), scene = name, "Unable to change scene."),
            },
            Action::TogglePreview(Some(name)) => {
                let (channel_id, previewing) = bank.toggle_preview(name)?;
                effects.push(HotkeyEffect::PreviewToggled {
                    channel_id,
                    previewing,
                });
            }
            Action::TogglePreview(None) => {
                effects.push(HotkeyEffect::MasterPreviewToggled(
                    bank.toggle_master_preview(),
                ));
            }
            Action::TriggerEffect(name) => {
                if let Err(e) = self.scenes.trigger_effect(name) {
                    warn!(err = e.as_ref(), effect = name, "Unable to trigger effect.");
                }
            }
        }

        Ok((effects, sound_token))
    }
}

/// Splits a `"name:value"` parameter. A missing or malformed value falls back
/// to the velocity scaled to a percentage.
fn parse_volume_parameter(parameter: &str, velocity: u8) -> (&str, u8) {
    let fallback = (f32::from(velocity) / 127.0 * 100.0).round() as u8;
    match parameter.split_once(':') {
        Some((name, value)) => match value.trim().parse::<u8>() {
            Ok(volume) => (name, volume.min(100)),
            Err(_) => {
                warn!(
                    parameter,
                    "Malformed volume parameter, deriving volume from velocity."
                );
                (name, fallback)
            }
        },
        None => (parameter, fallback),
    }
}

#[cfg(test)]
mod test {
    use std::{
        error::Error,
        fmt,
        path::{Path, PathBuf},
        sync::Mutex,
    };

    use crate::channel::Channel;

    use super::*;

    #[derive(Default)]
    struct RecordingPlayer {
        plays: Mutex<Vec<(PathBuf, f32, bool)>>,
        stops: Mutex<Vec<u64>>,
    }

    impl SoundPlayer for RecordingPlayer {
        fn play(&self, path: &Path, volume: f32, looped: bool) -> Result<u64, Box<dyn Error>> {
            let mut plays = self.plays.lock().expect("unable to lock plays");
            plays.push((path.to_path_buf(), volume, looped));
            Ok(plays.len() as u64)
        }

        fn stop(&self, token: u64) {
            self.stops.lock().expect("unable to lock stops").push(token);
        }
    }

    impl fmt::Display for RecordingPlayer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "recording sound player")
        }
    }

    fn machine(hotkeys: Vec<Hotkey>) -> (HotkeyMachine, Arc<RecordingPlayer>) {
        let player = Arc::new(RecordingPlayer::default());
        let machine = HotkeyMachine::new(
            hotkeys,
            player.clone(),
            Arc::new(crate::scenes::Disconnected),
        );
        (machine, player)
    }

    fn bank() -> ChannelBank {
        ChannelBank::new(vec![
            Channel::new(1, "Music", "Spotify"),
            Channel::new(2, "Chat", "Discord"),
        ])
    }

    fn hold_sound() -> Hotkey {
        Hotkey {
            id: 1,
            name: "airhorn".to_string(),
            action: Action::PlaySound(PathBuf::from("/sounds/airhorn.wav")),
            mode: Mode::Hold,
            midi_note: Some(60),
        }
    }

    #[test]
    fn test_hold_sound_lifecycle() {
        let (mut machine, player) = machine(vec![hold_sound()]);
        let mut bank = bank();

        let effects = machine.press(1, 100, &mut bank).expect("press failed");
        assert_eq!(effects, vec![HotkeyEffect::SoundStarted(1)]);
        {
            let plays = player.plays.lock().expect("lock");
            assert_eq!(plays.len(), 1);
            let (path, volume, looped) = &plays[0];
            assert_eq!(path, &PathBuf::from("/sounds/airhorn.wav"));
            assert!((volume - 100.0 / 127.0).abs() < 1e-6);
            assert!(looped);
        }

        let effects = machine.release(1);
        assert_eq!(effects, vec![HotkeyEffect::SoundStopped(1)]);
        assert_eq!(*player.stops.lock().expect("lock"), vec![1]);
    }

    #[test]
    fn test_hold_is_idempotent() {
        let (mut machine, player) = machine(vec![hold_sound()]);
        let mut bank = bank();

        machine.press(1, 100, &mut bank).expect("press failed");
        // A second press while active must not start a second loop.
        let effects = machine.press(1, 100, &mut bank).expect("press failed");
        assert!(effects.is_empty());
        assert_eq!(player.plays.lock().expect("lock").len(), 1);

        machine.release(1);
        // After a release the hotkey can fire again.
        machine.press(1, 100, &mut bank).expect("press failed");
        assert_eq!(player.plays.lock().expect("lock").len(), 2);
    }

    #[test]
    fn test_press_mode_release_is_noop() {
        let mut hotkey = hold_sound();
        hotkey.mode = Mode::Press;
        let (mut machine, player) = machine(vec![hotkey]);
        let mut bank = bank();

        machine.press(1, 64, &mut bank).expect("press failed");
        assert!(machine.release(1).is_empty());
        assert!(player.stops.lock().expect("lock").is_empty());

        // Press mode plays unlooped.
        let plays = player.plays.lock().expect("lock");
        assert!(!plays[0].2);
    }

    #[test]
    fn test_set_channel_volume() {
        let hotkey = Hotkey {
            id: 1,
            name: "duck music".to_string(),
            action: Action::SetChannelVolume("Music:25".to_string()),
            mode: Mode::Press,
            midi_note: None,
        };
        let (mut machine, _) = machine(vec![hotkey]);
        let mut bank = bank();

        let effects = machine.press(1, 127, &mut bank).expect("press failed");
        assert_eq!(
            effects,
            vec![HotkeyEffect::VolumeSet {
                channel_id: 1,
                volume: 25,
                source: "Spotify".to_string()
            }]
        );
        assert_eq!(bank.get(1).expect("channel").volume, 25);
    }

    #[test]
    fn test_volume_falls_back_to_velocity() {
        let hotkey = Hotkey {
            id: 1,
            name: "music fader".to_string(),
            action: Action::SetChannelVolume("Music".to_string()),
            mode: Mode::Press,
            midi_note: None,
        };
        let (mut machine, _) = machine(vec![hotkey]);
        let mut bank = bank();

        machine.press(1, 64, &mut bank).expect("press failed");
        assert_eq!(bank.get(1).expect("channel").volume, 50);
    }

    #[test]
    fn test_unknown_channel_is_an_error() {
        let hotkey = Hotkey {
            id: 1,
            name: "ghost".to_string(),
            action: Action::ToggleMute("Podcast".to_string()),
            mode: Mode::Press,
            midi_note: None,
        };
        let (mut machine, _) = machine(vec![hotkey]);
        let mut bank = bank();

        assert!(matches!(
            machine.press(1, 64, &mut bank),
            Err(ControlError::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_master_preview_toggle() {
        let hotkey = Hotkey {
            id: 1,
            name: "preview".to_string(),
            action: Action::TogglePreview(None),
            mode: Mode::Press,
            midi_note: None,
        };
        let (mut machine, _) = machine(vec![hotkey]);
        let mut bank = bank();

        let effects = machine.press(1, 64, &mut bank).expect("press failed");
        assert_eq!(effects, vec![HotkeyEffect::MasterPreviewToggled(true)]);
        let effects = machine.press(1, 64, &mut bank).expect("press failed");
        assert_eq!(effects, vec![HotkeyEffect::MasterPreviewToggled(false)]);
    }

    struct RecordingScenes {
        switches: Mutex<Vec<String>>,
        effects: Mutex<Vec<String>>,
    }

    impl crate::scenes::SceneController for RecordingScenes {
        fn scenes(&self) -> Vec<String> {
            vec!["Live".to_string(), "BRB".to_string()]
        }

        fn set_scene(&self, name: &str) -> Result<bool, Box<dyn Error>> {
            let known = self.scenes().iter().any(|scene| scene == name);
            if known {
                self.switches
                    .lock()
                    .expect("unable to lock switches")
                    .push(name.to_string());
            }
            Ok(known)
        }

        fn is_connected(&self) -> bool {
            true
        }

        fn trigger_effect(&self, name: &str) -> Result<(), Box<dyn Error>> {
            self.effects
                .lock()
                .expect("unable to lock effects")
                .push(name.to_string());
            Ok(())
        }
    }

    impl fmt::Display for RecordingScenes {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "recording scene controller")
        }
    }

    #[test]
    fn test_scene_change() {
        let scenes = Arc::new(RecordingScenes {
            switches: Mutex::new(Vec::new()),
            effects: Mutex::new(Vec::new()),
        });
        let mut machine = HotkeyMachine::new(
            vec![
                Hotkey {
                    id: 1,
                    name: "go live".to_string(),
                    action: Action::ChangeOutputScene("Live".to_string()),
                    mode: Mode::Press,
                    midi_note: None,
                },
                Hotkey {
                    id: 2,
                    name: "ghost scene".to_string(),
                    action: Action::ChangeOutputScene("Intermission".to_string()),
                    mode: Mode::Press,
                    midi_note: None,
                },
                Hotkey {
                    id: 3,
                    name: "confetti".to_string(),
                    action: Action::TriggerEffect("confetti".to_string()),
                    mode: Mode::Press,
                    midi_note: None,
                },
            ],
            Arc::new(crate::sound::NullPlayer::new()),
            scenes.clone(),
        );
        let mut bank = bank();

        let effects = machine.press(1, 64, &mut bank).expect("press failed");
        assert_eq!(effects, vec![HotkeyEffect::SceneChanged("Live".to_string())]);
        assert_eq!(
            *scenes.switches.lock().expect("lock"),
            vec!["Live".to_string()]
        );

        // A refused scene change produces no effect and no error.
        let effects = machine.press(2, 64, &mut bank).expect("press failed");
        assert!(effects.is_empty());

        machine.press(3, 64, &mut bank).expect("press failed");
        assert_eq!(
            *scenes.effects.lock().expect("lock"),
            vec!["confetti".to_string()]
        );
    }

    #[test]
    fn test_action_parsing() {
        assert_eq!(
            Action::parse("toggle_mute", "Music").expect("parse failed"),
            Action::ToggleMute("Music".to_string())
        );
        assert_eq!(
            Action::parse("toggle_preview", "").expect("parse failed"),
            Action::TogglePreview(None)
        );
        assert_eq!(
            Action::parse("toggle_preview", "Chat").expect("parse failed"),
            Action::TogglePreview(Some("Chat".to_string()))
        );
        assert!(matches!(
            Action::parse("explode", "now"),
            Err(ControlError::UnknownAction(_))
        ));
        assert!(matches!(
            Action::parse("play_sound", ""),
            Err(ControlError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_malformed_volume_parameter() {
        let (name, volume) = parse_volume_parameter("Music:loud", 127);
        assert_eq!(name, "Music");
        assert_eq!(volume, 100);

        let (name, volume) = parse_volume_parameter("Music:55", 0);
        assert_eq!(name, "Music");
        assert_eq!(volume, 55);
    }
}
