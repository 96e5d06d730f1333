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
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    backend, engine,
    routing::Output,
    scenes::Disconnected,
    sound::NullPlayer,
};

pub mod error;

mod channel;
mod hotkey;
mod settings;

pub use error::ConfigError;
pub use settings::Settings;

/// The persisted configuration. Runtime ids are positional; the file itself
/// only carries names.
#[derive(Deserialize, Serialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    channels: Vec<channel::Channel>,
    #[serde(default)]
    hotkeys: Vec<hotkey::Hotkey>,
    #[serde(default)]
    outputs: Vec<Output>,
    #[serde(default)]
    settings: Settings,
}

impl Config {
    /// Parses the configuration from the given file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        Ok(serde_yml::from_str(&fs::read_to_string(path)?)?)
    }

    /// Parses the configuration, falling back to defaults when the file
    /// doesn't exist yet.
    pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
        match fs::read_to_string(path) {
            Ok(contents) => Ok(serde_yml::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    path = format!("{}", path.display()),
                    "No config file found, starting with defaults."
                );
                Ok(Config::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Writes the configuration to the given file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        fs::write(path, serde_yml::to_string(self)?)?;
        Ok(())
    }

    /// The runtime channels, with ids assigned positionally starting at 1.
    pub fn channels(&self) -> Vec<crate::channel::Channel> {
        self.channels
            .iter()
            .enumerate()
            .map(|(index, channel)| channel.to_channel(index as u32 + 1))
            .collect()
    }

    /// The runtime hotkeys, with ids assigned positionally starting at 1.
    /// Hotkeys with unknown actions or bad parameters are skipped with a
    /// warning; one bad entry must not take the rest down.
    pub fn hotkeys(&self) -> Vec<crate::hotkeys::Hotkey> {
        self.hotkeys
            .iter()
            .enumerate()
            .filter_map(|(index, hotkey)| {
                match hotkey.to_hotkey(index as u32 + 1) {
                    Ok(hotkey) => Some(hotkey),
                    Err(e) => {
                        warn!(
                            hotkey = hotkey.name(),
                            err = e.to_string(),
                            "Skipping misconfigured hotkey."
                        );
                        None
                    }
                }
            })
            .collect()
    }

    /// The configured mix outputs, or the standard three when none are
    /// configured.
    pub fn outputs(&self) -> Vec<Output> {
        if !self.outputs.is_empty() {
            return self.outputs.clone();
        }
        vec![
            Output {
                id: "obs_mix".to_string(),
                name: "OBS Mix".to_string(),
            },
            Output {
                id: "stream_mix".to_string(),
                name: "Stream Mix".to_string(),
            },
            Output {
                id: "recording_mix".to_string(),
                name: "Recording Mix".to_string(),
            },
        ]
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Records runtime channel state back into the persisted shape. The id
    /// is the positional id handed out by channels().
    pub fn update_channel(&mut self, channel: &crate::channel::Channel) {
        if let Some(config) = self.channels.get_mut(channel.id as usize - 1) {
            config.update_from(channel);
        }
    }

    /// Records runtime hotkey state back into the persisted shape.
    pub fn update_hotkey(&mut self, hotkey: &crate::hotkeys::Hotkey) {
        if let Some(config) = self.hotkeys.get_mut(hotkey.id as usize - 1) {
            config.update_from(hotkey);
        }
    }

    pub fn set_master_volume(&mut self, volume: u8) {
        self.settings.set_master_volume(volume);
    }
}

/// Persists config mutations as they happen. Saving is best effort; a failed
/// write warns and the engine carries on.
pub struct ConfigSink {
    path: PathBuf,
    config: Config,
}

impl ConfigSink {
    pub fn new(path: PathBuf, config: Config) -> ConfigSink {
        ConfigSink { path, config }
    }

    pub fn record_channel(&mut self, channel: &crate::channel::Channel) {
        self.config.update_channel(channel);
        self.save();
    }

    pub fn record_hotkey(&mut self, hotkey: &crate::hotkeys::Hotkey) {
        self.config.update_hotkey(hotkey);
        self.save();
    }

    pub fn record_master_volume(&mut self, volume: u8) {
        self.config.set_master_volume(volume);
        self.save();
    }

    fn save(&self) {
        if let Err(e) = self.config.save(&self.path) {
            warn!(
                err = e.to_string(),
                path = format!("{}", self.path.display()),
                "Unable to save config."
            );
        }
    }
}

/// Initializes the engine from the given config file. The midi device and
/// audio backend in the settings pick the hardware; a "mock" prefix on either
/// selects the simulated implementation.
pub fn init_engine(config_path: &Path) -> Result<engine::Engine, Box<dyn Error>> {
    let config = Config::load_or_default(config_path)?;

    let audio_backend = backend::get_backend(config.settings().audio_device());
    let midi_device = match config.settings().midi_device() {
        Some(name) => Some(crate::midi::get_device(name)?),
        None => None,
    };

    engine::Engine::new(
        config,
        Some(config_path.to_path_buf()),
        audio_backend,
        midi_device,
        Arc::new(NullPlayer::new()),
        Arc::new(Disconnected),
    )
}
