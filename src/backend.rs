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
use std::{error::Error, fmt, sync::Arc};

use tracing::warn;

use crate::session::Session;

pub mod mock;

/// The operating-system audio provider. Native and simulated backends sit
/// behind this one contract; callers are backend-agnostic.
pub trait AudioBackend: fmt::Display + Send + Sync {
    /// Returns the name of the backend.
    fn name(&self) -> String;

    /// Returns true if the backend measures real output levels. When false,
    /// the registry synthesizes levels instead.
    fn supplies_levels(&self) -> bool;

    /// Returns a snapshot of the current application audio sessions. This is
    /// non-blocking; the registry calls it once per poll tick.
    fn get_sessions(&self) -> Result<Vec<Session>, Box<dyn Error>>;

    /// Sets the volume of every application matching the name. Returns true
    /// if at least one application matched.
    fn set_application_volume(&self, name: &str, volume: u8) -> Result<bool, Box<dyn Error>>;

    /// Mutes or unmutes every application matching the name. Returns true if
    /// at least one application matched.
    fn mute_application(&self, name: &str, mute: bool) -> Result<bool, Box<dyn Error>>;

    /// Gets the system output volume.
    fn get_system_volume(&self) -> Result<u8, Box<dyn Error>>;

    /// Sets the system output volume.
    fn set_system_volume(&self, volume: u8) -> Result<bool, Box<dyn Error>>;
}

/// Gets a backend with the given device name. Names starting with "mock"
/// select the simulated backend directly; anything else falls back to the
/// simulated backend too, since no native provider is linked into this
/// build. A missing backend is never fatal.
pub fn get_backend(device: &str) -> Arc<dyn AudioBackend> {
    if device.starts_with("mock") {
        return Arc::new(mock::Backend::get(device));
    }

    warn!(
        device = device,
        "No native audio backend available, using simulated sessions."
    );
    Arc::new(mock::Backend::get(device))
}
