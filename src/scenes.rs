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
use std::{error::Error, fmt};

use tracing::warn;

/// An external presentation controller that owns output scenes and effects.
/// Scene names and effect identifiers are opaque to the engine.
pub trait SceneController: fmt::Display + Send + Sync {
    /// Returns the scene names the controller knows about.
    fn scenes(&self) -> Vec<String>;

    /// Switches to the named scene. Returns false if the scene doesn't exist.
    fn set_scene(&self, name: &str) -> Result<bool, Box<dyn Error>>;

    fn is_connected(&self) -> bool;

    /// Fires an opaque effect. Unknown effects are the controller's problem.
    fn trigger_effect(&self, name: &str) -> Result<(), Box<dyn Error>>;
}

/// The controller used when nothing is connected. Scene switches warn and
/// report failure rather than erroring so hotkeys stay harmless.
#[derive(Default)]
pub struct Disconnected;

impl SceneController for Disconnected {
    fn scenes(&self) -> Vec<String> {
        Vec::new()
    }

    fn set_scene(&self, name: &str) -> Result<bool, Box<dyn Error>> {
        warn!(scene = name, "No scene controller connected.");
        Ok(false)
    }

    fn is_connected(&self) -> bool {
        false
    }

    fn trigger_effect(&self, name: &str) -> Result<(), Box<dyn Error>> {
        warn!(effect = name, "No scene controller connected.");
        Ok(())
    }
}

impl fmt::Display for Disconnected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "disconnected scene controller")
    }
}
