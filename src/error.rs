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

/// Typed errors for the control engine so callers can distinguish a missing
/// session from a misconfigured hotkey without string matching. None of these
/// are fatal to the engine loop.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// The audio backend could not be reached. The next poll tick is the retry.
    #[error("audio backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A volume/mute command targeted a session or channel that doesn't exist.
    #[error("no session or channel matching '{0}'")]
    SessionNotFound(String),

    /// Two bindings claimed the same MIDI control. Resolved last-write-wins.
    #[error("MIDI {kind} {value} is already bound")]
    BindingConflict { kind: &'static str, value: u8 },

    /// A hotkey action identifier that isn't in the dispatch table.
    #[error("unknown hotkey action '{0}'")]
    UnknownAction(String),

    /// A malformed action parameter (e.g. a bad "name:value" volume string).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A route was addressed for a (session, output) pair that doesn't exist.
    #[error("no route from '{session}' to '{output}'")]
    UnknownRoute { session: String, output: String },
}
