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
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ControlError;

/// One session-to-output assignment.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Route {
    pub volume: u8,
    pub enabled: bool,
}

/// A mix destination sessions can be routed to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Output {
    pub id: String,
    pub name: String,
}

/// The full cross product of session keys and outputs. Every pair has exactly
/// one route.
#[derive(Debug, Default)]
pub struct RoutingMatrix {
    routes: HashMap<(String, String), Route>,
    outputs: Vec<Output>,
}

impl RoutingMatrix {
    /// Builds the matrix for the given session keys, carrying forward routes
    /// for pairs that survive. New pairs default to disabled at volume zero.
    pub fn build(&mut self, session_keys: &[String], outputs: Vec<Output>) {
        let mut routes = HashMap::with_capacity(session_keys.len() * outputs.len());
        for key in session_keys {
            for output in &outputs {
                let pair = (key.clone(), output.id.clone());
                let route = self.routes.get(&pair).copied().unwrap_or_default();
                routes.insert(pair, route);
            }
        }
        self.routes = routes;
        self.outputs = outputs;
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn get(&self, session_key: &str, output_id: &str) -> Option<Route> {
        self.routes
            .get(&(session_key.to_string(), output_id.to_string()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Updates a route. The pair must already exist in the matrix.
    pub fn set_route(
        &mut self,
        session_key: &str,
        output_id: &str,
        volume: u8,
        enabled: bool,
    ) -> Result<(), ControlError> {
        if volume > 100 {
            return Err(ControlError::InvalidParameter(format!(
                "route volume {} out of range",
                volume
            )));
        }
        match self
            .routes
            .get_mut(&(session_key.to_string(), output_id.to_string()))
        {
            Some(route) => {
                route.volume = volume;
                route.enabled = enabled;
                Ok(())
            }
            None => Err(ControlError::UnknownRoute {
                session: session_key.to_string(),
                output: output_id.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn outputs() -> Vec<Output> {
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

    #[test]
    fn test_full_cross_product() {
        let mut matrix = RoutingMatrix::default();
        let keys = vec!["system".to_string(), "spotify.exe#0".to_string()];
        matrix.build(&keys, outputs());

        assert_eq!(matrix.len(), 6);
        for key in &keys {
            for output in matrix.outputs().to_vec() {
                let route = matrix.get(key, &output.id).expect("missing route");
                assert_eq!(route, Route::default());
            }
        }
    }

    #[test]
    fn test_carry_forward() {
        let mut matrix = RoutingMatrix::default();
        matrix.build(&["system".to_string(), "spotify.exe#0".to_string()], outputs());
        matrix
            .set_route("spotify.exe#0", "obs_mix", 80, true)
            .expect("set route failed");

        // The spotify route survives a rebuild; the departed session's routes
        // are dropped and the new session gets defaults.
        matrix.build(
            &["system".to_string(), "spotify.exe#0".to_string(), "discord.exe#0".to_string()],
            outputs(),
        );
        assert_eq!(matrix.len(), 9);
        assert_eq!(
            matrix.get("spotify.exe#0", "obs_mix").expect("route"),
            Route {
                volume: 80,
                enabled: true
            }
        );
        assert_eq!(
            matrix.get("discord.exe#0", "obs_mix").expect("route"),
            Route::default()
        );

        matrix.build(&["system".to_string()], outputs());
        assert_eq!(matrix.len(), 3);
        assert!(matrix.get("spotify.exe#0", "obs_mix").is_none());
    }

    #[test]
    fn test_set_route_validation() {
        let mut matrix = RoutingMatrix::default();
        matrix.build(&["system".to_string()], outputs());

        assert!(matches!(
            matrix.set_route("system", "obs_mix", 101, true),
            Err(ControlError::InvalidParameter(_))
        ));
        assert!(matches!(
            matrix.set_route("system", "nonexistent", 50, true),
            Err(ControlError::UnknownRoute { .. })
        ));
        assert!(matrix.set_route("system", "obs_mix", 100, true).is_ok());
    }
}
