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
mod backend;
mod bindings;
mod channel;
mod config;
mod engine;
mod error;
mod hotkeys;
mod interpreter;
mod levels;
mod midi;
mod routing;
mod scenes;
mod session;
mod sound;
#[cfg(test)]
mod testutil;

use std::error::Error;
use std::path::PathBuf;

use clap::{crate_version, Parser, Subcommand};

use crate::session::registry::Registry;

const SYSTEMD_SERVICE: &str = r#"
[Unit]
Description=MIDI audio mixer engine

[Service]
Type=simple
Restart=on-failure
EnvironmentFile=-/etc/default/faderdeck
ExecStart=/usr/local/bin/faderdeck start "$FADERDECK_CONFIG"
ExecReload=/bin/kill -HUP $MAINPID

[Install]
WantedBy=multi-user.target
Alias=faderdeck.service
"#;

#[derive(Parser)]
#[clap(
    version = crate_version!(),
    about = "A MIDI-controller-driven per-application audio mixer engine."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available MIDI input devices.
    MidiDevices {},
    /// Polls the audio backend once and lists the sessions it reports.
    Sessions {
        /// The audio backend device name. A "mock" prefix selects the
        /// simulated backend.
        #[arg(short, long, default_value = "mock")]
        device: String,
    },
    /// Verifies a config file and reports what it would load.
    Check {
        /// The path to the config file.
        config_path: String,
    },
    /// Starts the mixer engine.
    Start {
        /// The path to the config file.
        config_path: String,
    },
    /// Prints a systemd service definition to stdout.
    Systemd {},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::MidiDevices {} => {
            let devices = midi::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Sessions { device } => {
            let backend = backend::get_backend(&device);
            let mut registry = Registry::new(backend);
            let diff = registry.poll();
            if diff.transient_error {
                return Err("backend unavailable".into());
            }

            println!("Sessions{}:", if diff.simulated { " (simulated)" } else { "" });
            for session in registry.sessions() {
                println!(
                    "- {} ({}): volume {}%{}",
                    session.display_name,
                    session.name,
                    session.volume,
                    if session.muted { ", muted" } else { "" }
                );
            }
        }
        Commands::Check { config_path } => {
            let config = config::Config::load(&PathBuf::from(&config_path))?;

            let channels = config.channels();
            println!("Channels (count: {}):", channels.len());
            for channel in channels {
                println!(
                    "- {} -> {}{}",
                    channel.name,
                    channel.source,
                    match channel.midi_cc {
                        Some(cc) => format!(" (CC {})", cc),
                        None => String::new(),
                    }
                );
            }

            let hotkeys = config.hotkeys();
            println!("Hotkeys (count: {}):", hotkeys.len());
            for hotkey in hotkeys {
                println!(
                    "- {}{}",
                    hotkey.name,
                    match hotkey.midi_note {
                        Some(note) => format!(" (note {})", note),
                        None => String::new(),
                    }
                );
            }

            println!("Outputs (count: {}):", config.outputs().len());
            for output in config.outputs() {
                println!("- {} ({})", output.name, output.id);
            }
        }
        Commands::Start { config_path } => {
            let engine = config::init_engine(&PathBuf::from(&config_path))?;
            let handle = engine.start();

            tokio::signal::ctrl_c().await?;
            handle.stop().await?;
        }
        Commands::Systemd {} => print!("{}", SYSTEMD_SERVICE),
    }

    Ok(())
}
