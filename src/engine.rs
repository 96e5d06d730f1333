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
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};
use tracing::{error, info, warn};

use crate::{
    backend::AudioBackend,
    bindings::BindingTable,
    channel::ChannelBank,
    config::{Config, ConfigSink},
    error::ControlError,
    hotkeys::{HotkeyEffect, HotkeyMachine},
    interpreter::{InputEvent, Interpreter, LearnTarget},
    midi,
    routing::{Output, Route, RoutingMatrix},
    scenes::SceneController,
    session::{registry::Registry, SessionDiff},
    sound::SoundPlayer,
};

/// The mutable state consumers may inspect. All mutation happens inside the
/// engine loop; the mutex is coarse and contention is low.
pub struct EngineState {
    pub registry: Registry,
    pub bank: ChannelBank,
    pub routing: RoutingMatrix,
}

/// A request for the engine loop.
#[derive(Debug)]
pub enum Command {
    SetChannelVolume { id: u32, volume: u8 },
    ToggleChannelMute { name: String },
    ToggleChannelPreview { name: String },
    ToggleMasterPreview,
    SetMasterVolume(u8),
    SetSessionVolume { query: String, volume: u8 },
    ToggleSessionMute { query: String },
    SetRoute {
        session: String,
        output: String,
        volume: u8,
        enabled: bool,
    },
    RebuildRouting,
    StartLearn { target: LearnTarget, id: u32 },
    CancelLearn,
    Stop,
}

/// Something the engine did, broadcast to all subscribers.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Sessions(SessionDiff),
    ChannelVolume { channel_id: u32, volume: u8 },
    ChannelMute { channel_id: u32, muted: bool },
    ChannelPreview { channel_id: u32, previewing: bool },
    MasterPreview(bool),
    MasterVolume(u8),
    SceneChanged(String),
    SoundStarted(u64),
    SoundStopped(u64),
    BindingLearned {
        target: LearnTarget,
        id: u32,
        value: u8,
    },
    RouteChanged {
        session: String,
        output: String,
        route: Route,
    },
    Error(String),
}

/// The control engine. One cooperative loop owns all registry, channel, and
/// hotkey state; timers, MIDI callbacks, and commands are serialized through
/// it so a volume command never interleaves with a poll tick.
pub struct Engine {
    state: Arc<Mutex<EngineState>>,
    interpreter: Interpreter,
    bindings: BindingTable,
    machine: HotkeyMachine,
    pending_learn: Option<(LearnTarget, u32)>,
    events: broadcast::Sender<EngineEvent>,
    midi_device: Option<Arc<dyn midi::Device>>,
    poll_interval: Duration,
    outputs: Vec<Output>,
    sink: Option<ConfigSink>,
}

/// Talks to a running engine.
pub struct Handle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<EngineEvent>,
    state: Arc<Mutex<EngineState>>,
    join: JoinHandle<()>,
}

impl Handle {
    /// Subscribes to engine events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Sends a command to the engine loop.
    pub async fn command(&self, command: Command) -> Result<(), Box<dyn Error>> {
        self.commands
            .send(command)
            .await
            .map_err(|e| -> Box<dyn Error> { e.to_string().into() })
    }

    pub fn state(&self) -> Arc<Mutex<EngineState>> {
        self.state.clone()
    }

    /// Stops the engine and waits for the loop to drain.
    pub async fn stop(self) -> Result<(), Box<dyn Error>> {
        // The loop also stops when the command channel closes, so a send
        // failure just means it's already gone.
        let _ = self.commands.send(Command::Stop).await;
        self.join.await?;
        Ok(())
    }
}

impl Engine {
    /// Builds the engine from configuration and its collaborators.
    pub fn new(
        config: Config,
        config_path: Option<PathBuf>,
        backend: Arc<dyn AudioBackend>,
        midi_device: Option<Arc<dyn midi::Device>>,
        sound: Arc<dyn SoundPlayer>,
        scenes: Arc<dyn SceneController>,
    ) -> Result<Engine, Box<dyn Error>> {
        let channels = config.channels();
        let hotkeys = config.hotkeys();
        let bindings = BindingTable::build(&channels, &hotkeys);

        let mut bank = ChannelBank::new(channels);
        bank.set_master_volume(config.settings().master_volume());

        let registry = Registry::new(backend);
        let poll_interval = config
            .settings()
            .poll_interval()?
            .unwrap_or_else(|| registry.poll_interval());

        let outputs = config.outputs();
        let machine = HotkeyMachine::new(hotkeys, sound, scenes);
        let sink = config_path.map(|path| ConfigSink::new(path, config));

        let (events, _) = broadcast::channel(64);
        Ok(Engine {
            state: Arc::new(Mutex::new(EngineState {
                registry,
                bank,
                routing: RoutingMatrix::default(),
            })),
            interpreter: Interpreter::new(),
            bindings,
            machine,
            pending_learn: None,
            events,
            midi_device,
            poll_interval,
            outputs,
            sink,
        })
    }

    pub fn state(&self) -> Arc<Mutex<EngineState>> {
        self.state.clone()
    }

    /// Starts the engine loop and returns a handle to it.
    pub fn start(self) -> Handle {
        let (commands_tx, commands_rx) = mpsc::channel(16);
        let events = self.events.clone();
        let state = self.state.clone();
        let join = tokio::spawn(self.run(commands_rx));
        Handle {
            commands: commands_tx,
            events,
            state,
            join,
        }
    }

    /// The engine loop. Runs until a Stop command arrives or the command
    /// channel closes.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let (midi_tx, mut midi_rx) = mpsc::channel::<Vec<u8>>(64);
        if let Some(device) = &self.midi_device {
            info!(device = device.name(), "Watching MIDI device.");
            if let Err(e) = device.watch_events(midi_tx.clone()) {
                error!(err = e.as_ref(), "Unable to watch MIDI device.");
            }
        }
        // Keep the sender side open even with no device so the receive arm
        // stays pending instead of resolving to None in a tight loop.
        let _midi_keepalive = midi_tx;

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(
            poll_interval = format!("{:?}", self.poll_interval),
            "Engine started."
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick(),
                Some(raw_event) = midi_rx.recv() => self.handle_midi(&raw_event),
                command = commands.recv() => match command {
                    Some(Command::Stop) | None => break,
                    Some(command) => self.handle_command(command),
                },
            }
        }

        if let Some(device) = &self.midi_device {
            device.stop_watch_events();
        }
        info!("Engine stopped.");
    }

    /// One poll tick: reconcile sessions and rebuild routing when the
    /// session set changed shape.
    fn tick(&mut self) {
        let mut state = self.state.lock().expect("unable to get state lock");
        let diff = state.registry.poll();
        if !diff.added.is_empty() || !diff.removed.is_empty() {
            let keys = state.registry.keys();
            state.routing.build(&keys, self.outputs.clone());
        }
        if !diff.is_empty() {
            self.broadcast(EngineEvent::Sessions(diff));
        }
    }

    fn handle_midi(&mut self, raw_event: &[u8]) {
        let event = match self.interpreter.handle(raw_event) {
            Some(event) => event,
            None => return,
        };

        match event {
            InputEvent::ControlChange { control, percent } => {
                let Some(channel_id) = self.bindings.channel_for(control) else {
                    return;
                };
                if let Err(e) = self.set_channel_volume(channel_id, percent) {
                    warn!(err = e.to_string(), control, "Unable to apply fader move.");
                    self.broadcast(EngineEvent::Error(e.to_string()));
                }
            }
            InputEvent::HotkeyPress { note, velocity } => {
                let Some(hotkey_id) = self.bindings.hotkey_for(note) else {
                    return;
                };
                let result = {
                    let mut state = self.state.lock().expect("unable to get state lock");
                    self.machine.press(hotkey_id, velocity, &mut state.bank)
                };
                match result {
                    Ok(effects) => self.apply_effects(effects),
                    Err(e) => {
                        warn!(err = e.to_string(), note, "Hotkey failed.");
                        self.broadcast(EngineEvent::Error(e.to_string()));
                    }
                }
            }
            InputEvent::HotkeyRelease { note } => {
                let Some(hotkey_id) = self.bindings.hotkey_for(note) else {
                    return;
                };
                let effects = self.machine.release(hotkey_id);
                self.apply_effects(effects);
            }
            InputEvent::Learned { target, value } => self.finish_learn(target, value),
        }
    }

    fn handle_command(&mut self, command: Command) {
        let result = match command {
            Command::SetChannelVolume { id, volume } => self.set_channel_volume(id, volume),
            Command::ToggleChannelMute { name } => self.toggle_channel_mute(&name),
            Command::ToggleChannelPreview { name } => {
                let result = {
                    let mut state = self.state.lock().expect("unable to get state lock");
                    state.bank.toggle_preview(&name)
                };
                result.map(|(channel_id, previewing)| {
                    self.broadcast(EngineEvent::ChannelPreview {
                        channel_id,
                        previewing,
                    });
                })
            }
            Command::ToggleMasterPreview => {
                let previewing = {
                    let mut state = self.state.lock().expect("unable to get state lock");
                    state.bank.toggle_master_preview()
                };
                self.broadcast(EngineEvent::MasterPreview(previewing));
                Ok(())
            }
            Command::SetMasterVolume(volume) => {
                let volume = volume.min(100);
                {
                    let mut state = self.state.lock().expect("unable to get state lock");
                    state.bank.set_master_volume(volume);
                }
                if let Some(sink) = &mut self.sink {
                    sink.record_master_volume(volume);
                }
                self.broadcast(EngineEvent::MasterVolume(volume));
                Ok(())
            }
            Command::SetSessionVolume { query, volume } => {
                let mut state = self.state.lock().expect("unable to get state lock");
                state.registry.set_volume(&query, volume)
            }
            Command::ToggleSessionMute { query } => {
                let mut state = self.state.lock().expect("unable to get state lock");
                state.registry.toggle_mute(&query).map(|_| ())
            }
            Command::SetRoute {
                session,
                output,
                volume,
                enabled,
            } => {
                let result = {
                    let mut state = self.state.lock().expect("unable to get state lock");
                    state.routing.set_route(&session, &output, volume, enabled)
                };
                result.map(|()| {
                    self.broadcast(EngineEvent::RouteChanged {
                        session,
                        output,
                        route: Route { volume, enabled },
                    });
                })
            }
            Command::RebuildRouting => {
                let mut state = self.state.lock().expect("unable to get state lock");
                let keys = state.registry.keys();
                state.routing.build(&keys, self.outputs.clone());
                Ok(())
            }
            Command::StartLearn { target, id } => {
                self.interpreter.start_learn(target);
                self.pending_learn = Some((target, id));
                Ok(())
            }
            Command::CancelLearn => {
                self.interpreter.cancel_learn();
                self.pending_learn = None;
                Ok(())
            }
            // Stop is handled by the loop.
            Command::Stop => Ok(()),
        };

        if let Err(e) = result {
            warn!(err = e.to_string(), "Command failed.");
            self.broadcast(EngineEvent::Error(e.to_string()));
        }
    }

    /// Applies a fader move to the channel and forwards it to the session it
    /// sources from. A channel whose session is currently absent still moves.
    fn set_channel_volume(&mut self, id: u32, volume: u8) -> Result<(), ControlError> {
        let channel = {
            let mut state = self.state.lock().expect("unable to get state lock");
            let source = state.bank.set_volume(id, volume)?;
            forward_volume(&mut state, &source, volume);
            state.bank.get(id).cloned()
        };

        if let (Some(sink), Some(channel)) = (&mut self.sink, &channel) {
            sink.record_channel(channel);
        }
        self.broadcast(EngineEvent::ChannelVolume {
            channel_id: id,
            volume: volume.min(100),
        });
        Ok(())
    }

    fn toggle_channel_mute(&mut self, name: &str) -> Result<(), ControlError> {
        let (channel_id, muted, channel) = {
            let mut state = self.state.lock().expect("unable to get state lock");
            let (channel_id, muted, source) = state.bank.toggle_mute(name)?;
            forward_mute(&mut state, &source, muted);
            (channel_id, muted, state.bank.get(channel_id).cloned())
        };

        if let (Some(sink), Some(channel)) = (&mut self.sink, &channel) {
            sink.record_channel(channel);
        }
        self.broadcast(EngineEvent::ChannelMute { channel_id, muted });
        Ok(())
    }

    /// Turns hotkey effects into engine events, forwarding volume and mute
    /// changes to the sessions they source from.
    fn apply_effects(&mut self, effects: Vec<HotkeyEffect>) {
        for effect in effects {
            let event = match effect {
                HotkeyEffect::VolumeSet {
                    channel_id,
                    volume,
                    source,
                } => {
                    let mut state = self.state.lock().expect("unable to get state lock");
                    forward_volume(&mut state, &source, volume);
                    EngineEvent::ChannelVolume { channel_id, volume }
                }
                HotkeyEffect::MuteToggled {
                    channel_id,
                    muted,
                    source,
                } => {
                    let mut state = self.state.lock().expect("unable to get state lock");
                    forward_mute(&mut state, &source, muted);
                    EngineEvent::ChannelMute { channel_id, muted }
                }
                HotkeyEffect::PreviewToggled {
                    channel_id,
                    previewing,
                } => EngineEvent::ChannelPreview {
                    channel_id,
                    previewing,
                },
                HotkeyEffect::MasterPreviewToggled(previewing) => {
                    EngineEvent::MasterPreview(previewing)
                }
                HotkeyEffect::SceneChanged(name) => EngineEvent::SceneChanged(name),
                HotkeyEffect::SoundStarted(token) => EngineEvent::SoundStarted(token),
                HotkeyEffect::SoundStopped(token) => EngineEvent::SoundStopped(token),
            };
            self.broadcast(event);
        }
    }

    /// Completes a learn: stores the captured binding on the target, rebinds
    /// the table, and persists.
    fn finish_learn(&mut self, target: LearnTarget, value: u8) {
        let Some((pending_target, id)) = self.pending_learn.take() else {
            warn!("Learned a binding with no pending learn target, dropping.");
            return;
        };
        if pending_target != target {
            warn!("Learn target mismatch, dropping captured binding.");
            return;
        }

        match target {
            LearnTarget::Channel => {
                let channel = {
                    let mut state = self.state.lock().expect("unable to get state lock");
                    match state.bank.get_mut(id) {
                        Some(channel) => {
                            channel.midi_cc = Some(value);
                            channel.clone()
                        }
                        None => {
                            warn!(channel = id, "Learned binding for unknown channel.");
                            return;
                        }
                    }
                };
                self.bindings.unbind_channel(id);
                self.bindings.bind_control(value, id);
                if let Some(sink) = &mut self.sink {
                    sink.record_channel(&channel);
                }
            }
            LearnTarget::Hotkey => {
                let hotkey = match self.machine.get_mut(id) {
                    Some(hotkey) => {
                        hotkey.midi_note = Some(value);
                        hotkey.clone()
                    }
                    None => {
                        warn!(hotkey = id, "Learned binding for unknown hotkey.");
                        return;
                    }
                };
                self.bindings.unbind_hotkey(id);
                self.bindings.bind_note(value, id);
                if let Some(sink) = &mut self.sink {
                    sink.record_hotkey(&hotkey);
                }
            }
        }

        info!(
            target = format!("{:?}", target),
            id, value, "Binding learned."
        );
        self.broadcast(EngineEvent::BindingLearned { target, id, value });
    }

    fn broadcast(&self, event: EngineEvent) {
        // A send error just means nobody is subscribed right now.
        let _ = self.events.send(event);
    }
}

/// Forwards a channel volume move to the session it sources from. The
/// session being absent is normal; the move sticks on the channel.
fn forward_volume(state: &mut EngineState, source: &str, volume: u8) {
    if let Err(e) = state.registry.set_volume(source, volume) {
        match e {
            ControlError::SessionNotFound(_) => {}
            e => warn!(err = e.to_string(), source, "Unable to forward volume."),
        }
    }
}

/// Forwards a channel mute to the session it sources from, only toggling
/// when the states actually disagree.
fn forward_mute(state: &mut EngineState, source: &str, muted: bool) {
    let session_muted = match state.registry.get_by_name(source) {
        Some(session) => session.muted,
        None => return,
    };
    if session_muted != muted {
        if let Err(e) = state.registry.toggle_mute(source) {
            warn!(err = e.to_string(), source, "Unable to forward mute.");
        }
    }
}
