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

use midly::{live::LiveEvent, MidiMessage};
use tracing::{debug, info};

/// Smoothing factor for continuous controls. Smoothed values chase the raw
/// value; repeated identical inputs converge on it.
const SMOOTHING: f32 = 0.3;

/// What a captured MIDI value should be bound to while learn mode is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnTarget {
    /// Bind the next control change to a channel fader.
    Channel,
    /// Bind the next note press to a hotkey.
    Hotkey,
}

/// An interpreted MIDI input event.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// A continuous control moved. The percent is smoothed and scaled to
    /// 0..=100.
    ControlChange { control: u8, percent: u8 },
    /// A note went down.
    HotkeyPress { note: u8, velocity: u8 },
    /// A note came up. Note on with velocity zero is treated as a release.
    HotkeyRelease { note: u8 },
    /// Learn mode captured a value.
    Learned { target: LearnTarget, value: u8 },
}

/// Turns raw MIDI bytes into interpreted events, smoothing continuous
/// controls along the way.
#[derive(Default)]
pub struct Interpreter {
    values: HashMap<u8, f32>,
    learn: Option<LearnTarget>,
}

impl Interpreter {
    pub fn new() -> Interpreter {
        Interpreter::default()
    }

    /// Arms learn mode. The next qualifying event is captured instead of
    /// dispatched.
    pub fn start_learn(&mut self, target: LearnTarget) {
        info!(target = format!("{:?}", target), "Learn mode armed.");
        self.learn = Some(target);
    }

    /// Disarms learn mode without capturing anything.
    pub fn cancel_learn(&mut self) {
        self.learn = None;
    }

    pub fn learning(&self) -> Option<LearnTarget> {
        self.learn
    }

    /// Handles a raw MIDI message. Returns None for messages that don't map
    /// to an event, including unparseable ones.
    pub fn handle(&mut self, raw_event: &[u8]) -> Option<InputEvent> {
        let message = match LiveEvent::parse(raw_event) {
            Ok(LiveEvent::Midi { message, .. }) => message,
            Ok(event) => {
                debug!(event = format!("{:?}", event), "Ignoring non-channel event.");
                return None;
            }
            Err(e) => {
                debug!(err = e.to_string(), "Ignoring unparseable MIDI message.");
                return None;
            }
        };

        match message {
            MidiMessage::Controller { controller, value } => {
                let control = controller.as_int();
                if let Some(target) = self.learn {
                    if target == LearnTarget::Channel {
                        self.learn = None;
                        return Some(InputEvent::Learned {
                            target,
                            value: control,
                        });
                    }
                    // Non-qualifying input during a learn is swallowed
                    // entirely; the smoothing state stays untouched.
                    return None;
                }

                let smoothed = self.smooth(control, value.as_int());
                Some(InputEvent::ControlChange {
                    control,
                    percent: (smoothed / 127.0 * 100.0).round() as u8,
                })
            }
            MidiMessage::NoteOn { key, vel } => {
                let note = key.as_int();
                let velocity = vel.as_int();
                if let Some(target) = self.learn {
                    if target == LearnTarget::Hotkey && velocity > 0 {
                        self.learn = None;
                        return Some(InputEvent::Learned {
                            target,
                            value: note,
                        });
                    }
                    return None;
                }
                if velocity == 0 {
                    return Some(InputEvent::HotkeyRelease { note });
                }
                Some(InputEvent::HotkeyPress { note, velocity })
            }
            MidiMessage::NoteOff { key, .. } => {
                if self.learn.is_some() {
                    return None;
                }
                Some(InputEvent::HotkeyRelease {
                    note: key.as_int(),
                })
            }
            _ => None,
        }
    }

    /// Applies exponential smoothing to a raw controller value. Each control
    /// carries its own running value, seeded at zero.
    fn smooth(&mut self, control: u8, value: u8) -> f32 {
        let current = self.values.entry(control).or_insert(0.0);
        *current += (f32::from(value) - *current) * SMOOTHING;
        *current
    }
}
