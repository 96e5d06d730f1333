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
use std::{collections::HashMap, f32::consts::PI, time::Instant};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::session::{clamp01, ActivityCategory};

/// How much the peak-hold level falls per tick when the instantaneous level
/// is below it. The attack is instant; the decay is slow, the classic VU law.
pub const PEAK_DECAY: f32 = 0.02;

/// Per-session waveform state: a fixed phase offset so sessions don't pulse
/// in lockstep, and a base activity weight.
struct Voice {
    phase: f32,
    base_activity: f32,
}

/// Synthesizes believable per-session levels when the backend cannot measure
/// real ones. Each category combines periodic terms with sparse random bursts
/// (music beats, speech bursts, notification chimes and the like).
pub struct LevelSynthesizer {
    start: Instant,
    voices: HashMap<String, Voice>,
    rng: StdRng,
}

impl LevelSynthesizer {
    pub fn new() -> LevelSynthesizer {
        LevelSynthesizer::with_seed(rand::thread_rng().gen())
    }

    /// Creates a synthesizer with a fixed seed for deterministic tests.
    pub fn with_seed(seed: u64) -> LevelSynthesizer {
        LevelSynthesizer {
            start: Instant::now(),
            voices: HashMap::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Advances the meter for one session and returns (level, peak_level).
    /// Muted sessions report level 0 while the peak keeps decaying.
    pub fn tick(
        &mut self,
        key: &str,
        category: ActivityCategory,
        volume: u8,
        muted: bool,
        prev_peak: f32,
    ) -> (f32, f32) {
        let level = if muted {
            0.0
        } else {
            let t = self.start.elapsed().as_millis() as f32;
            if !self.voices.contains_key(key) {
                let voice = Voice {
                    phase: self.rng.gen::<f32>() * 2.0 * PI,
                    base_activity: 0.2 + self.rng.gen::<f32>() * 0.6,
                };
                self.voices.insert(key.to_string(), voice);
            }
            let voice = &self.voices[key];
            let (phase, base) = (voice.phase, voice.base_activity);
            let raw = pattern(category, t, phase, base, &mut self.rng);
            clamp01(raw * volume as f32 / 100.0)
        };

        let peak = clamp01(level.max(prev_peak - PEAK_DECAY));
        (level, peak)
    }

    /// Drops waveform state for sessions that no longer exist.
    pub fn retain(&mut self, keys: &[String]) {
        self.voices.retain(|key, _| keys.iter().any(|k| k == key));
    }
}

impl Default for LevelSynthesizer {
    fn default() -> Self {
        LevelSynthesizer::new()
    }
}

/// The raw, pre-volume waveform for one category at time t (milliseconds).
fn pattern(category: ActivityCategory, t: f32, phase: f32, base: f32, rng: &mut StdRng) -> f32 {
    match category {
        ActivityCategory::Music => {
            let beat = (t / 500.0).sin() * 0.3;
            let bass = (t / 200.0).sin() * 0.2;
            let melody = (t / 300.0 + phase).sin() * 0.4;
            (beat + bass + melody).abs() * base
        }
        ActivityCategory::Voice => {
            let speech = if rng.gen::<f32>() > 0.7 {
                rng.gen::<f32>() * 0.8
            } else {
                0.1
            };
            let background = (t / 1000.0).sin() * 0.1;
            (speech + background) * base
        }
        ActivityCategory::Web => {
            let notification = if rng.gen::<f32>() > 0.98 {
                rng.gen::<f32>() * 0.6
            } else {
                0.0
            };
            let video = (t / 400.0 + phase).sin() * 0.3;
            (notification + video.abs()) * base * 0.7
        }
        ActivityCategory::Video => {
            let audio = (t / 300.0).sin() * 0.6;
            let effects = if rng.gen::<f32>() > 0.9 {
                rng.gen::<f32>() * 0.4
            } else {
                0.0
            };
            (audio.abs() + effects) * base
        }
        ActivityCategory::Gaming => {
            let action = if rng.gen::<f32>() > 0.8 {
                rng.gen::<f32>() * 0.9
            } else {
                0.2
            };
            let ambient = (t / 600.0 + phase).sin() * 0.3;
            (action + ambient.abs()) * base
        }
        ActivityCategory::Streaming => {
            let input = (t / 800.0).sin() * 0.4;
            let alerts = if rng.gen::<f32>() > 0.95 {
                rng.gen::<f32>() * 0.7
            } else {
                0.0
            };
            (input.abs() + alerts) * base * 0.8
        }
        ActivityCategory::System => {
            let notification = if rng.gen::<f32>() > 0.99 {
                rng.gen::<f32>() * 0.5
            } else {
                0.0
            };
            notification * 0.3
        }
    }
}
