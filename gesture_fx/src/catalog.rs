//! Gesture → effect lookup.
//!
//! A deployment uses one [`Preset`], which fixes both the gesture table the
//! classifier matches against and the shape of the effects:
//!
//! | Preset | Gesture | Effect | CC | Behavior |
//! |---|---|---|---|---|
//! | `effects` | Open Palm | Reverb | 91 | ramp 1→126, reset to 0 |
//! | `effects` | Point | Volume | 7 | ramp 1→126, reset to 0 |
//! | `effects` | Peace | Delay | 94 | ramp 1→126, reset to 0 |
//! | `effects` | Fist, Rock | – | – | stop current effect |
//! | `pitch_shift` | Stop … Octave | Pitch shift | 20 | one write, semitones → 0–127 |

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use hand_gesture::{GestureLabel, GestureTable};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CHANNEL:       u8       = 1;
pub const DEFAULT_RAMP_START:    u8       = 1;
pub const DEFAULT_RAMP_STEP:     u8       = 5;
pub const DEFAULT_RAMP_PEAK:     u8       = 126;
pub const DEFAULT_RAMP_INTERVAL: Duration = Duration::from_millis(100);

// ════════════════════════════════════════════════════════════════════════════
// EffectId
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectId {
    Reverb,
    Volume,
    Delay,
    PitchShift,
}

impl EffectId {
    /// Controller number the effect is mapped to.
    pub fn controller(self) -> u8 {
        match self {
            EffectId::Reverb     => 91,
            EffectId::Volume     => 7,
            EffectId::Delay      => 94,
            EffectId::PitchShift => 20,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EffectId::Reverb     => "reverb",
            EffectId::Volume     => "volume",
            EffectId::Delay      => "delay",
            EffectId::PitchShift => "pitch shift",
        }
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Ramp
// ════════════════════════════════════════════════════════════════════════════

/// A stepped sweep: `start, start+step, …`, the last step clamped to `peak`
/// (itself at most 127), one value every `interval`, then `terminal` once
/// the sweep ends or is cut short.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ramp {
    pub start:    u8,
    pub step:     u8,
    pub peak:     u8,
    pub interval: Duration,
    pub terminal: u8,
}

impl Ramp {
    /// Values the ramp sends, in order. Always ends on the peak (never above
    /// 127); a zero step yields only `start`.
    pub fn values(&self) -> impl Iterator<Item = u8> {
        let peak = self.peak.min(127);
        let step = self.step;
        let first = self.start.min(peak);
        std::iter::successors(Some(first), move |&v| {
            (step > 0 && v < peak).then(|| v.saturating_add(step).min(peak))
        })
    }
}

impl Default for Ramp {
    fn default() -> Self {
        Ramp {
            start:    DEFAULT_RAMP_START,
            step:     DEFAULT_RAMP_STEP,
            peak:     DEFAULT_RAMP_PEAK,
            interval: DEFAULT_RAMP_INTERVAL,
            terminal: 0,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// EffectDescriptor
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectBehavior {
    /// Write `value` once; nothing to cancel later.
    Discrete { value: u8 },
    /// Sweep in the background until stopped.
    Ramp(Ramp),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectDescriptor {
    pub effect:     EffectId,
    pub controller: u8,
    pub channel:    u8,
    pub behavior:   EffectBehavior,
}

impl EffectDescriptor {
    pub fn ramp(&self) -> Option<&Ramp> {
        match &self.behavior {
            EffectBehavior::Ramp(r) => Some(r),
            EffectBehavior::Discrete { .. } => None,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Preset
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Ramped reverb / volume / delay.
    #[default]
    Effects,
    /// Discrete pitch-shifter intervals.
    PitchShift,
}

impl Preset {
    pub fn table(self) -> GestureTable {
        match self {
            Preset::Effects    => GestureTable::Effects,
            Preset::PitchShift => GestureTable::PitchShift,
        }
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "effects"     => Ok(Preset::Effects),
            "pitch_shift" => Ok(Preset::PitchShift),
            other => Err(format!("unknown preset {:?} (expected effects or pitch-shift)", other)),
        }
    }
}

/// Map a pitch-shift amount onto a CC value: −12…+12 semitones spans
/// 0…127, truncated.
pub fn semitones_to_cc(semitones: i8) -> u8 {
    ((semitones as i32 + 12) * 127 / 24).clamp(0, 127) as u8
}

// ════════════════════════════════════════════════════════════════════════════
// EffectCatalog
// ════════════════════════════════════════════════════════════════════════════

/// Static gesture → effect table for one [`Preset`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectCatalog {
    preset:  Preset,
    channel: u8,
    ramp:    Ramp,
}

impl EffectCatalog {
    pub fn new(preset: Preset) -> Self {
        EffectCatalog { preset, channel: DEFAULT_CHANNEL, ramp: Ramp::default() }
    }

    pub fn channel(mut self, channel: u8) -> Self {
        self.channel = channel.min(15);
        self
    }

    /// Ramp shape shared by every ramped effect.
    pub fn ramp(mut self, ramp: Ramp) -> Self {
        self.ramp = ramp;
        self
    }

    pub fn preset(&self) -> Preset {
        self.preset
    }

    pub fn table(&self) -> GestureTable {
        self.preset.table()
    }

    pub fn lookup(&self, label: GestureLabel) -> Option<EffectDescriptor> {
        match self.preset {
            Preset::Effects    => self.lookup_effects(label),
            Preset::PitchShift => self.lookup_pitch_shift(label),
        }
    }

    fn lookup_effects(&self, label: GestureLabel) -> Option<EffectDescriptor> {
        let effect = match label {
            GestureLabel::OpenPalm => EffectId::Reverb,
            GestureLabel::Point    => EffectId::Volume,
            GestureLabel::Peace    => EffectId::Delay,
            GestureLabel::Fist
            | GestureLabel::Rock
            | GestureLabel::Unknown => return None,
            GestureLabel::Stop
            | GestureLabel::MinorThird
            | GestureLabel::MajorThird
            | GestureLabel::Tritone
            | GestureLabel::MajorFifth
            | GestureLabel::Octave => return None,
        };
        Some(EffectDescriptor {
            effect,
            controller: effect.controller(),
            channel:    self.channel,
            behavior:   EffectBehavior::Ramp(self.ramp),
        })
    }

    fn lookup_pitch_shift(&self, label: GestureLabel) -> Option<EffectDescriptor> {
        let semitones: i8 = match label {
            GestureLabel::Stop       => 0,
            GestureLabel::MinorThird => 3,
            GestureLabel::MajorThird => 4,
            GestureLabel::Tritone    => 6,
            GestureLabel::MajorFifth => 7,
            GestureLabel::Octave     => 12,
            GestureLabel::Fist
            | GestureLabel::OpenPalm
            | GestureLabel::Point
            | GestureLabel::Peace
            | GestureLabel::Rock
            | GestureLabel::Unknown => return None,
        };
        Some(EffectDescriptor {
            effect:     EffectId::PitchShift,
            controller: EffectId::PitchShift.controller(),
            channel:    self.channel,
            behavior:   EffectBehavior::Discrete { value: semitones_to_cc(semitones) },
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
