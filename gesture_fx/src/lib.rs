//! # gesture_fx
//!
//! Hand-gesture controller for MIDI effects. While a gesture is held its
//! effect either ramps a Control Change value on a background thread or
//! writes one value immediately; changing gesture stops and resets the old
//! effect before the new one begins.
//!
//! ## Pipeline
//!
//! ```text
//! LandmarkSource ─▶ GestureClassifier ─▶ GestureLoop ─▶ EffectController ─▶ MidiSink
//!  (thread, mpsc)    (hand_gesture)      (debounce)     (one ramp thread)    (midir)
//! ```
//!
//! ## Gesture → effect mapping (`effects` preset)
//!
//! | Gesture | Effect | CC |
//! |---|---|---|
//! | Open Palm | Reverb ramp | 91 |
//! | Point | Volume ramp | 7 |
//! | Peace | Delay ramp | 94 |
//! | Fist / Rock | stop current effect | – |
//!
//! The `pitch_shift` preset instead writes a pitch-shifter interval to CC 20
//! for each of Stop, Minor Third, Major Third, Tritone, Major Fifth and
//! Octave.

pub mod cancel;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod gesture_loop;
pub mod sink;
pub mod source;

pub use catalog::{EffectBehavior, EffectCatalog, EffectDescriptor, EffectId, Preset, Ramp};
pub use config::AppConfig;
pub use controller::{EffectController, StartOutcome};
pub use debounce::{transition, Action, Debouncer, UnknownPolicy};
pub use error::{GestureFxError, Result, TransportError};
pub use gesture_loop::GestureLoop;
pub use sink::{ControlChange, LogSink, MidiSink, MidirSink, NullSink, RecordingSink};
pub use source::{
    spawn_landmark_source, LandmarkFrame, LandmarkSource, LineSource, ScriptedSource, SourceEvent,
};
