//! # hand_gesture
//!
//! Classify one detected hand, given as 21 normalized landmarks, into a
//! discrete gesture label.
//!
//! Classification has two pure steps:
//!
//! 1. [`GestureClassifier::finger_states`]: landmark geometry →
//!    [`FingerState`] (which of the five fingers are extended).
//! 2. [`GestureClassifier::classify`]: exact lookup of that pattern in a
//!    [`GestureTable`]; anything unmatched is [`GestureLabel::Unknown`].
//!
//! ## Tables
//!
//! | Pattern (T I M R P) | `Effects` | `PitchShift` |
//! |---|---|---|
//! | `00000` | Fist | Stop |
//! | `11111` | Open Palm | Major Fifth |
//! | `01000` | Point | Minor Third |
//! | `01100` | Peace | Major Third |
//! | `01001` | Rock | Octave |
//! | `01110` | – | Tritone |
//!
//! ## Quick start
//!
//! ```rust
//! use hand_gesture::{FingerState, GestureClassifier, GestureLabel, GestureTable, HandLandmarks};
//!
//! let classifier = GestureClassifier::new(GestureTable::Effects);
//! let hand = HandLandmarks::synthesize(FingerState::from_bits([0, 1, 0, 0, 0]));
//! assert_eq!(classifier.classify_hand(&hand), GestureLabel::Point);
//! ```

pub mod classify;
pub mod label;
pub mod landmark;

pub use classify::{GestureClassifier, ThumbRule, DEFAULT_THRESHOLD};
pub use label::{FingerState, GestureLabel, GestureTable};
pub use landmark::{Finger, HandLandmarks, Landmark, LandmarkError, LANDMARK_COUNT};
