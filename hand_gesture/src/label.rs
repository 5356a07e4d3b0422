//! Gesture labels and the finger-pattern tables that produce them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::landmark::Finger;

// ════════════════════════════════════════════════════════════════════════════
// FingerState
// ════════════════════════════════════════════════════════════════════════════

/// Which fingers are extended, in order thumb, index, middle, ring, pinky.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FingerState(pub [bool; 5]);

impl FingerState {
    pub const CLOSED:   FingerState = FingerState([false; 5]);
    pub const EXTENDED: FingerState = FingerState([true; 5]);

    pub const fn new(fingers: [bool; 5]) -> Self {
        FingerState(fingers)
    }

    /// Build from 0/1 values, e.g. `[0, 1, 0, 0, 0]` for a pointing hand.
    pub const fn from_bits(bits: [u8; 5]) -> Self {
        FingerState([bits[0] != 0, bits[1] != 0, bits[2] != 0, bits[3] != 0, bits[4] != 0])
    }

    /// Parse a five-character pattern such as `"01000"`.
    pub fn parse(pattern: &str) -> Option<Self> {
        let bytes = pattern.as_bytes();
        if bytes.len() != 5 {
            return None;
        }
        let mut fingers = [false; 5];
        for (slot, b) in bytes.iter().enumerate() {
            fingers[slot] = match b {
                b'0' => false,
                b'1' => true,
                _    => return None,
            };
        }
        Some(FingerState(fingers))
    }

    pub fn is_extended(&self, finger: Finger) -> bool {
        self.0[finger.slot()]
    }

    pub fn extended_count(&self) -> usize {
        self.0.iter().filter(|f| **f).count()
    }
}

impl fmt::Display for FingerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for extended in self.0 {
            f.write_str(if extended { "1" } else { "0" })?;
        }
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureLabel
// ════════════════════════════════════════════════════════════════════════════

/// A discrete gesture. Each [`GestureTable`] uses a subset of these plus
/// [`GestureLabel::Unknown`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureLabel {
    // Effects vocabulary
    Fist,
    OpenPalm,
    Point,
    Peace,
    Rock,
    // Pitch-shift vocabulary
    Stop,
    MinorThird,
    MajorThird,
    Tritone,
    MajorFifth,
    Octave,

    /// No table row matched.
    Unknown,
}

impl GestureLabel {
    pub const ALL: [GestureLabel; 12] = [
        GestureLabel::Fist, GestureLabel::OpenPalm, GestureLabel::Point,
        GestureLabel::Peace, GestureLabel::Rock, GestureLabel::Stop,
        GestureLabel::MinorThird, GestureLabel::MajorThird, GestureLabel::Tritone,
        GestureLabel::MajorFifth, GestureLabel::Octave, GestureLabel::Unknown,
    ];

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            GestureLabel::Fist       => "Fist",
            GestureLabel::OpenPalm   => "Open Palm",
            GestureLabel::Point      => "Point",
            GestureLabel::Peace      => "Peace",
            GestureLabel::Rock       => "Rock",
            GestureLabel::Stop       => "Stop",
            GestureLabel::MinorThird => "Minor Third",
            GestureLabel::MajorThird => "Major Third",
            GestureLabel::Tritone    => "Tritone",
            GestureLabel::MajorFifth => "Major Fifth",
            GestureLabel::Octave     => "Octave",
            GestureLabel::Unknown    => "Unknown",
        }
    }

    /// Case-insensitive lookup by name, ignoring spaces, `_` and `-`
    /// (`"open palm"`, `"open_palm"` and `"OpenPalm"` all match).
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted: String = name
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        GestureLabel::ALL.into_iter().find(|label| {
            let have: String = label.name()
                .chars()
                .filter(|c| *c != ' ')
                .flat_map(char::to_lowercase)
                .collect();
            have == wanted
        })
    }

    pub fn is_unknown(self) -> bool {
        self == GestureLabel::Unknown
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureTable: exact-match pattern → label
// ════════════════════════════════════════════════════════════════════════════

const EFFECTS_ROWS: &[(FingerState, GestureLabel)] = &[
    (FingerState::from_bits([0, 0, 0, 0, 0]), GestureLabel::Fist),
    (FingerState::from_bits([1, 1, 1, 1, 1]), GestureLabel::OpenPalm),
    (FingerState::from_bits([0, 1, 0, 0, 0]), GestureLabel::Point),
    (FingerState::from_bits([0, 1, 1, 0, 0]), GestureLabel::Peace),
    (FingerState::from_bits([0, 1, 0, 0, 1]), GestureLabel::Rock),
];

const PITCH_SHIFT_ROWS: &[(FingerState, GestureLabel)] = &[
    (FingerState::from_bits([0, 0, 0, 0, 0]), GestureLabel::Stop),
    (FingerState::from_bits([1, 1, 1, 1, 1]), GestureLabel::MajorFifth),
    (FingerState::from_bits([0, 1, 0, 0, 0]), GestureLabel::MinorThird),
    (FingerState::from_bits([0, 1, 1, 0, 0]), GestureLabel::MajorThird),
    (FingerState::from_bits([0, 1, 1, 1, 0]), GestureLabel::Tritone),
    (FingerState::from_bits([0, 1, 0, 0, 1]), GestureLabel::Octave),
];

/// A fixed finger-pattern vocabulary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureTable {
    /// Fist / open palm / point / peace / rock.
    #[default]
    Effects,
    /// Interval names for a pitch shifter.
    PitchShift,
}

impl GestureTable {
    pub fn rows(self) -> &'static [(FingerState, GestureLabel)] {
        match self {
            GestureTable::Effects    => EFFECTS_ROWS,
            GestureTable::PitchShift => PITCH_SHIFT_ROWS,
        }
    }

    /// Exact match; anything not in the table is [`GestureLabel::Unknown`].
    pub fn lookup(self, state: FingerState) -> GestureLabel {
        self.rows()
            .iter()
            .find(|(pattern, _)| *pattern == state)
            .map(|(_, label)| *label)
            .unwrap_or(GestureLabel::Unknown)
    }

    /// Reverse lookup: the finger pattern that produces `label`.
    pub fn pattern_for(self, label: GestureLabel) -> Option<FingerState> {
        self.rows()
            .iter()
            .find(|(_, l)| *l == label)
            .map(|(pattern, _)| *pattern)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_agree() {
        let s = FingerState::parse("01001").unwrap();
        assert_eq!(s, FingerState::from_bits([0, 1, 0, 0, 1]));
        assert_eq!(s.to_string(), "01001");
        assert_eq!(s.extended_count(), 2);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(FingerState::parse("0100"), None);
        assert_eq!(FingerState::parse("01x00"), None);
    }

    #[test]
    fn closed_and_open_hand_labels() {
        assert_eq!(GestureTable::Effects.lookup(FingerState::CLOSED), GestureLabel::Fist);
        assert_eq!(GestureTable::Effects.lookup(FingerState::EXTENDED), GestureLabel::OpenPalm);
        assert_eq!(GestureTable::PitchShift.lookup(FingerState::CLOSED), GestureLabel::Stop);
        assert_eq!(GestureTable::PitchShift.lookup(FingerState::EXTENDED), GestureLabel::MajorFifth);
    }

    #[test]
    fn unmatched_pattern_is_unknown() {
        let odd = FingerState::from_bits([1, 0, 1, 0, 1]);
        assert_eq!(GestureTable::Effects.lookup(odd), GestureLabel::Unknown);
        assert_eq!(GestureTable::PitchShift.lookup(odd), GestureLabel::Unknown);
    }

    #[test]
    fn tables_have_no_duplicate_patterns() {
        for table in [GestureTable::Effects, GestureTable::PitchShift] {
            let rows = table.rows();
            for (i, (a, _)) in rows.iter().enumerate() {
                for (b, _) in &rows[i + 1..] {
                    assert_ne!(a, b, "{:?} repeats pattern {}", table, a);
                }
            }
        }
    }

    #[test]
    fn pattern_for_inverts_lookup() {
        for table in [GestureTable::Effects, GestureTable::PitchShift] {
            for (pattern, label) in table.rows() {
                assert_eq!(table.pattern_for(*label), Some(*pattern));
            }
        }
        assert_eq!(GestureTable::Effects.pattern_for(GestureLabel::Octave), None);
    }

    #[test]
    fn from_name_is_forgiving() {
        assert_eq!(GestureLabel::from_name("open palm"), Some(GestureLabel::OpenPalm));
        assert_eq!(GestureLabel::from_name("OPEN_PALM"), Some(GestureLabel::OpenPalm));
        assert_eq!(GestureLabel::from_name("major-fifth"), Some(GestureLabel::MajorFifth));
        assert_eq!(GestureLabel::from_name("wave"), None);
    }
}
