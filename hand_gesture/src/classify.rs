//! Landmarks → finger states → gesture label.
//!
//! The classifier is a plain value with no interior state; one instance can
//! be shared across threads and called for any number of frames.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::label::{FingerState, GestureLabel, GestureTable};
use crate::landmark::{Finger, HandLandmarks};

/// Default margin (normalized frame units) a fingertip must clear its base
/// knuckle by to count as extended.
pub const DEFAULT_THRESHOLD: f32 = 0.02;

// ════════════════════════════════════════════════════════════════════════════
// ThumbRule
// ════════════════════════════════════════════════════════════════════════════

/// How thumb extension is decided. The thumb folds sideways, so the
/// vertical tip-above-knuckle test used for the other fingers doesn't apply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThumbRule {
    /// Orientation-aware: when the thumb MCP lies to the right of the wrist
    /// the tip must be further right than the MCP, otherwise further left.
    #[default]
    Directional,
    /// Orientation-free: the tip must be further from the wrist horizontally
    /// than the MCP is, by at least the threshold.
    WristDistance,
}

impl FromStr for ThumbRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "directional"    => Ok(ThumbRule::Directional),
            "wrist_distance" => Ok(ThumbRule::WristDistance),
            other => Err(format!("unknown thumb rule {:?} (expected directional or wrist-distance)", other)),
        }
    }
}

impl ThumbRule {
    fn is_extended(self, hand: &HandLandmarks, threshold: f32) -> bool {
        let tip   = hand.tip(Finger::Thumb);
        let mcp   = hand.base(Finger::Thumb);
        let wrist = hand.wrist();
        match self {
            ThumbRule::Directional => {
                if wrist.x < mcp.x { tip.x > mcp.x } else { tip.x < mcp.x }
            }
            ThumbRule::WristDistance => {
                (tip.x - wrist.x).abs() > (mcp.x - wrist.x).abs() + threshold
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureClassifier
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureClassifier {
    table:      GestureTable,
    thumb_rule: ThumbRule,
    threshold:  f32,
}

impl GestureClassifier {
    pub fn new(table: GestureTable) -> Self {
        GestureClassifier {
            table,
            thumb_rule: ThumbRule::default(),
            threshold:  DEFAULT_THRESHOLD,
        }
    }

    pub fn thumb_rule(mut self, rule: ThumbRule) -> Self {
        self.thumb_rule = rule;
        self
    }

    pub fn threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn table(&self) -> GestureTable {
        self.table
    }

    /// Decide which fingers are extended.
    ///
    /// Non-thumb fingers are extended when the tip is above its base knuckle
    /// by more than the threshold (`tip.y < base.y - threshold`).
    pub fn finger_states(&self, hand: &HandLandmarks) -> FingerState {
        let mut fingers = [false; 5];
        fingers[Finger::Thumb.slot()] = self.thumb_rule.is_extended(hand, self.threshold);
        for finger in &Finger::ALL[1..] {
            fingers[finger.slot()] = hand.tip(*finger).y < hand.base(*finger).y - self.threshold;
        }
        FingerState(fingers)
    }

    pub fn classify(&self, state: FingerState) -> GestureLabel {
        self.table.lookup(state)
    }

    pub fn classify_hand(&self, hand: &HandLandmarks) -> GestureLabel {
        self.classify(self.finger_states(hand))
    }
}

impl Default for GestureClassifier {
    fn default() -> Self {
        GestureClassifier::new(GestureTable::default())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
