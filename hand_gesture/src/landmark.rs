//! Normalized hand landmarks in the 21-point anatomical layout.
//!
//! ```text
//!         8   12  16  20        tips
//!         7   11  15  19
//!     4   6   10  14  18
//!     3   5    9  13  17        finger bases (MCP)
//!      2
//!       1
//!          0                    wrist
//! ```
//!
//! Coordinates are normalized to the frame: `x` grows to the right, `y`
//! grows *downwards*, so a smaller `y` is higher in the picture.

use thiserror::Error;

use crate::FingerState;

/// Number of landmarks reported per detected hand.
pub const LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;

// ════════════════════════════════════════════════════════════════════════════
// Finger: tip / base index pairs
// ════════════════════════════════════════════════════════════════════════════

/// The five digits, in the order used by [`FingerState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb, Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky,
    ];

    /// Landmark index of the fingertip.
    pub fn tip(self) -> usize {
        match self {
            Finger::Thumb  => 4,
            Finger::Index  => 8,
            Finger::Middle => 12,
            Finger::Ring   => 16,
            Finger::Pinky  => 20,
        }
    }

    /// Landmark index of the base knuckle the tip is compared against.
    /// For the thumb this is its MCP joint (2), not the CMC.
    pub fn base(self) -> usize {
        match self {
            Finger::Thumb  => 2,
            Finger::Index  => 5,
            Finger::Middle => 9,
            Finger::Ring   => 13,
            Finger::Pinky  => 17,
        }
    }

    /// Position of this finger inside a [`FingerState`].
    pub fn slot(self) -> usize {
        self as usize
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Landmark / HandLandmarks
// ════════════════════════════════════════════════════════════════════════════

/// A single normalized landmark. `z` is optional depth and is ignored by the
/// classifier.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Landmark { x, y, z: 0.0 }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LandmarkError {
    #[error("expected {LANDMARK_COUNT} landmarks, got {0}")]
    WrongCount(usize),
}

/// All 21 landmarks of one detected hand.
#[derive(Clone, Debug, PartialEq)]
pub struct HandLandmarks {
    points: [Landmark; LANDMARK_COUNT],
}

impl HandLandmarks {
    pub fn new(points: [Landmark; LANDMARK_COUNT]) -> Self {
        HandLandmarks { points }
    }

    /// Build from a slice as delivered by a landmark detector.
    pub fn from_slice(points: &[Landmark]) -> Result<Self, LandmarkError> {
        let points: [Landmark; LANDMARK_COUNT] = points
            .try_into()
            .map_err(|_| LandmarkError::WrongCount(points.len()))?;
        Ok(HandLandmarks { points })
    }

    pub fn point(&self, index: usize) -> Landmark {
        self.points[index]
    }

    pub fn wrist(&self) -> Landmark { self.points[WRIST] }
    pub fn tip(&self, finger: Finger) -> Landmark { self.points[finger.tip()] }
    pub fn base(&self, finger: Finger) -> Landmark { self.points[finger.base()] }

    pub fn points(&self) -> &[Landmark; LANDMARK_COUNT] {
        &self.points
    }

    /// Synthesize plausible geometry for an upright hand whose fingers are
    /// extended exactly as `state` says.
    ///
    /// The thumb sits on the left of the wrist and points left when
    /// extended, which satisfies both [`ThumbRule`](crate::ThumbRule)s with
    /// the default threshold. Used by sources that have no camera.
    pub fn synthesize(state: FingerState) -> Self {
        const WRIST_X:   f32 = 0.50;
        const WRIST_Y:   f32 = 0.90;
        const MCP_Y:     f32 = 0.60;
        const TIP_UP:    f32 = 0.35;
        const TIP_CURL:  f32 = 0.68;

        let mut points = [Landmark::default(); LANDMARK_COUNT];
        points[WRIST] = Landmark::new(WRIST_X, WRIST_Y);

        // Thumb: CMC, MCP, IP, TIP
        let thumb_tip_x = if state.is_extended(Finger::Thumb) { 0.30 } else { 0.46 };
        points[1] = Landmark::new(0.46, 0.82);
        points[2] = Landmark::new(0.42, 0.75);
        points[3] = Landmark::new((0.42 + thumb_tip_x) / 2.0, 0.72);
        points[4] = Landmark::new(thumb_tip_x, 0.70);

        for (offset, finger) in Finger::ALL[1..].iter().enumerate() {
            let x    = 0.45 + 0.05 * offset as f32;
            let tip_y = if state.is_extended(*finger) { TIP_UP } else { TIP_CURL };
            let base = finger.base();
            points[base]     = Landmark::new(x, MCP_Y);
            points[base + 1] = Landmark::new(x, MCP_Y + (tip_y - MCP_Y) / 3.0);
            points[base + 2] = Landmark::new(x, MCP_Y + 2.0 * (tip_y - MCP_Y) / 3.0);
            points[base + 3] = Landmark::new(x, tip_y);
        }

        HandLandmarks { points }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
