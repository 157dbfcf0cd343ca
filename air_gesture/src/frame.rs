//! Gesture identities and the per-frame classifier output.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::landmarks::Landmark;

// ════════════════════════════════════════════════════════════════════════════
// Digit
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Digit {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Digit {
    pub const ALL: [Digit; 5] = [Digit::Thumb, Digit::Index, Digit::Middle, Digit::Ring, Digit::Pinky];

    pub fn index(self) -> usize { self as usize }

    /// (tip, base joint) pair whose separation is the extension distance.
    pub fn landmarks(self) -> (Landmark, Landmark) {
        match self {
            Digit::Thumb  => (Landmark::ThumbTip,  Landmark::ThumbMcp),
            Digit::Index  => (Landmark::IndexTip,  Landmark::IndexMcp),
            Digit::Middle => (Landmark::MiddleTip, Landmark::MiddleMcp),
            Digit::Ring   => (Landmark::RingTip,   Landmark::RingMcp),
            Digit::Pinky  => (Landmark::PinkyTip,  Landmark::PinkyMcp),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureKey
// ════════════════════════════════════════════════════════════════════════════

/// One of the six triggerable gesture channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureKey {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
    Pinch,
}

impl GestureKey {
    pub const COUNT: usize = 6;

    pub const ALL: [GestureKey; GestureKey::COUNT] = [
        GestureKey::Thumb,
        GestureKey::Index,
        GestureKey::Middle,
        GestureKey::Ring,
        GestureKey::Pinky,
        GestureKey::Pinch,
    ];

    pub fn index(self) -> usize { self as usize }

    pub fn digit(self) -> Option<Digit> {
        match self {
            GestureKey::Thumb  => Some(Digit::Thumb),
            GestureKey::Index  => Some(Digit::Index),
            GestureKey::Middle => Some(Digit::Middle),
            GestureKey::Ring   => Some(Digit::Ring),
            GestureKey::Pinky  => Some(Digit::Pinky),
            GestureKey::Pinch  => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GestureKey::Thumb  => "thumb",
            GestureKey::Index  => "index",
            GestureKey::Middle => "middle",
            GestureKey::Ring   => "ring",
            GestureKey::Pinky  => "pinky",
            GestureKey::Pinch  => "pinch",
        }
    }
}

impl From<Digit> for GestureKey {
    fn from(d: Digit) -> Self {
        GestureKey::ALL[d.index()]
    }
}

impl fmt::Display for GestureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureFrame
// ════════════════════════════════════════════════════════════════════════════

/// Classifier output for one input frame.
///
/// `active` is indexed by [`GestureKey::index`].  Measurements are zero when
/// no hand was present.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GestureFrame {
    pub active:         [bool; GestureKey::COUNT],
    /// Extension distance per digit, indexed by [`Digit::index`].
    pub extension:      [f32; 5],
    pub pinch_distance: f32,
    pub centroid_x:     f32,
    pub hand_present:   bool,
}

impl GestureFrame {
    /// The all-inactive frame produced when no hand is tracked.
    pub fn absent() -> Self { GestureFrame::default() }

    pub fn is_active(&self, key: GestureKey) -> bool {
        self.active[key.index()]
    }

    pub fn set_active(&mut self, key: GestureKey, on: bool) {
        self.active[key.index()] = on;
    }

    pub fn extension_of(&self, digit: Digit) -> f32 {
        self.extension[digit.index()]
    }

    pub fn active_keys(&self) -> impl Iterator<Item = GestureKey> + '_ {
        GestureKey::ALL.into_iter().filter(move |k| self.is_active(*k))
    }
}
