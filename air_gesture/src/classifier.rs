//! Thresholding of hand geometry into a per-frame gesture vector.
//!
//! Digits use a hysteresis pair: a digit turns raised above
//! `raise_threshold` and only turns lowered again below `lower_threshold`.
//! Pinch works the same way inverted: it engages below `pinch_threshold`
//! and releases above `pinch_release`.
//!
//! Pinch and thumb are classified independently.  Both may be active in the
//! same frame; deciding which one sounds is the note state machine's job.

use serde::{Deserialize, Serialize};

use crate::frame::{Digit, GestureFrame, GestureKey};
use crate::geometry::HandGeometry;

// ════════════════════════════════════════════════════════════════════════════
// ClassifierConfig
// ════════════════════════════════════════════════════════════════════════════

/// Gesture thresholds, in the landmark feed's coordinate units (pixels for
/// a camera feed).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub raise_threshold: f32,
    pub lower_threshold: f32,
    pub pinch_threshold: f32,
    pub pinch_release:   f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            raise_threshold: 70.0,
            lower_threshold: 55.0,
            pinch_threshold: 30.0,
            pinch_release:   40.0,
        }
    }
}

impl ClassifierConfig {
    /// Repair an inverted pair by collapsing it (no hysteresis band) rather
    /// than producing a digit that can never settle.
    pub fn normalized(mut self) -> Self {
        if self.lower_threshold > self.raise_threshold {
            log::warn!(
                target: "gesture",
                "lower threshold {} above raise threshold {}; using {} for both",
                self.lower_threshold, self.raise_threshold, self.raise_threshold
            );
            self.lower_threshold = self.raise_threshold;
        }
        if self.pinch_release < self.pinch_threshold {
            log::warn!(
                target: "gesture",
                "pinch release {} below pinch threshold {}; using {} for both",
                self.pinch_release, self.pinch_threshold, self.pinch_threshold
            );
            self.pinch_release = self.pinch_threshold;
        }
        self
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureClassifier
// ════════════════════════════════════════════════════════════════════════════

/// Stateful classifier; the only memory is the last flag per channel, which
/// the hysteresis band needs.
#[derive(Clone, Debug)]
pub struct GestureClassifier {
    config:   ClassifierConfig,
    raised:   [bool; 5],
    pinching: bool,
}

impl GestureClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        GestureClassifier {
            config:   config.normalized(),
            raised:   [false; 5],
            pinching: false,
        }
    }

    pub fn config(&self) -> &ClassifierConfig { &self.config }

    /// New thresholds apply from the next classified frame.
    pub fn set_config(&mut self, config: ClassifierConfig) {
        self.config = config.normalized();
    }

    /// Forget hysteresis memory.
    pub fn reset(&mut self) {
        self.raised = [false; 5];
        self.pinching = false;
    }

    pub fn classify(&mut self, geometry: Option<&HandGeometry>) -> GestureFrame {
        let Some(g) = geometry else {
            self.reset();
            return GestureFrame::absent();
        };

        let mut frame = GestureFrame {
            extension:      g.extension,
            pinch_distance: g.pinch_distance,
            centroid_x:     g.centroid_x,
            hand_present:   true,
            ..GestureFrame::default()
        };

        for digit in Digit::ALL {
            let ext = g.extension_of(digit);
            let was = self.raised[digit.index()];
            let now = if was {
                ext >= self.config.lower_threshold
            } else {
                ext > self.config.raise_threshold
            };
            self.raised[digit.index()] = now;
            frame.set_active(GestureKey::from(digit), now);
        }

        self.pinching = if self.pinching {
            g.pinch_distance <= self.config.pinch_release
        } else {
            g.pinch_distance < self.config.pinch_threshold
        };
        frame.set_active(GestureKey::Pinch, self.pinching);

        frame
    }
}

impl Default for GestureClassifier {
    fn default() -> Self { GestureClassifier::new(ClassifierConfig::default()) }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
