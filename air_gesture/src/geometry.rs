//! Scalar measurements derived from one frame's landmarks.
//!
//! Stateless: every call looks at a single [`HandLandmarks`].  An absent hand
//! yields `None`, which downstream code turns into an all-inactive frame.

use crate::frame::Digit;
use crate::landmarks::{HandLandmarks, Landmark};

/// Geometry of one tracked hand in one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandGeometry {
    /// Tip-to-base distance per digit, indexed by [`Digit::index`].
    pub extension:      [f32; 5],
    /// Thumb tip to index tip.
    pub pinch_distance: f32,
    /// Mean x over all landmarks.
    pub centroid_x:     f32,
}

impl HandGeometry {
    pub fn measure(hand: Option<&HandLandmarks>) -> Option<HandGeometry> {
        hand.map(Self::of)
    }

    pub fn of(hand: &HandLandmarks) -> HandGeometry {
        let extension = Digit::ALL.map(|d| {
            let (tip, base) = d.landmarks();
            hand.get(tip).distance_2d(&hand.get(base))
        });

        let pinch_distance = hand
            .get(Landmark::ThumbTip)
            .distance_2d(&hand.get(Landmark::IndexTip));

        let points = hand.points();
        let centroid_x = points.iter().map(|p| p.x).sum::<f32>() / points.len() as f32;

        HandGeometry { extension, pinch_distance, centroid_x }
    }

    pub fn extension_of(&self, digit: Digit) -> f32 {
        self.extension[digit.index()]
    }
}
