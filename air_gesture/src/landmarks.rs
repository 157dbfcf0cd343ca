//! Hand landmark input model.
//!
//! The pose collaborator delivers, once per frame, zero or more hands, each a
//! list of 21 landmark coordinates in MediaPipe order.  This module validates
//! that raw data into [`HandLandmarks`] and picks the single hand the rest of
//! the pipeline tracks.

use serde::{Deserialize, Serialize};

use crate::error::FrameError;

/// Number of landmarks in one tracked hand.
pub const LANDMARK_COUNT: usize = 21;

// ════════════════════════════════════════════════════════════════════════════
// Landmark — named indices
// ════════════════════════════════════════════════════════════════════════════

/// Named hand landmarks, discriminant = index in the landmark list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Landmark {
    Wrist      = 0,
    ThumbCmc   = 1,
    ThumbMcp   = 2,
    ThumbIp    = 3,
    ThumbTip   = 4,
    IndexMcp   = 5,
    IndexPip   = 6,
    IndexDip   = 7,
    IndexTip   = 8,
    MiddleMcp  = 9,
    MiddlePip  = 10,
    MiddleDip  = 11,
    MiddleTip  = 12,
    RingMcp    = 13,
    RingPip    = 14,
    RingDip    = 15,
    RingTip    = 16,
    PinkyMcp   = 17,
    PinkyPip   = 18,
    PinkyDip   = 19,
    PinkyTip   = 20,
}

impl Landmark {
    pub fn index(self) -> usize { self as usize }
}

// ════════════════════════════════════════════════════════════════════════════
// Point
// ════════════════════════════════════════════════════════════════════════════

/// A landmark position.  `z` is zero for 2D feeds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Point { x, y, z: 0.0 }
    }

    /// Planar (x, y) distance; depth is ignored like the camera image is.
    pub fn distance_2d(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HandSide / HandLandmarks
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandSide {
    Left,
    #[default]
    Right,
}

/// A validated set of 21 finite landmark positions for one hand.
#[derive(Clone, Debug, PartialEq)]
pub struct HandLandmarks {
    side:   HandSide,
    points: [Point; LANDMARK_COUNT],
}

impl HandLandmarks {
    /// Validate a raw point list.  The wrong count or any NaN/infinite
    /// coordinate is an [`FrameError`].
    pub fn from_points(side: HandSide, points: Vec<Point>) -> Result<Self, FrameError> {
        let found = points.len();
        let points: [Point; LANDMARK_COUNT] = points
            .try_into()
            .map_err(|_| FrameError::LandmarkCount { expected: LANDMARK_COUNT, found })?;

        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(FrameError::NonFinite { index });
        }

        Ok(HandLandmarks { side, points })
    }

    pub fn side(&self) -> HandSide { self.side }

    pub fn get(&self, landmark: Landmark) -> Point {
        self.points[landmark.index()]
    }

    pub fn points(&self) -> &[Point; LANDMARK_COUNT] { &self.points }
}

// ════════════════════════════════════════════════════════════════════════════
// PoseFrame — what the pose collaborator delivers
// ════════════════════════════════════════════════════════════════════════════

/// One hand as delivered on the wire: a side and `[x, y]` or `[x, y, z]`
/// coordinate lists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawHand {
    #[serde(default)]
    pub side:      HandSide,
    pub landmarks: Vec<Vec<f32>>,
}

impl RawHand {
    pub fn validate(&self) -> Result<HandLandmarks, FrameError> {
        let points = self
            .landmarks
            .iter()
            .enumerate()
            .map(|(index, coords)| match coords.as_slice() {
                [x, y]    => Ok(Point::new(*x, *y)),
                [x, y, z] => Ok(Point { x: *x, y: *y, z: *z }),
                _ => Err(FrameError::Coordinates { index, len: coords.len() }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        HandLandmarks::from_points(self.side, points)
    }
}

/// All hands seen in one capture frame.  An empty `hands` list is the
/// explicit "no hand present" frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    #[serde(default)]
    pub hands: Vec<RawHand>,
}

impl PoseFrame {
    pub fn empty() -> Self { PoseFrame::default() }

    pub fn single(hand: &HandLandmarks) -> Self {
        let landmarks = hand
            .points()
            .iter()
            .map(|p| vec![p.x, p.y, p.z])
            .collect();
        PoseFrame { hands: vec![RawHand { side: hand.side(), landmarks }] }
    }

    /// The hand to track this frame: the preferred side when present,
    /// otherwise the first hand.
    pub fn select(&self, preferred: HandSide) -> Option<&RawHand> {
        self.hands
            .iter()
            .find(|h| h.side == preferred)
            .or_else(|| self.hands.first())
    }

    /// [`select`](Self::select) and validate.  `Ok(None)` is a frame with
    /// no hand; a malformed hand is an error the caller recovers from.
    pub fn tracked_hand(&self, preferred: HandSide) -> Result<Option<HandLandmarks>, FrameError> {
        self.select(preferred).map(RawHand::validate).transpose()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
