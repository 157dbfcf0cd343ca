//! # air_gesture
//!
//! Turns a hand's landmark positions into a per-frame gesture vector.
//!
//! ```text
//! PoseFrame ──tracked_hand()──► HandLandmarks ──HandGeometry::of──► HandGeometry
//!                                                                   │
//!                          GestureFrame ◄──GestureClassifier::classify
//! ```
//!
//! | Channel | Active when |
//! |---|---|
//! | thumb … pinky | tip-to-base distance above the raise threshold (hysteresis on release) |
//! | pinch | thumb tip to index tip below the pinch threshold |
//!
//! A frame without a hand, or with a malformed one, classifies as all
//! inactive with zeroed measurements.

pub mod classifier;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod landmarks;

pub use classifier::{ClassifierConfig, GestureClassifier};
pub use error::FrameError;
pub use frame::{Digit, GestureFrame, GestureKey};
pub use geometry::HandGeometry;
pub use landmarks::{HandLandmarks, HandSide, Landmark, Point, PoseFrame, RawHand, LANDMARK_COUNT};
