use thiserror::Error;

/// A landmark set that cannot be measured.  The frame pump recovers from
/// every variant by treating the frame as "no hand present".
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error("expected {expected} landmarks, found {found}")]
    LandmarkCount { expected: usize, found: usize },

    #[error("landmark {index} has a non-finite coordinate")]
    NonFinite { index: usize },

    #[error("landmark {index} has {len} coordinates, expected 2 or 3")]
    Coordinates { index: usize, len: usize },
}
