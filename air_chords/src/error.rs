use thiserror::Error;

use air_gesture::GestureKey;

use crate::scale::Scale;

/// A chord table that cannot serve every (scale, gesture) lookup.  Raised
/// by startup validation; a validated [`crate::ChordMap`] never fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChordMapError {
    #[error("no chord defined for {key} in {scale}")]
    Missing { scale: Scale, key: GestureKey },

    #[error("chord for {key} in {scale} has no notes")]
    Empty { scale: Scale, key: GestureKey },

    #[error("chord for {key} in {scale} contains note {note}, above 127")]
    OutOfRange { scale: Scale, key: GestureKey, note: u8 },
}
