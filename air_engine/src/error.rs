use thiserror::Error;

use air_chords::ChordMapError;
use air_gesture::FrameError;

/// Everything the engine reports to its caller.
///
/// Only `Configuration` is fatal, and only at startup.  The others leave
/// engine state untouched: the caller shows them and carries on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("chord configuration: {0}")]
    Configuration(#[from] ChordMapError),

    #[error("invalid frame: {0}")]
    InvalidFrame(#[from] FrameError),

    #[error("playback rejected while recording")]
    PlaybackRejected,

    #[error("nothing recorded to play back")]
    EmptyPlayback,

    #[error("sink '{sink}' rejected an event: {source}")]
    SinkDelivery { sink: String, source: SinkError },
}

/// Failure reported by a single [`crate::EventSink`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("output disconnected")]
    Disconnected,

    #[error("send failed: {0}")]
    Send(String),
}
