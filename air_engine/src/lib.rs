//! # air_engine
//!
//! The real-time core of the air piano: edge-triggered note events from
//! gesture frames, and faithful record/replay of what was played.
//!
//! ```text
//!  GestureFrame ──► NoteStateMachine ──► EventBus ──┬──► outputs (synth, capture)
//!                                          ▲         └──► Recorder (live only)
//!                                          │
//!                               Player thread (replay, outputs only)
//! ```
//!
//! [`Performance`] ties these together behind a single command dispatch.
//! The bus lock serialises the frame pump and the playback thread, so a
//! replayed event never lands in the middle of a live one.
//!
//! Sustain and echo live on the output side: [`EffectsSink`] wraps an
//! output and delays its note-offs or adds repeats, so the state machine
//! and the recorder only ever see plain key presses.
//!
//! ## Guarantees
//!
//! * At most one sounding chord per gesture; note-ons minus note-offs per
//!   gesture is 0 or 1 after every frame.
//! * Velocity is fixed when a chord is triggered.
//! * A scale change only affects chords triggered afterwards.
//! * Shutdown, cancelled playback and stopped recordings leave nothing
//!   sounding and the bend centred.

pub mod effects;
pub mod error;
pub mod events;
pub mod ledger;
pub mod performance;
pub mod player;
pub mod recorder;
pub mod state_machine;
pub mod testing;

pub use effects::{EffectSettings, Effects, EffectsSink};
pub use error::{EngineError, SinkError};
pub use events::{EventBus, EventSink, NoteEvent, Route};
pub use ledger::HeldNotes;
pub use performance::{Command, EngineConfig, FrameReport, Outcome, Performance};
pub use player::{PlaybackReport, Player};
pub use recorder::{RecordedEvent, Recorder, RecorderTap, Recording, RecordingSession};
pub use state_machine::{ActiveNote, NoteStateMachine, ThumbPolicy};
