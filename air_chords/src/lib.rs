//! # air_chords
//!
//! The musical side of the air piano: which notes a gesture plays, how hard,
//! and how far the pitch wheel moves.
//!
//! * **ChordMap** — `(Scale, GestureKey)` → [`ChordDefinition`], validated
//!   total at startup and shared per scale as `Arc<ChordTable>`.
//! * **VelocityMapper** — finger extension → velocity 20–127, scaled by
//!   the global [`Volume`].
//! * **BendMapper** — hand displacement → signed bend within ±8191.
//! * **MidiMessage** / **SmfTrack** — live wire bytes and Type-0 MIDI files.
//!
//! ## Built-in chords (low register)
//!
//! | Gesture | D Major | C Major | Pentatonic |
//! |---|---|---|---|
//! | thumb  | D  (62 66 69) | C  (60 64 67) | C    (60 64 67) |
//! | index  | Em (64 67 71) | Dm (62 65 69) | Dsus (62 67 69) |
//! | middle | F#m (66 69 73)| Em (64 67 71) | Em   (64 69 72) |
//! | ring   | G  (67 71 74) | F  (65 69 72) | G    (67 72 74) |
//! | pinky  | A  (69 73 76) | G  (67 71 74) | Am   (69 74 77) |
//! | pinch  | C  (84 88 91) | C  (84 88 91) | C    (84 88 91) |
//!
//! The high register moves the five digit chords up an octave.

pub mod chord_map;
pub mod error;
pub mod instrument;
pub mod mapping;
pub mod scale;
pub mod smf;
pub mod theory;
pub mod wire;

pub use chord_map::{ChordDefinition, ChordMap, ChordTable, PINCH_CHORD};
pub use error::ChordMapError;
pub use instrument::Instrument;
pub use mapping::{BendMapper, VelocityMapper, Volume, MAX_BEND_RANGE, MAX_VELOCITY, MIN_VELOCITY};
pub use scale::{Register, Scale};
pub use smf::SmfTrack;
pub use theory::{chord_name, note_name};
pub use wire::MidiMessage;
