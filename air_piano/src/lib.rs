//! # air_piano
//!
//! Plays chords on a MIDI synthesiser from a stream of hand landmarks,
//! records performances and plays them back.
//!
//! ## Gesture → sound
//!
//! | Gesture | Sound |
//! |---|---|
//! | Raise a finger | That finger's chord in the current scale; velocity from how far it is raised |
//! | Pinch thumb and index | High C chord; moving the hand sideways bends the pitch |
//! | Lower / release | Chord off (bend recentres on pinch release) |
//!
//! ## Inputs
//!
//! * `--frames <file>` — a JSON-lines landmark feed, paced at the configured
//!   frame rate.
//! * `--frames -` — the same feed on stdin, paced by its producer.
//! * `--simulate` (default) — a built-in scripted hand.
//!
//! Typed commands (`r`, `p`, `s`, `+`/`-`, `1`–`9`, `q`) are read from stdin
//! whenever it is not carrying the feed.  See [`commands`].

pub mod app;
pub mod commands;
pub mod config;
pub mod midi_out;
pub mod source;
