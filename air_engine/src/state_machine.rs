//! Per-gesture edge detection: gesture frames in, note events out.
//!
//! Six independent `Off`/`On` machines, one per [`GestureKey`], plus the
//! shared pitch-bend state driven by the pinch.  Each frame is compared
//! against the previous frame's flags, which are kept here explicitly:
//!
//! | previous | current | action                                   |
//! |----------|---------|------------------------------------------|
//! | off      | on      | look up chord, fix velocity, note-on     |
//! | on       | off     | note-off for the stored chord            |
//! | on       | on      | nothing (velocity is not updated)        |
//! | off      | off     | nothing                                  |
//!
//! Within one frame all releases are emitted before any trigger, so a chord
//! that shares notes with the one it replaces is not cut short.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use air_chords::{BendMapper, ChordMap, ChordTable, Scale, VelocityMapper, Volume};
use air_gesture::{GestureFrame, GestureKey};

use crate::events::NoteEvent;

// ════════════════════════════════════════════════════════════════════════════
// ThumbPolicy
// ════════════════════════════════════════════════════════════════════════════

/// Who wins when pinch and thumb-raised are both reported in one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThumbPolicy {
    /// While pinching, the thumb machine is frozen in whatever state it
    /// had: it neither triggers nor releases until the pinch ends.
    #[default]
    PinchOwnsThumb,
    /// Thumb and pinch are independent channels.
    Independent,
}

// ════════════════════════════════════════════════════════════════════════════
// ActiveNote
// ════════════════════════════════════════════════════════════════════════════

/// A chord currently sounding for one gesture.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveNote {
    pub key:          GestureKey,
    pub notes:        Vec<u8>,
    pub velocity:     u8,
    pub triggered_at: Instant,
}

#[derive(Clone, Debug)]
enum Slot {
    Off,
    On(ActiveNote),
}

impl Slot {
    fn is_on(&self) -> bool { matches!(self, Slot::On(_)) }
}

// ════════════════════════════════════════════════════════════════════════════
// NoteStateMachine
// ════════════════════════════════════════════════════════════════════════════

pub struct NoteStateMachine {
    chords:      ChordMap,
    table:       Arc<ChordTable>,
    volume:      Volume,
    velocity:    VelocityMapper,
    bend:        BendMapper,
    policy:      ThumbPolicy,

    slots:       [Slot; GestureKey::COUNT],
    /// Effective flags of the last processed frame.
    previous:    GestureFrame,
    bend_anchor: Option<f32>,
    last_bend:   i16,
}

impl NoteStateMachine {
    pub fn new(chords: ChordMap, scale: Scale) -> Self {
        let table = chords.table(scale);
        NoteStateMachine {
            chords,
            table,
            volume:      Volume::default(),
            velocity:    VelocityMapper::default(),
            bend:        BendMapper::default(),
            policy:      ThumbPolicy::default(),
            slots:       std::array::from_fn(|_| Slot::Off),
            previous:    GestureFrame::absent(),
            bend_anchor: None,
            last_bend:   0,
        }
    }

    // ── settings (apply from the next frame) ──────────────────────────────

    /// Swap the active chord table.  Sounding chords keep their notes.
    pub fn set_scale(&mut self, scale: Scale) {
        self.table = self.chords.table(scale);
    }

    /// Replace the chord map (e.g. a register change), keeping the scale.
    pub fn set_chord_map(&mut self, chords: ChordMap) {
        let scale = self.scale();
        self.chords = chords;
        self.table = self.chords.table(scale);
    }

    pub fn set_volume(&mut self, volume: Volume)               { self.volume = volume; }
    pub fn set_velocity_mapper(&mut self, m: VelocityMapper)   { self.velocity = m; }
    pub fn set_bend_mapper(&mut self, m: BendMapper)           { self.bend = m; }
    pub fn set_thumb_policy(&mut self, policy: ThumbPolicy)    { self.policy = policy; }

    pub fn scale(&self) -> Scale          { self.table.scale() }
    pub fn volume(&self) -> Volume        { self.volume }
    pub fn thumb_policy(&self) -> ThumbPolicy { self.policy }

    /// Current applied bend.
    pub fn bend(&self) -> i16 { self.last_bend }

    pub fn active_note(&self, key: GestureKey) -> Option<&ActiveNote> {
        match &self.slots[key.index()] {
            Slot::On(note) => Some(note),
            Slot::Off      => None,
        }
    }

    pub fn active_notes(&self) -> impl Iterator<Item = &ActiveNote> + '_ {
        self.slots.iter().filter_map(|s| match s {
            Slot::On(note) => Some(note),
            Slot::Off      => None,
        })
    }

    pub fn is_silent(&self) -> bool {
        self.slots.iter().all(|s| !s.is_on()) && self.last_bend == 0
    }

    // ── per frame ─────────────────────────────────────────────────────────

    /// Advance by one frame and return the events to emit, in order.
    pub fn step(&mut self, frame: &GestureFrame, now: Instant) -> Vec<NoteEvent> {
        let mut events = Vec::new();

        if let Some(key) = self.inconsistent_key() {
            log::error!(target: "engine", "slot for {} disagrees with its flag; flushing", key);
            events.extend(self.flush());
        }

        let mut current = frame.active;
        if self.policy == ThumbPolicy::PinchOwnsThumb && frame.is_active(GestureKey::Pinch) {
            current[GestureKey::Thumb.index()] = self.previous.is_active(GestureKey::Thumb);
        }

        for key in GestureKey::ALL {
            if self.previous.is_active(key) && !current[key.index()] {
                self.release(key, &mut events);
            }
        }
        for key in GestureKey::ALL {
            if !self.previous.is_active(key) && current[key.index()] {
                self.trigger(key, frame, now, &mut events);
            }
        }
        if current[GestureKey::Pinch.index()] {
            self.track_bend(frame.centroid_x, &mut events);
        }

        self.previous = GestureFrame { active: current, ..*frame };
        events
    }

    /// Note-off every sounding chord, recentre the bend, and return every
    /// machine to `Off`.
    pub fn flush(&mut self) -> Vec<NoteEvent> {
        let mut events = Vec::new();
        for slot in self.slots.iter_mut() {
            if let Slot::On(note) = std::mem::replace(slot, Slot::Off) {
                log::debug!(target: "engine", "flush {}: {:?}", note.key, note.notes);
                events.push(NoteEvent::NoteOff { notes: note.notes });
            }
        }
        if self.last_bend != 0 || self.bend_anchor.is_some() {
            events.push(NoteEvent::PitchBend { value: 0 });
        }
        self.previous = GestureFrame::absent();
        self.bend_anchor = None;
        self.last_bend = 0;
        events
    }

    fn trigger(&mut self, key: GestureKey, frame: &GestureFrame, now: Instant, out: &mut Vec<NoteEvent>) {
        let notes = self.table.chord(key).notes().to_vec();
        let velocity = match key.digit() {
            Some(digit) => self.velocity.map(frame.extension_of(digit), self.volume),
            None        => self.velocity.pinch(self.volume),
        };
        if key == GestureKey::Pinch {
            self.bend_anchor = Some(frame.centroid_x);
            self.last_bend = 0;
        }

        log::debug!(target: "engine", "{} on: {:?} vel {}", key, notes, velocity);
        out.push(NoteEvent::NoteOn { notes: notes.clone(), velocity });
        self.slots[key.index()] = Slot::On(ActiveNote { key, notes, velocity, triggered_at: now });
    }

    fn release(&mut self, key: GestureKey, out: &mut Vec<NoteEvent>) {
        if let Slot::On(note) = std::mem::replace(&mut self.slots[key.index()], Slot::Off) {
            log::debug!(target: "engine", "{} off: {:?}", key, note.notes);
            out.push(NoteEvent::NoteOff { notes: note.notes });
        }
        if key == GestureKey::Pinch {
            self.bend_anchor = None;
            self.last_bend = 0;
            out.push(NoteEvent::PitchBend { value: 0 });
        }
    }

    fn track_bend(&mut self, centroid_x: f32, out: &mut Vec<NoteEvent>) {
        let Some(anchor) = self.bend_anchor else { return };
        let value = self.bend.map(centroid_x - anchor);
        if value != self.last_bend {
            self.last_bend = value;
            out.push(NoteEvent::PitchBend { value });
        }
    }

    fn inconsistent_key(&self) -> Option<GestureKey> {
        GestureKey::ALL
            .into_iter()
            .find(|k| self.slots[k.index()].is_on() != self.previous.is_active(*k))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
