//! Passive capture of live events with offsets from the recording start.
//!
//! The recorder sits on the event bus as a tap, so it sees exactly what the
//! outputs saw, in the same order, and never sees replayed events.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use air_chords::{MidiMessage, SmfTrack};

use crate::error::SinkError;
use crate::events::{EventSink, NoteEvent};
use crate::ledger::HeldNotes;

// ════════════════════════════════════════════════════════════════════════════
// RecordedEvent / Recording
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedEvent {
    /// Time since the recording started.
    pub offset: Duration,
    pub event:  NoteEvent,
}

/// A finished, immutable take.  Clones share the event list.
#[derive(Clone, Debug, PartialEq)]
pub struct Recording {
    events: Arc<[RecordedEvent]>,
}

impl Recording {
    pub fn new(events: Vec<RecordedEvent>) -> Self {
        Recording { events: events.into() }
    }

    pub fn events(&self) -> &[RecordedEvent] { &self.events }
    pub fn len(&self) -> usize               { self.events.len() }
    pub fn is_empty(&self) -> bool           { self.events.is_empty() }

    /// Offset of the last event.
    pub fn duration(&self) -> Duration {
        self.events.last().map(|e| e.offset).unwrap_or_default()
    }

    /// Convert to a single-track MIDI file on `channel`, with an optional
    /// program change at the start.  Shared pitches are counted the way a
    /// live output counts them: a note-off is written only when the last
    /// chord holding that pitch lets go.
    pub fn to_smf(&self, name: &str, channel: u8, program: Option<u8>) -> SmfTrack {
        let mut track = SmfTrack::new(name);
        track.program = program.map(|p| (channel, p));
        let mut held = HeldNotes::default();
        for rec in self.events.iter() {
            match &rec.event {
                NoteEvent::NoteOn { notes, velocity } => {
                    for &note in notes {
                        held.hold(note);
                        track.push(rec.offset, MidiMessage::NoteOn { channel, note, velocity: *velocity });
                    }
                }
                NoteEvent::NoteOff { notes } => {
                    for &note in notes {
                        if held.release(note) {
                            track.push(rec.offset, MidiMessage::NoteOff { channel, note });
                        }
                    }
                }
                NoteEvent::PitchBend { value } => {
                    track.push(rec.offset, MidiMessage::PitchBend { channel, value: *value });
                }
            }
        }
        track
    }
}

// ════════════════════════════════════════════════════════════════════════════
// RecordingSession
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub enum RecordingSession {
    #[default]
    Idle,
    Recording { started: Instant, buffer: Vec<RecordedEvent> },
}

#[derive(Default)]
struct RecorderState {
    session: RecordingSession,
    /// What the take has left sounding so far.
    held:      HeldNotes,
    /// Notes already sounding when the take started.
    inherited: HeldNotes,
    last:      Option<Recording>,
}

// ════════════════════════════════════════════════════════════════════════════
// Recorder
// ════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
pub struct Recorder {
    state: Mutex<RecorderState>,
}

impl Recorder {
    pub fn new() -> Self { Recorder::default() }

    /// Bus-side handle feeding this recorder.
    pub fn tap(self: &Arc<Self>) -> RecorderTap {
        RecorderTap { recorder: Arc::clone(self) }
    }

    /// Begin a take, discarding any unfinished one.  `sounding` lists the
    /// chords already held: their note-offs are left out of the take, so it
    /// never releases what it did not start.
    pub fn start<'a>(&self, now: Instant, sounding: impl IntoIterator<Item = &'a [u8]>) {
        let mut st = self.state.lock();
        if matches!(st.session, RecordingSession::Recording { .. }) {
            log::info!(target: "recorder", "restarting recording; unfinished take discarded");
        }
        st.session = RecordingSession::Recording { started: now, buffer: Vec::new() };
        st.held = HeldNotes::default();
        st.inherited = HeldNotes::default();
        for notes in sounding {
            for &n in notes {
                st.inherited.hold(n);
            }
        }
    }

    /// End the take and keep it as the last recording.  Notes still held
    /// are closed at the stop offset so the take is balanced.
    pub fn stop(&self, now: Instant) -> Option<Recording> {
        let mut st = self.state.lock();
        let RecordingSession::Recording { started, mut buffer } = std::mem::take(&mut st.session) else {
            return None;
        };

        let offset = now.saturating_duration_since(started);
        buffer.extend(st.held.close().into_iter().map(|event| RecordedEvent { offset, event }));

        let recording = Recording::new(buffer);
        log::info!(
            target: "recorder",
            "recorded {} events over {:.2}s",
            recording.len(),
            recording.duration().as_secs_f32()
        );
        st.last = Some(recording.clone());
        Some(recording)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state.lock().session, RecordingSession::Recording { .. })
    }

    pub fn last(&self) -> Option<Recording> {
        self.state.lock().last.clone()
    }

    /// Append `event` if a take is running; otherwise ignore it.
    pub fn capture(&self, event: &NoteEvent, now: Instant) {
        let mut st = self.state.lock();
        let RecorderState { session, held, inherited, .. } = &mut *st;
        let RecordingSession::Recording { started, buffer } = session else { return };

        let event = match event {
            NoteEvent::NoteOff { notes } => {
                let mut own = Vec::with_capacity(notes.len());
                for &n in notes {
                    if inherited.holds(n) {
                        inherited.release(n);
                    } else {
                        own.push(n);
                    }
                }
                if own.is_empty() {
                    log::debug!(target: "recorder", "skipping release of {:?} held before the take", notes);
                    return;
                }
                NoteEvent::NoteOff { notes: own }
            }
            other => other.clone(),
        };

        held.track(&event);
        buffer.push(RecordedEvent { offset: now.saturating_duration_since(*started), event });
    }
}

// ── bus adapter ───────────────────────────────────────────────────────────

/// The recorder as an [`EventSink`].  Never fails.
pub struct RecorderTap {
    recorder: Arc<Recorder>,
}

impl EventSink for RecorderTap {
    fn name(&self) -> &str { "recorder" }

    fn note_on(&mut self, notes: &[u8], velocity: u8) -> Result<(), SinkError> {
        self.deliver(&NoteEvent::NoteOn { notes: notes.to_vec(), velocity })
    }

    fn note_off(&mut self, notes: &[u8]) -> Result<(), SinkError> {
        self.deliver(&NoteEvent::NoteOff { notes: notes.to_vec() })
    }

    fn pitch_bend(&mut self, value: i16) -> Result<(), SinkError> {
        self.deliver(&NoteEvent::PitchBend { value })
    }

    fn deliver(&mut self, event: &NoteEvent) -> Result<(), SinkError> {
        self.recorder.capture(event, Instant::now());
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    const NONE_HELD: [&[u8]; 0] = [];

    fn on(notes: &[u8]) -> NoteEvent  { NoteEvent::NoteOn { notes: notes.to_vec(), velocity: 100 } }
    fn off(notes: &[u8]) -> NoteEvent { NoteEvent::NoteOff { notes: notes.to_vec() } }

    #[test]
    fn offsets_are_relative_to_start() {
        let rec = Recorder::new();
        let t0 = Instant::now();
        rec.start(t0, NONE_HELD);
        rec.capture(&on(&[60]), t0 + Duration::from_millis(250));
        rec.capture(&off(&[60]), t0 + Duration::from_millis(900));
        let take = rec.stop(t0 + Duration::from_secs(1)).unwrap();

        let offsets: Vec<u64> = take.events().iter().map(|e| e.offset.as_millis() as u64).collect();
        assert_eq!(offsets, vec![250, 900]);
        assert_eq!(rec.last(), Some(take));
    }

    #[test]
    fn idle_recorder_ignores_events() {
        let rec = Recorder::new();
        rec.capture(&on(&[60]), Instant::now());
        assert!(rec.stop(Instant::now()).is_none());
        assert!(rec.last().is_none());
    }

    #[test]
    fn stop_closes_held_notes_and_bend() {
        let rec = Recorder::new();
        let t0 = Instant::now();
        rec.start(t0, NONE_HELD);
        rec.capture(&on(&[62, 66, 69]), t0);
        rec.capture(&on(&[84, 88, 91]), t0);
        rec.capture(&NoteEvent::PitchBend { value: 300 }, t0);
        rec.capture(&off(&[84, 88, 91]), t0);
        let take = rec.stop(t0 + Duration::from_millis(40)).unwrap();

        let tail: Vec<&NoteEvent> = take.events().iter().rev().take(2).map(|e| &e.event).collect();
        assert_eq!(tail, vec![&NoteEvent::PitchBend { value: 0 }, &off(&[62, 66, 69])]);
        assert_eq!(take.duration(), Duration::from_millis(40));
    }

    #[test]
    fn chord_held_across_start_is_not_released_in_the_take() {
        let rec = Recorder::new();
        let t0 = Instant::now();
        rec.start(t0, [&[62u8, 66, 69][..]]);
        rec.capture(&on(&[66, 69, 73]), t0);
        rec.capture(&off(&[62, 66, 69]), t0 + Duration::from_millis(10));
        rec.capture(&off(&[66, 69, 73]), t0 + Duration::from_millis(20));
        let take = rec.stop(t0 + Duration::from_millis(30)).unwrap();

        let events: Vec<NoteEvent> = take.events().iter().map(|e| e.event.clone()).collect();
        assert_eq!(events, vec![on(&[66, 69, 73]), off(&[66, 69, 73])]);
    }

    #[test]
    fn chord_retriggered_after_start_is_recorded_whole() {
        let rec = Recorder::new();
        let t0 = Instant::now();
        rec.start(t0, [&[62u8, 66, 69][..]]);
        rec.capture(&off(&[62, 66, 69]), t0);
        rec.capture(&on(&[62, 66, 69]), t0);
        let take = rec.stop(t0 + Duration::from_millis(5)).unwrap();

        let events: Vec<NoteEvent> = take.events().iter().map(|e| e.event.clone()).collect();
        assert_eq!(events, vec![on(&[62, 66, 69]), off(&[62, 66, 69])]);
    }

    #[test]
    fn restart_discards_unfinished_take() {
        let rec = Recorder::new();
        let t0 = Instant::now();
        rec.start(t0, NONE_HELD);
        rec.capture(&on(&[60]), t0);
        rec.start(t0, NONE_HELD);
        assert!(rec.is_recording());
        let take = rec.stop(t0).unwrap();
        assert!(take.is_empty());
    }

    #[test]
    fn new_take_replaces_last() {
        let rec = Recorder::new();
        let t0 = Instant::now();
        rec.start(t0, NONE_HELD);
        rec.capture(&on(&[60]), t0);
        rec.capture(&off(&[60]), t0);
        rec.stop(t0);
        rec.start(t0, NONE_HELD);
        rec.stop(t0);
        assert!(rec.last().unwrap().is_empty());
    }

    #[test]
    fn smf_export_expands_chords() {
        let take = Recording::new(vec![
            RecordedEvent { offset: Duration::ZERO, event: on(&[60, 64, 67]) },
            RecordedEvent { offset: Duration::from_millis(500), event: off(&[60, 64, 67]) },
        ]);
        let track = take.to_smf("take", 0, Some(4));
        assert_eq!(track.events.len(), 6);
        assert_eq!(track.program, Some((0, 4)));
        assert_eq!(track.ticks_for(track.events[5].0), 480);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take.mid");
        track.write_file(&path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"MThd");
    }

    #[test]
    fn smf_export_keeps_shared_pitches_sounding() {
        let take = Recording::new(vec![
            RecordedEvent { offset: Duration::ZERO,               event: on(&[62, 66, 69]) },
            RecordedEvent { offset: Duration::from_millis(100),   event: on(&[66, 69, 73]) },
            RecordedEvent { offset: Duration::from_millis(200),   event: off(&[62, 66, 69]) },
            RecordedEvent { offset: Duration::from_millis(300),   event: off(&[66, 69, 73]) },
        ]);
        let track = take.to_smf("take", 0, None);
        let offs: Vec<(Duration, u8)> = track
            .events
            .iter()
            .filter_map(|(t, m)| match m {
                MidiMessage::NoteOff { note, .. } => Some((*t, *note)),
                _ => None,
            })
            .collect();
        assert_eq!(
            offs,
            vec![
                (Duration::from_millis(200), 62),
                (Duration::from_millis(300), 66),
                (Duration::from_millis(300), 69),
                (Duration::from_millis(300), 73),
            ]
        );
    }
}
