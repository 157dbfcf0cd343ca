//! Sinks for tests: capture everything, or fail everything.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::error::SinkError;
use crate::events::{EventSink, NoteEvent};

/// Records every delivery with its arrival time.  Clones share the log, so
/// keep one clone and hand the other to the bus.
#[derive(Clone)]
pub struct CaptureSink {
    name:     String,
    log:      Arc<Mutex<Vec<(Instant, NoteEvent)>>>,
    programs: Arc<Mutex<Vec<u8>>>,
}

impl CaptureSink {
    pub fn new(name: &str) -> Self {
        CaptureSink {
            name:     name.to_string(),
            log:      Arc::default(),
            programs: Arc::default(),
        }
    }

    pub fn events(&self) -> Vec<NoteEvent> {
        self.log.lock().iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn timed(&self) -> Vec<(Instant, NoteEvent)> {
        self.log.lock().clone()
    }

    pub fn programs(&self) -> Vec<u8> {
        self.programs.lock().clone()
    }

    pub fn clear(&self) {
        self.log.lock().clear();
    }

    /// Note-ons minus note-offs seen so far, counted per event.
    pub fn balance(&self) -> i64 {
        self.log.lock().iter().fold(0, |n, (_, e)| match e {
            NoteEvent::NoteOn { .. }  => n + 1,
            NoteEvent::NoteOff { .. } => n - 1,
            NoteEvent::PitchBend { .. } => n,
        })
    }

    fn push(&self, event: NoteEvent) {
        self.log.lock().push((Instant::now(), event));
    }
}

impl EventSink for CaptureSink {
    fn name(&self) -> &str { &self.name }

    fn note_on(&mut self, notes: &[u8], velocity: u8) -> Result<(), SinkError> {
        self.push(NoteEvent::NoteOn { notes: notes.to_vec(), velocity });
        Ok(())
    }

    fn note_off(&mut self, notes: &[u8]) -> Result<(), SinkError> {
        self.push(NoteEvent::NoteOff { notes: notes.to_vec() });
        Ok(())
    }

    fn pitch_bend(&mut self, value: i16) -> Result<(), SinkError> {
        self.push(NoteEvent::PitchBend { value });
        Ok(())
    }

    fn program_change(&mut self, program: u8) -> Result<(), SinkError> {
        self.programs.lock().push(program);
        Ok(())
    }
}

/// A sink whose every delivery fails.
pub struct FailingSink;

impl EventSink for FailingSink {
    fn name(&self) -> &str { "failing" }

    fn note_on(&mut self, _notes: &[u8], _velocity: u8) -> Result<(), SinkError> {
        Err(SinkError::Disconnected)
    }

    fn note_off(&mut self, _notes: &[u8]) -> Result<(), SinkError> {
        Err(SinkError::Disconnected)
    }

    fn pitch_bend(&mut self, _value: i16) -> Result<(), SinkError> {
        Err(SinkError::Disconnected)
    }

    fn program_change(&mut self, _program: u8) -> Result<(), SinkError> {
        Err(SinkError::Disconnected)
    }
}
