//! Emitted events, the sink interface, and the bus that serialises
//! deliveries from the frame pump and the playback thread.
//!
//! | Route      | Outputs | Taps (recorder) |
//! |------------|---------|-----------------|
//! | `Live`     | yes     | yes             |
//! | `Playback` | yes     | no              |

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{EngineError, SinkError};

// ════════════════════════════════════════════════════════════════════════════
// NoteEvent
// ════════════════════════════════════════════════════════════════════════════

/// One abstract performance event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NoteEvent {
    NoteOn    { notes: Vec<u8>, velocity: u8 },
    NoteOff   { notes: Vec<u8> },
    /// Signed bend; `0` is neutral.
    PitchBend { value: i16 },
}

impl NoteEvent {
    pub fn is_note_on(&self) -> bool {
        matches!(self, NoteEvent::NoteOn { .. })
    }

    pub fn is_note_off(&self) -> bool {
        matches!(self, NoteEvent::NoteOff { .. })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// EventSink
// ════════════════════════════════════════════════════════════════════════════

/// A consumer of emitted events: a live output or the recorder.
///
/// Implementations must not block for long; the bus holds its lock for the
/// duration of each call.
pub trait EventSink: Send {
    fn name(&self) -> &str;

    fn note_on(&mut self, notes: &[u8], velocity: u8) -> Result<(), SinkError>;
    fn note_off(&mut self, notes: &[u8]) -> Result<(), SinkError>;
    fn pitch_bend(&mut self, value: i16) -> Result<(), SinkError>;

    /// Instrument change.  Only outputs that drive a synth care.
    fn program_change(&mut self, _program: u8) -> Result<(), SinkError> {
        Ok(())
    }

    /// Push out anything held back for later.  Called once on shutdown.
    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn deliver(&mut self, event: &NoteEvent) -> Result<(), SinkError> {
        match event {
            NoteEvent::NoteOn { notes, velocity } => self.note_on(notes, *velocity),
            NoteEvent::NoteOff { notes }          => self.note_off(notes),
            NoteEvent::PitchBend { value }        => self.pitch_bend(*value),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// EventBus
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Emitted by the note state machine: every sink.
    Live,
    /// Replayed from a recording: outputs only.
    Playback,
}

#[derive(Default)]
struct BusInner {
    outputs:  Vec<Box<dyn EventSink>>,
    taps:     Vec<Box<dyn EventSink>>,
    failures: u64,
}

/// Cloneable handle to the shared sink set.  All emissions go through one
/// lock so live and replayed events never interleave mid-event.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
}

impl EventBus {
    pub fn new() -> Self { EventBus::default() }

    /// Register a live output (synth port, test capture).
    pub fn add_output(&self, sink: Box<dyn EventSink>) {
        log::debug!(target: "engine", "output registered: {}", sink.name());
        self.inner.lock().outputs.push(sink);
    }

    /// Register a passive tap that only sees live events.
    pub fn add_tap(&self, sink: Box<dyn EventSink>) {
        log::debug!(target: "engine", "tap registered: {}", sink.name());
        self.inner.lock().taps.push(sink);
    }

    /// Deliver one event to every sink on `route`.
    ///
    /// A failing sink is logged and skipped; the others still receive the
    /// event.  The failures are returned for callers that want to surface
    /// them, but the frame pump ignores them.
    pub fn emit(&self, route: Route, event: &NoteEvent) -> Vec<EngineError> {
        let mut inner = self.inner.lock();
        let BusInner { outputs, taps, failures } = &mut *inner;

        let mut errors = Vec::new();
        let tapped: &mut [Box<dyn EventSink>] = match route {
            Route::Live     => taps.as_mut_slice(),
            Route::Playback => &mut [],
        };
        for sink in outputs.iter_mut().chain(tapped.iter_mut()) {
            if let Err(source) = sink.deliver(event) {
                log::warn!(target: "engine", "sink '{}' failed on {:?}: {}", sink.name(), event, source);
                *failures += 1;
                errors.push(EngineError::SinkDelivery { sink: sink.name().to_string(), source });
            }
        }
        errors
    }

    pub fn emit_all(&self, route: Route, events: &[NoteEvent]) -> Vec<EngineError> {
        events.iter().flat_map(|e| self.emit(route, e)).collect()
    }

    /// Program change to outputs; taps are not told.
    pub fn program_change(&self, program: u8) -> Vec<EngineError> {
        let mut inner = self.inner.lock();
        let BusInner { outputs, failures, .. } = &mut *inner;
        let mut errors = Vec::new();
        for sink in outputs.iter_mut() {
            if let Err(source) = sink.program_change(program) {
                log::warn!(target: "engine", "sink '{}' failed on program change: {}", sink.name(), source);
                *failures += 1;
                errors.push(EngineError::SinkDelivery { sink: sink.name().to_string(), source });
            }
        }
        errors
    }

    /// Ask every output to push out what it is holding back.
    pub fn flush(&self) -> Vec<EngineError> {
        let mut inner = self.inner.lock();
        let BusInner { outputs, failures, .. } = &mut *inner;
        let mut errors = Vec::new();
        for sink in outputs.iter_mut() {
            if let Err(source) = sink.flush() {
                log::warn!(target: "engine", "sink '{}' failed to flush: {}", sink.name(), source);
                *failures += 1;
                errors.push(EngineError::SinkDelivery { sink: sink.name().to_string(), source });
            }
        }
        errors
    }

    /// Total failed deliveries since the bus was created.
    pub fn failures(&self) -> u64 {
        self.inner.lock().failures
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CaptureSink, FailingSink};

    #[test]
    fn live_reaches_outputs_and_taps() {
        let bus = EventBus::new();
        let out = CaptureSink::new("out");
        let tap = CaptureSink::new("tap");
        bus.add_output(Box::new(out.clone()));
        bus.add_tap(Box::new(tap.clone()));

        let ev = NoteEvent::NoteOn { notes: vec![60, 64], velocity: 90 };
        assert!(bus.emit(Route::Live, &ev).is_empty());
        assert_eq!(out.events(), vec![ev.clone()]);
        assert_eq!(tap.events(), vec![ev]);
    }

    #[test]
    fn playback_skips_taps() {
        let bus = EventBus::new();
        let out = CaptureSink::new("out");
        let tap = CaptureSink::new("tap");
        bus.add_output(Box::new(out.clone()));
        bus.add_tap(Box::new(tap.clone()));

        bus.emit(Route::Playback, &NoteEvent::PitchBend { value: 12 });
        assert_eq!(out.events().len(), 1);
        assert!(tap.events().is_empty());
    }

    #[test]
    fn failing_sink_does_not_starve_others() {
        let bus = EventBus::new();
        let out = CaptureSink::new("out");
        bus.add_output(Box::new(FailingSink));
        bus.add_output(Box::new(out.clone()));

        let errors = bus.emit(Route::Live, &NoteEvent::NoteOff { notes: vec![62] });
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], EngineError::SinkDelivery { sink, .. } if sink == "failing"));
        assert_eq!(out.events().len(), 1);
        assert_eq!(bus.failures(), 1);
    }

    #[test]
    fn program_change_reaches_outputs_only() {
        let bus = EventBus::new();
        let out = CaptureSink::new("out");
        bus.add_output(Box::new(out.clone()));
        assert!(bus.program_change(40).is_empty());
        assert_eq!(out.programs(), vec![40]);
    }
}
