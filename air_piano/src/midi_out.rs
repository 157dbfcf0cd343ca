//! Live MIDI output: the synth-facing [`EventSink`].
//!
//! Gestures can sound the same note twice (D major's thumb and middle
//! chords share F# and A).  The sink counts note-ons per note number and
//! only sends a Note Off when the last holder lets go, so releasing one
//! chord never cuts a shared note out of another.

use air_chords::MidiMessage;
use air_engine::{EventSink, HeldNotes, SinkError};

use crate::config::MidiConfig;

// ════════════════════════════════════════════════════════════════════════════
// MidiOut — abstraction over midir / null (for testing)
// ════════════════════════════════════════════════════════════════════════════

pub trait MidiOut: Send {
    fn send(&mut self, message: MidiMessage) -> Result<(), SinkError>;
}

// ── midir backend ─────────────────────────────────────────────────────────

struct MidirOut {
    conn: midir::MidiOutputConnection,
}

impl MidiOut for MidirOut {
    fn send(&mut self, message: MidiMessage) -> Result<(), SinkError> {
        self.conn
            .send(&message.to_bytes())
            .map_err(|e| SinkError::Send(e.to_string()))
    }
}

// ── null backend (used when no MIDI port is available) ────────────────────

pub struct NullOut;

impl MidiOut for NullOut {
    fn send(&mut self, _message: MidiMessage) -> Result<(), SinkError> { Ok(()) }
}

// ════════════════════════════════════════════════════════════════════════════
// open_midi_output — enumerate ports and pick one
// ════════════════════════════════════════════════════════════════════════════

/// Names of the available output ports.
pub fn list_ports(client_name: &str) -> Result<Vec<String>, midir::InitError> {
    let midi_out = midir::MidiOutput::new(client_name)?;
    Ok(midi_out
        .ports()
        .iter()
        .filter_map(|p| midi_out.port_name(p).ok())
        .collect())
}

/// Index of the port to use: the configured name if it matches, else a
/// software synth if one is visible, else the first port.
pub fn choose_port(names: &[String], wanted: Option<&str>) -> Option<usize> {
    if names.is_empty() {
        return None;
    }
    if let Some(wanted) = wanted {
        let wanted = wanted.to_lowercase();
        match names.iter().position(|n| n.to_lowercase().contains(&wanted)) {
            Some(i) => return Some(i),
            None => log::warn!(target: "midi", "no output port matches '{}'", wanted),
        }
    }
    let synth = names.iter().position(|n| {
        let n = n.to_lowercase();
        ["fluid", "timidity", "microsoft", "gs", "synth", "loopmidi"]
            .iter()
            .any(|hint| n.contains(hint))
    });
    Some(synth.unwrap_or(0))
}

/// Open the configured output, falling back to [`NullOut`] with a warning
/// when there is nothing to connect to.
pub fn open_midi_output(config: &MidiConfig) -> (Box<dyn MidiOut>, String) {
    let midi_out = match midir::MidiOutput::new(&config.client_name) {
        Ok(m) => m,
        Err(e) => {
            log::warn!(target: "midi", "MIDI init error: {}; using null output", e);
            return (Box::new(NullOut), "null".to_string());
        }
    };

    let ports = midi_out.ports();
    let names: Vec<String> = ports
        .iter()
        .map(|p| midi_out.port_name(p).unwrap_or_else(|_| "Unknown".to_string()))
        .collect();

    let Some(index) = choose_port(&names, config.port.as_deref()) else {
        log::warn!(target: "midi", "no MIDI output ports found; using null output");
        log::warn!(target: "midi", "start a synthesiser such as `fluidsynth` or `timidity -iA`");
        return (Box::new(NullOut), "null".to_string());
    };

    let name = names[index].clone();
    log::info!(target: "midi", "opening MIDI port: {}", name);
    match midi_out.connect(&ports[index], "air-piano-out") {
        Ok(conn) => (Box::new(MidirOut { conn }), name),
        Err(e) => {
            log::warn!(target: "midi", "failed to connect to {}: {}; using null output", name, e);
            (Box::new(NullOut), "null".to_string())
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MidiSink
// ════════════════════════════════════════════════════════════════════════════

pub struct MidiSink {
    out:     Box<dyn MidiOut>,
    name:    String,
    channel: u8,
    /// Outstanding note-ons per note number.
    holders: HeldNotes,
}

impl MidiSink {
    pub fn new(out: Box<dyn MidiOut>, name: &str, channel: u8) -> Self {
        MidiSink { out, name: name.to_string(), channel: channel & 0x0F, holders: HeldNotes::default() }
    }

    pub fn open(config: &MidiConfig) -> Self {
        let (out, port) = open_midi_output(config);
        MidiSink::new(out, &format!("midi:{}", port), config.channel)
    }
}

impl EventSink for MidiSink {
    fn name(&self) -> &str { &self.name }

    fn note_on(&mut self, notes: &[u8], velocity: u8) -> Result<(), SinkError> {
        let channel = self.channel;
        for &note in notes {
            self.holders.hold(note);
            self.out.send(MidiMessage::NoteOn { channel, note, velocity })?;
        }
        Ok(())
    }

    fn note_off(&mut self, notes: &[u8]) -> Result<(), SinkError> {
        let channel = self.channel;
        for &note in notes {
            if self.holders.release(note) {
                self.out.send(MidiMessage::NoteOff { channel, note })?;
            }
        }
        Ok(())
    }

    fn pitch_bend(&mut self, value: i16) -> Result<(), SinkError> {
        self.out.send(MidiMessage::PitchBend { channel: self.channel, value })
    }

    fn program_change(&mut self, program: u8) -> Result<(), SinkError> {
        self.out.send(MidiMessage::ProgramChange { channel: self.channel, program })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
