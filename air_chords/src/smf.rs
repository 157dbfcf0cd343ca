//! Standard MIDI File (Type 0) writer for timed message sequences.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use crate::wire::MidiMessage;

pub const DEFAULT_TICKS_PER_QUARTER: u16 = 480;
pub const DEFAULT_TEMPO_BPM: u32 = 120;

// ════════════════════════════════════════════════════════════════════════════
// SmfTrack — timed messages before serialisation
// ════════════════════════════════════════════════════════════════════════════

/// A single-track sequence of messages at wall-clock offsets.
pub struct SmfTrack {
    pub events:            Vec<(Duration, MidiMessage)>,
    pub ticks_per_quarter: u16,
    pub tempo_bpm:         u32,
    /// Program Change sent at tick 0, if any.
    pub program:           Option<(u8, u8)>,
    pub name:              String,
}

impl SmfTrack {
    pub fn new(name: &str) -> Self {
        SmfTrack {
            events:            Vec::new(),
            ticks_per_quarter: DEFAULT_TICKS_PER_QUARTER,
            tempo_bpm:         DEFAULT_TEMPO_BPM,
            program:           None,
            name:              name.to_string(),
        }
    }

    pub fn push(&mut self, at: Duration, message: MidiMessage) {
        self.events.push((at, message));
    }

    /// Wall-clock offset → ticks at this track's tempo and resolution.
    pub fn ticks_for(&self, at: Duration) -> u32 {
        let micros_per_quarter = 60_000_000u128 / self.tempo_bpm.max(1) as u128;
        let ticks = at.as_micros() * self.ticks_per_quarter as u128 / micros_per_quarter;
        ticks.min(u32::MAX as u128) as u32
    }

    /// Serialise and write to `path`.
    pub fn write_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let bytes = self.to_bytes();
        let mut f = std::fs::File::create(path)?;
        f.write_all(&bytes)
    }

    /// Serialise to a `Vec<u8>` containing a valid MIDI Type-0 file.
    pub fn to_bytes(&self) -> Vec<u8> {
        let track = self.build_track_chunk();

        let mut out = Vec::new();
        // ── Header chunk ──────────────────────────────────────────────────
        // MThd  length=6  format=0  ntrks=1  division
        out.extend_from_slice(b"MThd");
        out.extend_from_slice(&6u32.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&1u16.to_be_bytes());
        out.extend_from_slice(&self.ticks_per_quarter.to_be_bytes());

        // ── Track chunk ───────────────────────────────────────────────────
        out.extend_from_slice(b"MTrk");
        out.extend_from_slice(&(track.len() as u32).to_be_bytes());
        out.extend_from_slice(&track);

        out
    }

    fn build_track_chunk(&self) -> Vec<u8> {
        let mut t: Vec<u8> = Vec::new();

        // ── Tempo meta-event (delta=0) ────────────────────────────────────
        let micros = 60_000_000u32 / self.tempo_bpm.max(1);
        t.extend_from_slice(&[0x00, 0xFF, 0x51, 0x03]);
        t.push(((micros >> 16) & 0xFF) as u8);
        t.push(((micros >>  8) & 0xFF) as u8);
        t.push(( micros        & 0xFF) as u8);

        // ── Track name meta-event ─────────────────────────────────────────
        let name = self.name.as_bytes();
        t.extend_from_slice(&[0x00, 0xFF, 0x03]);
        write_vlq(&mut t, name.len() as u32);
        t.extend_from_slice(name);

        if let Some((channel, program)) = self.program {
            t.push(0x00);
            t.extend(MidiMessage::ProgramChange { channel, program }.to_bytes());
        }

        // ── Channel messages, stable-sorted by time ───────────────────────
        let mut events: Vec<&(Duration, MidiMessage)> = self.events.iter().collect();
        events.sort_by_key(|(at, _)| *at);

        let mut last_tick = 0u32;
        for (at, msg) in events {
            let tick = self.ticks_for(*at);
            write_vlq(&mut t, tick - last_tick);
            last_tick = tick;
            t.extend(msg.to_bytes());
        }

        // ── End of Track meta-event ───────────────────────────────────────
        t.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);

        t
    }
}

/// Write a MIDI variable-length quantity (VLQ).
pub(crate) fn write_vlq(buf: &mut Vec<u8>, mut value: u32) {
    let mut bytes = [0u8; 5];
    let mut i = 4;
    bytes[i] = (value & 0x7F) as u8;
    value >>= 7;
    while value > 0 {
        i -= 1;
        bytes[i] = ((value & 0x7F) | 0x80) as u8;
        value >>= 7;
    }
    buf.extend_from_slice(&bytes[i..]);
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    // ── VLQ encoding ─────────────────────────────────────────────────────
    #[test]
    fn vlq_single_byte() {
        let mut b = Vec::new();
        write_vlq(&mut b, 0x40);
        assert_eq!(b, [0x40]);
    }

    #[test]
    fn vlq_two_bytes() {
        let mut b = Vec::new();
        write_vlq(&mut b, 128);
        assert_eq!(b, [0x81, 0x00]);
    }

    #[test]
    fn vlq_max_u32_fits() {
        let mut b = Vec::new();
        write_vlq(&mut b, u32::MAX);
        assert_eq!(b, [0x8F, 0xFF, 0xFF, 0xFF, 0x7F]);
    }

    // ── Timing ───────────────────────────────────────────────────────────
    #[test]
    fn half_second_is_one_quarter_at_120bpm() {
        let t = SmfTrack::new("t");
        assert_eq!(t.ticks_for(Duration::from_millis(500)), 480);
        assert_eq!(t.ticks_for(Duration::from_millis(250)), 240);
    }

    // ── File layout ──────────────────────────────────────────────────────
    #[test]
    fn header_and_track_lengths() {
        let mut t = SmfTrack::new("air");
        t.push(Duration::ZERO, MidiMessage::NoteOn { channel: 0, note: 62, velocity: 90 });
        t.push(Duration::from_millis(500), MidiMessage::NoteOff { channel: 0, note: 62 });
        let bytes = t.to_bytes();

        assert_eq!(&bytes[0..4], b"MThd");
        assert_eq!(&bytes[8..10], &[0, 0]);          // format 0
        assert_eq!(&bytes[12..14], &480u16.to_be_bytes());
        assert_eq!(&bytes[14..18], b"MTrk");
        let len = u32::from_be_bytes([bytes[18], bytes[19], bytes[20], bytes[21]]) as usize;
        assert_eq!(bytes.len(), 22 + len);
        assert_eq!(&bytes[bytes.len() - 4..], &[0x00, 0xFF, 0x2F, 0x00]);
    }

    #[test]
    fn note_off_delta_is_encoded() {
        let mut t = SmfTrack::new("");
        t.push(Duration::ZERO, MidiMessage::NoteOn { channel: 0, note: 60, velocity: 64 });
        t.push(Duration::from_millis(500), MidiMessage::NoteOff { channel: 0, note: 60 });
        let bytes = t.to_bytes();
        // 480 ticks → VLQ 0x83 0x60, followed by the note-off status.
        let pos = bytes.windows(3).position(|w| w == [0x83, 0x60, 0x80]);
        assert!(pos.is_some());
    }
}
