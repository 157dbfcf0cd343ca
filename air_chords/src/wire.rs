//! Channel-voice message encoding for a live MIDI port.

/// Centre value of the 14-bit pitch-bend wheel.
pub const BEND_CENTER: u16 = 8192;

/// A channel-voice message ready to be sent on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn        { channel: u8, note: u8, velocity: u8 },
    NoteOff       { channel: u8, note: u8 },
    /// Signed bend, `0` = centre; clamped to −8192..=8191 on encoding.
    PitchBend     { channel: u8, value: i16 },
    ProgramChange { channel: u8, program: u8 },
}

impl MidiMessage {
    /// Encode to status + data bytes.
    pub fn to_bytes(self) -> Vec<u8> {
        match self {
            MidiMessage::NoteOn { channel, note, velocity } => {
                vec![0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::NoteOff { channel, note } => {
                vec![0x80 | (channel & 0x0F), note & 0x7F, 0x00]
            }
            MidiMessage::PitchBend { channel, value } => {
                let raw = bend_to_raw(value);
                vec![0xE0 | (channel & 0x0F), (raw & 0x7F) as u8, ((raw >> 7) & 0x7F) as u8]
            }
            MidiMessage::ProgramChange { channel, program } => {
                vec![0xC0 | (channel & 0x0F), program & 0x7F]
            }
        }
    }
}

/// Signed bend → unsigned 14-bit wire value.
pub fn bend_to_raw(value: i16) -> u16 {
    (value.clamp(-8192, 8191) as i32 + BEND_CENTER as i32) as u16
}
