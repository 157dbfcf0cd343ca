//! The General MIDI programs offered for selection.

use serde::{Deserialize, Serialize};

/// Selectable instruments, discriminant = General MIDI program number
/// (0-indexed, as sent in Program Change).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Instrument {
    #[default]
    AcousticGrandPiano = 0,
    ElectricPiano      = 1,
    RhodesPiano        = 4,
    Harpsichord        = 6,
    Celesta            = 8,
    Vibraphone         = 11,
    Marimba            = 12,
    TubularBells       = 14,
    HammondOrgan       = 16,
    AcousticGuitar     = 25,
    Violin             = 40,
    StringEnsemble     = 48,
    Flute              = 73,
    LeadSynth          = 80,
}

impl Instrument {
    /// Selection order; the first nine are bound to number keys 1–9.
    pub const ALL: [Instrument; 14] = [
        Instrument::AcousticGrandPiano,
        Instrument::ElectricPiano,
        Instrument::RhodesPiano,
        Instrument::Harpsichord,
        Instrument::Celesta,
        Instrument::Vibraphone,
        Instrument::Marimba,
        Instrument::TubularBells,
        Instrument::HammondOrgan,
        Instrument::AcousticGuitar,
        Instrument::Violin,
        Instrument::StringEnsemble,
        Instrument::Flute,
        Instrument::LeadSynth,
    ];

    /// Raw MIDI program number (0–127).
    pub fn program(self) -> u8 { self as u8 }

    pub fn from_program(program: u8) -> Option<Instrument> {
        Self::ALL.into_iter().find(|i| i.program() == program)
    }

    /// 1-based selection slot, as typed on a number key.
    pub fn from_slot(slot: usize) -> Option<Instrument> {
        slot.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn name(self) -> &'static str {
        match self {
            Instrument::AcousticGrandPiano => "Acoustic Grand Piano",
            Instrument::ElectricPiano      => "Electric Piano",
            Instrument::RhodesPiano        => "Rhodes Piano",
            Instrument::Harpsichord        => "Harpsichord",
            Instrument::Celesta            => "Celesta",
            Instrument::Vibraphone         => "Vibraphone",
            Instrument::Marimba            => "Marimba",
            Instrument::TubularBells       => "Tubular Bells",
            Instrument::HammondOrgan       => "Hammond Organ",
            Instrument::AcousticGuitar     => "Acoustic Guitar",
            Instrument::Violin             => "Violin",
            Instrument::StringEnsemble     => "String Ensemble",
            Instrument::Flute              => "Flute",
            Instrument::LeadSynth          => "Lead Synth",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_numbers() {
        assert_eq!(Instrument::AcousticGrandPiano.program(), 0);
        assert_eq!(Instrument::Violin.program(), 40);
        assert_eq!(Instrument::LeadSynth.program(), 80);
    }

    #[test]
    fn slots_are_one_based() {
        assert_eq!(Instrument::from_slot(1), Some(Instrument::AcousticGrandPiano));
        assert_eq!(Instrument::from_slot(9), Some(Instrument::HammondOrgan));
        assert_eq!(Instrument::from_slot(0), None);
        assert_eq!(Instrument::from_slot(15), None);
    }

    #[test]
    fn from_program_roundtrips_known_only() {
        for i in Instrument::ALL {
            assert_eq!(Instrument::from_program(i.program()), Some(i));
        }
        assert_eq!(Instrument::from_program(2), None);
    }
}
