//! Bookkeeping of what a stream of events has left sounding.

use std::collections::BTreeMap;

use crate::events::NoteEvent;

/// Per-note on-counts plus the last bend, for closing a stream cleanly.
#[derive(Clone, Debug, Default)]
pub struct HeldNotes {
    counts: BTreeMap<u8, u32>,
    bend:   i16,
}

impl HeldNotes {
    pub fn track(&mut self, event: &NoteEvent) {
        match event {
            NoteEvent::NoteOn { notes, .. } => {
                for &n in notes {
                    self.hold(n);
                }
            }
            NoteEvent::NoteOff { notes } => {
                for &n in notes {
                    self.release(n);
                }
            }
            NoteEvent::PitchBend { value } => self.bend = *value,
        }
    }

    /// Count one more holder of `note`.
    pub fn hold(&mut self, note: u8) {
        *self.counts.entry(note).or_default() += 1;
    }

    /// Drop one holder of `note`.  Returns `true` when nothing holds it any
    /// more, which includes a note that was never held here.
    pub fn release(&mut self, note: u8) -> bool {
        let Some(count) = self.counts.get_mut(&note) else { return true };
        *count -= 1;
        if *count == 0 {
            self.counts.remove(&note);
            true
        } else {
            false
        }
    }

    pub fn holds(&self, note: u8) -> bool {
        self.counts.contains_key(&note)
    }

    pub fn is_clear(&self) -> bool {
        self.counts.is_empty() && self.bend == 0
    }

    /// Events that silence everything tracked so far, and reset.
    pub fn close(&mut self) -> Vec<NoteEvent> {
        let mut out = Vec::new();
        let notes: Vec<u8> = std::mem::take(&mut self.counts).into_keys().collect();
        if !notes.is_empty() {
            out.push(NoteEvent::NoteOff { notes });
        }
        if std::mem::take(&mut self.bend) != 0 {
            out.push(NoteEvent::PitchBend { value: 0 });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_notes_need_every_off() {
        let mut held = HeldNotes::default();
        held.track(&NoteEvent::NoteOn { notes: vec![62, 66, 69], velocity: 90 });
        held.track(&NoteEvent::NoteOn { notes: vec![66, 69, 73], velocity: 90 });
        held.track(&NoteEvent::NoteOff { notes: vec![62, 66, 69] });
        assert_eq!(held.close(), vec![NoteEvent::NoteOff { notes: vec![66, 69, 73] }]);
        assert!(held.is_clear());
    }

    #[test]
    fn release_reports_the_last_holder() {
        let mut held = HeldNotes::default();
        held.hold(66);
        held.hold(66);
        assert!(!held.release(66));
        assert!(held.holds(66));
        assert!(held.release(66));
        assert!(!held.holds(66));
        assert!(held.release(66));
    }

    #[test]
    fn stray_off_is_ignored() {
        let mut held = HeldNotes::default();
        held.track(&NoteEvent::NoteOff { notes: vec![60] });
        held.track(&NoteEvent::PitchBend { value: -12 });
        assert_eq!(held.close(), vec![NoteEvent::PitchBend { value: 0 }]);
    }
}
