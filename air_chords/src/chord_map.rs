//! Gesture → chord lookup per scale.
//!
//! A [`ChordMap`] is built once, validated to be total over
//! `Scale::ALL × GestureKey::ALL`, and then handed out as shared
//! [`ChordTable`]s.  Switching scale means swapping which `Arc<ChordTable>`
//! the caller holds; chords already sounding keep their own copy of the
//! note numbers.

use std::collections::BTreeMap;
use std::sync::Arc;

use air_gesture::GestureKey;

use crate::error::ChordMapError;
use crate::scale::{Register, Scale};

// ════════════════════════════════════════════════════════════════════════════
// ChordDefinition
// ════════════════════════════════════════════════════════════════════════════

/// Ordered note numbers sounded together for one gesture.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChordDefinition {
    notes: Vec<u8>,
}

impl ChordDefinition {
    pub fn new(notes: impl Into<Vec<u8>>) -> Self {
        ChordDefinition { notes: notes.into() }
    }

    pub fn notes(&self) -> &[u8] { &self.notes }

    fn transposed(&self, semitones: u8) -> Self {
        ChordDefinition {
            notes: self.notes.iter().map(|n| n.saturating_add(semitones)).collect(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ChordTable — one scale's six chords
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChordTable {
    scale:  Scale,
    chords: [ChordDefinition; GestureKey::COUNT],
}

impl ChordTable {
    pub fn scale(&self) -> Scale { self.scale }

    pub fn chord(&self, key: GestureKey) -> &ChordDefinition {
        &self.chords[key.index()]
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ChordMap
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct ChordMap {
    tables: BTreeMap<Scale, Arc<ChordTable>>,
}

impl ChordMap {
    /// Build from loose `(scale, key, notes)` entries, validating that every
    /// supported scale defines every gesture key with 1+ notes in 0–127.
    /// Later duplicates override earlier ones.
    pub fn from_entries<I>(entries: I) -> Result<Self, ChordMapError>
    where
        I: IntoIterator<Item = (Scale, GestureKey, Vec<u8>)>,
    {
        let mut loose: BTreeMap<(Scale, GestureKey), Vec<u8>> = BTreeMap::new();
        for (scale, key, notes) in entries {
            loose.insert((scale, key), notes);
        }

        let mut tables = BTreeMap::new();
        for scale in Scale::ALL {
            let mut chords = Vec::with_capacity(GestureKey::COUNT);
            for key in GestureKey::ALL {
                let notes = loose
                    .remove(&(scale, key))
                    .ok_or(ChordMapError::Missing { scale, key })?;
                if notes.is_empty() {
                    return Err(ChordMapError::Empty { scale, key });
                }
                if let Some(&note) = notes.iter().find(|n| **n > 127) {
                    return Err(ChordMapError::OutOfRange { scale, key, note });
                }
                chords.push(ChordDefinition::new(notes));
            }
            let chords: [ChordDefinition; GestureKey::COUNT] = chords
                .try_into()
                .map_err(|_| ChordMapError::Missing { scale, key: GestureKey::Pinch })?;
            tables.insert(scale, Arc::new(ChordTable { scale, chords }));
        }

        Ok(ChordMap { tables })
    }

    /// The built-in tables for a register.
    pub fn standard(register: Register) -> Self {
        match Self::with_overrides(register, std::iter::empty()) {
            Ok(map) => map,
            // The built-in table is total; the test suite holds it to that.
            Err(e) => unreachable!("built-in chord table invalid: {}", e),
        }
    }

    /// The built-in tables for a register with user entries layered on top.
    /// Overrides are taken as written (no register transposition) and are
    /// validated like any other entry.
    pub fn with_overrides<I>(register: Register, overrides: I) -> Result<Self, ChordMapError>
    where
        I: IntoIterator<Item = (Scale, GestureKey, Vec<u8>)>,
    {
        let shift = register.transpose();
        let base = standard_entries().into_iter().map(|(scale, key, notes)| {
            let notes = match key {
                // The pinch chord sits above both registers already.
                GestureKey::Pinch => notes,
                _ => ChordDefinition::new(notes).transposed(shift).notes,
            };
            (scale, key, notes)
        });
        Self::from_entries(base.chain(overrides))
    }

    /// Shared handle to one scale's table.
    pub fn table(&self, scale: Scale) -> Arc<ChordTable> {
        match self.tables.get(&scale) {
            Some(t) => Arc::clone(t),
            None => unreachable!("validated chord map lacks {}", scale),
        }
    }

    pub fn lookup(&self, scale: Scale, key: GestureKey) -> &ChordDefinition {
        match self.tables.get(&scale) {
            Some(t) => t.chord(key),
            None => unreachable!("validated chord map lacks {}", scale),
        }
    }
}

impl Default for ChordMap {
    fn default() -> Self { ChordMap::standard(Register::Low) }
}

/// High C major, shared by every scale.
pub const PINCH_CHORD: [u8; 3] = [84, 88, 91];

fn standard_entries() -> Vec<(Scale, GestureKey, Vec<u8>)> {
    use GestureKey::*;

    let rows: [(Scale, [[u8; 3]; 5]); 3] = [
        (Scale::DMajor, [
            [62, 66, 69], // D
            [64, 67, 71], // Em
            [66, 69, 73], // F#m
            [67, 71, 74], // G
            [69, 73, 76], // A
        ]),
        (Scale::CMajor, [
            [60, 64, 67], // C
            [62, 65, 69], // Dm
            [64, 67, 71], // Em
            [65, 69, 72], // F
            [67, 71, 74], // G
        ]),
        (Scale::Pentatonic, [
            [60, 64, 67], // C
            [62, 67, 69], // Dsus
            [64, 69, 72], // Em
            [67, 72, 74], // G
            [69, 74, 77], // Am
        ]),
    ];

    let mut out = Vec::new();
    for (scale, chords) in rows {
        for (key, notes) in [Thumb, Index, Middle, Ring, Pinky].into_iter().zip(chords) {
            out.push((scale, key, notes.to_vec()));
        }
        out.push((scale, Pinch, PINCH_CHORD.to_vec()));
    }
    out
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
