//! Note and chord naming for status lines and logs.

const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// MIDI note number → name with octave; 60 → "C4", 0 → "C-1".
pub fn note_name(note: u8) -> String {
    let octave = (note / 12) as i32 - 1;
    format!("{}{}", pitch_class(note), octave)
}

/// Pitch class without octave.
pub fn pitch_class(note: u8) -> &'static str {
    NOTE_NAMES[(note % 12) as usize]
}

/// Heuristic chord name from a set of notes, e.g. "D Maj", "E Min",
/// "C M3".  Unrecognised shapes fall back to a generic label.
pub fn chord_name(notes: &[u8]) -> String {
    let mut sorted = notes.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let Some(&root) = sorted.first() else {
        return "---".to_string();
    };
    let root_name = pitch_class(root);

    match sorted.as_slice() {
        [_] => root_name.to_string(),
        [a, b] => {
            let label = match b - a {
                3 => "m3",
                4 => "M3",
                7 => "P5",
                _ => "Pair",
            };
            format!("{} {}", root_name, label)
        }
        [a, b, c, ..] => {
            let label = match (b - a, c - b) {
                (4, 3) => "Maj",
                (3, 4) => "Min",
                (5, 2) => "Sus4",
                (2, 5) => "Sus2",
                _ => "Triad",
            };
            format!("{} {}", root_name, label)
        }
        [] => "---".to_string(),
    }
}
