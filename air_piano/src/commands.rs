//! Keyboard commands typed on stdin, one per line.
//!
//! | Input          | Command |
//! |----------------|---------|
//! | `r`            | toggle recording |
//! | `p`            | play back the last recording |
//! | `x`            | stop playback |
//! | `s`            | next scale |
//! | `e`            | echo on/off |
//! | `scale <name>` | set scale (`d_major`, `c_major`, `pentatonic`) |
//! | `+` / `-`      | volume up / down |
//! | `volume <x>`   | set the volume multiplier |
//! | `1` … `9`      | instrument from the list |
//! | `q`            | shut down |

use std::io::BufRead;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use air_chords::{Instrument, Scale, Volume};
use air_engine::Command;

/// One parsed input line.
#[derive(Clone, Debug, PartialEq)]
pub enum Input {
    Command(Command),
    Help,
}

pub fn parse_line(line: &str) -> Result<Option<Input>, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else { return Ok(None) };
    let arg = words.next();

    let command = match (head, arg) {
        ("r", None)            => Command::ToggleRecording,
        ("p", None)            => Command::StartPlayback,
        ("x", None)            => Command::StopPlayback,
        ("s", None)            => Command::CycleScale,
        ("e", None)            => Command::ToggleEcho,
        ("+" | "=", None)      => Command::AdjustVolume(Volume::STEP),
        ("-", None)            => Command::AdjustVolume(-Volume::STEP),
        ("q" | "quit", None)   => Command::Shutdown,
        ("h" | "?" | "help", None) => return Ok(Some(Input::Help)),
        ("scale", Some(name))  => Command::SetScale(name.parse::<Scale>()?),
        ("volume", Some(v))    => {
            let v: f32 = v.parse().map_err(|_| format!("'{}' is not a number", v))?;
            Command::SetVolumeMultiplier(v)
        }
        (digit, None) if digit.len() == 1 && digit.as_bytes()[0].is_ascii_digit() => {
            let slot = (digit.as_bytes()[0] - b'0') as usize;
            let instrument = Instrument::from_slot(slot).ok_or_else(|| format!("no instrument in slot {}", slot))?;
            Command::SetInstrument(instrument.program())
        }
        _ => return Err(format!("unknown command '{}'", line.trim())),
    };
    Ok(Some(Input::Command(command)))
}

pub fn help_text() -> String {
    let mut out = String::from(
        "  r record on/off   p play   x stop playback   s next scale   e echo   +/- volume   q quit\n",
    );
    for (i, instrument) in Instrument::ALL.iter().take(9).enumerate() {
        out.push_str(&format!("  {} {}\n", i + 1, instrument.name()));
    }
    out
}

/// Read commands from `reader` on a background thread.  Bad lines are
/// answered on stderr and skipped.
pub fn spawn_command_reader<R: BufRead + Send + 'static>(reader: R) -> Receiver<Command> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in reader.lines() {
            let Ok(line) = line else { break };
            match parse_line(&line) {
                Ok(Some(Input::Command(cmd))) => {
                    let quit = cmd == Command::Shutdown;
                    if tx.send(cmd).is_err() || quit {
                        return;
                    }
                }
                Ok(Some(Input::Help)) => eprint!("{}", help_text()),
                Ok(None) => {}
                Err(e) => eprintln!("  {} (h for help)", e),
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(line: &str) -> Command {
        match parse_line(line) {
            Ok(Some(Input::Command(c))) => c,
            other => panic!("{:?} → {:?}", line, other),
        }
    }

    #[test]
    fn single_keys() {
        assert_eq!(command("r"), Command::ToggleRecording);
        assert_eq!(command(" p "), Command::StartPlayback);
        assert_eq!(command("s"), Command::CycleScale);
        assert_eq!(command("e"), Command::ToggleEcho);
        assert_eq!(command("-"), Command::AdjustVolume(-0.1));
        assert_eq!(command("q"), Command::Shutdown);
    }

    #[test]
    fn number_keys_pick_instruments() {
        assert_eq!(command("1"), Command::SetInstrument(0));
        assert_eq!(command("9"), Command::SetInstrument(16));
        assert!(parse_line("0").is_err());
    }

    #[test]
    fn worded_commands() {
        assert_eq!(command("scale pentatonic"), Command::SetScale(Scale::Pentatonic));
        assert_eq!(command("volume 1.5"), Command::SetVolumeMultiplier(1.5));
        assert!(parse_line("volume loud").is_err());
        assert!(parse_line("scale lydian").is_err());
    }

    #[test]
    fn blank_and_help() {
        assert_eq!(parse_line("   "), Ok(None));
        assert_eq!(parse_line("?"), Ok(Some(Input::Help)));
        assert!(help_text().contains("Hammond Organ"));
    }

    #[test]
    fn reader_stops_after_quit() {
        let input = std::io::Cursor::new("s\nbogus\nq\nr\n");
        let got: Vec<Command> = spawn_command_reader(input).iter().collect();
        assert_eq!(got, vec![Command::CycleScale, Command::Shutdown]);
    }
}
