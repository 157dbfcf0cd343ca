use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The scales a chord table exists for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scale {
    #[default]
    #[serde(alias = "d_major", alias = "D_Major")]
    DMajor,
    #[serde(alias = "c_major", alias = "C_Major")]
    CMajor,
    #[serde(alias = "pentatonic")]
    Pentatonic,
}

impl Scale {
    pub const ALL: [Scale; 3] = [Scale::DMajor, Scale::CMajor, Scale::Pentatonic];

    /// Next scale in cycling order, wrapping around.
    pub fn next(self) -> Scale {
        let i = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn name(self) -> &'static str {
        match self {
            Scale::DMajor     => "D Major",
            Scale::CMajor     => "C Major",
            Scale::Pentatonic => "Pentatonic",
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match norm.as_str() {
            "dmajor" | "d"      => Ok(Scale::DMajor),
            "cmajor" | "c"      => Ok(Scale::CMajor),
            "pentatonic" | "penta" => Ok(Scale::Pentatonic),
            _ => Err(format!("unknown scale '{}'", s)),
        }
    }
}

/// Which octave a chord table sits in.  `Low` is the left-hand table of
/// the keyboard layout, `High` the right-hand table an octave above.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Register {
    #[default]
    Low,
    High,
}

impl Register {
    pub fn transpose(self) -> u8 {
        match self {
            Register::Low  => 0,
            Register::High => 12,
        }
    }
}
