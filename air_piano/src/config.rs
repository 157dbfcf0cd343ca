//! Startup settings, read once from an optional TOML file.
//!
//! ```toml
//! [gesture]
//! raise_threshold = 70.0
//! lower_threshold = 55.0
//!
//! [performance]
//! scale      = "c_major"
//! register   = "high"
//! volume     = 1.2
//! instrument = 11
//! sustain_ms = 800
//! echo       = true
//!
//! [midi]
//! port = "fluid"
//!
//! [[chords]]
//! scale = "pentatonic"
//! key   = "pinch"
//! notes = [72, 79, 84]
//! ```
//!
//! Every key is optional.  A missing file means defaults; a malformed one
//! is reported and ignored.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use air_chords::{BendMapper, Instrument, Register, Scale, VelocityMapper, Volume};
use air_engine::{EffectSettings, Effects, EngineConfig, ThumbPolicy};
use air_gesture::{ClassifierConfig, GestureKey, HandSide};

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub gesture:     ClassifierConfig,
    pub velocity:    VelocityMapper,
    pub bend:        BendMapper,
    pub performance: PerformanceConfig,
    pub midi:        MidiConfig,
    pub chords:      Vec<ChordEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub scale:        Scale,
    pub register:     Register,
    pub volume:       Volume,
    /// General MIDI program number.
    pub instrument:   u8,
    pub hand:         HandSide,
    pub thumb_policy: ThumbPolicy,
    /// How long released chords ring on at the synth; 0 cuts them off.
    pub sustain_ms:   u64,
    /// Start with echo switched on.
    pub echo:         bool,
    /// Frame rate for the simulated hand and for paced file feeds.
    pub fps:          u32,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        PerformanceConfig {
            scale:        Scale::default(),
            register:     Register::default(),
            volume:       Volume::default(),
            instrument:   Instrument::default().program(),
            hand:         HandSide::default(),
            thumb_policy: ThumbPolicy::default(),
            sustain_ms:   800,
            echo:         false,
            fps:          30,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiConfig {
    /// Case-insensitive substring of the output port to use.
    pub port:        Option<String>,
    pub channel:     u8,
    pub client_name: String,
}

impl Default for MidiConfig {
    fn default() -> Self {
        MidiConfig {
            port:        None,
            channel:     0,
            client_name: "air_piano".to_string(),
        }
    }
}

/// One chord replacing a built-in entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChordEntry {
    pub scale: Scale,
    pub key:   GestureKey,
    pub notes: Vec<u8>,
}

impl AppConfig {
    /// Load from `path`, or from the per-user default location.
    pub fn load(path: Option<&Path>) -> AppConfig {
        let Some(path) = path.map(Path::to_path_buf).or_else(default_path) else {
            return AppConfig::default();
        };
        if !path.exists() {
            log::debug!(target: "config", "no config at {}; using defaults", path.display());
            return AppConfig::default();
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => match AppConfig::parse(&text) {
                Ok(config) => {
                    log::info!(target: "config", "loaded {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e);
                    AppConfig::default()
                }
            },
            Err(e) => {
                log::warn!(target: "config", "could not read config {}: {}", path.display(), e);
                AppConfig::default()
            }
        }
    }

    pub fn parse(text: &str) -> Result<AppConfig, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.performance.fps.clamp(1, 240) as f64)
    }

    pub fn engine_config(&self) -> EngineConfig {
        let perf = &self.performance;
        let instrument = Instrument::from_program(perf.instrument).unwrap_or_else(|| {
            log::warn!(target: "config", "program {} is not in the instrument list; using piano", perf.instrument);
            Instrument::default()
        });
        EngineConfig {
            classifier:      self.gesture.normalized(),
            velocity:        self.velocity,
            bend:            self.bend,
            scale:           perf.scale,
            register:        perf.register,
            volume:          perf.volume,
            instrument,
            thumb_policy:    perf.thumb_policy,
            hand:            perf.hand,
            chord_overrides: self
                .chords
                .iter()
                .map(|c| (c.scale, c.key, c.notes.clone()))
                .collect(),
            effects:         Effects::new(EffectSettings {
                sustain: Duration::from_millis(perf.sustain_ms),
                echo:    perf.echo,
            }),
        }
    }
}

/// `<config dir>/air_piano/config.toml`.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("air_piano").join("config.toml"))
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_default() {
        assert_eq!(AppConfig::parse("").unwrap(), AppConfig::default());
    }

    #[test]
    fn sections_parse() {
        let config = AppConfig::parse(
            r#"
            [gesture]
            raise_threshold = 80.0

            [bend]
            sensitivity = 20.0

            [performance]
            scale = "pentatonic"
            register = "high"
            volume = 3.0
            instrument = 40
            hand = "left"
            thumb_policy = "independent"
            sustain_ms = 250
            echo = true

            [midi]
            port = "timidity"
            channel = 2

            [[chords]]
            scale = "d_major"
            key = "pinch"
            notes = [74, 81]
            "#,
        )
        .unwrap();

        assert_eq!(config.gesture.raise_threshold, 80.0);
        assert_eq!(config.gesture.lower_threshold, 55.0);
        assert_eq!(config.bend.sensitivity, 20.0);
        assert_eq!(config.performance.scale, Scale::Pentatonic);
        assert_eq!(config.performance.volume.get(), Volume::MAX);
        assert_eq!(config.midi.port.as_deref(), Some("timidity"));

        let engine = config.engine_config();
        assert_eq!(engine.instrument, Instrument::Violin);
        assert_eq!(engine.register, Register::High);
        assert_eq!(engine.hand, HandSide::Left);
        assert_eq!(engine.thumb_policy, ThumbPolicy::Independent);
        assert_eq!(
            engine.effects.settings(),
            EffectSettings { sustain: Duration::from_millis(250), echo: true }
        );
        assert_eq!(engine.chord_overrides, vec![(Scale::DMajor, GestureKey::Pinch, vec![74, 81])]);
    }

    #[test]
    fn sustain_defaults_on() {
        let settings = AppConfig::default().engine_config().effects.settings();
        assert_eq!(settings, EffectSettings { sustain: Duration::from_millis(800), echo: false });
    }

    #[test]
    fn unknown_program_falls_back_to_piano() {
        let mut config = AppConfig::default();
        config.performance.instrument = 99;
        assert_eq!(config.engine_config().instrument, Instrument::AcousticGrandPiano);
    }

    #[test]
    fn malformed_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[performance\nscale = ").unwrap();
        assert_eq!(AppConfig::load(Some(&path)), AppConfig::default());
    }

    #[test]
    fn file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[performance]\nfps = 60\n").unwrap();
        let config = AppConfig::load(Some(&path));
        assert_eq!(config.performance.fps, 60);
        assert_eq!(config.frame_interval().as_millis(), 16);
    }
}
