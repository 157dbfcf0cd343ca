//! The session controller: frames in, commands in, events out.
//!
//! [`Performance`] owns the classifier, the note state machine, the
//! recorder and the playback thread handle, and is driven from a single
//! frame-pump thread.  Every state change goes through either
//! [`Performance::process_pose`] or [`Performance::dispatch`].

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use air_chords::{
    chord_name, BendMapper, ChordMap, Instrument, Register, Scale, VelocityMapper, Volume,
};
use air_gesture::{
    ClassifierConfig, GestureClassifier, GestureFrame, GestureKey, HandGeometry,
    HandLandmarks, HandSide, PoseFrame,
};

use crate::effects::Effects;
use crate::error::EngineError;
use crate::events::{EventBus, NoteEvent, Route};
use crate::player::{PlaybackReport, Player};
use crate::recorder::{Recorder, Recording};
use crate::state_machine::{NoteStateMachine, ThumbPolicy};

// ════════════════════════════════════════════════════════════════════════════
// EngineConfig
// ════════════════════════════════════════════════════════════════════════════

/// Startup settings.  Everything except the chord layout can also be
/// changed later through commands or setters.
#[derive(Clone, Debug, Default)]
pub struct EngineConfig {
    pub classifier:      ClassifierConfig,
    pub velocity:        VelocityMapper,
    pub bend:            BendMapper,
    pub scale:           Scale,
    pub register:        Register,
    pub volume:          Volume,
    pub instrument:      Instrument,
    pub thumb_policy:    ThumbPolicy,
    /// Hand to follow when more than one is in view.
    pub hand:            HandSide,
    /// Chords replacing built-in entries.
    pub chord_overrides: Vec<(Scale, GestureKey, Vec<u8>)>,
    /// Sustain/echo settings shared with the outputs' effects wrappers.
    pub effects:         Effects,
}

// ════════════════════════════════════════════════════════════════════════════
// Command / Outcome
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    SetScale(Scale),
    CycleScale,
    SetVolumeMultiplier(f32),
    /// Step the volume by a signed amount.
    AdjustVolume(f32),
    /// MIDI program number.
    SetInstrument(u8),
    ToggleEcho,
    StartRecording,
    StopRecording,
    ToggleRecording,
    StartPlayback,
    StopPlayback,
    Shutdown,
}

/// What a successful command did.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    ScaleChanged(Scale),
    VolumeChanged(Volume),
    InstrumentChanged(u8),
    EchoChanged(bool),
    RecordingStarted { cancelled_playback: bool },
    RecordingStopped { events: usize },
    NotRecording,
    PlaybackStarted { events: usize },
    PlaybackStopped(PlaybackReport),
    NotPlaying,
    ShutDown { released: usize },
    /// The performance has already shut down.
    Ignored,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::ScaleChanged(s)      => write!(f, "Scale: {}", s),
            Outcome::VolumeChanged(v)     => write!(f, "Volume: {}%", v.percent()),
            Outcome::InstrumentChanged(p) => match Instrument::from_program(*p) {
                Some(i) => write!(f, "Instrument: {}", i.name()),
                None    => write!(f, "Instrument: program {}", p),
            },
            Outcome::EchoChanged(on)      => write!(f, "Echo: {}", if *on { "on" } else { "off" }),
            Outcome::RecordingStarted { cancelled_playback: true } => {
                write!(f, "Recording started (playback stopped)")
            }
            Outcome::RecordingStarted { .. }   => write!(f, "Recording started"),
            Outcome::RecordingStopped { events } => write!(f, "Recording stopped: {} events", events),
            Outcome::NotRecording          => write!(f, "Not recording"),
            Outcome::PlaybackStarted { events } => write!(f, "Playing back {} events", events),
            Outcome::PlaybackStopped(r)    => write!(f, "Playback stopped after {} events", r.emitted),
            Outcome::NotPlaying            => write!(f, "Nothing playing"),
            Outcome::ShutDown { released } => write!(f, "Shut down, {} chords released", released),
            Outcome::Ignored               => write!(f, "Already shut down"),
        }
    }
}

/// Result of feeding one pose frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    pub gestures: GestureFrame,
    pub events:   Vec<NoteEvent>,
    /// Set when the tracked hand was malformed and handled as absent.
    pub rejected: Option<EngineError>,
}

// ════════════════════════════════════════════════════════════════════════════
// Performance
// ════════════════════════════════════════════════════════════════════════════

pub struct Performance {
    classifier: GestureClassifier,
    machine:    NoteStateMachine,
    bus:        EventBus,
    recorder:   Arc<Recorder>,
    player:     Option<Player>,
    effects:    Effects,
    hand:       HandSide,
    program:    u8,
    gestures:   GestureFrame,
    shut_down:  bool,
}

impl Performance {
    /// Validate the chord layout and hook the recorder onto `bus`.  Outputs
    /// may be registered on the bus before or after.
    pub fn new(config: EngineConfig, bus: EventBus) -> Result<Self, EngineError> {
        let chords = ChordMap::with_overrides(config.register, config.chord_overrides)?;

        let mut machine = NoteStateMachine::new(chords, config.scale);
        machine.set_volume(config.volume);
        machine.set_velocity_mapper(config.velocity);
        machine.set_bend_mapper(config.bend);
        machine.set_thumb_policy(config.thumb_policy);

        let recorder = Arc::new(Recorder::new());
        bus.add_tap(Box::new(recorder.tap()));

        let program = config.instrument.program();
        bus.program_change(program);

        log::info!(
            target: "engine",
            "ready: {} ({:?} register), {}, volume {}%",
            config.scale, config.register, config.instrument.name(), config.volume.percent()
        );

        Ok(Performance {
            classifier: GestureClassifier::new(config.classifier),
            machine,
            bus,
            recorder,
            player: None,
            effects: config.effects,
            hand: config.hand,
            program,
            gestures: GestureFrame::absent(),
            shut_down: false,
        })
    }

    // ── frames ────────────────────────────────────────────────────────────

    /// Run one pose frame through classification and the state machine,
    /// and deliver the resulting events.
    pub fn process_pose(&mut self, pose: &PoseFrame) -> FrameReport {
        let (hand, rejected) = match pose.tracked_hand(self.hand) {
            Ok(hand) => (hand, None),
            Err(e) => {
                log::warn!(target: "engine", "treating frame as empty: {}", e);
                (None, Some(EngineError::InvalidFrame(e)))
            }
        };
        let events = self.process_hand(hand.as_ref());
        FrameReport { gestures: self.gestures, events, rejected }
    }

    /// Like [`process_pose`](Self::process_pose) for an already validated
    /// (or absent) hand.
    pub fn process_hand(&mut self, hand: Option<&HandLandmarks>) -> Vec<NoteEvent> {
        let geometry = HandGeometry::measure(hand);
        let gestures = self.classifier.classify(geometry.as_ref());
        self.process_gestures(&gestures)
    }

    /// Feed an already classified frame.
    pub fn process_gestures(&mut self, gestures: &GestureFrame) -> Vec<NoteEvent> {
        self.reap_player();
        if self.shut_down {
            return Vec::new();
        }
        self.gestures = *gestures;
        let events = self.machine.step(gestures, Instant::now());
        self.bus.emit_all(Route::Live, &events);
        events
    }

    // ── commands ──────────────────────────────────────────────────────────

    pub fn dispatch(&mut self, command: Command) -> Result<Outcome, EngineError> {
        self.reap_player();
        if self.shut_down {
            log::debug!(target: "engine", "ignoring {:?} after shutdown", command);
            return Ok(Outcome::Ignored);
        }
        log::debug!(target: "engine", "command {:?}", command);

        let outcome = match command {
            Command::SetScale(scale) => {
                self.machine.set_scale(scale);
                Outcome::ScaleChanged(scale)
            }
            Command::CycleScale => {
                let scale = self.machine.scale().next();
                self.machine.set_scale(scale);
                Outcome::ScaleChanged(scale)
            }
            Command::SetVolumeMultiplier(v) => self.set_volume(Volume::new(v)),
            Command::AdjustVolume(delta)    => self.set_volume(self.machine.volume().adjusted(delta)),
            Command::SetInstrument(program) => {
                self.program = program & 0x7F;
                self.bus.program_change(self.program);
                Outcome::InstrumentChanged(self.program)
            }
            Command::ToggleEcho => Outcome::EchoChanged(self.effects.toggle_echo()),
            Command::StartRecording => self.start_recording(),
            Command::StopRecording  => self.stop_recording(),
            Command::ToggleRecording => {
                if self.recorder.is_recording() {
                    self.stop_recording()
                } else {
                    self.start_recording()
                }
            }
            Command::StartPlayback => self.start_playback()?,
            Command::StopPlayback  => match self.player.take() {
                Some(player) => Outcome::PlaybackStopped(player.cancel()),
                None         => Outcome::NotPlaying,
            },
            Command::Shutdown => self.shutdown_now(),
        };

        log::info!(target: "engine", "{}", outcome);
        Ok(outcome)
    }

    /// Same as dispatching [`Command::Shutdown`].
    pub fn shutdown(&mut self) -> Outcome {
        if self.shut_down {
            return Outcome::Ignored;
        }
        let outcome = self.shutdown_now();
        log::info!(target: "engine", "{}", outcome);
        outcome
    }

    fn set_volume(&mut self, volume: Volume) -> Outcome {
        self.machine.set_volume(volume);
        Outcome::VolumeChanged(volume)
    }

    fn start_recording(&mut self) -> Outcome {
        let cancelled_playback = match self.player.take() {
            Some(player) => {
                player.cancel();
                true
            }
            None => false,
        };
        let sounding = self.machine.active_notes().map(|n| n.notes.as_slice());
        self.recorder.start(Instant::now(), sounding);
        Outcome::RecordingStarted { cancelled_playback }
    }

    fn stop_recording(&mut self) -> Outcome {
        match self.recorder.stop(Instant::now()) {
            Some(take) => Outcome::RecordingStopped { events: take.len() },
            None       => Outcome::NotRecording,
        }
    }

    fn start_playback(&mut self) -> Result<Outcome, EngineError> {
        if self.recorder.is_recording() {
            return Err(EngineError::PlaybackRejected);
        }
        let take = self
            .recorder
            .last()
            .filter(|r| !r.is_empty())
            .ok_or(EngineError::EmptyPlayback)?;

        if let Some(previous) = self.player.take() {
            previous.cancel();
        }
        let events = take.len();
        self.player = Some(Player::spawn(take, self.bus.clone()));
        Ok(Outcome::PlaybackStarted { events })
    }

    fn shutdown_now(&mut self) -> Outcome {
        if let Some(player) = self.player.take() {
            player.cancel();
        }
        let flushed = self.machine.flush();
        let released = flushed.iter().filter(|e| e.is_note_off()).count();
        self.bus.emit_all(Route::Live, &flushed);
        self.bus.flush();
        self.recorder.stop(Instant::now());
        self.classifier.reset();
        self.gestures = GestureFrame::absent();
        self.shut_down = true;
        Outcome::ShutDown { released }
    }

    fn reap_player(&mut self) {
        if self.player.as_ref().is_some_and(Player::is_finished) {
            if let Some(player) = self.player.take() {
                player.join();
            }
        }
    }

    // ── live settings ─────────────────────────────────────────────────────

    pub fn set_classifier_config(&mut self, config: ClassifierConfig) {
        self.classifier.set_config(config);
    }

    pub fn set_velocity_mapper(&mut self, mapper: VelocityMapper) {
        self.machine.set_velocity_mapper(mapper);
    }

    pub fn set_bend_mapper(&mut self, mapper: BendMapper) {
        self.machine.set_bend_mapper(mapper);
    }

    pub fn set_thumb_policy(&mut self, policy: ThumbPolicy) {
        self.machine.set_thumb_policy(policy);
    }

    // ── status ────────────────────────────────────────────────────────────

    pub fn bus(&self) -> &EventBus        { &self.bus }
    pub fn scale(&self) -> Scale          { self.machine.scale() }
    pub fn volume(&self) -> Volume        { self.machine.volume() }
    pub fn program(&self) -> u8           { self.program }
    pub fn bend(&self) -> i16             { self.machine.bend() }
    pub fn gestures(&self) -> &GestureFrame { &self.gestures }
    pub fn is_recording(&self) -> bool    { self.recorder.is_recording() }
    pub fn effects(&self) -> &Effects     { &self.effects }
    pub fn is_shut_down(&self) -> bool    { self.shut_down }

    pub fn is_playing(&self) -> bool {
        self.player.as_ref().is_some_and(|p| !p.is_finished())
    }

    pub fn last_recording(&self) -> Option<Recording> {
        self.recorder.last()
    }

    /// Sounding chords by gesture, named (e.g. `(Thumb, "D Maj")`).
    pub fn sounding(&self) -> Vec<(GestureKey, String)> {
        self.machine
            .active_notes()
            .map(|n| (n.key, chord_name(&n.notes)))
            .collect()
    }
}

impl Drop for Performance {
    fn drop(&mut self) {
        if !self.shut_down {
            self.shutdown();
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
