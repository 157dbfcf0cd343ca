//! The frame pump.
//!
//! `App` owns the [`Performance`] and turns frames and typed commands into
//! calls on it, keeping a one-line status for the terminal.  [`App::run`]
//! is the main loop: it blocks on the frame channel for at most one frame
//! interval, then drains pending commands, until the feed ends or a
//! shutdown is requested.

use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

use air_engine::{
    Command, EffectsSink, EngineConfig, EngineError, EventBus, EventSink, Outcome, Performance,
    Recording,
};
use air_gesture::{GestureKey, PoseFrame};

// ════════════════════════════════════════════════════════════════════════════
// App
// ════════════════════════════════════════════════════════════════════════════

pub struct App {
    performance: Performance,
    pub status:  String,
    frames:      u64,
    rejected:    u64,
}

/// Totals for the end-of-session summary.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionSummary {
    pub frames:    u64,
    pub rejected:  u64,
    pub recording: Option<Recording>,
    /// Program in effect when the session ended.
    pub program:   u8,
}

impl App {
    /// Each output is wrapped for sustain and echo before it joins the bus.
    pub fn new(config: EngineConfig, outputs: Vec<Box<dyn EventSink>>) -> Result<Self, EngineError> {
        let bus = EventBus::new();
        for out in outputs {
            bus.add_output(Box::new(EffectsSink::new(out, config.effects.clone())));
        }
        let performance = Performance::new(config, bus)?;
        let status = format!(
            "Ready: {}, volume {}%",
            performance.scale(),
            performance.volume().percent()
        );
        Ok(App { performance, status, frames: 0, rejected: 0 })
    }

    pub fn performance(&self) -> &Performance { &self.performance }

    // ── process one frame ─────────────────────────────────────────────────

    pub fn handle_frame(&mut self, frame: &PoseFrame) {
        let report = self.performance.process_pose(frame);
        self.frames += 1;
        if report.rejected.is_some() {
            self.rejected += 1;
        }
        if !report.events.is_empty() {
            self.status = self.sounding_line();
            log::debug!(target: "app", "{}", self.status);
        }
    }

    // ── process one command ───────────────────────────────────────────────

    pub fn handle_command(&mut self, command: Command) -> Result<Outcome, EngineError> {
        let result = self.performance.dispatch(command);
        self.status = match &result {
            Ok(outcome) => outcome.to_string(),
            Err(e)      => e.to_string(),
        };
        result
    }

    fn sounding_line(&self) -> String {
        let sounding = self.performance.sounding();
        if sounding.is_empty() {
            return "♪ -".to_string();
        }
        let chords: Vec<String> = sounding
            .iter()
            .map(|(key, chord)| format!("{}:{}", key, chord))
            .collect();
        let bend = self.performance.bend();
        if sounding.iter().any(|(k, _)| *k == GestureKey::Pinch) && bend != 0 {
            format!("♪ {}  bend {:+}", chords.join("  "), bend)
        } else {
            format!("♪ {}", chords.join("  "))
        }
    }

    // ── main loop ─────────────────────────────────────────────────────────

    /// Pump frames and commands until the feed closes or a shutdown
    /// command arrives, then shut the performance down.
    pub fn run(
        mut self,
        frames:   Receiver<PoseFrame>,
        commands: Option<Receiver<Command>>,
        tick:     Duration,
    ) -> SessionSummary {
        let mut feed_open = true;
        while feed_open && !self.performance.is_shut_down() {
            match frames.recv_timeout(tick) {
                Ok(frame) => self.handle_frame(&frame),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => feed_open = false,
            }

            let Some(commands) = commands.as_ref() else { continue };
            loop {
                match commands.try_recv() {
                    Ok(cmd) => {
                        match self.handle_command(cmd) {
                            Ok(_)  => println!("  {}", self.status),
                            Err(_) => eprintln!("  {}", self.status),
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => break,
                }
            }
        }

        if !feed_open {
            log::info!(target: "app", "frame feed closed");
        }
        let outcome = self.performance.shutdown();
        if outcome != Outcome::Ignored {
            println!("  {}", outcome);
        }
        SessionSummary {
            frames:    self.frames,
            rejected:  self.rejected,
            recording: self.performance.last_recording(),
            program:   self.performance.program(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
