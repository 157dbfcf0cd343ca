//! Output-side sustain and echo.
//!
//! [`EffectsSink`] wraps a live output.  The note state machine and the
//! recorder keep seeing plain on/off pairs; only what reaches the wrapped
//! output is stretched or repeated.
//!
//! | effect  | behaviour at the output                                          |
//! |---------|------------------------------------------------------------------|
//! | sustain | a release is held back for the sustain time                      |
//! | retrigger | striking a pitch whose release is pending cancels that release |
//! | echo    | the first note of each chord is struck again at 80 and 160 ms    |
//!
//! Held-back releases and echoes are fired by a timer thread that takes the
//! same lock as the bus-side calls, so the output never sees two writers at
//! once.  [`EventSink::flush`] and dropping the wrapper fire every pending
//! release immediately.

use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::SinkError;
use crate::events::EventSink;
use crate::ledger::HeldNotes;

/// Echo repeats: delay after the strike, velocity factor.
const ECHOES: [(Duration, f32); 2] = [
    (Duration::from_millis(80),  0.7),
    (Duration::from_millis(160), 0.4),
];

// ════════════════════════════════════════════════════════════════════════════
// Effects — shared, live-adjustable settings
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EffectSettings {
    /// How long a release is held back.  Zero passes releases straight on.
    pub sustain: Duration,
    pub echo:    bool,
}

/// Handle to the settings every [`EffectsSink`] reads.  Clones share them,
/// so a change made through the performance reaches the outputs at once.
#[derive(Clone, Debug, Default)]
pub struct Effects {
    settings: Arc<Mutex<EffectSettings>>,
}

impl Effects {
    pub fn new(settings: EffectSettings) -> Self {
        Effects { settings: Arc::new(Mutex::new(settings)) }
    }

    pub fn settings(&self) -> EffectSettings { *self.settings.lock() }

    pub fn set_sustain(&self, sustain: Duration) {
        self.settings.lock().sustain = sustain;
    }

    pub fn set_echo(&self, on: bool) {
        self.settings.lock().echo = on;
    }

    /// Flip echo; returns the new state.
    pub fn toggle_echo(&self) -> bool {
        let mut s = self.settings.lock();
        s.echo = !s.echo;
        s.echo
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tail — the wrapped output and what is scheduled for it
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug)]
enum Pending {
    Release { at: Instant, note: u8 },
    Echo    { at: Instant, note: u8, velocity: u8 },
}

impl Pending {
    fn at(&self) -> Instant {
        match *self {
            Pending::Release { at, .. } | Pending::Echo { at, .. } => at,
        }
    }
}

struct Tail {
    out:      Box<dyn EventSink>,
    pending:  Vec<Pending>,
    /// Note-ons forwarded and not yet matched by a forwarded note-off.
    sounding: HeldNotes,
}

impl Tail {
    fn forward_on(&mut self, notes: &[u8], velocity: u8) -> Result<(), SinkError> {
        if notes.is_empty() {
            return Ok(());
        }
        for &n in notes {
            self.sounding.hold(n);
        }
        self.out.note_on(notes, velocity)
    }

    fn forward_off(&mut self, notes: &[u8]) -> Result<(), SinkError> {
        if notes.is_empty() {
            return Ok(());
        }
        for &n in notes {
            self.sounding.release(n);
        }
        self.out.note_off(notes)
    }

    /// Drop one pending release of `note`.  `true` if there was one.
    fn cancel_release(&mut self, note: u8) -> bool {
        let found = self
            .pending
            .iter()
            .position(|p| matches!(p, Pending::Release { note: n, .. } if *n == note));
        match found {
            Some(i) => {
                self.pending.remove(i);
                true
            }
            None => false,
        }
    }

    fn pending_releases(&self) -> usize {
        self.pending.iter().filter(|p| matches!(p, Pending::Release { .. })).count()
    }

    /// Fire everything due by `now`, releases sharing a deadline as one
    /// note-off.  Returns the next deadline.
    fn fire_due(&mut self, now: Instant) -> Option<Instant> {
        let (mut due, rest): (Vec<Pending>, Vec<Pending>) =
            std::mem::take(&mut self.pending).into_iter().partition(|p| p.at() <= now);
        self.pending = rest;
        due.sort_by_key(Pending::at);

        let mut batch: Vec<u8> = Vec::new();
        let mut batch_at: Option<Instant> = None;
        for p in due {
            match p {
                Pending::Release { at, note } => {
                    if batch_at.is_some_and(|b| b != at) {
                        self.release_batch(&mut batch);
                    }
                    batch_at = Some(at);
                    batch.push(note);
                }
                Pending::Echo { note, velocity, .. } => {
                    self.release_batch(&mut batch);
                    batch_at = None;
                    self.echo(note, velocity);
                }
            }
        }
        self.release_batch(&mut batch);

        self.pending.iter().map(Pending::at).min()
    }

    /// Fire every pending release now and forget the echoes.
    fn fire_all(&mut self) {
        let mut notes: Vec<u8> = self
            .pending
            .drain(..)
            .filter_map(|p| match p {
                Pending::Release { note, .. } => Some(note),
                Pending::Echo { .. } => None,
            })
            .collect();
        self.release_batch(&mut notes);
    }

    fn release_batch(&mut self, notes: &mut Vec<u8>) {
        if notes.is_empty() {
            return;
        }
        if let Err(e) = self.forward_off(notes) {
            log::warn!(target: "effects", "sustained release to '{}' failed: {}", self.out.name(), e);
        }
        notes.clear();
    }

    /// Strike a still-sounding note again.  The off/on pair leaves the
    /// output's own note counts unchanged.
    fn echo(&mut self, note: u8, velocity: u8) {
        if !self.sounding.holds(note) {
            return;
        }
        let result = self
            .out
            .note_off(&[note])
            .and_then(|()| self.out.note_on(&[note], velocity));
        if let Err(e) = result {
            log::warn!(target: "effects", "echo to '{}' failed: {}", self.out.name(), e);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// EffectsSink
// ════════════════════════════════════════════════════════════════════════════

pub struct EffectsSink {
    name:    String,
    effects: Effects,
    tail:    Arc<Mutex<Tail>>,
    wake_tx: Option<Sender<()>>,
    timer:   Option<JoinHandle<()>>,
}

impl EffectsSink {
    pub fn new(out: Box<dyn EventSink>, effects: Effects) -> Self {
        let name = out.name().to_string();
        let tail = Arc::new(Mutex::new(Tail {
            out,
            pending:  Vec::new(),
            sounding: HeldNotes::default(),
        }));
        let (wake_tx, wake_rx) = mpsc::channel::<()>();
        let timer = {
            let tail = Arc::clone(&tail);
            thread::spawn(move || timer_thread(tail, wake_rx))
        };
        EffectsSink { name, effects, tail, wake_tx: Some(wake_tx), timer: Some(timer) }
    }

    /// Releases waiting for their sustain to run out.
    pub fn pending_releases(&self) -> usize {
        self.tail.lock().pending_releases()
    }

    fn wake(&self) {
        if let Some(tx) = &self.wake_tx {
            // A stopped timer means the sink is being dropped.
            let _ = tx.send(());
        }
    }
}

impl EventSink for EffectsSink {
    fn name(&self) -> &str { &self.name }

    fn note_on(&mut self, notes: &[u8], velocity: u8) -> Result<(), SinkError> {
        let settings = self.effects.settings();
        let now = Instant::now();
        let result = {
            let mut tail = self.tail.lock();
            let fresh: Vec<u8> = notes.iter().copied().filter(|&n| !tail.cancel_release(n)).collect();
            if fresh.len() < notes.len() {
                log::debug!(target: "effects", "retrigger keeps sustained notes sounding: {:?}", notes);
            }
            let result = tail.forward_on(&fresh, velocity);
            if let (true, Some(&first)) = (settings.echo, notes.first()) {
                for (delay, factor) in ECHOES {
                    let velocity = (velocity as f32 * factor).round().clamp(1.0, 127.0) as u8;
                    tail.pending.push(Pending::Echo { at: now + delay, note: first, velocity });
                }
            }
            result
        };
        if settings.echo {
            self.wake();
        }
        result
    }

    fn note_off(&mut self, notes: &[u8]) -> Result<(), SinkError> {
        let sustain = self.effects.settings().sustain;
        if sustain.is_zero() {
            return self.tail.lock().forward_off(notes);
        }
        let at = Instant::now() + sustain;
        self.tail
            .lock()
            .pending
            .extend(notes.iter().map(|&note| Pending::Release { at, note }));
        self.wake();
        Ok(())
    }

    fn pitch_bend(&mut self, value: i16) -> Result<(), SinkError> {
        self.tail.lock().out.pitch_bend(value)
    }

    fn program_change(&mut self, program: u8) -> Result<(), SinkError> {
        self.tail.lock().out.program_change(program)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        let mut tail = self.tail.lock();
        tail.fire_all();
        tail.out.flush()
    }
}

impl Drop for EffectsSink {
    fn drop(&mut self) {
        drop(self.wake_tx.take());
        if let Some(timer) = self.timer.take() {
            if timer.join().is_err() {
                log::error!(target: "effects", "effects timer panicked");
            }
        }
    }
}

fn timer_thread(tail: Arc<Mutex<Tail>>, wake_rx: Receiver<()>) {
    loop {
        let next = tail.lock().fire_due(Instant::now());
        let open = match next {
            Some(at) => !matches!(
                wake_rx.recv_timeout(at.saturating_duration_since(Instant::now())),
                Err(RecvTimeoutError::Disconnected)
            ),
            None => wake_rx.recv().is_ok(),
        };
        if !open {
            break;
        }
    }
    tail.lock().fire_all();
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
