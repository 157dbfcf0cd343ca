//! Timed replay of a [`Recording`] on its own thread.
//!
//! The thread sleeps on its cancel channel until each event's deadline, so
//! a cancel lands before the next emission rather than after it.  It keeps
//! its own ledger of what it switched on and silences that on the way out,
//! whether the take ran to the end or was cut short.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::events::{EventBus, Route};
use crate::ledger::HeldNotes;
use crate::recorder::Recording;

/// What a finished playback did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlaybackReport {
    /// Recorded events emitted.
    pub emitted:   usize,
    /// Closing events emitted after the last recorded one.
    pub flushed:   usize,
    pub cancelled: bool,
}

// ════════════════════════════════════════════════════════════════════════════
// Player — handle to the playback thread
// ════════════════════════════════════════════════════════════════════════════

/// Dropping the handle cancels the playback and waits for its flush.
pub struct Player {
    cancel_tx: Sender<()>,
    handle:    Option<JoinHandle<PlaybackReport>>,
    length:    usize,
}

impl Player {
    /// Start replaying `recording` to the bus's outputs.
    pub fn spawn(recording: Recording, bus: EventBus) -> Self {
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
        let length = recording.len();
        log::info!(
            target: "player",
            "playing {} events over {:.2}s",
            length,
            recording.duration().as_secs_f32()
        );

        let handle = thread::spawn(move || playback_thread(recording, bus, cancel_rx));
        Player { cancel_tx, handle: Some(handle), length }
    }

    /// Number of events in the take being played.
    pub fn len(&self) -> usize { self.length }

    pub fn is_empty(&self) -> bool { self.length == 0 }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Stop now.  Returns once held notes have been released.
    pub fn cancel(mut self) -> PlaybackReport {
        self.finish(true)
    }

    /// Wait for the take to play out.
    pub fn join(mut self) -> PlaybackReport {
        self.finish(false)
    }

    fn finish(&mut self, cancel: bool) -> PlaybackReport {
        let Some(handle) = self.handle.take() else {
            return PlaybackReport::default();
        };
        if cancel {
            // The thread may already be gone; a closed channel is fine.
            let _ = self.cancel_tx.send(());
        }
        match handle.join() {
            Ok(report) => report,
            Err(_) => {
                log::error!(target: "player", "playback thread panicked");
                PlaybackReport { cancelled: true, ..PlaybackReport::default() }
            }
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.finish(true);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// playback_thread — the actual loop
// ════════════════════════════════════════════════════════════════════════════

fn playback_thread(recording: Recording, bus: EventBus, cancel_rx: Receiver<()>) -> PlaybackReport {
    let start = Instant::now();
    let mut held = HeldNotes::default();
    let mut report = PlaybackReport::default();

    for rec in recording.events() {
        if wait_until(start + rec.offset, &cancel_rx) {
            report.cancelled = true;
            break;
        }
        bus.emit(Route::Playback, &rec.event);
        held.track(&rec.event);
        report.emitted += 1;
    }

    for event in held.close() {
        bus.emit(Route::Playback, &event);
        report.flushed += 1;
    }

    log::info!(
        target: "player",
        "playback {} after {} events ({} flushed)",
        if report.cancelled { "cancelled" } else { "finished" },
        report.emitted,
        report.flushed
    );
    report
}

/// Block until `deadline`.  Returns `true` if cancelled first; a dropped
/// handle counts as a cancel.
fn wait_until(deadline: Instant, cancel_rx: &Receiver<()>) -> bool {
    loop {
        let now = Instant::now();
        if now >= deadline {
            return !matches!(cancel_rx.try_recv(), Err(TryRecvError::Empty));
        }
        match cancel_rx.recv_timeout(deadline - now) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return true,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::events::NoteEvent;
    use crate::recorder::RecordedEvent;
    use crate::testing::CaptureSink;

    fn at(ms: u64, event: NoteEvent) -> RecordedEvent {
        RecordedEvent { offset: Duration::from_millis(ms), event }
    }

    fn bus_with_capture() -> (EventBus, CaptureSink) {
        let bus = EventBus::new();
        let out = CaptureSink::new("out");
        bus.add_output(Box::new(out.clone()));
        (bus, out)
    }

    #[test]
    fn plays_in_order_with_spacing() {
        let (bus, out) = bus_with_capture();
        let take = Recording::new(vec![
            at(0,   NoteEvent::NoteOn { notes: vec![60], velocity: 80 }),
            at(60,  NoteEvent::NoteOff { notes: vec![60] }),
            at(120, NoteEvent::NoteOn { notes: vec![62], velocity: 81 }),
            at(180, NoteEvent::NoteOff { notes: vec![62] }),
        ]);
        let started = Instant::now();
        let report = Player::spawn(take.clone(), bus).join();

        assert_eq!(report, PlaybackReport { emitted: 4, flushed: 0, cancelled: false });
        let got = out.timed();
        let events: Vec<NoteEvent> = got.iter().map(|(_, e)| e.clone()).collect();
        let want: Vec<NoteEvent> = take.events().iter().map(|r| r.event.clone()).collect();
        assert_eq!(events, want);
        for ((t, _), rec) in got.iter().zip(take.events()) {
            let late = t.duration_since(started).saturating_sub(rec.offset);
            assert!(t.duration_since(started) >= rec.offset);
            assert!(late < Duration::from_millis(50), "event late by {:?}", late);
        }
    }

    #[test]
    fn cancel_flushes_what_was_started() {
        let (bus, out) = bus_with_capture();
        let take = Recording::new(vec![
            at(0,      NoteEvent::NoteOn { notes: vec![62, 66, 69], velocity: 90 }),
            at(0,      NoteEvent::PitchBend { value: 500 }),
            at(10_000, NoteEvent::NoteOff { notes: vec![62, 66, 69] }),
        ]);
        let player = Player::spawn(take, bus);
        thread::sleep(Duration::from_millis(50));
        let report = player.cancel();

        assert!(report.cancelled);
        assert_eq!(report.emitted, 2);
        assert_eq!(out.events()[2..], [
            NoteEvent::NoteOff { notes: vec![62, 66, 69] },
            NoteEvent::PitchBend { value: 0 },
        ]);
        assert_eq!(out.balance(), 0);
    }

    #[test]
    fn drop_cancels() {
        let (bus, out) = bus_with_capture();
        let take = Recording::new(vec![
            at(0,      NoteEvent::NoteOn { notes: vec![70], velocity: 90 }),
            at(10_000, NoteEvent::NoteOff { notes: vec![70] }),
        ]);
        let player = Player::spawn(take, bus);
        thread::sleep(Duration::from_millis(30));
        drop(player);
        assert_eq!(out.balance(), 0);
    }

    #[test]
    fn playback_does_not_feed_taps() {
        let (bus, _out) = bus_with_capture();
        let tap = CaptureSink::new("tap");
        bus.add_tap(Box::new(tap.clone()));
        let take = Recording::new(vec![at(0, NoteEvent::PitchBend { value: 1 })]);
        Player::spawn(take, bus).join();
        assert!(tap.events().is_empty());
    }
}
