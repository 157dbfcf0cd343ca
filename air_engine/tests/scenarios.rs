//! End-to-end behaviour of a performance: gestures in, events out.

use std::thread;
use std::time::{Duration, Instant};

use air_chords::{Scale, VelocityMapper, Volume};
use air_engine::testing::{CaptureSink, FailingSink};
use air_engine::{
    Command, EffectSettings, Effects, EffectsSink, EngineConfig, EngineError, EventBus, HeldNotes,
    NoteEvent, Outcome, Performance,
};
use air_gesture::{GestureFrame, GestureKey, HandLandmarks, HandSide, Point};

// ── fixtures ──────────────────────────────────────────────────────────────

fn setup() -> (Performance, CaptureSink) {
    let bus = EventBus::new();
    let out = CaptureSink::new("synth");
    bus.add_output(Box::new(out.clone()));
    let perf = Performance::new(EngineConfig::default(), bus).expect("default config is valid");
    (perf, out)
}

fn gestures(active: &[GestureKey], centroid_x: f32) -> GestureFrame {
    let mut f = GestureFrame {
        extension: [120.0; 5],
        pinch_distance: 80.0,
        centroid_x,
        hand_present: true,
        ..GestureFrame::absent()
    };
    for k in active {
        f.set_active(*k, true);
    }
    f
}

/// A right hand at rest around x = 300: every digit folded onto its base,
/// thumb tip 50 px left of the index tip.
fn hand(thumb_raised: bool) -> HandLandmarks {
    let mut pts = vec![Point::new(300.0, 300.0); 21];
    pts[4] = Point::new(if thumb_raised { 200.0 } else { 250.0 }, 300.0);
    HandLandmarks::from_points(HandSide::Right, pts).unwrap()
}

fn bends(events: &[NoteEvent]) -> Vec<i16> {
    events
        .iter()
        .filter_map(|e| match e {
            NoteEvent::PitchBend { value } => Some(*value),
            _ => None,
        })
        .collect()
}

fn wait_for_playback(perf: &Performance) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while perf.is_playing() {
        assert!(Instant::now() < deadline, "playback never finished");
        thread::sleep(Duration::from_millis(5));
    }
}

// ── scenarios ─────────────────────────────────────────────────────────────

#[test]
fn thumb_tap_in_d_major() {
    let (mut perf, out) = setup();
    let v = VelocityMapper::default().map(100.0, Volume::default());

    assert!(perf.process_hand(Some(&hand(false))).is_empty());
    perf.process_hand(Some(&hand(true)));
    assert!(perf.process_hand(Some(&hand(true))).is_empty());
    perf.process_hand(Some(&hand(false)));

    assert_eq!(out.events(), vec![
        NoteEvent::NoteOn { notes: vec![62, 66, 69], velocity: v },
        NoteEvent::NoteOff { notes: vec![62, 66, 69] },
    ]);
}

#[test]
fn sustained_raise_triggers_once() {
    let (mut perf, out) = setup();
    for _ in 0..30 {
        perf.process_gestures(&gestures(&[GestureKey::Ring], 0.0));
    }
    assert_eq!(out.events().iter().filter(|e| e.is_note_on()).count(), 1);
}

#[test]
fn losing_the_hand_releases_everything() {
    let (mut perf, out) = setup();
    perf.process_hand(Some(&hand(true)));
    perf.process_hand(None);
    assert_eq!(out.balance(), 0);
}

#[test]
fn pinch_bend_sweep() {
    let (mut perf, out) = setup();
    perf.process_gestures(&gestures(&[GestureKey::Pinch], 100.0));
    perf.process_gestures(&gestures(&[GestureKey::Pinch], 150.0));
    perf.process_gestures(&gestures(&[GestureKey::Pinch], 100.0));
    assert_eq!(bends(&out.events()), vec![2000, 0]);

    perf.process_gestures(&gestures(&[], 100.0));
    assert_eq!(bends(&out.events()), vec![2000, 0, 0]);
    assert_eq!(perf.bend(), 0);
}

#[test]
fn record_then_play_back() {
    let (mut perf, out) = setup();
    perf.dispatch(Command::StartRecording).unwrap();

    perf.process_gestures(&gestures(&[GestureKey::Thumb], 0.0));
    thread::sleep(Duration::from_millis(40));
    perf.process_gestures(&gestures(&[], 0.0));
    thread::sleep(Duration::from_millis(40));
    perf.process_gestures(&gestures(&[GestureKey::Pinky], 0.0));
    thread::sleep(Duration::from_millis(40));
    perf.process_gestures(&gestures(&[], 0.0));

    assert_eq!(perf.dispatch(Command::StopRecording).unwrap(), Outcome::RecordingStopped { events: 4 });
    let live = out.events();
    let take = perf.last_recording().unwrap();
    out.clear();

    let started = Instant::now();
    assert_eq!(perf.dispatch(Command::StartPlayback).unwrap(), Outcome::PlaybackStarted { events: 4 });
    wait_for_playback(&perf);

    let replayed = out.timed();
    assert_eq!(replayed.iter().map(|(_, e)| e.clone()).collect::<Vec<_>>(), live);

    let first = replayed[0].0;
    for ((at, _), rec) in replayed.iter().zip(take.events()) {
        let replay_gap = at.duration_since(first);
        let recorded_gap = rec.offset - take.events()[0].offset;
        let drift = if replay_gap > recorded_gap { replay_gap - recorded_gap } else { recorded_gap - replay_gap };
        assert!(drift < Duration::from_millis(25), "spacing drifted by {:?}", drift);
        assert!(at.duration_since(started) >= rec.offset);
    }

    // Replayed events were not re-recorded.
    assert_eq!(perf.last_recording().unwrap(), take);
    assert!(!perf.is_playing());
}

#[test]
fn empty_playback_is_reported() {
    let (mut perf, out) = setup();
    assert_eq!(perf.dispatch(Command::StartPlayback), Err(EngineError::EmptyPlayback));

    perf.dispatch(Command::StartRecording).unwrap();
    perf.dispatch(Command::StopRecording).unwrap();
    assert_eq!(perf.dispatch(Command::StartPlayback), Err(EngineError::EmptyPlayback));

    assert!(!perf.is_playing());
    assert!(!perf.is_recording());
    assert!(out.events().is_empty());
}

#[test]
fn chord_held_across_record_start_stays_out_of_the_take() {
    let (mut perf, out) = setup();
    let v = VelocityMapper::default().map(120.0, Volume::default());
    let middle = vec![66, 69, 73];

    perf.process_gestures(&gestures(&[GestureKey::Thumb], 0.0));
    perf.dispatch(Command::StartRecording).unwrap();
    perf.process_gestures(&gestures(&[], 0.0));
    assert_eq!(
        perf.dispatch(Command::StopRecording).unwrap(),
        Outcome::RecordingStopped { events: 0 }
    );
    assert_eq!(perf.dispatch(Command::StartPlayback), Err(EngineError::EmptyPlayback));

    perf.process_gestures(&gestures(&[GestureKey::Thumb], 0.0));
    perf.dispatch(Command::StartRecording).unwrap();
    perf.process_gestures(&gestures(&[GestureKey::Middle], 0.0));
    perf.process_gestures(&gestures(&[], 0.0));
    perf.dispatch(Command::StopRecording).unwrap();
    let take: Vec<NoteEvent> = perf
        .last_recording()
        .unwrap()
        .events()
        .iter()
        .map(|e| e.event.clone())
        .collect();
    assert_eq!(take, vec![
        NoteEvent::NoteOn { notes: middle.clone(), velocity: v },
        NoteEvent::NoteOff { notes: middle.clone() },
    ]);

    // A live middle chord keeps its pitches through the replay.
    perf.process_gestures(&gestures(&[GestureKey::Middle], 0.0));
    out.clear();
    perf.dispatch(Command::StartPlayback).unwrap();
    wait_for_playback(&perf);
    assert_eq!(out.events(), take);
    assert!(perf.sounding().iter().any(|(k, _)| *k == GestureKey::Middle));
}

#[test]
fn shutdown_flushes_sustained_releases() {
    let effects = Effects::new(EffectSettings { sustain: Duration::from_secs(10), echo: false });
    let bus = EventBus::new();
    let out = CaptureSink::new("synth");
    bus.add_output(Box::new(EffectsSink::new(Box::new(out.clone()), effects.clone())));
    let config = EngineConfig { effects, ..EngineConfig::default() };
    let mut perf = Performance::new(config, bus).unwrap();

    perf.process_gestures(&gestures(&[GestureKey::Index], 0.0));
    perf.process_gestures(&gestures(&[], 0.0));
    perf.process_gestures(&gestures(&[GestureKey::Ring], 0.0));
    assert!(!out.events().iter().any(NoteEvent::is_note_off));

    perf.shutdown();
    let mut held = HeldNotes::default();
    for e in out.events() {
        held.track(&e);
    }
    assert!(held.is_clear(), "left sounding after shutdown: {:?}", out.events());
}

#[test]
fn shutdown_releases_held_chords() {
    let (mut perf, out) = setup();
    perf.process_gestures(&gestures(&[GestureKey::Index, GestureKey::Middle], 0.0));
    out.clear();

    assert_eq!(perf.dispatch(Command::Shutdown).unwrap(), Outcome::ShutDown { released: 2 });
    assert_eq!(out.events(), vec![
        NoteEvent::NoteOff { notes: vec![64, 67, 71] },
        NoteEvent::NoteOff { notes: vec![66, 69, 73] },
    ]);
}

#[test]
fn scale_switch_mid_hold() {
    let (mut perf, out) = setup();
    perf.process_gestures(&gestures(&[GestureKey::Ring], 0.0));
    perf.dispatch(Command::SetScale(Scale::Pentatonic)).unwrap();
    perf.process_gestures(&gestures(&[GestureKey::Ring], 0.0));
    perf.process_gestures(&gestures(&[], 0.0));
    perf.process_gestures(&gestures(&[GestureKey::Ring], 0.0));

    let events = out.events();
    assert!(matches!(&events[0], NoteEvent::NoteOn { notes, .. } if notes == &[67, 71, 74]));
    assert_eq!(events[1], NoteEvent::NoteOff { notes: vec![67, 71, 74] });
    assert!(matches!(&events[2], NoteEvent::NoteOn { notes, .. } if notes == &[67, 72, 74]));
}

#[test]
fn recording_cancels_playback_cleanly() {
    let (mut perf, out) = setup();
    perf.dispatch(Command::StartRecording).unwrap();
    perf.process_gestures(&gestures(&[GestureKey::Thumb], 0.0));
    thread::sleep(Duration::from_millis(300));
    perf.dispatch(Command::StopRecording).unwrap();
    perf.process_gestures(&gestures(&[], 0.0));
    out.clear();

    perf.dispatch(Command::StartPlayback).unwrap();
    thread::sleep(Duration::from_millis(50));
    let outcome = perf.dispatch(Command::StartRecording).unwrap();

    assert_eq!(outcome, Outcome::RecordingStarted { cancelled_playback: true });
    assert!(!perf.is_playing());
    assert_eq!(out.balance(), 0);
}

#[test]
fn stop_playback_when_idle() {
    let (mut perf, _) = setup();
    assert_eq!(perf.dispatch(Command::StopPlayback).unwrap(), Outcome::NotPlaying);
}

#[test]
fn failing_sink_leaves_bookkeeping_intact() {
    let bus = EventBus::new();
    let out = CaptureSink::new("synth");
    bus.add_output(Box::new(FailingSink));
    bus.add_output(Box::new(out.clone()));
    let mut perf = Performance::new(EngineConfig::default(), bus.clone()).unwrap();

    perf.process_gestures(&gestures(&[GestureKey::Thumb], 0.0));
    perf.process_gestures(&gestures(&[], 0.0));
    assert_eq!(out.events().len(), 2);
    // Startup program change plus two events.
    assert_eq!(bus.failures(), 3);
}

#[test]
fn per_gesture_balance_on_every_prefix() {
    let (mut perf, out) = setup();
    let mut seed: u64 = 0x9e37_79b9_7f4a_7c15;
    for _ in 0..1_000 {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        let active: Vec<GestureKey> = GestureKey::ALL
            .into_iter()
            .filter(|k| (seed >> (k.index() * 5)) & 3 == 0)
            .collect();
        perf.process_gestures(&gestures(&active, (seed % 400) as f32));

        let balance = out.balance();
        assert!((0..=GestureKey::COUNT as i64).contains(&balance));
        assert_eq!(balance as usize, perf.sounding().len());
    }
    perf.shutdown();
    assert_eq!(out.balance(), 0);
}
