//! Pose frame sources: a JSON-lines landmark feed, or a simulated hand.
//!
//! Consumers only see [`PoseFrame`]s arriving over an `mpsc` channel and do
//! not care where they came from.  The channel closing means the feed has
//! ended.
//!
//! Feed format, one frame per line:
//!
//! ```text
//! {"hands": [{"side": "right", "landmarks": [[x, y], [x, y], ... 21 points]}]}
//! {"hands": []}
//! ```

use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use air_gesture::{Digit, HandLandmarks, HandSide, Landmark, Point, PoseFrame, LANDMARK_COUNT};

// ════════════════════════════════════════════════════════════════════════════
// FrameSource trait — unified interface for feeds and simulation
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`PoseFrame`]s over a channel.
pub trait FrameSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<PoseFrame>);
}

/// Spawn a frame source on its own thread and return the receiving end.
pub fn spawn_frame_source<S: FrameSource>(source: S) -> Receiver<PoseFrame> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || Box::new(source).run(tx));
    rx
}

// ════════════════════════════════════════════════════════════════════════════
// JsonLinesSource
// ════════════════════════════════════════════════════════════════════════════

/// Reads one JSON [`PoseFrame`] per line.
///
/// A line that does not parse is logged and delivered as an empty frame so
/// the performance sees "no hand" rather than a stale one.
pub struct JsonLinesSource {
    reader: Box<dyn BufRead + Send>,
    /// Sleep between frames; `None` for a producer that paces itself.
    pace:   Option<Duration>,
}

impl JsonLinesSource {
    pub fn new(reader: Box<dyn BufRead + Send>, pace: Option<Duration>) -> Self {
        JsonLinesSource { reader, pace }
    }
}

impl FrameSource for JsonLinesSource {
    fn run(self: Box<Self>, tx: Sender<PoseFrame>) {
        let JsonLinesSource { reader, pace } = *self;
        for (lineno, line) in reader.lines().enumerate() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    log::error!(target: "source", "feed read failed at line {}: {}", lineno + 1, e);
                    return;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let frame = parse_frame(&line).unwrap_or_else(|e| {
                log::warn!(target: "source", "line {}: {}", lineno + 1, e);
                PoseFrame::empty()
            });
            if tx.send(frame).is_err() {
                return;
            }
            if let Some(pace) = pace {
                thread::sleep(pace);
            }
        }
        log::info!(target: "source", "landmark feed ended");
    }
}

pub fn parse_frame(line: &str) -> Result<PoseFrame, serde_json::Error> {
    serde_json::from_str(line)
}

// ════════════════════════════════════════════════════════════════════════════
// SimulatedHand — a scripted performance (always available)
// ════════════════════════════════════════════════════════════════════════════

/// One pose of the simulated hand.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HandPose {
    pub raised:     [bool; 5],
    pub pinch:      bool,
    pub centroid_x: f32,
}

impl HandPose {
    pub fn with(digits: &[Digit]) -> Self {
        let mut pose = HandPose { centroid_x: 320.0, ..HandPose::default() };
        for d in digits {
            pose.raised[d.index()] = true;
        }
        pose
    }

    pub fn pinching(centroid_x: f32) -> Self {
        HandPose { pinch: true, centroid_x, ..HandPose::default() }
    }
}

/// Plays a short looping script: each digit in turn, a two-finger chord,
/// then a pinch swept left and right.
pub struct SimulatedHand {
    frame_interval: Duration,
    /// Number of passes through the script; `None` loops until the
    /// receiver goes away.
    passes:         Option<usize>,
}

impl SimulatedHand {
    pub fn new(frame_interval: Duration, passes: Option<usize>) -> Self {
        SimulatedHand { frame_interval, passes }
    }

    /// The scripted poses, one entry per frame.
    pub fn script() -> Vec<Option<HandPose>> {
        let mut frames = Vec::new();
        let mut hold = |pose: Option<HandPose>, n: usize| frames.extend(std::iter::repeat(pose).take(n));

        for d in Digit::ALL {
            hold(Some(HandPose::with(&[d])), 12);
            hold(Some(HandPose::with(&[])), 6);
        }
        hold(Some(HandPose::with(&[Digit::Index, Digit::Ring])), 18);
        hold(Some(HandPose::with(&[])), 6);
        hold(None, 6);

        for step in 0..=20 {
            hold(Some(HandPose::pinching(320.0 + step as f32 * 4.0)), 1);
        }
        for step in (0..=20).rev() {
            hold(Some(HandPose::pinching(320.0 - (20 - step) as f32 * 4.0)), 1);
        }
        hold(Some(HandPose::with(&[])), 12);
        frames
    }
}

impl FrameSource for SimulatedHand {
    fn run(self: Box<Self>, tx: Sender<PoseFrame>) {
        let script = SimulatedHand::script();
        let mut pass = 0;
        while self.passes.map_or(true, |n| pass < n) {
            for pose in &script {
                let frame = match pose {
                    Some(p) => PoseFrame::single(&synthesize(p, HandSide::Right)),
                    None    => PoseFrame::empty(),
                };
                if tx.send(frame).is_err() {
                    return;
                }
                thread::sleep(self.frame_interval);
            }
            pass += 1;
        }
        log::info!(target: "source", "simulation finished after {} passes", pass);
    }
}

// ── landmark synthesis ────────────────────────────────────────────────────

/// Horizontal offset of each digit's base joint from the palm centre.
const DIGIT_OFFSET: [f32; 5] = [-60.0, -20.0, 0.0, 20.0, 40.0];
const BASE_Y:       f32 = 300.0;
const RAISED_REACH: f32 = 100.0;
const FOLDED_REACH: f32 = 30.0;

/// Build a 21-point hand whose measured gestures match `pose` under the
/// default thresholds.
pub fn synthesize(pose: &HandPose, side: HandSide) -> HandLandmarks {
    let cx = pose.centroid_x;
    let mut pts = vec![Point::new(cx, BASE_Y + 100.0); LANDMARK_COUNT];

    for digit in Digit::ALL {
        let (tip, base) = digit.landmarks();
        let base_pt = Point::new(cx + DIGIT_OFFSET[digit.index()], BASE_Y);
        let reach = if pose.raised[digit.index()] { RAISED_REACH } else { FOLDED_REACH };
        let tip_pt = match digit {
            // The thumb opens sideways, the fingers upwards.
            Digit::Thumb => Point::new(base_pt.x - reach, base_pt.y),
            _            => Point::new(base_pt.x, base_pt.y - reach),
        };
        let (b, t) = (base.index(), tip.index());
        pts[b] = base_pt;
        pts[t] = tip_pt;
        // Joints in between, evenly spaced.
        for j in (b + 1)..t {
            let f = (j - b) as f32 / (t - b) as f32;
            pts[j] = Point::new(base_pt.x + (tip_pt.x - base_pt.x) * f, base_pt.y + (tip_pt.y - base_pt.y) * f);
        }
    }
    pts[Landmark::ThumbCmc.index()] = Point::new(cx - 40.0, BASE_Y + 60.0);

    if pose.pinch {
        let index_tip = pts[Landmark::IndexTip.index()];
        pts[Landmark::ThumbTip.index()] = Point::new(index_tip.x - 5.0, index_tip.y);
    }

    // Recentre so the landmark mean sits exactly on the requested x.
    let mean = pts.iter().map(|p| p.x).sum::<f32>() / LANDMARK_COUNT as f32;
    for p in pts.iter_mut() {
        p.x += cx - mean;
    }

    match HandLandmarks::from_points(side, pts) {
        Ok(hand) => hand,
        // Every coordinate above is finite and there are exactly 21.
        Err(e) => unreachable!("synthesized hand invalid: {}", e),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
