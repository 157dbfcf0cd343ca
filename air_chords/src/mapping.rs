//! Geometry → MIDI parameter mapping.
//!
//! * [`VelocityMapper`] — extension distance → note velocity, monotonic
//!   non-decreasing, clamped to `[MIN_VELOCITY, 127]` and scaled by the
//!   global volume multiplier.
//! * [`BendMapper`] — horizontal displacement → signed pitch bend, linear,
//!   clamped to a symmetric range.

use serde::{Deserialize, Serialize};

pub const MIN_VELOCITY: u8 = 20;
pub const MAX_VELOCITY: u8 = 127;

/// Largest magnitude a 14-bit pitch bend can express on both sides.
pub const MAX_BEND_RANGE: i16 = 8191;

// ════════════════════════════════════════════════════════════════════════════
// Volume
// ════════════════════════════════════════════════════════════════════════════

/// Global volume multiplier, always within `[Volume::MIN, Volume::MAX]`.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f32", into = "f32")]
pub struct Volume(f32);

impl Volume {
    pub const MIN:  f32 = 0.1;
    pub const MAX:  f32 = 2.0;
    pub const STEP: f32 = 0.1;

    pub fn new(multiplier: f32) -> Self {
        if multiplier.is_nan() {
            return Volume::default();
        }
        Volume(multiplier.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(self) -> f32 { self.0 }

    /// Step by `delta`, rounded to the 0.1 grid so repeated steps don't drift.
    pub fn adjusted(self, delta: f32) -> Self {
        Volume::new(((self.0 + delta) * 10.0).round() / 10.0)
    }

    pub fn percent(self) -> u32 { (self.0 * 100.0).round() as u32 }
}

impl Default for Volume {
    fn default() -> Self { Volume(1.0) }
}

impl From<f32> for Volume {
    fn from(v: f32) -> Self { Volume::new(v) }
}

impl From<Volume> for f32 {
    fn from(v: Volume) -> Self { v.0 }
}

// ════════════════════════════════════════════════════════════════════════════
// VelocityMapper
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityMapper {
    /// Distance at or below which the curve bottoms out.
    pub min_distance: f32,
    /// Distance at or above which the curve tops out.
    pub max_distance: f32,
    /// Exponent applied to the normalised distance; below 1 favours small
    /// movements.
    pub curve:        f32,
    /// Base velocity of the pinch chord before volume scaling.
    pub pinch_velocity: u8,
}

impl Default for VelocityMapper {
    fn default() -> Self {
        VelocityMapper {
            min_distance:   20.0,
            max_distance:   150.0,
            curve:          0.6,
            pinch_velocity: 120,
        }
    }
}

impl VelocityMapper {
    /// Velocity for an extension distance under the given volume.
    pub fn map(&self, distance: f32, volume: Volume) -> u8 {
        let span = (self.max_distance - self.min_distance).max(f32::EPSILON);
        let normalized = if distance.is_nan() {
            0.0
        } else {
            ((distance - self.min_distance) / span).clamp(0.0, 1.0)
        };
        let shaped = normalized.powf(self.curve.max(f32::EPSILON));
        let range = (MAX_VELOCITY - MIN_VELOCITY) as f32;
        clamp_velocity(MIN_VELOCITY as f32 + shaped * range * volume.get())
    }

    /// Pinch chord velocity: a fixed base under the given volume.
    pub fn pinch(&self, volume: Volume) -> u8 {
        clamp_velocity(self.pinch_velocity as f32 * volume.get())
    }
}

fn clamp_velocity(v: f32) -> u8 {
    (v.floor() as i32).clamp(MIN_VELOCITY as i32, MAX_VELOCITY as i32) as u8
}

// ════════════════════════════════════════════════════════════════════════════
// BendMapper
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BendMapper {
    /// Bend units per unit of horizontal displacement.
    pub sensitivity: f32,
    /// Symmetric bound; clamped itself to [`MAX_BEND_RANGE`].
    pub range:       i16,
}

impl Default for BendMapper {
    fn default() -> Self {
        BendMapper { sensitivity: 40.0, range: MAX_BEND_RANGE }
    }
}

impl BendMapper {
    pub fn range(&self) -> i16 {
        self.range.clamp(0, MAX_BEND_RANGE)
    }

    pub fn map(&self, displacement: f32) -> i16 {
        let range = self.range() as f32;
        let raw = (displacement * self.sensitivity).round();
        if raw.is_nan() {
            return 0;
        }
        raw.clamp(-range, range) as i16
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_endpoints() {
        let m = VelocityMapper::default();
        assert_eq!(m.map(0.0, Volume::default()), MIN_VELOCITY);
        assert_eq!(m.map(20.0, Volume::default()), MIN_VELOCITY);
        assert_eq!(m.map(150.0, Volume::default()), MAX_VELOCITY);
        assert_eq!(m.map(1_000.0, Volume::default()), MAX_VELOCITY);
    }

    #[test]
    fn velocity_is_monotonic_and_bounded() {
        let m = VelocityMapper::default();
        for vol in [0.1, 0.5, 1.0, 1.5, 2.0] {
            let vol = Volume::new(vol);
            let mut last = 0u8;
            for step in 0..400 {
                let v = m.map(step as f32 * 0.5, vol);
                assert!(v >= last, "velocity dropped at distance {}", step as f32 * 0.5);
                assert!((MIN_VELOCITY..=MAX_VELOCITY).contains(&v));
                last = v;
            }
        }
    }

    #[test]
    fn velocity_matches_curve_midpoint() {
        let m = VelocityMapper::default();
        // normalised 0.5 → 0.5^0.6 ≈ 0.6598 → 20 + 70.6 = 90
        assert_eq!(m.map(85.0, Volume::default()), 90);
    }

    #[test]
    fn volume_scales_and_never_exceeds_bound() {
        let m = VelocityMapper::default();
        let quiet = m.map(85.0, Volume::new(0.5));
        let loud  = m.map(85.0, Volume::new(2.0));
        assert!(quiet < loud);
        assert_eq!(loud, MAX_VELOCITY);
    }

    #[test]
    fn nan_distance_is_minimum() {
        let m = VelocityMapper::default();
        assert_eq!(m.map(f32::NAN, Volume::default()), MIN_VELOCITY);
    }

    #[test]
    fn pinch_velocity_scales_with_volume() {
        let m = VelocityMapper::default();
        assert_eq!(m.pinch(Volume::default()), 120);
        assert_eq!(m.pinch(Volume::new(0.5)), 60);
        assert_eq!(m.pinch(Volume::new(2.0)), MAX_VELOCITY);
        assert_eq!(m.pinch(Volume::new(0.1)), MIN_VELOCITY);
    }

    #[test]
    fn volume_is_clamped_and_steps_cleanly() {
        assert_eq!(Volume::new(5.0).get(), Volume::MAX);
        assert_eq!(Volume::new(0.0).get(), Volume::MIN);
        let mut v = Volume::default();
        for _ in 0..3 { v = v.adjusted(Volume::STEP); }
        assert_eq!(v.percent(), 130);
        for _ in 0..30 { v = v.adjusted(-Volume::STEP); }
        assert_eq!(v.get(), Volume::MIN);
    }

    #[test]
    fn bend_is_linear_then_clamped() {
        let b = BendMapper { sensitivity: 10.0, range: 1000 };
        assert_eq!(b.map(0.0), 0);
        assert_eq!(b.map(50.0), 500);
        assert_eq!(b.map(-50.0), -500);
        assert_eq!(b.map(500.0), 1000);
        assert_eq!(b.map(-500.0), -1000);
    }

    #[test]
    fn bend_range_capped_at_14_bit() {
        let b = BendMapper { sensitivity: 1000.0, range: i16::MAX };
        assert_eq!(b.map(1_000.0), MAX_BEND_RANGE);
        assert_eq!(b.map(-1_000.0), -MAX_BEND_RANGE);
    }
}
