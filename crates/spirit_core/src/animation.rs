//! Morph-target weight animation
//!
//! A [`MorphClip`] holds keyframed influence weights for every morph target
//! of one mesh. A [`MorphPlayer`] loops a clip over a fixed playback period:
//! the clip is time-remapped onto the period rather than sped up, so the
//! gait cycle has the same length whatever the clip's authored duration.

use crate::error::{Result, SpiritError};
use crate::mesh::MeshSource;

/// Playback period used when none is configured (one time unit per cycle)
pub const DEFAULT_PLAYBACK_PERIOD: f32 = 1.0;

/// Keyframe interpolation mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    /// Hold the previous keyframe
    Step,
    /// Linear blend between keyframes
    #[default]
    Linear,
    /// Hermite spline with per-keyframe in/out tangents
    CubicSpline,
}

/// Keyframed morph weights for a single mesh
#[derive(Clone, Debug)]
pub struct MorphClip {
    /// Clip name
    pub name: String,
    /// Keyframe times in seconds (non-decreasing)
    times: Vec<f32>,
    /// Keyframe-major weights; cubic clips store (in, value, out) blocks
    values: Vec<f32>,
    /// Number of morph targets animated
    target_count: usize,
    /// Interpolation mode
    interpolation: Interpolation,
}

impl MorphClip {
    /// Create a clip, checking keyframe/value counts
    pub fn new(
        name: impl Into<String>,
        times: Vec<f32>,
        values: Vec<f32>,
        target_count: usize,
        interpolation: Interpolation,
    ) -> Result<Self> {
        if times.is_empty() {
            return Err(SpiritError::Asset("animation clip has no keyframes".into()));
        }
        if target_count == 0 {
            return Err(SpiritError::Asset("animation clip animates no targets".into()));
        }
        if times.iter().any(|t| !t.is_finite()) || times.windows(2).any(|w| w[1] < w[0]) {
            return Err(SpiritError::Asset(
                "keyframe times must be finite and non-decreasing".into(),
            ));
        }

        let per_key = match interpolation {
            Interpolation::CubicSpline => target_count * 3,
            _ => target_count,
        };
        if values.len() != times.len() * per_key {
            return Err(SpiritError::Asset(format!(
                "expected {} weight values for {} keyframes, found {}",
                times.len() * per_key,
                times.len(),
                values.len()
            )));
        }

        Ok(Self {
            name: name.into(),
            times,
            values,
            target_count,
            interpolation,
        })
    }

    /// Authored clip length (time of the last keyframe)
    pub fn duration(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    pub fn keyframe_count(&self) -> usize {
        self.times.len()
    }

    /// Number of animated morph targets
    pub fn target_count(&self) -> usize {
        self.target_count
    }

    /// Interpolation mode
    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    fn value(&self, key: usize, target: usize) -> f32 {
        match self.interpolation {
            Interpolation::CubicSpline => {
                self.values[key * self.target_count * 3 + self.target_count + target]
            }
            _ => self.values[key * self.target_count + target],
        }
    }

    fn in_tangent(&self, key: usize, target: usize) -> f32 {
        self.values[key * self.target_count * 3 + target]
    }

    fn out_tangent(&self, key: usize, target: usize) -> f32 {
        self.values[key * self.target_count * 3 + self.target_count * 2 + target]
    }

    /// Evaluate the weights at clip time `t` (clamped to the keyframe range)
    ///
    /// Writes `min(out.len(), target_count)` weights.
    pub fn sample(&self, t: f32, out: &mut [f32]) {
        let count = out.len().min(self.target_count);
        let last = self.times.len() - 1;
        let t = t.clamp(self.times[0], self.times[last]);

        // Segment start: last keyframe at or before t
        let key = self.times.partition_point(|&k| k <= t).saturating_sub(1);

        if key >= last {
            for (target, w) in out.iter_mut().take(count).enumerate() {
                *w = self.value(last, target);
            }
            return;
        }

        let t0 = self.times[key];
        let t1 = self.times[key + 1];
        let span = t1 - t0;
        let s = if span > 0.0 { (t - t0) / span } else { 0.0 };

        for (target, w) in out.iter_mut().take(count).enumerate() {
            let v0 = self.value(key, target);
            let v1 = self.value(key + 1, target);
            *w = match self.interpolation {
                Interpolation::Step => v0,
                Interpolation::Linear => v0 + (v1 - v0) * s,
                Interpolation::CubicSpline => {
                    let s2 = s * s;
                    let s3 = s2 * s;
                    let b0 = self.out_tangent(key, target) * span;
                    let a1 = self.in_tangent(key + 1, target) * span;
                    (2.0 * s3 - 3.0 * s2 + 1.0) * v0
                        + (s3 - 2.0 * s2 + s) * b0
                        + (-2.0 * s3 + 3.0 * s2) * v1
                        + (s3 - s2) * a1
                }
            };
        }
    }
}

/// Loops a morph clip at a fixed playback period
#[derive(Clone, Debug)]
pub struct MorphPlayer {
    clip: MorphClip,
    period: f32,
    time: f32,
    weights: Vec<f32>,
    playing: bool,
}

impl MorphPlayer {
    /// Start playing `clip`, one full cycle every `period` seconds
    pub fn new(clip: MorphClip, period: f32) -> Result<Self> {
        if !period.is_finite() || period <= 0.0 {
            return Err(SpiritError::Config(format!(
                "playback period must be positive, got {}",
                period
            )));
        }

        let mut weights = vec![0.0; clip.target_count()];
        clip.sample(0.0, &mut weights);

        Ok(Self {
            clip,
            period,
            time: 0.0,
            weights,
            playing: true,
        })
    }

    /// The clip being played
    pub fn clip(&self) -> &MorphClip {
        &self.clip
    }

    /// Position within the current cycle, in `[0, period)`
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Whether playback is running
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Pause or resume playback
    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    /// Advance the playback clock and re-evaluate the weights
    pub fn advance(&mut self, dt: f32) -> &[f32] {
        if self.playing {
            self.time = (self.time + dt).rem_euclid(self.period);
            let clip_time = self.time / self.period * self.clip.duration();
            self.clip.sample(clip_time, &mut self.weights);
        }
        &self.weights
    }

    /// Current weights
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Write the current weights into a mesh's influences
    pub fn apply(&self, mesh: &mut MeshSource) {
        mesh.set_influences(&self.weights);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> MorphClip {
        // two targets, cross-fading over 2 seconds
        MorphClip::new(
            "gallop",
            vec![0.0, 1.0, 2.0],
            vec![1.0, 0.0, 0.0, 1.0, 1.0, 0.0],
            2,
            Interpolation::Linear,
        )
        .unwrap()
    }

    #[test]
    fn test_linear_sampling() {
        let clip = ramp();
        let mut w = [0.0; 2];

        clip.sample(0.5, &mut w);
        assert!((w[0] - 0.5).abs() < 1e-6);
        assert!((w[1] - 0.5).abs() < 1e-6);

        clip.sample(5.0, &mut w);
        assert_eq!(w, [1.0, 0.0]);
    }

    #[test]
    fn test_step_sampling() {
        let clip = MorphClip::new(
            "step",
            vec![0.0, 1.0],
            vec![0.2, 0.8],
            1,
            Interpolation::Step,
        )
        .unwrap();
        let mut w = [0.0];
        clip.sample(0.99, &mut w);
        assert_eq!(w[0], 0.2);
        clip.sample(1.0, &mut w);
        assert_eq!(w[0], 0.8);
    }

    #[test]
    fn test_cubic_spline_hits_keyframes() {
        // (in, value, out) per key, one target, flat tangents
        let clip = MorphClip::new(
            "cubic",
            vec![0.0, 1.0],
            vec![0.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            1,
            Interpolation::CubicSpline,
        )
        .unwrap();
        let mut w = [0.0];
        clip.sample(0.0, &mut w);
        assert!(w[0].abs() < 1e-6);
        clip.sample(0.5, &mut w);
        assert!((w[0] - 0.5).abs() < 1e-6);
        clip.sample(1.0, &mut w);
        assert!((w[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_mismatched_values() {
        let err = MorphClip::new("bad", vec![0.0, 1.0], vec![0.0; 3], 2, Interpolation::Linear);
        assert!(err.is_err());
    }

    #[test]
    fn test_player_remaps_time_to_period() {
        // authored over 2s, played once per 1s
        let mut player = MorphPlayer::new(ramp(), 1.0).unwrap();

        let w = player.advance(0.25).to_vec();
        assert!((w[0] - 0.5).abs() < 1e-5);

        // wraps around the period
        player.advance(1.0);
        assert!((player.time() - 0.25).abs() < 1e-5);
        assert!((player.weights()[0] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_player_applies_weights_to_mesh() {
        let mut mesh = MeshSource::new(vec![glam::Vec3::ZERO; 3])
            .with_morph_target(vec![glam::Vec3::X; 3])
            .with_morph_target(vec![glam::Vec3::Y; 3]);
        let mut player = MorphPlayer::new(ramp(), 1.0).unwrap();
        player.advance(0.5);
        player.apply(&mut mesh);
        assert!((mesh.influences()[1] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_paused_player_holds_weights() {
        let mut player = MorphPlayer::new(ramp(), 1.0).unwrap();
        player.set_playing(false);
        player.advance(0.3);
        assert_eq!(player.time(), 0.0);
        assert_eq!(player.weights(), &[1.0, 0.0]);
    }
}
