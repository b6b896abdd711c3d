//! Beat-driven pulse animation.
//!
//! The animator turns heartbeat notifications and a smoothed BPM into a scale
//! multiplier around 1.0. A recent beat event plays a short two-phase pulse;
//! otherwise a periodic curve at the smoothed BPM keeps the heart moving.
//!
//! BPM smoothing advances one step per [`PulseAnimator::query_scale`] call, not
//! per unit of wall-clock time, so the effective rate depends on how often the
//! caller queries (the defaults assume ~30 Hz). Use [`smoothing_for_rate`] to
//! carry the same response over to another cadence.

use std::f32::consts::{FRAC_PI_2, PI, TAU};
use std::time::Duration;

use instant::Instant;

use crate::config::{duration_or, AnimationConfig};
use crate::constants::{
    BEAT_SCALE_AMPLITUDE, BPM_SMOOTHING, PERIODIC_CONTRACTION_GAIN, PULSE_DURATION_SECS,
    PULSE_RISE_FRACTION,
};

/// Which curve is authoritative for a given query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AnimationMode {
    /// A beat event is in flight; `progress` runs over \[0, 1).
    EventPulse { progress: f32 },
    /// No active event; animate periodically at the smoothed BPM.
    Periodic { bpm: f32 },
    /// Nothing to animate.
    Idle,
}

/// Converts a per-query smoothing coefficient tuned at `from_hz` into one that
/// gives the same time response when queried at `to_hz`.
pub fn smoothing_for_rate(coefficient: f32, from_hz: f32, to_hz: f32) -> f32 {
    if from_hz <= 0.0 || to_hz <= 0.0 {
        return coefficient;
    }
    let keep = (1.0 - coefficient).clamp(0.0, 1.0);
    1.0 - keep.powf(from_hz / to_hz)
}

/// Two-phase event pulse at `progress` in \[0, 1\].
///
/// Before `rise_fraction` a half sine swells and falls back (peak at half the
/// rise); from `rise_fraction` on the pulse restarts at full amplitude and
/// decays along a quarter cosine. The curve jumps at `rise_fraction`.
pub fn event_pulse(progress: f32, amplitude: f32, rise_fraction: f32) -> f32 {
    let progress = progress.clamp(0.0, 1.0);
    if progress < rise_fraction {
        amplitude * (progress * PI / rise_fraction).sin()
    } else {
        let decay = (progress - rise_fraction) / (1.0 - rise_fraction);
        amplitude * (decay * FRAC_PI_2).cos()
    }
}

/// Periodic pulse at `phase` radians: full-strength expansion over the first
/// half cycle, half-strength contraction over the second.
pub fn periodic_pulse(phase: f32, amplitude: f32) -> f32 {
    let pulse = phase.sin() * amplitude;
    if phase < PI {
        pulse
    } else {
        pulse * PERIODIC_CONTRACTION_GAIN
    }
}

#[derive(Clone, Debug)]
pub struct PulseAnimator {
    amplitude: f32,
    smoothing: f32,
    pulse_duration: Duration,
    rise_fraction: f32,

    start: Instant,
    target_bpm: Option<u32>,
    current_bpm: Option<f32>,
    last_beat_at: Option<Instant>,
    pulse_start: Option<Instant>,
    scale: f32,
}

impl Default for PulseAnimator {
    fn default() -> Self {
        Self::new(
            BEAT_SCALE_AMPLITUDE,
            BPM_SMOOTHING,
            Duration::from_secs_f32(PULSE_DURATION_SECS),
        )
    }
}

impl PulseAnimator {
    pub fn new(amplitude: f32, smoothing: f32, pulse_duration: Duration) -> Self {
        Self::new_at(amplitude, smoothing, pulse_duration, Instant::now())
    }

    /// Same as [`new`](Self::new) with an explicit animation epoch.
    pub fn new_at(
        amplitude: f32,
        smoothing: f32,
        pulse_duration: Duration,
        start: Instant,
    ) -> Self {
        Self {
            amplitude,
            smoothing: smoothing.clamp(0.0, 1.0),
            pulse_duration,
            rise_fraction: PULSE_RISE_FRACTION,
            start,
            target_bpm: None,
            current_bpm: None,
            last_beat_at: None,
            pulse_start: None,
            scale: 1.0,
        }
    }

    pub fn from_config(config: &AnimationConfig) -> Self {
        let mut animator = Self::new(
            config.amplitude,
            config.smoothing,
            duration_or(
                config.pulse_duration_secs,
                PULSE_DURATION_SECS,
                "animation.pulse_duration_secs",
            ),
        );
        animator.rise_fraction = config.rise_fraction;
        animator
    }

    /// Sets the BPM the periodic curve moves toward. `None` stops the
    /// smoothing but leaves the current BPM where it is.
    pub fn update_bpm(&mut self, bpm: Option<u32>) {
        self.target_bpm = bpm;
    }

    /// Records a heartbeat; call once per sensor notification.
    pub fn trigger_event(&mut self) {
        self.trigger_event_at(Instant::now());
    }

    pub fn trigger_event_at(&mut self, now: Instant) {
        self.last_beat_at = Some(now);
        self.pulse_start = Some(now);
    }

    pub fn query_scale(&mut self) -> f32 {
        self.query_scale_at(Instant::now())
    }

    /// Current scale multiplier (1.0 = rest).
    ///
    /// In periodic mode each call moves the smoothed BPM one step toward the
    /// target, so callers should query at a steady rate.
    pub fn query_scale_at(&mut self, now: Instant) -> f32 {
        if self.event_progress(now).is_none() {
            self.pulse_start = None;
            self.step_bpm();
        }

        let scale = match self.mode_at(now) {
            AnimationMode::EventPulse { progress } => {
                1.0 + event_pulse(progress, self.amplitude, self.rise_fraction)
            }
            AnimationMode::Periodic { bpm } => {
                let elapsed = now.saturating_duration_since(self.start).as_secs_f64();
                let interval = 60.0 / bpm as f64;
                let phase = ((elapsed % interval) / interval) as f32 * TAU;
                1.0 + periodic_pulse(phase, self.amplitude)
            }
            AnimationMode::Idle => 1.0,
        };
        self.scale = scale;
        scale
    }

    /// The mode a query at `now` would use, without advancing any state.
    pub fn mode_at(&self, now: Instant) -> AnimationMode {
        if let Some(progress) = self.event_progress(now) {
            return AnimationMode::EventPulse { progress };
        }
        match self.current_bpm {
            Some(bpm) if bpm > 0.0 => AnimationMode::Periodic { bpm },
            _ => AnimationMode::Idle,
        }
    }

    pub fn reset(&mut self) {
        self.reset_at(Instant::now());
    }

    pub fn reset_at(&mut self, now: Instant) {
        self.start = now;
        self.target_bpm = None;
        self.current_bpm = None;
        self.last_beat_at = None;
        self.pulse_start = None;
        self.scale = 1.0;
    }

    pub fn set_smoothing(&mut self, smoothing: f32) {
        self.smoothing = smoothing.clamp(0.0, 1.0);
    }

    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    pub fn target_bpm(&self) -> Option<u32> {
        self.target_bpm
    }

    pub fn current_bpm(&self) -> Option<f32> {
        self.current_bpm
    }

    pub fn last_beat_at(&self) -> Option<Instant> {
        self.last_beat_at
    }

    /// Scale returned by the most recent query.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn pulse_duration(&self) -> Duration {
        self.pulse_duration
    }

    fn event_progress(&self, now: Instant) -> Option<f32> {
        let start = self.pulse_start?;
        let duration = self.pulse_duration.as_secs_f32();
        let elapsed = now.saturating_duration_since(start).as_secs_f32();
        (elapsed < duration).then(|| elapsed / duration)
    }

    fn step_bpm(&mut self) {
        let Some(target) = self.target_bpm else {
            return;
        };
        let target = target as f32;
        self.current_bpm = Some(match self.current_bpm {
            None => target,
            Some(current) => current + (target - current) * self.smoothing,
        });
    }
}
