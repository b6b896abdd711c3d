//! Wiring between the sensor stream, the video tick and the render sink.
//!
//! Two loops touch the core: heartbeat notifications arrive on a sensor thread
//! and feed a [`BeatPipeline`]; the video tick runs an [`OverlayPipeline`] that
//! tracks the chest and reads the current beat intensity. The beat state is
//! shared as a [`SharedBeat`]; each side holds the lock only for one call.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use glam::{Mat4, Vec2};
use instant::Instant;
use log::{debug, warn};

use crate::anchor::AnchorTracker;
use crate::beat::{is_plausible_bpm, BeatSignal};
use crate::config::{duration_or, CameraConfig, Config};
use crate::constants::{REFERENCE_QUERY_HZ, STALE_TIMEOUT_SECS};
use crate::error::Result;
use crate::landmark::Landmarks;
use crate::measurement::HeartRateMeasurement;
use crate::pulse::{smoothing_for_rate, AnimationMode, PulseAnimator};
use crate::sink::RenderSink;

pub type SharedBeat = Arc<Mutex<BeatPipeline>>;

/// Heart-rate smoothing plus pulse animation behind one handler.
#[derive(Clone, Debug)]
pub struct BeatPipeline {
    signal: BeatSignal,
    animator: PulseAnimator,
    min_bpm: u32,
    max_bpm: u32,
    stale_timeout: Duration,
    base_smoothing: f32,
}

impl Default for BeatPipeline {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl BeatPipeline {
    pub fn from_config(config: &Config) -> Self {
        Self {
            signal: BeatSignal::from_config(&config.beat),
            animator: PulseAnimator::from_config(&config.animation),
            min_bpm: config.beat.min_bpm,
            max_bpm: config.beat.max_bpm,
            stale_timeout: duration_or(
                config.beat.stale_timeout_secs,
                STALE_TIMEOUT_SECS,
                "beat.stale_timeout_secs",
            ),
            base_smoothing: config.animation.smoothing,
        }
    }

    pub fn into_shared(self) -> SharedBeat {
        Arc::new(Mutex::new(self))
    }

    /// Rescales the per-query BPM smoothing for a video tick of `hz`, keeping
    /// the response the configured coefficient gives at 30 Hz.
    pub fn set_query_rate(&mut self, hz: f32) {
        let smoothing = smoothing_for_rate(self.base_smoothing, REFERENCE_QUERY_HZ, hz);
        self.animator.set_smoothing(smoothing);
    }

    /// Handles one heartbeat notification. Returns the smoothed BPM, or `None`
    /// if the sample was outside the plausible range and dropped.
    pub fn on_beat(&mut self, bpm: u32) -> Option<u32> {
        self.on_beat_at(bpm, Instant::now())
    }

    pub fn on_beat_at(&mut self, bpm: u32, now: Instant) -> Option<u32> {
        if !is_plausible_bpm(bpm, self.min_bpm, self.max_bpm) {
            warn!(
                "dropping heart rate {bpm} bpm (outside {}..={})",
                self.min_bpm, self.max_bpm
            );
            return None;
        }
        let smoothed = self.signal.update_at(bpm, now);
        self.animator.update_bpm(Some(smoothed));
        self.animator.trigger_event_at(now);
        debug!("beat: raw {bpm} bpm, smoothed {smoothed} bpm");
        Some(smoothed)
    }

    /// Decodes a raw Heart Rate Measurement packet and handles it as a beat.
    pub fn on_measurement(&mut self, packet: &[u8]) -> Result<Option<u32>> {
        self.on_measurement_at(packet, Instant::now())
    }

    pub fn on_measurement_at(&mut self, packet: &[u8], now: Instant) -> Result<Option<u32>> {
        let measurement = HeartRateMeasurement::parse(packet)?;
        Ok(self.on_beat_at(measurement.bpm as u32, now))
    }

    /// Beat scale for this tick; 1.0 while the heart-rate signal is stale.
    pub fn intensity(&mut self) -> f32 {
        self.intensity_at(Instant::now())
    }

    pub fn intensity_at(&mut self, now: Instant) -> f32 {
        if self.signal.is_stale_at(now, self.stale_timeout) {
            return 1.0;
        }
        self.animator.query_scale_at(now)
    }

    pub fn mode_at(&self, now: Instant) -> AnimationMode {
        self.animator.mode_at(now)
    }

    pub fn bpm(&self) -> Option<u32> {
        self.signal.current()
    }

    pub fn is_stale_at(&self, now: Instant) -> bool {
        self.signal.is_stale_at(now, self.stale_timeout)
    }

    pub fn signal(&self) -> &BeatSignal {
        &self.signal
    }

    pub fn animator(&self) -> &PulseAnimator {
        &self.animator
    }

    pub fn reset(&mut self) {
        self.signal.reset();
        self.animator.reset();
    }
}

/// Values pushed to the sink for one video tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayFrame {
    pub anchor_2d: Option<Vec2>,
    pub transform: Option<Mat4>,
    pub intensity: f32,
}

/// Per-frame tracking and transform building.
#[derive(Clone, Debug, Default)]
pub struct OverlayPipeline {
    tracker: AnchorTracker,
    camera: CameraConfig,
}

impl OverlayPipeline {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tracker: AnchorTracker::from_config(&config.tracker),
            camera: config.camera.clone(),
        }
    }

    pub fn tracker(&self) -> &AnchorTracker {
        &self.tracker
    }

    /// Runs one video tick and pushes the results to `sink`.
    ///
    /// The 3D transform comes from world landmarks when available (holding the
    /// last good pose through dropouts). Without world landmarks, or before the
    /// first world pose has been tracked, the 2D anchor is lifted to the
    /// configured viewing distance.
    pub fn tick<S: RenderSink>(
        &mut self,
        normalized: Option<&Landmarks>,
        world: Option<&Landmarks>,
        frame_width: u32,
        frame_height: u32,
        beat: &Mutex<BeatPipeline>,
        sink: &mut S,
    ) -> OverlayFrame {
        self.tick_at(
            normalized,
            world,
            frame_width,
            frame_height,
            beat,
            sink,
            Instant::now(),
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn tick_at<S: RenderSink>(
        &mut self,
        normalized: Option<&Landmarks>,
        world: Option<&Landmarks>,
        frame_width: u32,
        frame_height: u32,
        beat: &Mutex<BeatPipeline>,
        sink: &mut S,
        now: Instant,
    ) -> OverlayFrame {
        let anchor_2d = normalized
            .and_then(|lm| self.tracker.position_2d(lm, frame_width, frame_height));
        match anchor_2d {
            Some(anchor) => sink.set_anchor_2d(anchor),
            None => sink.clear_anchor_2d(),
        }

        let world_transform = world.and_then(|lm| self.tracker.transform(lm));
        let transform = world_transform.or_else(|| {
            anchor_2d.map(|anchor| {
                self.tracker.screen_transform(
                    anchor,
                    frame_width,
                    frame_height,
                    self.camera.fov_degrees,
                    self.camera.viewing_distance,
                )
            })
        });
        if let Some(m) = transform {
            sink.set_transform(m);
        }

        let intensity = beat
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .intensity_at(now);
        sink.set_intensity(intensity);

        OverlayFrame {
            anchor_2d,
            transform,
            intensity,
        }
    }

    pub fn reset(&mut self) {
        self.tracker.reset();
    }
}
