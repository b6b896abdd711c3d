//! Heart-rate smoothing and staleness detection.
//!
//! Raw BPM samples arrive from the sensor at irregular intervals. The
//! [`BeatSignal`] keeps a short FIFO window and reports its truncated mean.

use std::collections::VecDeque;
use std::time::Duration;

use instant::Instant;

use crate::config::BeatConfig;
use crate::constants::{BPM_WINDOW, STALE_TIMEOUT_SECS};

/// Default staleness timeout.
pub const DEFAULT_STALE_TIMEOUT: Duration = Duration::from_secs(STALE_TIMEOUT_SECS as u64);

/// `true` if `bpm` lies in the physiologically plausible range `[min, max]`.
#[inline]
pub fn is_plausible_bpm(bpm: u32, min: u32, max: u32) -> bool {
    (min..=max).contains(&bpm)
}

/// Moving-average BPM over the last `window` samples.
#[derive(Clone, Debug)]
pub struct BeatSignal {
    window: usize,
    samples: VecDeque<u32>,
    current: Option<u32>,
    last_sample_at: Option<Instant>,
}

impl Default for BeatSignal {
    fn default() -> Self {
        Self::new(BPM_WINDOW)
    }
}

impl BeatSignal {
    /// A window of zero is bumped to one.
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            samples: VecDeque::with_capacity(window),
            current: None,
            last_sample_at: None,
        }
    }

    pub fn from_config(config: &BeatConfig) -> Self {
        Self::new(config.window)
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Number of samples currently retained.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Pushes a sample stamped with the current time and returns the new mean.
    pub fn update(&mut self, bpm: u32) -> u32 {
        self.update_at(bpm, Instant::now())
    }

    pub fn update_at(&mut self, bpm: u32, now: Instant) -> u32 {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(bpm);
        self.last_sample_at = Some(now);

        let sum: u64 = self.samples.iter().map(|&s| s as u64).sum();
        // integer division truncates, same as flooring the float mean for positive inputs
        let mean = (sum / self.samples.len() as u64) as u32;
        self.current = Some(mean);
        mean
    }

    pub fn current(&self) -> Option<u32> {
        self.current
    }

    /// Time between beats at the current BPM.
    pub fn beat_interval(&self) -> Option<Duration> {
        self.current
            .filter(|&bpm| bpm > 0)
            .map(|bpm| Duration::from_secs_f64(60.0 / bpm as f64))
    }

    pub fn last_sample_at(&self) -> Option<Instant> {
        self.last_sample_at
    }

    pub fn is_stale(&self, timeout: Duration) -> bool {
        self.is_stale_at(Instant::now(), timeout)
    }

    /// Stale if nothing was ever received or more than `timeout` has passed.
    pub fn is_stale_at(&self, now: Instant, timeout: Duration) -> bool {
        match self.last_sample_at {
            None => true,
            Some(at) => now.saturating_duration_since(at) > timeout,
        }
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.current = None;
        self.last_sample_at = None;
    }
}
