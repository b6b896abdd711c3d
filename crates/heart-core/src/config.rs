use std::fs;
use std::path::Path;
use std::time::Duration;

use log::warn;
use serde::Deserialize;

use crate::constants::*;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub beat: BeatConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub camera: CameraConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TrackerConfig {
    /// Landmarks below this visibility are ignored
    #[serde(default = "default_visibility_threshold")]
    pub visibility_threshold: f32,
    /// History weight of the exponential anchor filter, in [0, 1)
    #[serde(default = "default_smoothing_factor")]
    pub smoothing_factor: f32,
    /// Pull toward the camera from the shoulder midpoint (metres)
    #[serde(default = "default_heart_offset_z")]
    pub heart_offset_z: f32,
    /// Uniform scale of the placement transform
    #[serde(default = "default_heart_scale")]
    pub heart_scale: f32,
    #[serde(default = "default_torso_drop_ratio")]
    pub torso_drop_ratio: f32,
    #[serde(default = "default_shoulder_drop_ratio")]
    pub shoulder_drop_ratio: f32,
    #[serde(default = "default_lateral_shift_ratio")]
    pub lateral_shift_ratio: f32,
}

fn default_visibility_threshold() -> f32 { VISIBILITY_THRESHOLD }
fn default_smoothing_factor() -> f32 { ANCHOR_SMOOTHING }
fn default_heart_offset_z() -> f32 { HEART_OFFSET_Z }
fn default_heart_scale() -> f32 { HEART_SCALE }
fn default_torso_drop_ratio() -> f32 { TORSO_DROP_RATIO }
fn default_shoulder_drop_ratio() -> f32 { SHOULDER_DROP_RATIO }
fn default_lateral_shift_ratio() -> f32 { LATERAL_SHIFT_RATIO }

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: default_visibility_threshold(),
            smoothing_factor: default_smoothing_factor(),
            heart_offset_z: default_heart_offset_z(),
            heart_scale: default_heart_scale(),
            torso_drop_ratio: default_torso_drop_ratio(),
            shoulder_drop_ratio: default_shoulder_drop_ratio(),
            lateral_shift_ratio: default_lateral_shift_ratio(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BeatConfig {
    /// Number of raw samples averaged
    #[serde(default = "default_window")]
    pub window: usize,
    #[serde(default = "default_stale_timeout_secs")]
    pub stale_timeout_secs: f32,
    /// Samples outside [min_bpm, max_bpm] are dropped at the sensor boundary
    #[serde(default = "default_min_bpm")]
    pub min_bpm: u32,
    #[serde(default = "default_max_bpm")]
    pub max_bpm: u32,
}

fn default_window() -> usize { BPM_WINDOW }
fn default_stale_timeout_secs() -> f32 { STALE_TIMEOUT_SECS }
fn default_min_bpm() -> u32 { MIN_PLAUSIBLE_BPM }
fn default_max_bpm() -> u32 { MAX_PLAUSIBLE_BPM }

impl Default for BeatConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            stale_timeout_secs: default_stale_timeout_secs(),
            min_bpm: default_min_bpm(),
            max_bpm: default_max_bpm(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AnimationConfig {
    /// Peak scale change of a beat (0.3 = 30%)
    #[serde(default = "default_amplitude")]
    pub amplitude: f32,
    /// Per-query BPM smoothing coefficient
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,
    #[serde(default = "default_pulse_duration_secs")]
    pub pulse_duration_secs: f32,
    /// Share of the event pulse spent expanding
    #[serde(default = "default_rise_fraction")]
    pub rise_fraction: f32,
}

fn default_amplitude() -> f32 { BEAT_SCALE_AMPLITUDE }
fn default_smoothing() -> f32 { BPM_SMOOTHING }
fn default_pulse_duration_secs() -> f32 { PULSE_DURATION_SECS }
fn default_rise_fraction() -> f32 { PULSE_RISE_FRACTION }

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            amplitude: default_amplitude(),
            smoothing: default_smoothing(),
            pulse_duration_secs: default_pulse_duration_secs(),
            rise_fraction: default_rise_fraction(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CameraConfig {
    #[serde(default = "default_fov_degrees")]
    pub fov_degrees: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
    #[serde(default = "default_eye")]
    pub eye: [f32; 3],
    #[serde(default = "default_target")]
    pub target: [f32; 3],
    #[serde(default = "default_up")]
    pub up: [f32; 3],
    /// Depth at which a 2D anchor is placed in the scene (metres)
    #[serde(default = "default_viewing_distance")]
    pub viewing_distance: f32,
}

fn default_fov_degrees() -> f32 { CAMERA_FOV_DEGREES }
fn default_near() -> f32 { CAMERA_NEAR }
fn default_far() -> f32 { CAMERA_FAR }
fn default_eye() -> [f32; 3] { [0.0, 0.0, 0.0] }
fn default_target() -> [f32; 3] { [0.0, 0.0, -1.0] }
fn default_up() -> [f32; 3] { [0.0, 1.0, 0.0] }
fn default_viewing_distance() -> f32 { VIEWING_DISTANCE }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: default_fov_degrees(),
            near: default_near(),
            far: default_far(),
            eye: default_eye(),
            target: default_target(),
            up: default_up(),
            viewing_distance: default_viewing_distance(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, falling back to defaults (with a warning) on any error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("{} not found, using default config", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("{}: {e}; using default config", path.display());
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let t = &self.tracker;
        if !(0.0..=1.0).contains(&t.visibility_threshold) {
            return Err(invalid("tracker.visibility_threshold must be in [0, 1]"));
        }
        if !(0.0..1.0).contains(&t.smoothing_factor) {
            return Err(invalid("tracker.smoothing_factor must be in [0, 1)"));
        }
        if !(t.heart_scale > 0.0 && t.heart_scale.is_finite()) {
            return Err(invalid("tracker.heart_scale must be positive and finite"));
        }
        if !t.heart_offset_z.is_finite() {
            return Err(invalid("tracker.heart_offset_z must be finite"));
        }
        let ratios = [t.torso_drop_ratio, t.shoulder_drop_ratio, t.lateral_shift_ratio];
        if !ratios.iter().all(|r| r.is_finite()) {
            return Err(invalid("tracker offset ratios must be finite"));
        }

        let b = &self.beat;
        if b.window == 0 {
            return Err(invalid("beat.window must be at least 1"));
        }
        if !(b.stale_timeout_secs > 0.0 && b.stale_timeout_secs <= MAX_STALE_TIMEOUT_SECS) {
            return Err(invalid("beat.stale_timeout_secs must be in (0, 3600]"));
        }
        if b.min_bpm == 0 || b.min_bpm > b.max_bpm {
            return Err(invalid("beat.min_bpm must be positive and <= beat.max_bpm"));
        }

        let a = &self.animation;
        if !(a.pulse_duration_secs > 0.0 && a.pulse_duration_secs <= MAX_PULSE_DURATION_SECS) {
            return Err(invalid("animation.pulse_duration_secs must be in (0, 10]"));
        }
        if !a.amplitude.is_finite() {
            return Err(invalid("animation.amplitude must be finite"));
        }
        if !(0.0..=1.0).contains(&a.smoothing) {
            return Err(invalid("animation.smoothing must be in [0, 1]"));
        }
        if !(a.rise_fraction > 0.0 && a.rise_fraction < 1.0) {
            return Err(invalid("animation.rise_fraction must be in (0, 1)"));
        }

        let c = &self.camera;
        if !(c.fov_degrees > 0.0 && c.fov_degrees < 180.0) {
            return Err(invalid("camera.fov_degrees must be in (0, 180)"));
        }
        if !(c.near > 0.0 && c.near < c.far) {
            return Err(invalid("camera.near must be positive and < camera.far"));
        }
        if !(c.far.is_finite() && c.viewing_distance > 0.0 && c.viewing_distance.is_finite()) {
            return Err(invalid("camera.far and camera.viewing_distance must be finite"));
        }
        if ![c.eye, c.target, c.up].iter().flatten().all(|v| v.is_finite()) {
            return Err(invalid("camera.eye, target and up must be finite"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> Error {
    Error::InvalidConfig(msg.to_string())
}

/// `secs` as a `Duration`, or `fallback` (with a warning) when it is negative,
/// NaN or too large. Guards components built from an unvalidated config.
pub(crate) fn duration_or(secs: f32, fallback: f32, what: &str) -> Duration {
    Duration::try_from_secs_f32(secs).unwrap_or_else(|_| {
        warn!("{what} = {secs} is not a valid duration, using {fallback}");
        Duration::from_secs_f32(fallback)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tracker.smoothing_factor, 0.7);
        assert_eq!(config.beat.window, 5);
        assert_eq!(config.animation.pulse_duration_secs, 0.3);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_section() {
        let config = Config::from_toml(
            r#"
            [tracker]
            smoothing_factor = 0.5

            [beat]
            window = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.tracker.smoothing_factor, 0.5);
        assert_eq!(config.tracker.heart_scale, HEART_SCALE);
        assert_eq!(config.beat.window, 8);
        assert_eq!(config.beat.max_bpm, MAX_PLAUSIBLE_BPM);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = Config::from_toml("[tracker]\nsmoothing_factor = 1.0\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        let err = Config::from_toml("[camera]\nnear = 5.0\nfar = 1.0\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        let err = Config::from_toml("[beat]\nwindow = 0\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_non_finite_durations_rejected() {
        let err = Config::from_toml("[beat]\nstale_timeout_secs = inf\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        let err = Config::from_toml("[animation]\npulse_duration_secs = nan\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        let err = Config::from_toml("[camera]\nviewing_distance = inf\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        let err = Config::from_toml("[tracker]\nheart_offset_z = nan\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        let err = Config::from_toml("[beat]\nstale_timeout_secs = 1e30\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_parse_error() {
        let err = Config::from_toml("[tracker\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default("/nonexistent/heart-overlay.toml");
        assert_eq!(config, Config::default());
    }
}
