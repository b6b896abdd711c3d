pub mod anchor;
pub mod beat;
pub mod config;
pub mod constants;
pub mod error;
pub mod landmark;
pub mod measurement;
pub mod pipeline;
pub mod pulse;
pub mod sink;
pub mod transform;

pub use anchor::{AnchorState, AnchorTracker, ChestPose};
pub use beat::{is_plausible_bpm, BeatSignal};
pub use config::{AnimationConfig, BeatConfig, CameraConfig, Config, TrackerConfig};
pub use constants::*;
pub use error::{Error, Result};
pub use landmark::{Landmark, LandmarkIndex, Landmarks, PoseSource};
pub use measurement::{HeartRateMeasurement, MeasurementError, SensorContact};
pub use pipeline::{BeatPipeline, OverlayFrame, OverlayPipeline, SharedBeat};
pub use pulse::{event_pulse, periodic_pulse, smoothing_for_rate, AnimationMode, PulseAnimator};
pub use sink::{OverlayUniforms, RenderSink, UniformSink};
pub use transform::*;

pub use instant::Instant;
