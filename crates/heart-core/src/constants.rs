// Shared tracking/animation tuning constants. Config defaults are built from these.

// Landmarks
pub const VISIBILITY_THRESHOLD: f32 = 0.5; // below this a landmark is treated as absent

// Anchor tracking
pub const ANCHOR_SMOOTHING: f32 = 0.7; // history weight: smoothed = a*prev + (1-a)*new
pub const HEART_OFFSET_Z: f32 = 0.05; // metres pulled toward the camera from the shoulder midpoint
pub const HEART_SCALE: f32 = 0.15; // uniform model scale fused into the placement transform

// 2D anatomical offsets (fractions of torso height / shoulder width in pixels)
pub const TORSO_DROP_RATIO: f32 = 0.25;
pub const SHOULDER_DROP_RATIO: f32 = 0.3; // used when hips are not visible
pub const LATERAL_SHIFT_RATIO: f32 = 0.15; // toward the viewer's right

// Heart rate
pub const BPM_WINDOW: usize = 5;
pub const STALE_TIMEOUT_SECS: f32 = 5.0;
pub const MAX_STALE_TIMEOUT_SECS: f32 = 3600.0;
pub const MIN_PLAUSIBLE_BPM: u32 = 30;
pub const MAX_PLAUSIBLE_BPM: u32 = 220;

// Pulse animation
pub const BEAT_SCALE_AMPLITUDE: f32 = 0.3;
pub const BPM_SMOOTHING: f32 = 0.1; // per query, not per second
pub const PULSE_DURATION_SECS: f32 = 0.3;
pub const MAX_PULSE_DURATION_SECS: f32 = 10.0;
pub const PULSE_RISE_FRACTION: f32 = 0.3; // share of the pulse spent expanding
pub const PERIODIC_CONTRACTION_GAIN: f32 = 0.5;
pub const REFERENCE_QUERY_HZ: f32 = 30.0; // cadence the per-query smoothing was tuned at

// Renderer-side clamp for the beat scale uniform
pub const MIN_RENDER_SCALE: f32 = 0.5;
pub const MAX_RENDER_SCALE: f32 = 2.0;

// Camera
pub const CAMERA_FOV_DEGREES: f32 = 60.0;
pub const CAMERA_NEAR: f32 = 0.1;
pub const CAMERA_FAR: f32 = 10.0;
pub const VIEWING_DISTANCE: f32 = 1.0; // metres, used when lifting a screen anchor into 3D
