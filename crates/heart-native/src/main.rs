use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context};
use glam::{Vec2, Vec3};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use heart_core::{
    BeatPipeline, Camera, Config, Instant, Landmark, LandmarkIndex, Landmarks, OverlayPipeline,
    PoseSource, SharedBeat, UniformSink,
};

const DEFAULT_CONFIG_PATH: &str = "heart-overlay.toml";
const FRAME_WIDTH: u32 = 1280;
const FRAME_HEIGHT: u32 = 720;
const TICK_HZ: f32 = 60.0;
const RUN_SECS: f32 = 12.0;
// the sensor goes quiet halfway through so the overlay falls back to rest
const SENSOR_SECS: f32 = 6.0;
const RESTING_BPM: f32 = 72.0;

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = match env::args().nth(1) {
        Some(path) => Config::load(&path).with_context(|| format!("loading {path}"))?,
        None => Config::load_or_default(DEFAULT_CONFIG_PATH),
    };

    let mut beat = BeatPipeline::from_config(&config);
    beat.set_query_rate(TICK_HZ);
    let beat = beat.into_shared();

    let running = Arc::new(AtomicBool::new(true));
    let sensor = spawn_sensor(Arc::clone(&beat), Arc::clone(&running))?;

    let aspect = Camera::aspect_for(FRAME_WIDTH, FRAME_HEIGHT);
    let camera = Camera::from_config(&config.camera, aspect);
    let mut sink = UniformSink::new(&camera);
    let mut overlay = OverlayPipeline::from_config(&config);
    let mut pose = SwayingPose::new(7);

    let start = Instant::now();
    let tick = Duration::from_secs_f32(1.0 / TICK_HZ);
    let mut frame_index: u64 = 0;
    while start.elapsed().as_secs_f32() < RUN_SECS {
        let t = start.elapsed().as_secs_f32();
        let normalized = pose.normalized_landmarks(&t);
        let world = pose.world_landmarks(&t);
        let frame = overlay.tick(
            normalized.as_ref(),
            world.as_ref(),
            FRAME_WIDTH,
            FRAME_HEIGHT,
            &beat,
            &mut sink,
        );

        if frame_index % TICK_HZ as u64 == 0 {
            let bpm = beat.lock().unwrap_or_else(PoisonError::into_inner).bpm();
            let uniforms = sink.uniforms();
            info!(
                "t={t:.1}s bpm={bpm:?} scale={:.3} anchor={:?} heart={:?} ({} uniform bytes)",
                uniforms.beat_scale,
                frame.anchor_2d,
                frame.transform.map(|m| m.w_axis.truncate()),
                sink.as_bytes().len(),
            );
        }
        frame_index += 1;
        thread::sleep(tick);
    }

    running.store(false, Ordering::Relaxed);
    sensor
        .join()
        .map_err(|_| anyhow!("heart-rate sensor thread panicked"))?;
    Ok(())
}

/// Stands in for a BLE strap: emits Heart Rate Measurement packets at the
/// current rate with some jitter, the odd implausible reading, and RR intervals.
fn spawn_sensor(
    beat: SharedBeat,
    running: Arc<AtomicBool>,
) -> anyhow::Result<thread::JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("hr-sensor".into())
        .spawn(move || {
            let mut rng = StdRng::seed_from_u64(42);
            let start = Instant::now();
            while running.load(Ordering::Relaxed) && start.elapsed().as_secs_f32() < SENSOR_SECS {
                let bpm = if rng.gen_bool(0.05) {
                    // strap slipping produces spikes
                    rng.gen_range(230..=255)
                } else {
                    (RESTING_BPM + rng.gen_range(-4.0..4.0)).round() as u8
                };
                let packet = measurement_packet(bpm);
                match beat
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .on_measurement(&packet)
                {
                    Ok(Some(smoothed)) => debug!("sensor: {bpm} bpm -> {smoothed}"),
                    Ok(None) => {}
                    Err(e) => warn!("sensor: {e}"),
                }
                thread::sleep(Duration::from_secs_f32(60.0 / bpm.max(30) as f32));
            }
            info!("heart-rate sensor stopped");
        })?;
    Ok(handle)
}

fn measurement_packet(bpm: u8) -> Vec<u8> {
    // contact supported + detected, one RR interval
    let rr = (60.0 / bpm.max(1) as f32 * 1024.0) as u16;
    let mut packet = vec![0x16, bpm];
    packet.extend_from_slice(&rr.to_le_bytes());
    packet
}

/// Synthetic upper body swaying side to side; drops out for a second now and then.
struct SwayingPose {
    rng: StdRng,
}

impl SwayingPose {
    fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn sway(&self, t: f32) -> f32 {
        (t * 0.8).sin()
    }

    fn visible(t: f32) -> bool {
        !(4.0..5.0).contains(&t)
    }

    fn noise(&mut self, amount: f32) -> f32 {
        self.rng.gen_range(-amount..amount)
    }
}

impl PoseSource for SwayingPose {
    /// Seconds since start.
    type Frame = f32;

    fn normalized_landmarks(&mut self, t: &f32) -> Option<Landmarks> {
        if !Self::visible(*t) {
            return None;
        }
        let center = Vec2::new(0.5 + 0.05 * self.sway(*t), 0.35);
        let half = Vec2::new(0.09, 0.0);
        let hips = Vec2::new(0.0, 0.3);

        let mut lm = Landmarks::empty();
        for (index, p) in [
            (LandmarkIndex::LeftShoulder, center - half),
            (LandmarkIndex::RightShoulder, center + half),
            (LandmarkIndex::LeftHip, center - half * 0.8 + hips),
            (LandmarkIndex::RightHip, center + half * 0.8 + hips),
        ] {
            let jitter = Vec2::new(self.noise(0.002), self.noise(0.002));
            let p = p + jitter;
            lm.set(index, Landmark::new_2d(p.x, p.y, 0.95));
        }
        Some(lm)
    }

    fn world_landmarks(&mut self, t: &f32) -> Option<Landmarks> {
        if !Self::visible(*t) {
            return None;
        }
        let yaw = 0.2 * self.sway(*t);
        let half = Vec3::new(0.18 * yaw.cos(), 0.18 * yaw.sin(), 0.0);
        let shoulders = Vec3::new(0.0, 0.0, 0.45);

        let mut lm = Landmarks::empty();
        for (index, p) in [
            (LandmarkIndex::LeftShoulder, shoulders - half),
            (LandmarkIndex::RightShoulder, shoulders + half),
            (LandmarkIndex::LeftHip, -half * 0.7),
            (LandmarkIndex::RightHip, half * 0.7),
        ] {
            let p = p + Vec3::splat(self.noise(0.003));
            lm.set(index, Landmark::new(p.x, p.y, p.z, 0.9));
        }
        Some(lm)
    }
}
