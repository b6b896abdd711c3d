// Integration tests for the beat pulse: event curve shape, hand-off to the
// periodic curve and BPM smoothing cadence.

use std::f32::consts::{FRAC_PI_2, PI};
use std::time::Duration;

use heart_core::{event_pulse, smoothing_for_rate, AnimationMode, Instant, PulseAnimator};
use proptest::prelude::*;

fn animator(start: Instant) -> PulseAnimator {
    PulseAnimator::new_at(0.3, 0.1, Duration::from_millis(300), start)
}

proptest! {
    #[test]
    fn event_pulse_is_smooth_within_each_phase(p in 0.0f32..0.999, rise in 0.1f32..0.9) {
        let eps = 1e-3;
        // the restart at `rise` is the only jump
        prop_assume!(p >= rise || p + eps < rise);
        let a = event_pulse(p, 0.3, rise);
        let b = event_pulse(p + eps, 0.3, rise);
        let slope = (0.3 * PI / rise).max(0.3 * FRAC_PI_2 / (1.0 - rise));
        prop_assert!((a - b).abs() <= slope * eps + 1e-5);
    }

    #[test]
    fn event_pulse_is_bounded(p in 0.0f32..=1.0) {
        let v = event_pulse(p, 0.3, 0.3);
        prop_assert!(v > -1e-6 && v < 0.3 + 1e-6);
    }

    #[test]
    fn smoothing_for_rate_matches_compounded_steps(c in 0.01f32..0.9, steps in 1u32..5) {
        let per_step = smoothing_for_rate(c, 30.0, 30.0 * steps as f32);
        let kept = (1.0 - per_step).powi(steps as i32);
        prop_assert!((kept - (1.0 - c)).abs() < 1e-4);
    }
}

#[test]
fn event_pulse_peaks_mid_rise_restarts_and_ends_at_rest() {
    assert_eq!(event_pulse(0.0, 0.3, 0.3), 0.0);
    assert!((event_pulse(0.15, 0.3, 0.3) - 0.3).abs() < 1e-6);
    assert!(event_pulse(0.2999, 0.3, 0.3) < 1e-3);
    assert!((event_pulse(0.3, 0.3, 0.3) - 0.3).abs() < 1e-6);
    assert!(event_pulse(1.0, 0.3, 0.3).abs() < 1e-6);
}

#[test]
fn event_hands_off_to_periodic_after_duration() {
    let t0 = Instant::now();
    let mut anim = animator(t0);
    anim.update_bpm(Some(60));
    anim.trigger_event_at(t0);

    let peak = anim.query_scale_at(t0 + Duration::from_millis(45));
    assert!((peak - 1.3).abs() < 1e-3);
    let decay_start = anim.query_scale_at(t0 + Duration::from_millis(91));
    assert!((decay_start - 1.3).abs() < 1e-2);
    assert!(matches!(
        anim.mode_at(t0 + Duration::from_millis(150)),
        AnimationMode::EventPulse { .. }
    ));

    anim.query_scale_at(t0 + Duration::from_millis(350));
    assert_eq!(
        anim.mode_at(t0 + Duration::from_millis(350)),
        AnimationMode::Periodic { bpm: 60.0 }
    );
}

#[test]
fn no_bpm_and_no_event_is_idle() {
    let t0 = Instant::now();
    let mut anim = animator(t0);
    assert_eq!(anim.query_scale_at(t0 + Duration::from_secs(1)), 1.0);
    assert_eq!(anim.mode_at(t0), AnimationMode::Idle);
}

#[test]
fn bpm_approaches_target_one_step_per_query() {
    let t0 = Instant::now();
    let mut anim = animator(t0);
    anim.update_bpm(Some(60));
    anim.query_scale_at(t0);
    anim.update_bpm(Some(120));
    let mut expected = 60.0f32;
    for i in 1..=10 {
        anim.query_scale_at(t0 + Duration::from_millis(33 * i));
        expected += (120.0 - expected) * 0.1;
        assert!((anim.current_bpm().unwrap() - expected).abs() < 1e-3);
    }
}

#[test]
fn periodic_expansion_is_stronger_than_contraction() {
    let t0 = Instant::now();
    let mut anim = animator(t0);
    anim.update_bpm(Some(60));
    // one beat per second: quarter cycle is the peak, three quarters the trough
    let peak = anim.query_scale_at(t0 + Duration::from_millis(250));
    let trough = anim.query_scale_at(t0 + Duration::from_millis(750));
    assert!((peak - 1.3).abs() < 1e-3);
    assert!((trough - 0.85).abs() < 1e-3);
}
