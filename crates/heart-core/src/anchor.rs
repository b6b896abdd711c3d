//! Chest anchor tracking.
//!
//! Two independent paths share one exponential filter coefficient:
//! - [`AnchorTracker::track`] turns metric world landmarks into a smoothed
//!   chest position and orientation. Lost shoulders hold the last good pose.
//! - [`AnchorTracker::position_2d`] turns normalized landmarks into a smoothed
//!   pixel anchor over the heart, with anatomical offsets from the shoulder line.
//!
//! Rotations are smoothed by a component-wise blend followed by SVD
//! re-orthonormalization. That is only accurate for small frame-to-frame
//! changes, which is what pose tracking at video rate produces.

use glam::{Mat3, Mat4, Vec2, Vec3};
use log::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::landmark::{LandmarkIndex, Landmarks};
use crate::transform::{
    blend_rotation, build_transform, chest_position, chest_rotation, orthonormalize,
    screen_to_world, shoulder_rotation,
};

/// Smoothed chest position and orientation in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChestPose {
    pub position: Vec3,
    pub rotation: Mat3,
}

/// Last known smoothed values. Survives frames where tracking fails.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnchorState {
    pub position_2d: Option<Vec2>,
    pub position_3d: Option<Vec3>,
    pub rotation: Option<Mat3>,
}

#[derive(Clone, Debug)]
pub struct AnchorTracker {
    config: TrackerConfig,
    state: AnchorState,
    tracking_3d: bool,
    tracking_2d: bool,
}

impl Default for AnchorTracker {
    fn default() -> Self {
        Self::from_config(&TrackerConfig::default())
    }
}

impl AnchorTracker {
    /// Tracker with default offsets and the given history weight.
    pub fn new(smoothing_factor: f32) -> Self {
        Self::from_config(&TrackerConfig {
            smoothing_factor,
            ..TrackerConfig::default()
        })
    }

    pub fn from_config(config: &TrackerConfig) -> Self {
        Self {
            config: config.clone(),
            state: AnchorState::default(),
            tracking_3d: false,
            tracking_2d: false,
        }
    }

    pub fn state(&self) -> &AnchorState {
        &self.state
    }

    pub fn smoothing_factor(&self) -> f32 {
        self.config.smoothing_factor
    }

    pub fn heart_scale(&self) -> f32 {
        self.config.heart_scale
    }

    /// Chest pose from world landmarks.
    ///
    /// Returns the previous pose unchanged when either shoulder is missing,
    /// and `None` if nothing has been tracked yet.
    pub fn track(&mut self, world: &Landmarks) -> Option<ChestPose> {
        let th = self.config.visibility_threshold;
        let alpha = self.config.smoothing_factor;

        let (Some(left_shoulder), Some(right_shoulder)) = (
            world.point_3d(LandmarkIndex::LeftShoulder, th),
            world.point_3d(LandmarkIndex::RightShoulder, th),
        ) else {
            if self.tracking_3d {
                info!("chest tracking lost, holding last pose");
                self.tracking_3d = false;
            }
            return self.last_pose();
        };
        if !self.tracking_3d {
            info!("chest tracking acquired");
            self.tracking_3d = true;
        }

        let target = chest_position(left_shoulder, right_shoulder, self.config.heart_offset_z);
        let position = match self.state.position_3d {
            Some(prev) => prev * alpha + target * (1.0 - alpha),
            None => target,
        };

        let left_hip = world.point_3d(LandmarkIndex::LeftHip, th);
        let right_hip = world.point_3d(LandmarkIndex::RightHip, th);
        let target_rotation = match (left_hip, right_hip) {
            (Some(lh), Some(rh)) => chest_rotation(left_shoulder, right_shoulder, lh, rh),
            _ => {
                debug!("hips not visible, orienting from shoulders only");
                shoulder_rotation(left_shoulder, right_shoulder)
            }
        };

        let rotation = match self.state.rotation {
            Some(prev) => {
                let blended = blend_rotation(prev, target_rotation, alpha);
                orthonormalize(blended).unwrap_or_else(|| {
                    warn!("rotation re-orthonormalization failed, using unsmoothed rotation");
                    target_rotation
                })
            }
            None => target_rotation,
        };

        self.state.position_3d = Some(position);
        self.state.rotation = Some(rotation);
        Some(ChestPose { position, rotation })
    }

    /// Placement transform for the world-space path, scaled by `heart_scale`.
    pub fn transform(&mut self, world: &Landmarks) -> Option<Mat4> {
        let pose = self.track(world)?;
        Some(build_transform(pose.position, pose.rotation, self.config.heart_scale))
    }

    /// Smoothed pixel anchor over the heart, or `None` if a shoulder is missing.
    pub fn position_2d(
        &mut self,
        normalized: &Landmarks,
        frame_width: u32,
        frame_height: u32,
    ) -> Option<Vec2> {
        let th = self.config.visibility_threshold;
        let (Some(left_shoulder), Some(right_shoulder)) = (
            normalized.point_2d(LandmarkIndex::LeftShoulder, th),
            normalized.point_2d(LandmarkIndex::RightShoulder, th),
        ) else {
            if self.tracking_2d {
                debug!("screen anchor lost");
                self.tracking_2d = false;
            }
            return None;
        };
        self.tracking_2d = true;

        let size = Vec2::new(frame_width as f32, frame_height as f32);
        let mut anchor = (left_shoulder + right_shoulder) * 0.5 * size;
        let shoulder_width = ((right_shoulder.x - left_shoulder.x) * size.x).abs();

        let left_hip = normalized.point_2d(LandmarkIndex::LeftHip, th);
        let right_hip = normalized.point_2d(LandmarkIndex::RightHip, th);
        match (left_hip, right_hip) {
            (Some(lh), Some(rh)) => {
                let hip_y = (lh.y + rh.y) * 0.5 * size.y;
                anchor.y += (hip_y - anchor.y) * self.config.torso_drop_ratio;
            }
            _ => anchor.y += shoulder_width * self.config.shoulder_drop_ratio,
        }
        // person's left side is on the viewer's right
        anchor.x += shoulder_width * self.config.lateral_shift_ratio;

        let alpha = self.config.smoothing_factor;
        let anchor = match self.state.position_2d {
            Some(prev) => prev * alpha + anchor * (1.0 - alpha),
            None => anchor,
        };
        self.state.position_2d = Some(anchor);
        Some(anchor)
    }

    /// Placement transform for the screen-space path: the pixel anchor lifted
    /// to `distance` in front of the camera, no rotation.
    pub fn transform_2d(
        &mut self,
        normalized: &Landmarks,
        frame_width: u32,
        frame_height: u32,
        fov_degrees: f32,
        distance: f32,
    ) -> Option<Mat4> {
        let anchor = self.position_2d(normalized, frame_width, frame_height)?;
        Some(self.screen_transform(anchor, frame_width, frame_height, fov_degrees, distance))
    }

    /// Unrotated placement transform for an already computed pixel anchor.
    pub fn screen_transform(
        &self,
        anchor_px: Vec2,
        frame_width: u32,
        frame_height: u32,
        fov_degrees: f32,
        distance: f32,
    ) -> Mat4 {
        let position = screen_to_world(anchor_px, frame_width, frame_height, fov_degrees, distance);
        build_transform(position, Mat3::IDENTITY, self.config.heart_scale)
    }

    pub fn reset(&mut self) {
        self.state = AnchorState::default();
        self.tracking_3d = false;
        self.tracking_2d = false;
    }

    fn last_pose(&self) -> Option<ChestPose> {
        Some(ChestPose {
            position: self.state.position_3d?,
            rotation: self.state.rotation?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::Landmark;

    fn approx_vec2(a: Vec2, b: Vec2, eps: f32) -> bool {
        (a - b).abs().max_element() < eps
    }

    fn screen_pose(hips: Option<(f32, f32)>) -> Landmarks {
        let mut lm = Landmarks::empty();
        lm.set(LandmarkIndex::LeftShoulder, Landmark::new_2d(0.4, 0.3, 0.9));
        lm.set(LandmarkIndex::RightShoulder, Landmark::new_2d(0.6, 0.3, 0.9));
        if let Some((ly, ry)) = hips {
            lm.set(LandmarkIndex::LeftHip, Landmark::new_2d(0.42, ly, 0.9));
            lm.set(LandmarkIndex::RightHip, Landmark::new_2d(0.58, ry, 0.9));
        }
        lm
    }

    fn world_pose(ls: Vec3, rs: Vec3, hips: bool) -> Landmarks {
        let mut lm = Landmarks::empty();
        lm.set(LandmarkIndex::LeftShoulder, Landmark::new(ls.x, ls.y, ls.z, 0.9));
        lm.set(LandmarkIndex::RightShoulder, Landmark::new(rs.x, rs.y, rs.z, 0.9));
        if hips {
            lm.set(LandmarkIndex::LeftHip, Landmark::new(-0.15, 0.0, 0.0, 0.9));
            lm.set(LandmarkIndex::RightHip, Landmark::new(0.15, 0.0, 0.0, 0.9));
        }
        lm
    }

    #[test]
    fn test_2d_without_hips() {
        let mut t = AnchorTracker::default();
        let p = t.position_2d(&screen_pose(None), 1000, 1000).unwrap();
        assert!(approx_vec2(p, Vec2::new(530.0, 360.0), 1e-3), "{p:?}");
    }

    #[test]
    fn test_2d_with_hips() {
        let mut t = AnchorTracker::default();
        let p = t.position_2d(&screen_pose(Some((0.7, 0.7))), 1000, 1000).unwrap();
        // torso 400 px, drop 25%
        assert!(approx_vec2(p, Vec2::new(530.0, 400.0), 1e-3), "{p:?}");
    }

    #[test]
    fn test_2d_one_hip_uses_shoulder_fallback() {
        let mut t = AnchorTracker::default();
        let mut lm = screen_pose(None);
        lm.set(LandmarkIndex::LeftHip, Landmark::new_2d(0.42, 0.7, 0.9));
        let p = t.position_2d(&lm, 1000, 1000).unwrap();
        assert!(approx_vec2(p, Vec2::new(530.0, 360.0), 1e-3));
    }

    #[test]
    fn test_2d_smoothing() {
        let mut t = AnchorTracker::default();
        t.position_2d(&screen_pose(None), 1000, 1000);
        let mut moved = Landmarks::empty();
        moved.set(LandmarkIndex::LeftShoulder, Landmark::new_2d(0.5, 0.3, 0.9));
        moved.set(LandmarkIndex::RightShoulder, Landmark::new_2d(0.7, 0.3, 0.9));
        let p = t.position_2d(&moved, 1000, 1000).unwrap();
        // raw x would be 630; 0.7 * 530 + 0.3 * 630 = 560
        assert!(approx_vec2(p, Vec2::new(560.0, 360.0), 1e-3), "{p:?}");
    }

    #[test]
    fn test_2d_missing_shoulder_is_absent_and_keeps_state() {
        let mut t = AnchorTracker::default();
        let first = t.position_2d(&screen_pose(None), 1000, 1000).unwrap();
        let mut lm = screen_pose(None);
        lm.set(LandmarkIndex::RightShoulder, Landmark::new_2d(0.6, 0.3, 0.2));
        assert!(t.position_2d(&lm, 1000, 1000).is_none());
        assert_eq!(t.state().position_2d, Some(first));
    }

    #[test]
    fn test_3d_first_frame_missing_shoulder_is_none() {
        let mut t = AnchorTracker::default();
        assert!(t.track(&Landmarks::empty()).is_none());
        assert!(t.transform(&Landmarks::empty()).is_none());
    }

    #[test]
    fn test_3d_first_frame_passthrough() {
        let mut t = AnchorTracker::default();
        let lm = world_pose(Vec3::new(-0.2, 0.5, 0.1), Vec3::new(0.2, 0.5, 0.1), true);
        let pose = t.track(&lm).unwrap();
        assert!((pose.position - Vec3::new(0.0, 0.5, 0.05)).length() < 1e-6);
    }

    #[test]
    fn test_3d_holds_last_pose() {
        let mut t = AnchorTracker::default();
        let lm = world_pose(Vec3::new(-0.2, 0.5, 0.1), Vec3::new(0.2, 0.5, 0.1), false);
        let pose = t.track(&lm).unwrap();
        let held = t.track(&Landmarks::empty()).unwrap();
        assert_eq!(pose, held);
    }

    #[test]
    fn test_3d_position_smoothing() {
        let mut t = AnchorTracker::default();
        t.track(&world_pose(Vec3::new(-0.2, 0.0, 0.05), Vec3::new(0.2, 0.0, 0.05), true));
        let pose = t
            .track(&world_pose(Vec3::new(0.8, 0.0, 0.05), Vec3::new(1.2, 0.0, 0.05), true))
            .unwrap();
        // 0.7 * 0 + 0.3 * 1.0
        assert!((pose.position.x - 0.3).abs() < 1e-5);
        assert!(pose.position.z.abs() < 1e-6);
    }

    #[test]
    fn test_3d_rotation_stays_proper() {
        let mut t = AnchorTracker::default();
        t.track(&world_pose(Vec3::new(-0.2, 0.0, 0.5), Vec3::new(0.2, 0.0, 0.5), true));
        let pose = t
            .track(&world_pose(Vec3::new(-0.2, 0.0, 0.5), Vec3::new(0.2, 0.0, 0.5), false))
            .unwrap();
        let r = pose.rotation;
        assert!((r.transpose() * r).abs_diff_eq(Mat3::IDENTITY, 1e-5));
        assert!((r.determinant() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_transform_uses_heart_scale() {
        let mut t = AnchorTracker::default();
        let lm = world_pose(Vec3::new(-0.2, 0.5, 0.1), Vec3::new(0.2, 0.5, 0.1), false);
        let m = t.transform(&lm).unwrap();
        assert!((m.x_axis.truncate().length() - 0.15).abs() < 1e-6);
        assert!((m.w_axis.truncate() - Vec3::new(0.0, 0.5, 0.05)).length() < 1e-6);
    }

    #[test]
    fn test_transform_2d_center() {
        let mut t = AnchorTracker::default();
        let mut lm = Landmarks::empty();
        // shoulders placed so the adjusted anchor lands on the frame centre
        lm.set(LandmarkIndex::LeftShoulder, Landmark::new_2d(0.37, 0.44, 0.9));
        lm.set(LandmarkIndex::RightShoulder, Landmark::new_2d(0.57, 0.44, 0.9));
        let m = t.transform_2d(&lm, 1000, 1000, 60.0, 1.0).unwrap();
        assert!((m.w_axis.truncate() - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-4);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut t = AnchorTracker::default();
        t.position_2d(&screen_pose(None), 1000, 1000);
        t.track(&world_pose(Vec3::new(-0.2, 0.0, 0.0), Vec3::new(0.2, 0.0, 0.0), true));
        t.reset();
        assert_eq!(t.state(), &AnchorState::default());
        assert!(t.track(&Landmarks::empty()).is_none());
    }
}
