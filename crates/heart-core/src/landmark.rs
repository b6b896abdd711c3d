//! Pose landmark model consumed by the anchor tracker.
//!
//! A pose source produces one [`Landmarks`] list per frame, indexed by the
//! 33-point body topology ([`LandmarkIndex`]). Two flavours exist: normalized
//! image coordinates (x, y in \[0, 1\], origin top-left) and world coordinates
//! in metres. Both share the same type; callers pick the accessor they need.

use glam::{Vec2, Vec3};

/// Body landmark indices (33-point topology).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum LandmarkIndex {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl LandmarkIndex {
    pub const COUNT: usize = 33;

    const ALL: [LandmarkIndex; Self::COUNT] = [
        Self::Nose,
        Self::LeftEyeInner,
        Self::LeftEye,
        Self::LeftEyeOuter,
        Self::RightEyeInner,
        Self::RightEye,
        Self::RightEyeOuter,
        Self::LeftEar,
        Self::RightEar,
        Self::MouthLeft,
        Self::MouthRight,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftPinky,
        Self::RightPinky,
        Self::LeftIndex,
        Self::RightIndex,
        Self::LeftThumb,
        Self::RightThumb,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
        Self::LeftHeel,
        Self::RightHeel,
        Self::LeftFootIndex,
        Self::RightFootIndex,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Single landmark as reported by the pose source.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    /// Depth; zero for sources that only report 2D.
    pub z: f32,
    /// Visibility/confidence in \[0, 1\].
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    pub fn new_2d(x: f32, y: f32, visibility: f32) -> Self {
        Self::new(x, y, 0.0, visibility)
    }

    pub fn is_visible(&self, threshold: f32) -> bool {
        self.visibility >= threshold
    }

    #[inline]
    pub fn xy(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    #[inline]
    pub fn xyz(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// One frame's worth of landmarks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Landmarks {
    points: Vec<Landmark>,
}

impl Landmarks {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    /// A full-topology list with every point invisible; handy for building test poses.
    pub fn empty() -> Self {
        Self::new(vec![Landmark::default(); LandmarkIndex::COUNT])
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: LandmarkIndex) -> Option<&Landmark> {
        self.points.get(index.index())
    }

    /// Sets a landmark, growing the list if the source reported fewer points.
    pub fn set(&mut self, index: LandmarkIndex, landmark: Landmark) {
        let i = index.index();
        if i >= self.points.len() {
            self.points.resize(i + 1, Landmark::default());
        }
        self.points[i] = landmark;
    }

    /// Normalized image position, or `None` if missing or not visible enough.
    pub fn point_2d(&self, index: LandmarkIndex, threshold: f32) -> Option<Vec2> {
        self.get(index)
            .filter(|l| l.is_visible(threshold))
            .map(Landmark::xy)
    }

    /// 3D position, or `None` if missing or not visible enough.
    pub fn point_3d(&self, index: LandmarkIndex, threshold: f32) -> Option<Vec3> {
        self.get(index)
            .filter(|l| l.is_visible(threshold))
            .map(Landmark::xyz)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Landmark> {
        self.points.iter()
    }
}

impl From<Vec<Landmark>> for Landmarks {
    fn from(points: Vec<Landmark>) -> Self {
        Self::new(points)
    }
}

/// Pose detector seam. Implementations wrap whatever model produces landmarks.
pub trait PoseSource {
    type Frame;

    /// Landmarks in normalized image coordinates, `None` when no person is found.
    fn normalized_landmarks(&mut self, frame: &Self::Frame) -> Option<Landmarks>;

    /// Landmarks in metric world coordinates, `None` when no person is found.
    fn world_landmarks(&mut self, frame: &Self::Frame) -> Option<Landmarks>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_index_count() {
        assert_eq!(LandmarkIndex::COUNT, 33);
        assert_eq!(LandmarkIndex::RightFootIndex.index(), 32);
    }

    #[test]
    fn test_landmark_index_from_index() {
        assert_eq!(LandmarkIndex::from_index(0), Some(LandmarkIndex::Nose));
        assert_eq!(LandmarkIndex::from_index(11), Some(LandmarkIndex::LeftShoulder));
        assert_eq!(LandmarkIndex::from_index(24), Some(LandmarkIndex::RightHip));
        assert_eq!(LandmarkIndex::from_index(33), None);
    }

    #[test]
    fn test_index_table_matches_discriminants() {
        for i in 0..LandmarkIndex::COUNT {
            let idx = LandmarkIndex::from_index(i).unwrap();
            assert_eq!(idx.index(), i);
        }
    }

    #[test]
    fn test_visibility_gate() {
        let mut lm = Landmarks::empty();
        lm.set(LandmarkIndex::LeftShoulder, Landmark::new_2d(0.4, 0.3, 0.49));
        lm.set(LandmarkIndex::RightShoulder, Landmark::new_2d(0.6, 0.3, 0.5));
        assert!(lm.point_2d(LandmarkIndex::LeftShoulder, 0.5).is_none());
        assert_eq!(
            lm.point_2d(LandmarkIndex::RightShoulder, 0.5),
            Some(Vec2::new(0.6, 0.3))
        );
    }

    #[test]
    fn test_short_list_is_absent_not_panic() {
        let lm = Landmarks::new(vec![Landmark::new(0.0, 0.0, 0.0, 1.0)]);
        assert!(lm.point_3d(LandmarkIndex::LeftHip, 0.5).is_none());
        assert!(lm.point_3d(LandmarkIndex::Nose, 0.5).is_some());
    }

    #[test]
    fn test_set_grows_list() {
        let mut lm = Landmarks::default();
        lm.set(LandmarkIndex::RightHip, Landmark::new(1.0, 2.0, 3.0, 1.0));
        assert_eq!(lm.len(), 25);
        assert_eq!(
            lm.point_3d(LandmarkIndex::RightHip, 0.5),
            Some(Vec3::new(1.0, 2.0, 3.0))
        );
    }
}
