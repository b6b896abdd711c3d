//! Render-side seam.
//!
//! The core never draws; once per tick it hands a transform, a beat intensity
//! and a pixel anchor to a [`RenderSink`]. [`UniformSink`] packs those into a
//! GPU-ready uniform block.

use glam::{Mat4, Vec2};

use crate::constants::{MAX_RENDER_SCALE, MIN_RENDER_SCALE};
use crate::transform::Camera;

pub trait RenderSink {
    fn set_transform(&mut self, transform: Mat4);
    /// Beat scale multiplier (1.0 = rest).
    fn set_intensity(&mut self, intensity: f32);
    fn set_anchor_2d(&mut self, anchor_px: Vec2);
    /// No pose this tick; the overlay should not be drawn.
    fn clear_anchor_2d(&mut self);
}

/// Uniform block for the heart shader. Layout is std140-compatible.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct OverlayUniforms {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub anchor_px: [f32; 2],
    pub beat_scale: f32,
    /// 1 when `anchor_px` is valid.
    pub anchor_visible: u32,
}

impl Default for OverlayUniforms {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY.to_cols_array_2d(),
            view: Mat4::IDENTITY.to_cols_array_2d(),
            projection: Mat4::IDENTITY.to_cols_array_2d(),
            anchor_px: [0.0, 0.0],
            beat_scale: 1.0,
            anchor_visible: 0,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct UniformSink {
    uniforms: OverlayUniforms,
}

impl UniformSink {
    pub fn new(camera: &Camera) -> Self {
        let mut sink = Self::default();
        sink.set_camera(camera);
        sink
    }

    pub fn set_camera(&mut self, camera: &Camera) {
        self.uniforms.view = camera.view_matrix().to_cols_array_2d();
        self.uniforms.projection = camera.projection_matrix().to_cols_array_2d();
    }

    pub fn uniforms(&self) -> &OverlayUniforms {
        &self.uniforms
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(&self.uniforms)
    }
}

impl RenderSink for UniformSink {
    fn set_transform(&mut self, transform: Mat4) {
        self.uniforms.model = transform.to_cols_array_2d();
    }

    fn set_intensity(&mut self, intensity: f32) {
        self.uniforms.beat_scale = intensity.clamp(MIN_RENDER_SCALE, MAX_RENDER_SCALE);
    }

    fn set_anchor_2d(&mut self, anchor_px: Vec2) {
        self.uniforms.anchor_px = anchor_px.to_array();
        self.uniforms.anchor_visible = 1;
    }

    fn clear_anchor_2d(&mut self) {
        self.uniforms.anchor_visible = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_uniform_block_size() {
        assert_eq!(std::mem::size_of::<OverlayUniforms>(), 208);
        assert_eq!(std::mem::size_of::<OverlayUniforms>() % 16, 0);
        let sink = UniformSink::default();
        assert_eq!(sink.as_bytes().len(), 208);
    }

    #[test]
    fn test_intensity_is_clamped() {
        let mut sink = UniformSink::default();
        sink.set_intensity(3.0);
        assert_eq!(sink.uniforms().beat_scale, 2.0);
        sink.set_intensity(0.1);
        assert_eq!(sink.uniforms().beat_scale, 0.5);
        sink.set_intensity(1.2);
        assert_eq!(sink.uniforms().beat_scale, 1.2);
    }

    #[test]
    fn test_anchor_visibility() {
        let mut sink = UniformSink::default();
        sink.set_anchor_2d(Vec2::new(10.0, 20.0));
        assert_eq!(sink.uniforms().anchor_visible, 1);
        assert_eq!(sink.uniforms().anchor_px, [10.0, 20.0]);
        sink.clear_anchor_2d();
        assert_eq!(sink.uniforms().anchor_visible, 0);
    }

    #[test]
    fn test_transform_and_camera() {
        let cam = Camera::default();
        let mut sink = UniformSink::new(&cam);
        assert_eq!(sink.uniforms().view, Mat4::IDENTITY.to_cols_array_2d());
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        sink.set_transform(m);
        assert_eq!(sink.uniforms().model[3], [1.0, 2.0, 3.0, 1.0]);
    }
}
