//! Camera and viewport state

use glam::{Mat4, Vec3};

use crate::config::CameraConfig;

/// Host window dimensions in CSS pixels plus device pixel density
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f64,
}

impl Viewport {
    pub fn new(width: u32, height: u32, pixel_ratio: f64) -> Self {
        Self {
            width,
            height,
            pixel_ratio,
        }
    }

    /// Width over height, with a zero-sized window treated as 1x1
    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }

    /// Drawing-buffer size with the pixel ratio capped at `max_pixel_ratio`
    pub fn output_size(&self, max_pixel_ratio: f64) -> OutputSize {
        let ratio = self.capped_pixel_ratio(max_pixel_ratio);
        OutputSize {
            width: (self.width as f64 * ratio).round() as u32,
            height: (self.height as f64 * ratio).round() as u32,
            pixel_ratio: ratio as f32,
        }
    }

    pub fn capped_pixel_ratio(&self, max_pixel_ratio: f64) -> f64 {
        if self.pixel_ratio.is_finite() && self.pixel_ratio > 0.0 {
            self.pixel_ratio.min(max_pixel_ratio)
        } else {
            1.0
        }
    }
}

/// Physical size of the backend's drawing buffer
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OutputSize {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

/// Perspective camera. Only `aspect` changes after construction.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraState {
    pub fov_y_deg: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl CameraState {
    pub fn new(config: &CameraConfig, aspect: f32) -> Self {
        Self {
            fov_y_deg: config.fov_y_deg,
            aspect,
            near: config.near,
            far: config.far,
            position: Vec3::from_array(config.position),
            target: Vec3::from_array(config.target),
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    /// OpenGL clip space (z in [-1, 1]), as WebGL expects
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y_deg.to_radians(), self.aspect, self.near, self.far)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_ratio_capped() {
        let viewport = Viewport::new(1000, 500, 3.0);
        let size = viewport.output_size(2.0);
        assert_eq!((size.width, size.height), (2000, 1000));
        assert_eq!(size.pixel_ratio, 2.0);

        let low = Viewport::new(1000, 500, 1.5).output_size(2.0);
        assert_eq!((low.width, low.height), (1500, 750));
    }

    #[test]
    fn test_bad_pixel_ratio_falls_back_to_one() {
        assert_eq!(Viewport::new(10, 10, 0.0).capped_pixel_ratio(2.0), 1.0);
        assert_eq!(Viewport::new(10, 10, f64::NAN).capped_pixel_ratio(2.0), 1.0);
    }

    #[test]
    fn test_zero_height_aspect_is_finite() {
        let viewport = Viewport::new(800, 0, 1.0);
        assert_eq!(viewport.aspect(), 800.0);
    }

    #[test]
    fn test_camera_defaults_and_aspect() {
        let mut camera = CameraState::new(&CameraConfig::default(), 16.0 / 9.0);
        assert_eq!(camera.fov_y_deg, 60.0);
        assert_eq!((camera.near, camera.far), (1.0, 200.0));

        camera.set_aspect(2.0);
        assert_eq!(camera.aspect, 2.0);
        camera.set_aspect(0.0);
        assert_eq!(camera.aspect, 2.0);
    }

    #[test]
    fn test_origin_is_in_front_of_camera() {
        let camera = CameraState::new(&CameraConfig::default(), 1.0);
        let view = camera.view_matrix().transform_point3(Vec3::ZERO);
        // Right-handed view space looks down -z
        assert!(view.z < 0.0);
        let distance = -view.z;
        assert!(distance > camera.near && distance < camera.far);
    }
}
