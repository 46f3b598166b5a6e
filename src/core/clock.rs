//! Animation time and field rotation
//!
//! Both advance by fixed steps per executed frame, so skipped (throttled)
//! ticks do not move the animation.

use glam::Mat4;

/// Elapsed-time accumulator feeding the shader's time uniform
#[derive(Clone, Debug, Default)]
pub struct AnimationClock {
    elapsed: f32,
    step: f32,
}

impl AnimationClock {
    pub fn new(step: f32) -> Self {
        Self { elapsed: 0.0, step }
    }

    /// Advance one frame, returning the new elapsed value
    pub fn advance(&mut self) -> f32 {
        self.elapsed += self.step;
        self.elapsed
    }

    /// Elapsed value the next `advance` will return
    pub fn peek(&self) -> f32 {
        self.elapsed + self.step
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }
}

/// Slow tumble of the whole point field
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FieldTransform {
    pub rotation_x: f32,
    pub rotation_y: f32,
}

impl FieldTransform {
    pub fn advance(&mut self, step: [f32; 2]) {
        self.rotation_x += step[0];
        self.rotation_y += step[1];
    }

    /// Model matrix, X applied after Y
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_x(self.rotation_x) * Mat4::from_rotation_y(self.rotation_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_steps() {
        let mut clock = AnimationClock::new(0.005);
        assert_eq!(clock.elapsed(), 0.0);
        clock.advance();
        let t = clock.advance();
        assert!((t - 0.01).abs() < 1e-7);
        assert_eq!(clock.elapsed(), t);
    }

    #[test]
    fn test_clock_peek_does_not_advance() {
        let mut clock = AnimationClock::new(0.005);
        assert_eq!(clock.peek(), 0.005);
        assert_eq!(clock.peek(), 0.005);
        assert_eq!(clock.elapsed(), 0.0);
        assert_eq!(clock.advance(), 0.005);
    }

    #[test]
    fn test_transform_accumulates() {
        let mut transform = FieldTransform::default();
        assert_eq!(transform.matrix(), Mat4::IDENTITY);
        for _ in 0..10 {
            transform.advance([0.0002, 0.0005]);
        }
        assert!((transform.rotation_x - 0.002).abs() < 1e-6);
        assert!((transform.rotation_y - 0.005).abs() < 1e-6);
        assert_ne!(transform.matrix(), Mat4::IDENTITY);
    }
}
