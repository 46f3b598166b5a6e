//! Procedural point cloud for the hero backdrop
//!
//! Points are sampled uniformly inside a sphere, pushed outward by a random
//! distortion factor and occasionally lifted by a fixed "spike" offset. The
//! result reads as a loose, organic cluster rather than a clean ball.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::f32::consts::TAU;
use tracing::debug;

use crate::config::GeneratorConfig;
use crate::theme::lerp_rgb;

/// A single particle. Immutable once generated.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Point {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub size: f32,
}

/// Fixed-size point set plus the flat attribute arrays uploaded to the GPU.
///
/// The three arrays are derived once at construction and never resized.
#[derive(Clone, Debug, Default)]
pub struct PointField {
    points: Vec<Point>,
    positions: Vec<[f32; 3]>,
    colors: Vec<[f32; 3]>,
    sizes: Vec<f32>,
}

impl PointField {
    pub fn from_points(points: Vec<Point>) -> Self {
        let positions = points.iter().map(|p| p.position).collect();
        let colors = points.iter().map(|p| p.color).collect();
        let sizes = points.iter().map(|p| p.size).collect();
        Self {
            points,
            positions,
            colors,
            sizes,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Positions, 3 floats per point
    pub fn position_data(&self) -> &[f32] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Colors, 3 floats per point
    pub fn color_data(&self) -> &[f32] {
        bytemuck::cast_slice(&self.colors)
    }

    /// Sizes, 1 float per point
    pub fn size_data(&self) -> &[f32] {
        &self.sizes
    }
}

/// Random source for field generation: seeded when the config asks for it,
/// entropy otherwise.
pub fn field_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    }
}

/// Generate `config.point_count` points inside a sphere of `config.radius`.
pub fn generate<R: Rng + ?Sized>(config: &GeneratorConfig, rng: &mut R) -> PointField {
    let points: Vec<Point> = (0..config.point_count)
        .map(|_| sample_point(config, rng))
        .collect();

    debug!(
        points = points.len(),
        radius = config.radius,
        "Generated point field"
    );

    PointField::from_points(points)
}

fn sample_point<R: Rng + ?Sized>(config: &GeneratorConfig, rng: &mut R) -> Point {
    // acos(2u - 1) keeps the polar angle uniform over the sphere surface,
    // cbrt keeps density uniform over the volume.
    let theta = rng.gen::<f32>() * TAU;
    let phi = (rng.gen::<f32>() * 2.0 - 1.0).acos();
    let radius = config.radius * rng.gen::<f32>().cbrt();

    let x = radius * phi.sin() * theta.cos();
    let y = radius * phi.sin() * theta.sin();
    let z = radius * phi.cos();

    let scale = 1.0 + rng.gen::<f32>() * config.distortion_max;
    let spike = if rng.gen::<f32>() < config.spike_probability {
        config.spike_offset
    } else {
        0.0
    };

    let intensity = rng.gen::<f32>();
    let size = config.size_base + rng.gen::<f32>() * config.size_range;

    Point {
        position: [x * scale, y * scale + spike, z * scale],
        color: lerp_rgb(config.color_low, config.color_high, intensity),
        size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(config: &GeneratorConfig, seed: u64) -> PointField {
        generate(config, &mut SmallRng::seed_from_u64(seed))
    }

    /// Sphere sampling only: no distortion, no spikes
    fn undistorted(point_count: usize, radius: f32) -> GeneratorConfig {
        GeneratorConfig {
            point_count,
            radius,
            distortion_max: 0.0,
            spike_probability: 0.0,
            ..GeneratorConfig::default()
        }
    }

    #[test]
    fn test_exact_count_and_finite() {
        for count in [0, 1, 7, 2500] {
            let config = GeneratorConfig {
                point_count: count,
                ..GeneratorConfig::default()
            };
            let field = seeded(&config, 42);
            assert_eq!(field.len(), count);
            assert_eq!(field.position_data().len(), count * 3);
            assert_eq!(field.color_data().len(), count * 3);
            assert_eq!(field.size_data().len(), count);
            for p in field.points() {
                assert!(p.position.iter().all(|c| c.is_finite()), "{:?}", p);
            }
        }
    }

    #[test]
    fn test_empty_field() {
        let field = seeded(&undistorted(0, 8.0), 1);
        assert!(field.is_empty());
        assert!(field.position_data().is_empty());
    }

    #[test]
    fn test_volumetric_uniformity() {
        let radius = 8.0;
        let field = seeded(&undistorted(100_000, radius), 1234);
        let normalized: Vec<f32> = field
            .points()
            .iter()
            .map(|p| {
                let [x, y, z] = p.position;
                (x * x + y * y + z * z).sqrt() / radius
            })
            .collect();

        assert!(normalized.iter().all(|&r| r <= 1.0 + 1e-5));

        // radius/R = cbrt(u) has CDF x^3 and mean 3/4
        let n = normalized.len() as f32;
        let mean = normalized.iter().sum::<f32>() / n;
        assert!((mean - 0.75).abs() < 0.01, "mean {}", mean);

        for x in [0.25f32, 0.5, 0.75, 0.9] {
            let below = normalized.iter().filter(|&&r| r <= x).count() as f32 / n;
            let expected = x.powi(3);
            assert!(
                (below - expected).abs() < 0.01,
                "P(r <= {}) = {}, expected {}",
                x,
                below,
                expected
            );
        }

        // Uniform-over-radius would put half of the points inside r = 0.5
        let inner_half = normalized.iter().filter(|&&r| r <= 0.5).count() as f32 / n;
        assert!(inner_half < 0.2);
    }

    #[test]
    fn test_distortion_and_spike_bounds() {
        let config = GeneratorConfig::default();
        let field = seeded(&config, 99);
        let limit = config.radius * (1.0 + config.distortion_max) + config.spike_offset;
        for p in field.points() {
            let [x, y, z] = p.position;
            assert!((x * x + y * y + z * z).sqrt() <= limit + 1e-4);
        }
    }

    #[test]
    fn test_spike_rate() {
        let config = GeneratorConfig {
            point_count: 20_000,
            distortion_max: 0.0,
            spike_offset: 100.0,
            ..GeneratorConfig::default()
        };
        // Undistorted points stay within radius, lifted ones land far above it
        let field = seeded(&config, 5);
        let lifted = field.points().iter().filter(|p| p.position[1] > 90.0).count();
        let fraction = lifted as f32 / field.len() as f32;
        assert!(
            (fraction - config.spike_probability).abs() < 0.01,
            "lifted fraction {}",
            fraction
        );
    }

    #[test]
    fn test_spike_always_when_certain() {
        let config = GeneratorConfig {
            point_count: 1_000,
            distortion_max: 0.0,
            spike_probability: 1.0,
            spike_offset: 100.0,
            ..GeneratorConfig::default()
        };
        let field = seeded(&config, 6);
        assert!(field.points().iter().all(|p| p.position[1] > 90.0));
    }

    #[test]
    fn test_distortion_only_expands() {
        let config = GeneratorConfig {
            point_count: 5_000,
            spike_probability: 0.0,
            ..GeneratorConfig::default()
        };
        let plain = seeded(
            &GeneratorConfig {
                distortion_max: 0.0,
                ..config.clone()
            },
            21,
        );
        let distorted = seeded(&config, 21);

        // Same seed, same draw order: only the scale factor differs
        let mut any_expanded = false;
        for (a, b) in plain.points().iter().zip(distorted.points()) {
            let ra = a.position.iter().map(|v| v * v).sum::<f32>().sqrt();
            let rb = b.position.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert!(rb >= ra - 1e-5, "{} < {}", rb, ra);
            assert!(rb <= ra * (1.0 + config.distortion_max) + 1e-4);
            any_expanded |= rb > ra * 1.01;
        }
        assert!(any_expanded);
    }

    #[test]
    fn test_color_and_size_ranges() {
        let config = GeneratorConfig::default();
        let field = seeded(&config, 3);
        for p in field.points() {
            for ch in 0..3 {
                assert!(p.color[ch] >= config.color_low[ch] - 1e-6);
                assert!(p.color[ch] <= config.color_high[ch] + 1e-6);
            }
            assert!(p.size >= config.size_base);
            assert!(p.size < config.size_base + config.size_range);
        }
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let config = GeneratorConfig {
            point_count: 64,
            ..GeneratorConfig::default()
        };
        let a = seeded(&config, 17);
        let b = seeded(&config, 17);
        let c = seeded(&config, 18);
        assert_eq!(a.points(), b.points());
        assert_ne!(a.points(), c.points());
    }

    #[test]
    fn test_flat_buffers_follow_points() {
        let field = seeded(&GeneratorConfig { point_count: 3, ..GeneratorConfig::default() }, 8);
        for (i, p) in field.points().iter().enumerate() {
            assert_eq!(&field.position_data()[i * 3..i * 3 + 3], &p.position);
            assert_eq!(&field.color_data()[i * 3..i * 3 + 3], &p.color);
            assert_eq!(field.size_data()[i], p.size);
        }
    }
}
