//! Shading program for the point sprites (GLSL ES 3.00)
//!
//! Vertex stage: gentle sinusoidal drift plus perspective size attenuation.
//! Fragment stage: soft round sprite, solid to 0.4 of the sprite radius and
//! fading linearly to transparent at 0.5.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Vertex attribute slots, bound to fixed locations in the vertex shader
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attribute {
    Position,
    Color,
    Size,
}

impl Attribute {
    pub const ALL: [Attribute; 3] = [Attribute::Position, Attribute::Color, Attribute::Size];

    pub fn location(self) -> u32 {
        match self {
            Attribute::Position => 0,
            Attribute::Color => 1,
            Attribute::Size => 2,
        }
    }

    /// Floats per vertex
    pub fn components(self) -> i32 {
        match self {
            Attribute::Position | Attribute::Color => 3,
            Attribute::Size => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Attribute::Position => "position",
            Attribute::Color => "color",
            Attribute::Size => "size",
        }
    }
}

pub const VERTEX_SHADER: &str = r#"#version 300 es
precision mediump float;

layout(location = 0) in vec3 a_position;
layout(location = 1) in vec3 a_color;
layout(location = 2) in float a_size;

uniform mat4 u_model_view;
uniform mat4 u_projection;
uniform float u_time;
uniform float u_point_scale;

out vec3 v_color;

void main() {
    v_color = a_color;

    vec3 pos = a_position;
    float drift = sin(u_time * 0.3 + a_position.x * 0.2 + a_position.y * 0.1) * 0.1;
    pos.x += drift;
    pos.y += drift * 0.5;

    vec4 mv_position = u_model_view * vec4(pos, 1.0);
    gl_PointSize = a_size * u_point_scale * (1.0 / -mv_position.z);
    gl_Position = u_projection * mv_position;
}
"#;

pub const FRAGMENT_SHADER: &str = r#"#version 300 es
precision mediump float;

in vec3 v_color;
out vec4 frag_color;

void main() {
    float dist = length(gl_PointCoord - vec2(0.5, 0.5));
    float opacity = clamp((0.5 - dist) / 0.1, 0.0, 1.0);
    frag_color = vec4(v_color, opacity);
}
"#;

/// Uniform names as declared in [`VERTEX_SHADER`]
pub mod uniforms {
    pub const MODEL_VIEW: &str = "u_model_view";
    pub const PROJECTION: &str = "u_projection";
    pub const TIME: &str = "u_time";
    pub const POINT_SCALE: &str = "u_point_scale";
}

/// Per-frame uniform values
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub model_view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub time: f32,
    pub point_scale: f32,
    pub _pad: [f32; 2],
}

impl FrameUniforms {
    pub fn new(model_view: Mat4, projection: Mat4, time: f32, point_scale: f32) -> Self {
        Self {
            model_view: model_view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            time,
            point_scale,
            _pad: [0.0; 2],
        }
    }

    /// Column-major model-view matrix, ready for `uniformMatrix4fv`
    pub fn model_view_data(&self) -> &[f32] {
        bytemuck::cast_slice(&self.model_view)
    }

    pub fn projection_data(&self) -> &[f32] {
        bytemuck::cast_slice(&self.projection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_locations_match_shader() {
        for attribute in Attribute::ALL {
            let decl = format!("layout(location = {}) in", attribute.location());
            let line = VERTEX_SHADER
                .lines()
                .find(|l| l.contains(&decl))
                .unwrap_or_else(|| panic!("no slot for {}", attribute.label()));
            assert!(line.contains(&format!("a_{};", attribute.label())), "{}", line);
            let ty = if attribute.components() == 1 { "float" } else { "vec3" };
            assert!(line.contains(ty), "{}", line);
        }
    }

    #[test]
    fn test_uniforms_declared() {
        for name in [
            uniforms::MODEL_VIEW,
            uniforms::PROJECTION,
            uniforms::TIME,
            uniforms::POINT_SCALE,
        ] {
            assert!(VERTEX_SHADER.contains(&format!(" {};", name)), "{}", name);
        }
    }

    #[test]
    fn test_matrix_data_is_column_major() {
        let translation = Mat4::from_translation(glam::Vec3::new(1.0, 2.0, 3.0));
        let u = FrameUniforms::new(translation, Mat4::IDENTITY, 0.0, 2.5);
        assert_eq!(u.model_view_data().len(), 16);
        assert_eq!(&u.model_view_data()[12..15], &[1.0, 2.0, 3.0]);
        assert_eq!(u.projection_data(), Mat4::IDENTITY.to_cols_array().as_slice());
    }

    #[test]
    fn test_point_size_is_depth_attenuated_only() {
        let line = VERTEX_SHADER
            .lines()
            .find(|l| l.contains("gl_PointSize"))
            .unwrap();
        assert_eq!(
            line.trim(),
            "gl_PointSize = a_size * u_point_scale * (1.0 / -mv_position.z);"
        );
        assert!(!VERTEX_SHADER.contains("pixel_ratio"));
    }
}
