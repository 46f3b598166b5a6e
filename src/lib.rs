//! Hero particle field - decorative WebGL point-cloud backdrop
//!
//! A few thousand points scattered through a loose sphere, slowly tumbling
//! and glowing with additive blending behind the portfolio hero section.
//!
//! - `core`: point generation, camera, throttling and the lifecycle scheduler
//! - `render`: backend-agnostic pipeline, shaders, headless and WebGL2 backends
//! - `web`: `mount`/`unmount` for the browser (wasm feature)

pub mod config;
pub mod core;
pub mod error;
pub mod render;
pub mod theme;
pub mod time;

#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
pub mod web;

pub use config::FieldConfig;
pub use crate::core::{FrameScheduler, LifecycleState, PointField, Viewport};
pub use error::{ConfigError, InitError};
pub use render::{RenderBackend, RenderPipeline};
