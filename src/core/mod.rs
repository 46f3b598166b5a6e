//! Platform-agnostic core - shared between the WASM component and the CLI

pub mod camera;
pub mod clock;
pub mod field;
pub mod scheduler;
pub mod throttle;

pub use camera::{CameraState, OutputSize, Viewport};
pub use clock::{AnimationClock, FieldTransform};
pub use field::{field_rng, generate, Point, PointField};
pub use scheduler::{FrameScheduler, FrameStats, FrameTicket, LifecycleState, TickOutcome};
pub use throttle::{Debouncer, FrameThrottle};
