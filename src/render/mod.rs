//! Render pipeline for the point field
//!
//! The pipeline owns one [`RenderContext`]: the backend (graphics context plus
//! display surface), the compiled program, the attribute buffers and the
//! camera. Everything is released through a single [`RenderPipeline::dispose`].

pub mod headless;
pub mod shader;
#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
pub mod webgl;

use tracing::{debug, info, trace, warn};

use crate::config::FieldConfig;
use crate::core::camera::{CameraState, OutputSize, Viewport};
use crate::core::clock::FieldTransform;
use crate::core::field::PointField;
use crate::error::InitError;
use shader::{Attribute, FrameUniforms, FRAGMENT_SHADER, VERTEX_SHADER};

pub use headless::{HeadlessBackend, HeadlessReport};

/// Graphics backend seam: WebGL2 in the browser, a recorder elsewhere.
///
/// Resources are plain values owned by the caller; the backend only needs
/// them back for drawing and deletion.
pub trait RenderBackend {
    type Buffer;
    type Program;

    fn create_buffer(&mut self, attribute: Attribute, data: &[f32]) -> Result<Self::Buffer, InitError>;

    fn create_program(&mut self, vertex: &str, fragment: &str) -> Result<Self::Program, InitError>;

    fn set_output_size(&mut self, size: OutputSize);

    /// True once the underlying context is gone; draws must be skipped
    fn is_context_lost(&self) -> bool;

    /// Clear the surface and draw `count` points with additive blending
    fn draw_points(
        &mut self,
        program: &Self::Program,
        buffers: &AttributeBuffers<Self::Buffer>,
        uniforms: &FrameUniforms,
        count: usize,
    );

    fn delete_buffer(&mut self, buffer: Self::Buffer);

    fn delete_program(&mut self, program: Self::Program);

    /// Drop the context and detach the display surface. Must tolerate being
    /// called on a half-initialized backend.
    fn release(&mut self);
}

/// One GPU buffer per attribute
pub struct AttributeBuffers<Buf> {
    pub position: Buf,
    pub color: Buf,
    pub size: Buf,
}

/// Result of a single `render_frame` call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Rendered,
    /// Pipeline not initialized or already disposed
    NoContext,
    ContextLost,
}

/// Everything acquired by `initialize`, released together by `dispose`
pub struct RenderContext<B: RenderBackend> {
    backend: B,
    program: B::Program,
    buffers: AttributeBuffers<B::Buffer>,
    camera: CameraState,
    transform: FieldTransform,
    output: OutputSize,
    field: PointField,
}

pub struct RenderPipeline<B: RenderBackend> {
    config: FieldConfig,
    context: Option<RenderContext<B>>,
}

impl<B: RenderBackend> RenderPipeline<B> {
    pub fn new(config: FieldConfig) -> Self {
        Self {
            config,
            context: None,
        }
    }

    /// Acquire the backend, upload `field` and compile the program.
    ///
    /// On failure everything acquired so far is released before returning.
    pub fn initialize<F>(&mut self, acquire: F, viewport: Viewport, field: PointField) -> Result<(), InitError>
    where
        F: FnOnce(OutputSize) -> Result<B, InitError>,
    {
        if self.context.is_some() {
            warn!("Render pipeline already initialized, disposing previous context");
            self.dispose();
        }

        let output = viewport.output_size(self.config.scheduler.max_pixel_ratio);
        let mut backend = acquire(output)?;
        backend.set_output_size(output);

        let buffers = match upload_field(&mut backend, &field) {
            Ok(buffers) => buffers,
            Err(e) => {
                backend.release();
                return Err(e);
            }
        };

        let program = match backend.create_program(VERTEX_SHADER, FRAGMENT_SHADER) {
            Ok(program) => program,
            Err(e) => {
                delete_buffers(&mut backend, buffers);
                backend.release();
                return Err(e);
            }
        };

        let camera = CameraState::new(&self.config.camera, viewport.aspect());

        info!(
            points = field.len(),
            width = output.width,
            height = output.height,
            pixel_ratio = output.pixel_ratio,
            "Render pipeline initialized"
        );

        self.context = Some(RenderContext {
            backend,
            program,
            buffers,
            camera,
            transform: FieldTransform::default(),
            output,
            field,
        });
        Ok(())
    }

    /// Advance the tumble, set the time uniform and draw once
    pub fn render_frame(&mut self, elapsed: f32) -> FrameOutcome {
        let Some(ctx) = self.context.as_mut() else {
            return FrameOutcome::NoContext;
        };

        if ctx.backend.is_context_lost() {
            trace!("Context lost, skipping frame");
            return FrameOutcome::ContextLost;
        }

        ctx.transform.advance(self.config.animation.rotation_step);

        let model_view = ctx.camera.view_matrix() * ctx.transform.matrix();
        let uniforms = FrameUniforms::new(
            model_view,
            ctx.camera.projection_matrix(),
            elapsed,
            self.config.animation.point_scale,
        );

        ctx.backend
            .draw_points(&ctx.program, &ctx.buffers, &uniforms, ctx.field.len());
        FrameOutcome::Rendered
    }

    /// Track a new viewport. No-op before `initialize` or after `dispose`.
    pub fn resize(&mut self, viewport: Viewport) {
        let Some(ctx) = self.context.as_mut() else {
            return;
        };

        let output = viewport.output_size(self.config.scheduler.max_pixel_ratio);
        ctx.camera.set_aspect(viewport.aspect());
        ctx.output = output;
        ctx.backend.set_output_size(output);

        debug!(
            width = output.width,
            height = output.height,
            aspect = ctx.camera.aspect,
            "Render pipeline resized"
        );
    }

    /// Release buffers, program, context and surface. Idempotent.
    pub fn dispose(&mut self) {
        let Some(ctx) = self.context.take() else {
            return;
        };

        let RenderContext {
            mut backend,
            program,
            buffers,
            field,
            ..
        } = ctx;

        delete_buffers(&mut backend, buffers);
        backend.delete_program(program);
        backend.release();

        debug!(points = field.len(), "Render pipeline disposed");
    }

    pub fn is_initialized(&self) -> bool {
        self.context.is_some()
    }

    pub fn camera(&self) -> Option<&CameraState> {
        self.context.as_ref().map(|ctx| &ctx.camera)
    }

    pub fn transform(&self) -> Option<FieldTransform> {
        self.context.as_ref().map(|ctx| ctx.transform)
    }

    pub fn output_size(&self) -> Option<OutputSize> {
        self.context.as_ref().map(|ctx| ctx.output)
    }

    pub fn point_count(&self) -> Option<usize> {
        self.context.as_ref().map(|ctx| ctx.field.len())
    }
}

impl<B: RenderBackend> Drop for RenderPipeline<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Upload the three attribute arrays, deleting any already-created buffer if
/// a later one fails.
fn upload_field<B: RenderBackend>(
    backend: &mut B,
    field: &PointField,
) -> Result<AttributeBuffers<B::Buffer>, InitError> {
    let position = backend.create_buffer(Attribute::Position, field.position_data())?;

    let color = match backend.create_buffer(Attribute::Color, field.color_data()) {
        Ok(buffer) => buffer,
        Err(e) => {
            backend.delete_buffer(position);
            return Err(e);
        }
    };

    let size = match backend.create_buffer(Attribute::Size, field.size_data()) {
        Ok(buffer) => buffer,
        Err(e) => {
            backend.delete_buffer(position);
            backend.delete_buffer(color);
            return Err(e);
        }
    };

    Ok(AttributeBuffers {
        position,
        color,
        size,
    })
}

fn delete_buffers<B: RenderBackend>(backend: &mut B, buffers: AttributeBuffers<B::Buffer>) {
    backend.delete_buffer(buffers.position);
    backend.delete_buffer(buffers.color);
    backend.delete_buffer(buffers.size);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::core::field::{field_rng, generate};
    use super::headless::FailPoint;

    fn small_field(count: usize) -> PointField {
        let config = GeneratorConfig {
            point_count: count,
            seed: Some(11),
            ..GeneratorConfig::default()
        };
        generate(&config, &mut field_rng(config.seed))
    }

    fn viewport() -> Viewport {
        Viewport::new(1280, 720, 1.0)
    }

    fn initialized(backend: HeadlessBackend, count: usize) -> RenderPipeline<HeadlessBackend> {
        let mut pipeline = RenderPipeline::new(FieldConfig::default());
        pipeline
            .initialize(|_| Ok(backend), viewport(), small_field(count))
            .unwrap();
        pipeline
    }

    #[test]
    fn test_initialize_uploads_and_compiles() {
        let backend = HeadlessBackend::new();
        let report = backend.report();
        let pipeline = initialized(backend, 100);

        let r = report.borrow();
        assert_eq!(r.buffers_created, 3);
        assert_eq!(r.programs_created, 1);
        assert_eq!(r.uploaded_floats, 100 * 7);
        assert_eq!(r.live_resources(), 4);
        assert_eq!(r.output_sizes.last().map(|s| (s.width, s.height)), Some((1280, 720)));
        assert!(pipeline.is_initialized());
        assert_eq!(pipeline.point_count(), Some(100));
    }

    #[test]
    fn test_render_frame_draws_once_and_advances() {
        let backend = HeadlessBackend::new();
        let report = backend.report();
        let mut pipeline = initialized(backend, 10);

        assert_eq!(pipeline.render_frame(0.005), FrameOutcome::Rendered);
        assert_eq!(pipeline.render_frame(0.010), FrameOutcome::Rendered);

        let r = report.borrow();
        assert_eq!(r.draw_calls, 2);
        assert_eq!(r.points_drawn, 20);
        let last = r.last_uniforms.unwrap();
        assert_eq!(last.time, 0.010);
        assert_eq!(last.point_scale, 2.5);

        let transform = pipeline.transform().unwrap();
        assert!((transform.rotation_y - 0.001).abs() < 1e-7);
        assert!((transform.rotation_x - 0.0004).abs() < 1e-7);
    }

    #[test]
    fn test_empty_field_renders() {
        let backend = HeadlessBackend::new();
        let report = backend.report();
        let mut pipeline = initialized(backend, 0);
        assert_eq!(pipeline.render_frame(0.0), FrameOutcome::Rendered);
        assert_eq!(report.borrow().points_drawn, 0);
    }

    #[test]
    fn test_acquire_failure() {
        let mut pipeline: RenderPipeline<HeadlessBackend> = RenderPipeline::new(FieldConfig::default());
        let result = pipeline.initialize(
            |_| Err(InitError::BackendUnavailable("no webgl2".into())),
            viewport(),
            small_field(5),
        );
        assert!(matches!(result, Err(InitError::BackendUnavailable(_))));
        assert!(!pipeline.is_initialized());
        assert_eq!(pipeline.render_frame(0.0), FrameOutcome::NoContext);
    }

    #[test]
    fn test_hidpi_keeps_sprite_scale() {
        let backend = HeadlessBackend::new();
        let report = backend.report();
        let mut pipeline = RenderPipeline::new(FieldConfig::default());
        pipeline
            .initialize(|_| Ok(backend), Viewport::new(1000, 500, 2.0), small_field(4))
            .unwrap();
        assert_eq!(pipeline.render_frame(0.0), FrameOutcome::Rendered);

        // Drawing buffer doubles, sprite size factor does not
        let size = pipeline.output_size().unwrap();
        assert_eq!((size.width, size.height), (2000, 1000));
        let last = report.borrow().last_uniforms.unwrap();
        assert_eq!(last.point_scale, 2.5);
    }

    #[test]
    fn test_partial_init_failure_releases_everything() {
        for fail in [
            FailPoint::PositionBuffer,
            FailPoint::ColorBuffer,
            FailPoint::SizeBuffer,
            FailPoint::Program,
        ] {
            let backend = HeadlessBackend::failing_at(fail);
            let report = backend.report();
            let mut pipeline = RenderPipeline::new(FieldConfig::default());
            let result = pipeline.initialize(|_| Ok(backend), viewport(), small_field(5));

            assert!(result.is_err(), "{:?}", fail);
            let r = report.borrow();
            assert_eq!(r.live_resources(), 0, "{:?}", fail);
            assert!(r.released, "{:?}", fail);
        }
    }

    #[test]
    fn test_resize_updates_camera_and_output() {
        let backend = HeadlessBackend::new();
        let report = backend.report();
        let mut pipeline = initialized(backend, 1);

        pipeline.resize(Viewport::new(800, 800, 3.0));
        assert_eq!(pipeline.camera().unwrap().aspect, 1.0);
        let size = pipeline.output_size().unwrap();
        assert_eq!((size.width, size.height, size.pixel_ratio), (1600, 1600, 2.0));
        assert_eq!(report.borrow().output_sizes.len(), 2);
    }

    #[test]
    fn test_resize_before_initialize_is_noop() {
        let mut pipeline: RenderPipeline<HeadlessBackend> = RenderPipeline::new(FieldConfig::default());
        pipeline.resize(viewport());
        assert!(pipeline.camera().is_none());
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let backend = HeadlessBackend::new();
        let report = backend.report();
        let mut pipeline = initialized(backend, 10);

        pipeline.dispose();
        let after_first = report.borrow().clone();
        assert_eq!(after_first.live_resources(), 0);
        assert!(after_first.released);
        assert!(!pipeline.is_initialized());

        pipeline.dispose();
        assert_eq!(*report.borrow(), after_first);
        assert!(!pipeline.is_initialized());
        assert!(pipeline.camera().is_none());
        assert_eq!(pipeline.render_frame(1.0), FrameOutcome::NoContext);
    }

    #[test]
    fn test_context_loss_skips_draws() {
        let backend = HeadlessBackend::new();
        let report = backend.report();
        let mut pipeline = initialized(backend, 10);

        report.borrow_mut().context_lost = true;
        assert_eq!(pipeline.render_frame(0.1), FrameOutcome::ContextLost);
        assert_eq!(report.borrow().draw_calls, 0);

        // Teardown still works on a lost context
        pipeline.dispose();
        assert_eq!(report.borrow().live_resources(), 0);
    }

    #[test]
    fn test_drop_disposes() {
        let backend = HeadlessBackend::new();
        let report = backend.report();
        drop(initialized(backend, 10));
        assert_eq!(report.borrow().live_resources(), 0);
        assert!(report.borrow().released);
    }
}
