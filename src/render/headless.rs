//! Recording backend: no GPU, just bookkeeping
//!
//! Used by the CLI harness and as the test double for the pipeline and
//! scheduler. The report is shared through `Rc<RefCell<..>>` so callers can
//! inspect it after the pipeline has consumed (and released) the backend.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use serde::Serialize;
use tracing::trace;

use super::shader::{Attribute, FrameUniforms};
use super::{AttributeBuffers, RenderBackend};
use crate::core::camera::OutputSize;
use crate::error::{InitError, ShaderStage};

pub type SharedReport = Rc<RefCell<HeadlessReport>>;

/// Everything the backend was asked to do
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct HeadlessReport {
    pub buffers_created: usize,
    pub buffers_deleted: usize,
    pub programs_created: usize,
    pub programs_deleted: usize,
    pub uploaded_floats: usize,
    pub draw_calls: usize,
    pub points_drawn: usize,
    #[serde(skip)]
    pub output_sizes: Vec<OutputSize>,
    #[serde(skip)]
    pub last_uniforms: Option<FrameUniforms>,
    /// Simulated context loss; set it to make draws no-op
    pub context_lost: bool,
    pub released: bool,
    #[serde(skip)]
    live: BTreeSet<u32>,
}

impl HeadlessReport {
    /// Buffers and programs created but not yet deleted
    pub fn live_resources(&self) -> usize {
        self.live.len()
    }
}

/// Where a [`HeadlessBackend`] should refuse to continue
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailPoint {
    PositionBuffer,
    ColorBuffer,
    SizeBuffer,
    Program,
}

#[derive(Debug)]
pub struct HeadlessBuffer {
    id: u32,
}

#[derive(Debug)]
pub struct HeadlessProgram {
    id: u32,
}

pub struct HeadlessBackend {
    report: SharedReport,
    next_id: u32,
    fail_at: Option<FailPoint>,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self {
            report: Rc::new(RefCell::new(HeadlessReport::default())),
            next_id: 0,
            fail_at: None,
        }
    }

    pub fn failing_at(fail_at: FailPoint) -> Self {
        Self {
            fail_at: Some(fail_at),
            ..Self::new()
        }
    }

    /// Handle to the shared report
    pub fn report(&self) -> SharedReport {
        self.report.clone()
    }

    fn allocate(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.report.borrow_mut().live.insert(id);
        id
    }
}

impl RenderBackend for HeadlessBackend {
    type Buffer = HeadlessBuffer;
    type Program = HeadlessProgram;

    fn create_buffer(&mut self, attribute: Attribute, data: &[f32]) -> Result<HeadlessBuffer, InitError> {
        let fail = matches!(
            (self.fail_at, attribute),
            (Some(FailPoint::PositionBuffer), Attribute::Position)
                | (Some(FailPoint::ColorBuffer), Attribute::Color)
                | (Some(FailPoint::SizeBuffer), Attribute::Size)
        );
        if fail {
            return Err(InitError::BufferAllocation(attribute.label()));
        }

        let id = self.allocate();
        let mut report = self.report.borrow_mut();
        report.buffers_created += 1;
        report.uploaded_floats += data.len();
        trace!(id, attribute = attribute.label(), floats = data.len(), "Buffer created");
        Ok(HeadlessBuffer { id })
    }

    fn create_program(&mut self, _vertex: &str, _fragment: &str) -> Result<HeadlessProgram, InitError> {
        if self.fail_at == Some(FailPoint::Program) {
            return Err(InitError::ShaderCompile {
                stage: ShaderStage::Vertex,
                log: "simulated compile failure".into(),
            });
        }

        let id = self.allocate();
        self.report.borrow_mut().programs_created += 1;
        Ok(HeadlessProgram { id })
    }

    fn set_output_size(&mut self, size: OutputSize) {
        self.report.borrow_mut().output_sizes.push(size);
    }

    fn is_context_lost(&self) -> bool {
        self.report.borrow().context_lost
    }

    fn draw_points(
        &mut self,
        _program: &HeadlessProgram,
        _buffers: &AttributeBuffers<HeadlessBuffer>,
        uniforms: &FrameUniforms,
        count: usize,
    ) {
        let mut report = self.report.borrow_mut();
        report.draw_calls += 1;
        report.points_drawn += count;
        report.last_uniforms = Some(*uniforms);
    }

    fn delete_buffer(&mut self, buffer: HeadlessBuffer) {
        let mut report = self.report.borrow_mut();
        if report.live.remove(&buffer.id) {
            report.buffers_deleted += 1;
        }
    }

    fn delete_program(&mut self, program: HeadlessProgram) {
        let mut report = self.report.borrow_mut();
        if report.live.remove(&program.id) {
            report.programs_deleted += 1;
        }
    }

    fn release(&mut self) {
        self.report.borrow_mut().released = true;
    }
}
