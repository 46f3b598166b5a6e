//! Frame scheduler and lifecycle manager
//!
//! `Idle -> Initializing -> Running -> Disposing -> Idle`
//!
//! The host (browser animation-frame loop, CLI interval, or a test) owns the
//! actual timers and forwards ticks and resize events here. Frame tickets tie
//! each registered callback to one mount, so a callback that fires after
//! `unmount` (or after a remount) cannot touch the pipeline.

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::config::FieldConfig;
use crate::core::camera::{OutputSize, Viewport};
use crate::core::clock::AnimationClock;
use crate::core::field::{field_rng, generate};
use crate::core::throttle::{Debouncer, FrameThrottle};
use crate::error::InitError;
use crate::render::{FrameOutcome, RenderBackend, RenderPipeline};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum LifecycleState {
    Idle,
    Initializing,
    Running,
    Disposing,
}

/// Token for one pending frame callback
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameTicket {
    epoch: u64,
}

/// What happened to a single scheduler tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Rendered,
    Throttled,
    /// Ticket from an earlier mount, or the scheduler is not running
    Stale,
    ContextLost,
}

/// Counters for the current mount
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    pub ticks: u64,
    pub rendered: u64,
    pub throttled: u64,
    pub stale: u64,
    pub context_lost: u64,
    pub resizes_applied: u64,
}

pub struct FrameScheduler<B: RenderBackend> {
    config: FieldConfig,
    state: LifecycleState,
    epoch: u64,
    pipeline: Option<RenderPipeline<B>>,
    throttle: FrameThrottle,
    resize: Debouncer<Viewport>,
    clock: AnimationClock,
    stats: FrameStats,
    degraded: Option<String>,
}

impl<B: RenderBackend> FrameScheduler<B> {
    pub fn new(config: FieldConfig) -> Self {
        Self {
            throttle: FrameThrottle::new(config.scheduler.frame_interval_ms),
            resize: Debouncer::new(config.scheduler.resize_debounce_ms),
            clock: AnimationClock::new(config.animation.time_step),
            config,
            state: LifecycleState::Idle,
            epoch: 0,
            pipeline: None,
            stats: FrameStats::default(),
            degraded: None,
        }
    }

    /// Mount with the configured random source (seeded or entropy)
    pub fn mount<F>(&mut self, acquire: F, viewport: Viewport) -> LifecycleState
    where
        F: FnOnce(OutputSize) -> Result<B, InitError>,
    {
        let mut rng = field_rng(self.config.generator.seed);
        self.mount_with_rng(acquire, viewport, &mut rng)
    }

    /// Build the field, initialize the pipeline and start running.
    ///
    /// Initialization failure is logged and leaves the scheduler idle and
    /// degraded; it is never returned to the caller.
    pub fn mount_with_rng<F, R>(&mut self, acquire: F, viewport: Viewport, rng: &mut R) -> LifecycleState
    where
        F: FnOnce(OutputSize) -> Result<B, InitError>,
        R: Rng + ?Sized,
    {
        if self.state != LifecycleState::Idle {
            warn!(state = ?self.state, "Mount ignored, scheduler not idle");
            return self.state;
        }

        self.state = LifecycleState::Initializing;
        self.epoch += 1;
        self.throttle.reset();
        self.resize.cancel();
        self.clock = AnimationClock::new(self.config.animation.time_step);
        self.stats = FrameStats::default();
        self.degraded = None;

        let field = generate(&self.config.generator, rng);
        let mut pipeline = RenderPipeline::new(self.config.clone());

        match pipeline.initialize(acquire, viewport, field) {
            Ok(()) => {
                self.pipeline = Some(pipeline);
                self.state = LifecycleState::Running;
                info!(epoch = self.epoch, "Particle field running");
            }
            Err(e) => {
                warn!(error = %e, "Particle field disabled, rendering nothing");
                self.degraded = Some(e.to_string());
                self.state = LifecycleState::Idle;
            }
        }
        self.state
    }

    /// Ticket for the next frame callback, `None` unless running
    pub fn request_frame(&self) -> Option<FrameTicket> {
        (self.state == LifecycleState::Running).then_some(FrameTicket { epoch: self.epoch })
    }

    /// One host frame callback at `now_ms`
    pub fn on_frame(&mut self, ticket: FrameTicket, now_ms: f64) -> TickOutcome {
        if ticket.epoch != self.epoch || self.state != LifecycleState::Running {
            self.stats.stale += 1;
            trace!(epoch = ticket.epoch, "Stale frame callback ignored");
            return TickOutcome::Stale;
        }

        self.stats.ticks += 1;
        if !self.throttle.try_acquire(now_ms) {
            self.stats.throttled += 1;
            return TickOutcome::Throttled;
        }

        let Some(pipeline) = self.pipeline.as_mut() else {
            self.stats.stale += 1;
            return TickOutcome::Stale;
        };

        // Time and rotation only move together, on a frame that was drawn
        match pipeline.render_frame(self.clock.peek()) {
            FrameOutcome::Rendered => {
                self.clock.advance();
                self.stats.rendered += 1;
                TickOutcome::Rendered
            }
            FrameOutcome::ContextLost => {
                self.stats.context_lost += 1;
                TickOutcome::ContextLost
            }
            FrameOutcome::NoContext => {
                self.stats.stale += 1;
                TickOutcome::Stale
            }
        }
    }

    /// Record a viewport change; applied once the debounce window passes
    pub fn schedule_resize(&mut self, viewport: Viewport, now_ms: f64) {
        if self.state != LifecycleState::Running {
            return;
        }
        trace!(width = viewport.width, height = viewport.height, "Resize scheduled");
        self.resize.push(viewport, now_ms);
    }

    /// Apply the pending resize if its window elapsed. Returns true if applied.
    pub fn poll_resize(&mut self, now_ms: f64) -> bool {
        match self.resize.poll(now_ms) {
            Some(viewport) => self.apply_resize(viewport),
            None => false,
        }
    }

    /// Apply the pending resize now; for hosts whose own timer tracks the window
    pub fn flush_resize(&mut self) -> bool {
        match self.resize.take() {
            Some(viewport) => self.apply_resize(viewport),
            None => false,
        }
    }

    fn apply_resize(&mut self, viewport: Viewport) -> bool {
        if self.state != LifecycleState::Running {
            return false;
        }
        let Some(pipeline) = self.pipeline.as_mut() else {
            return false;
        };
        pipeline.resize(viewport);
        self.stats.resizes_applied += 1;
        true
    }

    /// Tear down: cancel pending work, dispose the pipeline, drop references.
    /// Safe from any state and safe to repeat.
    pub fn unmount(&mut self) {
        if self.state == LifecycleState::Idle && self.pipeline.is_none() {
            return;
        }

        self.state = LifecycleState::Disposing;
        // Invalidate outstanding tickets before touching resources
        self.epoch += 1;
        self.resize.cancel();

        if let Some(mut pipeline) = self.pipeline.take() {
            pipeline.dispose();
        }

        self.state = LifecycleState::Idle;
        debug!(stats = ?self.stats, "Particle field unmounted");
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LifecycleState::Running
    }

    /// Initialization error from the last mount, if it failed
    pub fn degraded(&self) -> Option<&str> {
        self.degraded.as_deref()
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn resize_pending(&self) -> bool {
        self.resize.is_pending()
    }

    pub fn resize_window_ms(&self) -> f64 {
        self.resize.window_ms()
    }

    pub fn pipeline(&self) -> Option<&RenderPipeline<B>> {
        self.pipeline.as_ref()
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }
}

impl<B: RenderBackend> Drop for FrameScheduler<B> {
    fn drop(&mut self) {
        self.unmount();
    }
}
