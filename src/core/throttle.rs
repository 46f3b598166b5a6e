//! Frame-rate cap and resize debouncing
//!
//! Both are driven by caller-supplied millisecond timestamps so the same
//! logic runs against `requestAnimationFrame` time, a tokio interval or a
//! test's virtual clock.

/// Lets a render through only when `min_interval_ms` passed since the last
/// one that ran. Skipped ticks are dropped, not queued.
#[derive(Clone, Debug)]
pub struct FrameThrottle {
    min_interval_ms: f64,
    last_render_ms: Option<f64>,
}

impl FrameThrottle {
    pub fn new(min_interval_ms: f64) -> Self {
        Self {
            min_interval_ms,
            last_render_ms: None,
        }
    }

    /// Returns true if a render should run at `now_ms`, and records it.
    pub fn try_acquire(&mut self, now_ms: f64) -> bool {
        match self.last_render_ms {
            None => {
                self.last_render_ms = Some(now_ms);
                true
            }
            Some(last) if now_ms < last => {
                // Clock went backwards (new timeline); re-anchor without rendering
                self.last_render_ms = Some(now_ms);
                false
            }
            Some(last) if now_ms - last >= self.min_interval_ms => {
                self.last_render_ms = Some(now_ms);
                true
            }
            Some(_) => false,
        }
    }

    pub fn reset(&mut self) {
        self.last_render_ms = None;
    }
}

/// Coalesces a burst of values into the last one, released once
/// `window_ms` passed without a newer value.
#[derive(Clone, Debug)]
pub struct Debouncer<T> {
    window_ms: f64,
    pending: Option<(T, f64)>,
}

impl<T> Debouncer<T> {
    pub fn new(window_ms: f64) -> Self {
        Self {
            window_ms,
            pending: None,
        }
    }

    /// Replace any pending value and restart the window
    pub fn push(&mut self, value: T, now_ms: f64) {
        self.pending = Some((value, now_ms + self.window_ms));
    }

    /// Take the pending value if its window has elapsed
    pub fn poll(&mut self, now_ms: f64) -> Option<T> {
        let ready = matches!(self.pending, Some((_, deadline)) if now_ms >= deadline);
        if ready {
            self.take()
        } else {
            None
        }
    }

    /// Take the pending value regardless of its deadline
    pub fn take(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn window_ms(&self) -> f64 {
        self.window_ms
    }
}
