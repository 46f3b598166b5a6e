//! Browser entry point
//!
//! `mount` builds the scheduler on a WebGL2 backend inside the given
//! container, starts the animation-frame loop and listens for window resizes.
//! `FieldHandle::unmount` (or dropping the handle) tears it all down in the
//! order: cancel scheduling, dispose resources, clear references.

mod handles;

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{HtmlElement, Window};

use crate::config::FieldConfig;
use crate::core::{FrameScheduler, FrameTicket, TickOutcome, Viewport};
use crate::render::webgl::WebGlBackend;
use crate::time::now_millis;
use handles::{AnimationLoop, EventListener, Timeout};

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();

    // Initialize tracing for browser console
    tracing_wasm::set_as_global_default();
}

/// State reachable from browser callbacks, which only hold `Weak` refs
struct Shared {
    scheduler: FrameScheduler<WebGlBackend>,
    resize_timer: Option<Timeout>,
}

/// Handle returned to the page; the only operation is `unmount`
#[wasm_bindgen]
pub struct FieldHandle {
    shared: Option<Rc<RefCell<Shared>>>,
    frames: Option<AnimationLoop>,
    resize_listener: Option<EventListener>,
}

#[wasm_bindgen]
impl FieldHandle {
    pub fn unmount(&mut self) {
        // Scheduling first, so no callback runs against disposed resources
        self.frames.take();
        self.resize_listener.take();

        if let Some(shared) = self.shared.take() {
            match shared.try_borrow_mut() {
                Ok(mut shared) => {
                    shared.resize_timer.take();
                    shared.scheduler.unmount();
                }
                // The running callback holds the last strong ref; scheduler Drop disposes
                Err(_) => warn!("Unmount raced a browser callback"),
            }
        }
    }
}

impl Drop for FieldHandle {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Mount the particle field into `container`.
///
/// `config_json` optionally overrides tuning defaults. Any failure leaves an
/// empty container and a handle whose `unmount` is a no-op; nothing is thrown.
#[wasm_bindgen]
pub fn mount(container: HtmlElement, config_json: Option<String>) -> FieldHandle {
    let config = match config_json.as_deref().map(FieldConfig::from_json) {
        None => FieldConfig::default(),
        Some(Ok(config)) => config,
        Some(Err(e)) => {
            warn!(error = %e, "Ignoring field config, using defaults");
            FieldConfig::default()
        }
    };

    let mut handle = FieldHandle {
        shared: None,
        frames: None,
        resize_listener: None,
    };

    let Some(window) = web_sys::window() else {
        warn!("No window, particle field disabled");
        return handle;
    };

    let mut scheduler = FrameScheduler::new(config);
    scheduler.mount(
        |output| WebGlBackend::acquire(&container, output),
        read_viewport(&window),
    );
    let Some(ticket) = scheduler.request_frame() else {
        // Degraded: initialization failure was already logged
        return handle;
    };

    let shared = Rc::new(RefCell::new(Shared {
        scheduler,
        resize_timer: None,
    }));

    let weak = Rc::downgrade(&shared);
    match AnimationLoop::start(&window, move |timestamp| on_frame(&weak, ticket, timestamp)) {
        Ok(frames) => handle.frames = Some(frames),
        Err(e) => {
            warn!(?e, "Failed to start animation loop");
            shared.borrow_mut().scheduler.unmount();
            return handle;
        }
    }

    let weak = Rc::downgrade(&shared);
    let listener_window = window.clone();
    match EventListener::new(&window, "resize", move |_| {
        on_resize(&weak, &listener_window)
    }) {
        Ok(listener) => handle.resize_listener = Some(listener),
        Err(e) => warn!(?e, "Failed to listen for resize, keeping initial size"),
    }

    handle.shared = Some(shared);
    info!("Particle field mounted");
    handle
}

fn read_viewport(window: &Window) -> Viewport {
    let dimension = |value: Result<JsValue, JsValue>| {
        value
            .ok()
            .and_then(|v| v.as_f64())
            .map(|v| v.max(0.0) as u32)
            .unwrap_or(0)
    };
    Viewport::new(
        dimension(window.inner_width()),
        dimension(window.inner_height()),
        window.device_pixel_ratio(),
    )
}

/// Returns false once the scheduler stops accepting this mount's ticket
fn on_frame(shared: &Weak<RefCell<Shared>>, ticket: FrameTicket, timestamp: f64) -> bool {
    let Some(shared) = shared.upgrade() else {
        return false;
    };
    let Ok(mut shared) = shared.try_borrow_mut() else {
        return true;
    };
    shared.scheduler.on_frame(ticket, timestamp) != TickOutcome::Stale
}

fn on_resize(shared: &Weak<RefCell<Shared>>, window: &Window) {
    let Some(shared) = shared.upgrade() else {
        return;
    };
    let Ok(mut guard) = shared.try_borrow_mut() else {
        return;
    };

    guard.scheduler.schedule_resize(read_viewport(window), now_millis());
    let delay = guard.scheduler.resize_window_ms().ceil() as i32;

    let weak = Rc::downgrade(&shared);
    // Replacing the slot clears the previous timeout. A fired timeout stays
    // in the slot: it must not drop its own closure while running.
    guard.resize_timer = match Timeout::new(window, delay, move || {
        if let Some(shared) = weak.upgrade() {
            if let Ok(mut shared) = shared.try_borrow_mut() {
                shared.scheduler.flush_resize();
            }
        }
    }) {
        Ok(timer) => Some(timer),
        Err(e) => {
            warn!(?e, "Failed to arm resize timer");
            None
        }
    };
}
