//! Scoped browser registrations
//!
//! Each handle deregisters on drop: the animation frame is cancelled, the
//! listener removed, the timeout cleared. Dropping the handle also drops the
//! Rust closure, so JS must never call it afterwards.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, EventTarget, Window};

type FrameClosure = Closure<dyn FnMut(f64)>;

/// Self-rescheduling `requestAnimationFrame` loop
pub struct AnimationLoop {
    window: Window,
    request_id: Rc<Cell<Option<i32>>>,
    closure: Rc<RefCell<Option<FrameClosure>>>,
}

impl AnimationLoop {
    /// Start the loop. `on_frame` gets the rAF timestamp and returns whether
    /// to keep going.
    pub fn start<F>(window: &Window, mut on_frame: F) -> Result<Self, JsValue>
    where
        F: FnMut(f64) -> bool + 'static,
    {
        let request_id = Rc::new(Cell::new(None));
        let closure: Rc<RefCell<Option<FrameClosure>>> = Rc::new(RefCell::new(None));

        let loop_window = window.clone();
        let loop_id = request_id.clone();
        let loop_closure = closure.clone();
        *closure.borrow_mut() = Some(Closure::wrap(Box::new(move |timestamp: f64| {
            loop_id.set(None);
            if !on_frame(timestamp) {
                return;
            }
            if let Some(cb) = loop_closure.borrow().as_ref() {
                match loop_window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                    Ok(id) => loop_id.set(Some(id)),
                    Err(e) => warn!(?e, "Failed to request animation frame"),
                }
            }
        }) as Box<dyn FnMut(f64)>));

        let first = {
            let cb = closure.borrow();
            let cb = cb.as_ref().ok_or_else(|| JsValue::from_str("frame closure missing"))?;
            window.request_animation_frame(cb.as_ref().unchecked_ref())?
        };
        request_id.set(Some(first));

        Ok(Self {
            window: window.clone(),
            request_id,
            closure,
        })
    }
}

impl Drop for AnimationLoop {
    fn drop(&mut self) {
        if let Some(id) = self.request_id.take() {
            if let Err(e) = self.window.cancel_animation_frame(id) {
                warn!(?e, "Failed to cancel animation frame");
            }
        }
        // Breaks the closure's reference to itself
        self.closure.borrow_mut().take();
    }
}

/// `addEventListener` registration, removed on drop
pub struct EventListener {
    target: EventTarget,
    event: &'static str,
    closure: Closure<dyn FnMut(Event)>,
}

impl EventListener {
    pub fn new<F>(target: &EventTarget, event: &'static str, handler: F) -> Result<Self, JsValue>
    where
        F: FnMut(Event) + 'static,
    {
        let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
        target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
        Ok(Self {
            target: target.clone(),
            event,
            closure,
        })
    }
}

impl Drop for EventListener {
    fn drop(&mut self) {
        if let Err(e) = self
            .target
            .remove_event_listener_with_callback(self.event, self.closure.as_ref().unchecked_ref())
        {
            warn!(event = self.event, ?e, "Failed to remove event listener");
        }
    }
}

/// One-shot `setTimeout`, cleared on drop
pub struct Timeout {
    window: Window,
    id: i32,
    _closure: Closure<dyn FnMut()>,
}

impl Timeout {
    pub fn new<F>(window: &Window, delay_ms: i32, callback: F) -> Result<Self, JsValue>
    where
        F: FnMut() + 'static,
    {
        let closure = Closure::wrap(Box::new(callback) as Box<dyn FnMut()>);
        let id = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            delay_ms,
        )?;
        Ok(Self {
            window: window.clone(),
            id,
            _closure: closure,
        })
    }
}

impl Drop for Timeout {
    fn drop(&mut self) {
        // Clearing an already-fired timeout is a no-op
        self.window.clear_timeout_with_handle(self.id);
    }
}
