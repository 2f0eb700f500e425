use frame_core::RenderHook;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

type Callbacks = Rc<RefCell<Vec<Box<dyn FnMut()>>>>;

/// `requestAnimationFrame` loop acting as the bridge's render hook.
///
/// Pages whose engine already has a before-render observable can call
/// `render()` from it instead and skip this loop.
pub struct AnimationFrameLoop {
    running: Rc<Cell<bool>>,
    callbacks: Callbacks,
}

impl AnimationFrameLoop {
    pub fn start() -> Self {
        let running = Rc::new(Cell::new(true));
        let callbacks: Callbacks = Rc::new(RefCell::new(Vec::new()));

        let tick: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
        let tick_clone = tick.clone();
        let running_tick = running.clone();
        let callbacks_tick = callbacks.clone();
        *tick.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            if !running_tick.get() {
                // break the closure's reference to its own cell so it can drop
                let _ = tick_clone.borrow_mut().take();
                return;
            }
            for cb in callbacks_tick.borrow_mut().iter_mut() {
                cb();
            }
            request_frame(&tick_clone);
        }) as Box<dyn FnMut()>));
        request_frame(&tick);
        log::info!("[frame] animation loop started");

        Self { running, callbacks }
    }

    pub fn stop(&self) {
        self.running.set(false);
        log::info!("[frame] animation loop stopped");
    }
}

impl Drop for AnimationFrameLoop {
    fn drop(&mut self) {
        self.running.set(false);
    }
}

impl RenderHook for AnimationFrameLoop {
    fn on_before_render(&self, callback: Box<dyn FnMut()>) {
        self.callbacks.borrow_mut().push(callback);
    }
}

fn request_frame(tick: &Rc<RefCell<Option<Closure<dyn FnMut()>>>>) {
    let Some(w) = web::window() else {
        return;
    };
    if let Some(closure) = tick.borrow().as_ref() {
        let _ = w.request_animation_frame(closure.as_ref().unchecked_ref());
    }
}
