use crate::dom::DomSurface;
use crate::scene::JsNode;
use frame_core::orientation::{DeviceAngles, OrientationRig};
use frame_core::{BindingHandle, SceneBridge};
use glam::DVec2;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys as web;

pub type SharedBridge = Rc<RefCell<SceneBridge<DomSurface, JsNode>>>;

/// Keep the bridge sized to `parent` on window resizes.
pub fn wire_resize(bridge: &SharedBridge, parent: &web::HtmlElement) {
    let bridge = bridge.clone();
    let parent = parent.clone();
    let closure = Closure::wrap(Box::new(move || {
        bridge
            .borrow_mut()
            .set_size(parent.offset_width() as f64, parent.offset_height() as f64);
    }) as Box<dyn FnMut()>);
    if let Some(window) = web::window() {
        _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
    }
    closure.forget();
}

/// Hand pointer input back to the page when it leaves an embedded frame.
pub fn wire_frame_blur(bridge: &SharedBridge, frame: &web::HtmlElement, handle: BindingHandle) {
    let bridge = bridge.clone();
    let closure = Closure::wrap(Box::new(move || {
        // the binding may be gone already; nothing to give back then
        let _ = bridge.borrow_mut().blur(handle);
    }) as Box<dyn FnMut()>);
    _ = frame.add_event_listener_with_callback("mouseout", closure.as_ref().unchecked_ref());
    closure.forget();
}

struct Listener {
    target: web::EventTarget,
    kind: &'static str,
    closure: Closure<dyn FnMut(web::Event)>,
}

impl Listener {
    fn add(
        target: &web::EventTarget,
        kind: &'static str,
        handler: impl FnMut(web::Event) + 'static,
    ) -> Self {
        let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(web::Event)>);
        _ = target.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref());
        Self {
            target: target.clone(),
            kind,
            closure,
        }
    }

    fn remove(&self) {
        _ = self
            .target
            .remove_event_listener_with_callback(self.kind, self.closure.as_ref().unchecked_ref());
    }
}

fn viewport() -> DVec2 {
    web::window()
        .map(|w| {
            let width = w.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(1.0);
            let height = w.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(1.0);
            DVec2::new(width, height)
        })
        .unwrap_or(DVec2::ONE)
}

fn screen_orientation(window: &web::Window) -> f64 {
    js_sys::Reflect::get(window, &JsValue::from_str("orientation"))
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0)
}

/// Event wiring for an [`OrientationRig`]: device sensors plus mouse/touch drag on `element`.
pub struct OrientationWiring {
    listeners: Vec<Listener>,
}

impl OrientationWiring {
    pub fn connect(rig: &Rc<RefCell<OrientationRig>>, element: &web::EventTarget) -> Self {
        let mut listeners = Vec::new();
        rig.borrow_mut().connect();

        if let Some(window) = web::window() {
            rig.borrow_mut()
                .set_screen_orientation(screen_orientation(&window));

            let r = rig.clone();
            listeners.push(Listener::add(&window, "deviceorientation", move |ev| {
                if let Some(ev) = ev.dyn_ref::<web::DeviceOrientationEvent>() {
                    r.borrow_mut().set_device_angles(DeviceAngles {
                        alpha: ev.alpha().unwrap_or(0.0),
                        beta: ev.beta().unwrap_or(0.0),
                        gamma: ev.gamma().unwrap_or(0.0),
                    });
                }
            }));

            let r = rig.clone();
            let w = window.clone();
            listeners.push(Listener::add(&window, "orientationchange", move |_| {
                r.borrow_mut().set_screen_orientation(screen_orientation(&w));
            }));
        }

        // first mouse move starts a drag from the viewport centre, later ones steer it
        let r = rig.clone();
        listeners.push(Listener::add(element, "mousemove", move |ev| {
            let Some(ev) = ev.dyn_ref::<web::MouseEvent>() else {
                return;
            };
            let mut rig = r.borrow_mut();
            if rig.is_dragging() {
                rig.drag_to(DVec2::new(ev.page_x() as f64, ev.page_y() as f64));
            } else {
                let view = viewport();
                rig.begin_drag(view / 2.0, view);
            }
        }));

        let r = rig.clone();
        listeners.push(Listener::add(element, "touchstart", move |ev| {
            let Some(ev) = ev.dyn_ref::<web::TouchEvent>() else {
                return;
            };
            ev.prevent_default();
            ev.stop_propagation();
            if let (1, Some(touch)) = (ev.touches().length(), ev.touches().get(0)) {
                let at = DVec2::new(touch.page_x() as f64, touch.page_y() as f64);
                r.borrow_mut().begin_drag(at, viewport());
            }
        }));

        let r = rig.clone();
        listeners.push(Listener::add(element, "touchmove", move |ev| {
            let Some(ev) = ev.dyn_ref::<web::TouchEvent>() else {
                return;
            };
            if let (1, Some(touch)) = (ev.touches().length(), ev.touches().get(0)) {
                r.borrow_mut()
                    .drag_to(DVec2::new(touch.page_x() as f64, touch.page_y() as f64));
            }
        }));

        let r = rig.clone();
        listeners.push(Listener::add(element, "touchend", move |_| {
            r.borrow_mut().end_drag();
        }));

        log::info!("[orientation] wired {} listeners", listeners.len());
        Self { listeners }
    }

    pub fn disconnect(self, rig: &Rc<RefCell<OrientationRig>>) {
        for listener in &self.listeners {
            listener.remove();
        }
        rig.borrow_mut().disconnect();
    }
}
