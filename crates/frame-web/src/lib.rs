#![cfg(target_arch = "wasm32")]
use anyhow::anyhow;
use frame_core::orientation::OrientationRig;
use frame_core::{
    attach, BindOptions, BindingHandle, BridgeConfig, BridgeError, FrameLayer, OrientationConfig,
    SceneBridge,
};
use glam::{DQuat, DVec2};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys as web;

mod constants;
mod dom;
mod events;
mod frame;
mod scene;

use dom::DomSurface;
use events::{OrientationWiring, SharedBridge};
use frame::AnimationFrameLoop;
use scene::{JsCamera, JsNode};

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("frame-web loaded");
    Ok(())
}

fn to_js(e: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{:#}", e))
}

fn bridge_err(e: BridgeError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn option(options: &JsValue, name: &str) -> Option<JsValue> {
    if options.is_undefined() || options.is_null() {
        return None;
    }
    js_sys::Reflect::get(options, &JsValue::from_str(name))
        .ok()
        .filter(|v| !v.is_undefined() && !v.is_null())
}

fn bool_option(options: &JsValue, name: &str) -> bool {
    option(options, name)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

/// Reads `{ legacyCompatMode?: boolean, contentSize?: [width, height] }`.
fn bind_options(resolution: f64, options: &JsValue) -> BindOptions {
    let mut bind = BindOptions::with_resolution(resolution);
    if let Some(legacy) = option(options, "legacyCompatMode").and_then(|v| v.as_bool()) {
        bind = bind.legacy_compat_mode(legacy);
    }
    if let Some(size) = option(options, "contentSize") {
        let size = js_sys::Array::from(&size);
        // a malformed size reads as NaN and is rejected by the bridge
        let width = size.get(0).as_f64().unwrap_or(f64::NAN);
        let height = size.get(1).as_f64().unwrap_or(f64::NAN);
        bind = bind.content_size(DVec2::new(width, height));
    }
    bind
}

/// Glues HTML elements onto meshes of the page's 3D scene.
///
/// `options` is `{ legacyCompatMode?: boolean, embedded?: boolean }`.
#[wasm_bindgen]
pub struct HtmlFrameRenderer {
    bridge: SharedBridge,
    parent: web::HtmlElement,
    frame_loop: Option<AnimationFrameLoop>,
}

#[wasm_bindgen]
impl HtmlFrameRenderer {
    #[wasm_bindgen(constructor)]
    pub fn new(parent_id: &str, options: JsValue) -> Result<HtmlFrameRenderer, JsValue> {
        Self::build(parent_id, &options).map_err(to_js)
    }

    #[wasm_bindgen(js_name = setSize)]
    pub fn set_size(&self, width: f64, height: f64) {
        self.bridge.borrow_mut().set_size(width, height);
    }

    /// `[width, height]` as last passed to `setSize`.
    #[wasm_bindgen(js_name = getSize)]
    pub fn size(&self) -> Box<[f64]> {
        let size = self.bridge.borrow().size();
        Box::new([size.x, size.y])
    }

    /// Bind an existing element to `node`. Returns the binding handle.
    ///
    /// `options` is `{ legacyCompatMode?: boolean, contentSize?: [width, height] }`;
    /// `legacyCompatMode` must match the renderer's.
    pub fn register(
        &self,
        node: JsValue,
        element: web::HtmlElement,
        resolution: f64,
        options: JsValue,
    ) -> Result<u32, JsValue> {
        self.bridge
            .borrow_mut()
            .register(JsNode::new(node), element, bind_options(resolution, &options))
            .map(BindingHandle::id)
            .map_err(bridge_err)
    }

    /// Wrap `content` in a transparent frame sized from the node's bounding
    /// box and bind it. `resolution` is frame pixels per scene unit; `options`
    /// as for `register`. On error `content` stays where it was.
    #[wasm_bindgen(js_name = createFrame)]
    pub fn create_frame(
        &self,
        node: JsValue,
        content: web::Element,
        resolution: f64,
        options: JsValue,
    ) -> Result<u32, JsValue> {
        let node = JsNode::new(node);
        let options = bind_options(resolution, &options);
        let content_size = self
            .bridge
            .borrow()
            .validate(&node, &options)
            .map_err(bridge_err)?;
        let options = options.content_size(content_size);

        let layer = self.bridge.borrow().config().layer;
        let origin = dom::ContentOrigin::of(&content);
        let frame = self
            .bridge
            .borrow()
            .surface()
            .create_frame(&content, layer)
            .map_err(to_js)?;
        let registered = self
            .bridge
            .borrow_mut()
            .register(node, frame.clone(), options);
        let handle = match registered {
            Ok(handle) => handle,
            Err(e) => {
                origin.restore(&content);
                return Err(bridge_err(e));
            }
        };
        if layer == FrameLayer::Embedded {
            events::wire_frame_blur(&self.bridge, &frame, handle);
        }
        // the container may have grown while the frame was laid out
        self.bridge.borrow_mut().set_size(
            self.parent.offset_width() as f64,
            self.parent.offset_height() as f64,
        );
        Ok(handle.id())
    }

    pub fn unregister(&self, handle: u32) -> Result<(), JsValue> {
        self.bridge
            .borrow_mut()
            .unregister(BindingHandle::from_id(handle))
            .map(|_| ())
            .map_err(bridge_err)
    }

    /// Project all frames once. Call from the engine's before-render hook.
    pub fn render(&self, camera: JsValue) {
        let report = self.bridge.borrow_mut().tick(&JsCamera::new(camera));
        if !report.errors.is_empty() {
            log::debug!("[frame] {} projection errors", report.errors.len());
        }
    }

    /// Drive `render` from `requestAnimationFrame` until `stop`.
    pub fn start(&mut self, camera: JsValue) {
        self.stop();
        let frame_loop = AnimationFrameLoop::start();
        attach(
            self.bridge.clone(),
            Rc::new(JsCamera::new(camera)),
            &frame_loop,
        );
        self.frame_loop = Some(frame_loop);
    }

    pub fn stop(&mut self) {
        if let Some(frame_loop) = self.frame_loop.take() {
            frame_loop.stop();
        }
    }

    /// Report a pick hit on the frame's mesh so an embedded frame gets input.
    pub fn focus(&self, handle: u32) -> Result<bool, JsValue> {
        self.bridge
            .borrow_mut()
            .focus(BindingHandle::from_id(handle))
            .map_err(bridge_err)
    }

    pub fn blur(&self, handle: u32) -> Result<bool, JsValue> {
        self.bridge
            .borrow_mut()
            .blur(BindingHandle::from_id(handle))
            .map_err(bridge_err)
    }
}

impl HtmlFrameRenderer {
    fn build(parent_id: &str, options: &JsValue) -> anyhow::Result<HtmlFrameRenderer> {
        let document = dom::window_document().ok_or_else(|| anyhow!("no document"))?;
        let parent = document
            .get_element_by_id(parent_id)
            .ok_or_else(|| anyhow!("missing #{}", parent_id))?
            .dyn_into::<web::HtmlElement>()
            .map_err(|e| anyhow!("{:?}", e))?;

        let config = BridgeConfig {
            legacy_compat_mode: bool_option(options, "legacyCompatMode"),
            layer: if bool_option(options, "embedded") {
                FrameLayer::Embedded
            } else {
                FrameLayer::Overlay
            },
        };
        let surface = DomSurface::new(&document, config.legacy_compat_mode)?;
        surface.mount(&parent, config.layer)?;

        let bridge = Rc::new(RefCell::new(SceneBridge::new(surface, config)));
        bridge
            .borrow_mut()
            .set_size(parent.offset_width() as f64, parent.offset_height() as f64);
        events::wire_resize(&bridge, &parent);
        log::info!("[frame] renderer ready {:?}", config);

        Ok(HtmlFrameRenderer {
            bridge,
            parent,
            frame_loop: None,
        })
    }
}

/// Camera rotation from device orientation with drag override.
///
/// `rotation` is the camera's starting quaternion as `[x, y, z, w]`; apply the
/// array returned by `update()` to the camera every frame.
#[wasm_bindgen]
pub struct OrientationControls {
    rig: Rc<RefCell<OrientationRig>>,
    element: web::EventTarget,
    wiring: Option<OrientationWiring>,
}

#[wasm_bindgen]
impl OrientationControls {
    #[wasm_bindgen(constructor)]
    pub fn new(rotation: &[f64], element: web::EventTarget) -> Result<OrientationControls, JsValue> {
        let [x, y, z, w] = <[f64; 4]>::try_from(rotation)
            .map_err(|_| JsValue::from_str("rotation must be [x, y, z, w]"))?;
        let rig = OrientationRig::new(
            DQuat::from_xyzw(x, y, z, w).normalize(),
            OrientationConfig::default(),
        );
        Ok(OrientationControls {
            rig: Rc::new(RefCell::new(rig)),
            element,
            wiring: None,
        })
    }

    pub fn connect(&mut self) {
        if self.wiring.is_none() {
            self.wiring = Some(OrientationWiring::connect(&self.rig, &self.element));
        }
    }

    pub fn disconnect(&mut self) {
        if let Some(wiring) = self.wiring.take() {
            wiring.disconnect(&self.rig);
        }
    }

    #[wasm_bindgen(js_name = setRotationMultiplier)]
    pub fn set_rotation_multiplier(&self, multiplier: f64) {
        self.rig.borrow_mut().set_multiplier(multiplier);
    }

    pub fn update(&self) -> Box<[f64]> {
        let q = self.rig.borrow_mut().update();
        Box::new([q.x, q.y, q.z, q.w])
    }
}
