use crate::constants::{
    CONTAINER_ID, EMBEDDED_CONTAINER_Z_INDEX, EMBEDDED_FRAME_Z_INDEX, FRAME_BACKGROUND,
};
use anyhow::anyhow;
use frame_core::focus::PagePointerEvents;
use frame_core::{FrameLayer, Surface};
use wasm_bindgen::JsCast;
use web_sys as web;

#[inline]
pub fn window_document() -> Option<web::Document> {
    web::window().and_then(|w| w.document())
}

#[inline]
fn set_style(el: &web::HtmlElement, property: &str, value: &str) {
    let _ = el.style().set_property(property, value);
}

/// Set a style and its `-webkit-` twin.
#[inline]
fn set_prefixed(el: &web::HtmlElement, property: &str, value: &str) {
    set_style(el, &format!("-webkit-{}", property), value);
    set_style(el, property, value);
}

pub fn create_div(document: &web::Document) -> anyhow::Result<web::HtmlElement> {
    document
        .create_element("div")
        .map_err(|e| anyhow!("create div: {:?}", e))?
        .dyn_into::<web::HtmlElement>()
        .map_err(|e| anyhow!("{:?}", e))
}

/// Where an element sat in the document before it was wrapped in a frame.
pub struct ContentOrigin {
    parent: Option<web::Node>,
    next_sibling: Option<web::Node>,
}

impl ContentOrigin {
    pub fn of(content: &web::Element) -> Self {
        Self {
            parent: content.parent_node(),
            next_sibling: content.next_sibling(),
        }
    }

    /// Put `content` back, or just take it out of the frame if it had no parent.
    pub fn restore(&self, content: &web::Element) {
        match &self.parent {
            Some(parent) => {
                if let Err(e) = parent.insert_before(content, self.next_sibling.as_ref()) {
                    log::warn!("[frame] could not restore frame content: {:?}", e);
                }
            }
            None => content.remove(),
        }
    }
}

/// Outer element holding the perspective and the camera element inside it.
pub struct DomSurface {
    document: web::Document,
    dom_element: web::HtmlElement,
    camera_element: web::HtmlElement,
}

impl DomSurface {
    pub fn new(document: &web::Document, legacy_compat_mode: bool) -> anyhow::Result<Self> {
        let camera_element = create_div(document)?;
        // legacy engines do not propagate nested 3D contexts anyway
        if !legacy_compat_mode {
            set_prefixed(&camera_element, "transform-style", "preserve-3d");
        }
        set_style(&camera_element, "pointer-events", "none");

        let dom_element = create_div(document)?;
        set_style(&dom_element, "overflow", "hidden");
        set_style(&dom_element, "pointer-events", "none");
        dom_element
            .append_child(&camera_element)
            .map_err(|e| anyhow!("append camera element: {:?}", e))?;

        Ok(Self {
            document: document.clone(),
            dom_element,
            camera_element,
        })
    }

    pub fn dom_element(&self) -> &web::HtmlElement {
        &self.dom_element
    }

    /// Put the surface into a full-size container under `parent`, above the
    /// canvas for overlay frames and below it for embedded ones.
    pub fn mount(&self, parent: &web::HtmlElement, layer: FrameLayer) -> anyhow::Result<()> {
        let container = create_div(&self.document)?;
        container.set_id(CONTAINER_ID);
        set_style(&container, "pointer-events", "none");
        set_style(&container, "position", "absolute");
        set_style(&container, "left", "0px");
        set_style(&container, "top", "0px");
        set_style(&container, "width", "100%");
        set_style(&container, "height", "100%");

        let inserted = match layer {
            FrameLayer::Overlay => parent.append_child(&container),
            FrameLayer::Embedded => {
                set_style(&container, "z-index", EMBEDDED_CONTAINER_Z_INDEX);
                parent.insert_before(&container, parent.first_child().as_ref())
            }
        };
        inserted.map_err(|e| anyhow!("mount container: {:?}", e))?;
        container
            .append_child(&self.dom_element)
            .map_err(|e| anyhow!("mount surface: {:?}", e))?;
        Ok(())
    }

    /// Transparent wrapper sized later by the bridge, holding `content`.
    pub fn create_frame(
        &self,
        content: &web::Element,
        layer: FrameLayer,
    ) -> anyhow::Result<web::HtmlElement> {
        let frame = create_div(&self.document)?;
        set_style(&frame, "background-color", FRAME_BACKGROUND);
        if layer == FrameLayer::Embedded {
            set_style(&frame, "z-index", EMBEDDED_FRAME_Z_INDEX);
        }
        frame
            .append_child(content)
            .map_err(|e| anyhow!("append frame content: {:?}", e))?;
        Ok(frame)
    }
}

impl Surface for DomSurface {
    type Element = web::HtmlElement;

    fn set_size(&mut self, width: f64, height: f64) {
        let w = format!("{}px", width);
        let h = format!("{}px", height);
        set_style(&self.dom_element, "width", &w);
        set_style(&self.dom_element, "height", &h);
        set_style(&self.camera_element, "width", &w);
        set_style(&self.camera_element, "height", &h);
    }

    fn set_perspective(&mut self, perspective_px: Option<f64>) {
        match perspective_px {
            Some(px) => set_prefixed(&self.dom_element, "perspective", &format!("{}px", px)),
            None => set_prefixed(&self.dom_element, "perspective", ""),
        }
    }

    fn set_camera_transform(&mut self, style: &str) {
        set_prefixed(&self.camera_element, "transform", style);
    }

    fn prepare_element(&mut self, element: &web::HtmlElement, width_px: f64, height_px: f64) {
        set_style(element, "position", "absolute");
        set_style(element, "pointer-events", "auto");
        set_style(element, "width", &format!("{}px", width_px));
        set_style(element, "height", &format!("{}px", height_px));
    }

    fn set_element_transform(&mut self, element: &web::HtmlElement, style: &str) {
        set_prefixed(element, "transform", style);
    }

    fn is_camera_child(&self, element: &web::HtmlElement) -> bool {
        let camera: &web::Node = self.camera_element.as_ref();
        element.parent_node().is_some_and(|p| p == *camera)
    }

    fn attach_to_camera(&mut self, element: &web::HtmlElement) {
        if let Err(e) = self.camera_element.append_child(element) {
            log::error!("[dom] attach frame: {:?}", e);
        }
    }

    fn detach(&mut self, element: &web::HtmlElement) {
        if self.is_camera_child(element) {
            let _ = self.camera_element.remove_child(element);
        }
    }

    fn set_page_pointer_events(&mut self, state: PagePointerEvents) {
        if let Some(body) = self.document.body() {
            set_style(&body, "pointer-events", state.as_css());
        }
    }
}
