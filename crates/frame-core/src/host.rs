//! Interfaces between the bridge and the page it runs in.
//!
//! The bridge never walks a scene graph or touches the DOM itself. The host
//! 3D engine hands it a camera and a list of nodes, and a [`Surface`] carries
//! out the style writes.

use crate::bridge::SceneBridge;
use crate::focus::PagePointerEvents;
use glam::{DMat4, DVec2, DVec3};
use std::cell::RefCell;
use std::rc::Rc;

/// Axis-aligned box in the node's local space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: DVec3,
    pub max: DVec3,
}

impl BoundingBox {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Width and height of the box on the X/Y plane, in scene units.
    pub fn content_size(&self) -> DVec2 {
        (self.max - self.min).truncate().abs()
    }
}

/// Active camera of the host engine.
pub trait CameraSource {
    fn world_matrix(&self) -> DMat4;
    fn projection_matrix(&self) -> DMat4;
    fn is_orthographic(&self) -> bool;
}

/// A scene object a DOM element is glued to.
pub trait NodeSource {
    fn world_matrix(&self) -> DMat4;

    /// Queried once at bind time when no explicit content size is given.
    fn bounding_box(&self) -> BoundingBox;

    /// Scale applied on top of the content size correction.
    fn scaling(&self) -> DVec3 {
        DVec3::ONE
    }

    /// Returning `false` makes the bridge drop the binding on the next tick.
    fn is_alive(&self) -> bool {
        true
    }
}

/// The DOM side: an outer container holding the perspective, a camera
/// container inside it, and the projected elements inside that.
pub trait Surface {
    type Element: Clone + PartialEq;

    /// Resize both the outer and the camera container, in CSS pixels.
    fn set_size(&mut self, width: f64, height: f64);
    /// `None` clears the perspective (orthographic cameras).
    fn set_perspective(&mut self, perspective_px: Option<f64>);
    fn set_camera_transform(&mut self, style: &str);
    /// Called once at bind time with the authored pixel size of the element.
    fn prepare_element(&mut self, element: &Self::Element, width_px: f64, height_px: f64);
    fn set_element_transform(&mut self, element: &Self::Element, style: &str);
    fn is_camera_child(&self, element: &Self::Element) -> bool;
    fn attach_to_camera(&mut self, element: &Self::Element);
    fn detach(&mut self, element: &Self::Element);
    fn set_page_pointer_events(&mut self, state: PagePointerEvents);
}

/// Per-frame notification from the host engine, fired before the frame is presented.
pub trait RenderHook {
    fn on_before_render(&self, callback: Box<dyn FnMut()>);
}

/// Subscribe a shared bridge to `hook` so it projects once per frame from `camera`.
pub fn attach<S, N, C, H>(bridge: Rc<RefCell<SceneBridge<S, N>>>, camera: Rc<C>, hook: &H)
where
    S: Surface + 'static,
    N: NodeSource + 'static,
    C: CameraSource + ?Sized + 'static,
    H: RenderHook + ?Sized,
{
    hook.on_before_render(Box::new(move || {
        let report = bridge.borrow_mut().tick(&*camera);
        if report.dom_writes() > 0 {
            log::trace!("[bridge] tick wrote {} styles", report.dom_writes());
        }
    }));
}
