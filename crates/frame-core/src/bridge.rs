//! Scene bridge: keeps DOM elements glued to scene nodes.
//!
//! Once per frame [`SceneBridge::tick`] derives the camera container style and
//! one style per binding, writing to the [`Surface`] only when a string
//! actually changed since the last write.

use crate::config::{BindOptions, BridgeConfig, FrameLayer};
use crate::constants::{LEGACY_OBJECT_SCALE, W_DAMPING};
use crate::error::BridgeError;
use crate::focus::FocusCount;
use crate::host::{CameraSource, NodeSource, Surface};
use crate::projector::{camera_css, camera_style, object_style};
use fnv::FnvHashMap;
use glam::{DMat4, DVec2, DVec3, DVec4};
use smallvec::SmallVec;
use std::fmt;

/// Opaque token identifying one registered (node, element) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingHandle(u32);

impl fmt::Display for BindingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl BindingHandle {
    pub fn id(self) -> u32 {
        self.0
    }

    pub fn from_id(id: u32) -> Self {
        Self(id)
    }
}

struct Binding<N, E> {
    node: N,
    element: E,
    content_size: DVec2,
    element_px: DVec2,
    last_style: Option<String>,
    focused: bool,
    reported_invalid: bool,
}

#[derive(Debug, Default)]
struct CameraCache {
    // (fov in px, orthographic)
    perspective: Option<(f64, bool)>,
    style: Option<String>,
    reported_invalid: bool,
}

/// What a single tick did. `tick` never fails; per-binding problems land here.
#[derive(Debug, Default)]
pub struct TickReport {
    pub perspective_written: bool,
    pub camera_written: bool,
    pub styles_written: usize,
    pub reparented: usize,
    pub errors: SmallVec<[BridgeError; 2]>,
    pub stale: SmallVec<[BindingHandle; 2]>,
}

impl TickReport {
    pub fn dom_writes(&self) -> usize {
        self.perspective_written as usize
            + self.camera_written as usize
            + self.styles_written
            + self.reparented
    }
}

pub struct SceneBridge<S: Surface, N> {
    surface: S,
    config: BridgeConfig,
    size: DVec2,
    half_size: DVec2,
    camera: CameraCache,
    bindings: FnvHashMap<BindingHandle, Binding<N, S::Element>>,
    focus: FocusCount,
    next_id: u32,
}

impl<S: Surface, N: NodeSource> SceneBridge<S, N> {
    pub fn new(surface: S, config: BridgeConfig) -> Self {
        Self {
            surface,
            config,
            size: DVec2::ZERO,
            half_size: DVec2::ZERO,
            camera: CameraCache::default(),
            bindings: FnvHashMap::default(),
            focus: FocusCount::default(),
            next_id: 0,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Last size passed to [`Self::set_size`].
    pub fn size(&self) -> DVec2 {
        self.size
    }

    /// Must be called on every viewport change; stale sizes leave the
    /// projection off-centre.
    pub fn set_size(&mut self, width: f64, height: f64) {
        self.size = DVec2::new(width, height);
        self.half_size = self.size / 2.0;
        self.surface.set_size(width, height);
        log::debug!("[bridge] size {}x{}", width, height);
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn contains(&self, handle: BindingHandle) -> bool {
        self.bindings.contains_key(&handle)
    }

    pub fn handles(&self) -> impl Iterator<Item = BindingHandle> + '_ {
        self.bindings.keys().copied()
    }

    pub fn element(&self, handle: BindingHandle) -> Option<&S::Element> {
        self.bindings.get(&handle).map(|b| &b.element)
    }

    pub fn content_size(&self, handle: BindingHandle) -> Option<DVec2> {
        self.bindings.get(&handle).map(|b| b.content_size)
    }

    pub fn last_style(&self, handle: BindingHandle) -> Option<&str> {
        self.bindings
            .get(&handle)
            .and_then(|b| b.last_style.as_deref())
    }

    /// Check `options` against `node` without touching the surface.
    /// Returns the content size a [`Self::register`] call would use.
    pub fn validate(&self, node: &N, options: &BindOptions) -> Result<DVec2, BridgeError> {
        let resolution = options.resolution_px_per_unit;
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(BridgeError::InvalidOptions(
                "resolution must be a positive finite number",
            ));
        }
        // the camera container is shared, so every binding must use the bridge's mode
        if options
            .legacy_compat_mode
            .is_some_and(|legacy| legacy != self.config.legacy_compat_mode)
        {
            return Err(BridgeError::InvalidOptions(
                "legacy compat mode must match the bridge configuration",
            ));
        }
        if self.next_id == u32::MAX {
            return Err(BridgeError::HandlesExhausted);
        }
        let content_size = match options.content_size {
            Some(size) => size,
            None => node.bounding_box().content_size(),
        };
        if !(content_size.is_finite() && content_size.x > 0.0 && content_size.y > 0.0) {
            return Err(BridgeError::InvalidOptions(
                "content size must be positive and finite",
            ));
        }
        Ok(content_size)
    }

    /// Bind `element` to `node`. The element is sized to
    /// `content_size * resolution` pixels right away and moved into the
    /// camera container on the next tick.
    pub fn register(
        &mut self,
        node: N,
        element: S::Element,
        options: BindOptions,
    ) -> Result<BindingHandle, BridgeError> {
        let content_size = self.validate(&node, &options)?;
        if let Some((handle, _)) = self.bindings.iter().find(|(_, b)| b.element == element) {
            return Err(BridgeError::ElementAlreadyBound(*handle));
        }

        let element_px = content_size * options.resolution_px_per_unit;
        self.surface
            .prepare_element(&element, element_px.x, element_px.y);

        let handle = BindingHandle(self.next_id);
        self.next_id += 1;
        self.bindings.insert(
            handle,
            Binding {
                node,
                element,
                content_size,
                element_px,
                last_style: None,
                focused: false,
                reported_invalid: false,
            },
        );
        log::info!(
            "[bridge] registered {} content={:.3}x{:.3} px={:.1}x{:.1}",
            handle,
            content_size.x,
            content_size.y,
            element_px.x,
            element_px.y
        );
        Ok(handle)
    }

    /// Drop a binding and detach its element from the camera container.
    /// Returns the node so the caller can dispose of it.
    pub fn unregister(&mut self, handle: BindingHandle) -> Result<N, BridgeError> {
        let node = self
            .release(handle)
            .ok_or(BridgeError::UnknownBinding(handle))?;
        log::info!("[bridge] unregistered {}", handle);
        Ok(node)
    }

    /// Give an embedded frame pointer focus. Returns whether focus changed.
    /// Overlay frames always receive input, so this is a no-op for them.
    pub fn focus(&mut self, handle: BindingHandle) -> Result<bool, BridgeError> {
        let binding = self
            .bindings
            .get_mut(&handle)
            .ok_or(BridgeError::UnknownBinding(handle))?;
        if self.config.layer != FrameLayer::Embedded || binding.focused {
            return Ok(false);
        }
        binding.focused = true;
        if let Some(state) = self.focus.gain() {
            self.surface.set_page_pointer_events(state);
        }
        Ok(true)
    }

    pub fn blur(&mut self, handle: BindingHandle) -> Result<bool, BridgeError> {
        let binding = self
            .bindings
            .get_mut(&handle)
            .ok_or(BridgeError::UnknownBinding(handle))?;
        if !binding.focused {
            return Ok(false);
        }
        binding.focused = false;
        if let Some(state) = self.focus.lose() {
            self.surface.set_page_pointer_events(state);
        }
        Ok(true)
    }

    pub fn is_focused(&self, handle: BindingHandle) -> bool {
        self.bindings.get(&handle).is_some_and(|b| b.focused)
    }

    /// Project every binding from `camera`. Camera work always precedes
    /// object work.
    pub fn tick<C: CameraSource + ?Sized>(&mut self, camera: &C) -> TickReport {
        let mut report = TickReport::default();

        let world = camera.world_matrix();
        let projection = camera.projection_matrix();
        let bad_camera = if !world.is_finite() {
            Some("world matrix")
        } else if !projection.is_finite() {
            Some("projection matrix")
        } else {
            None
        };
        if let Some(what) = bad_camera {
            let err = BridgeError::InvalidCamera { what };
            if !self.camera.reported_invalid {
                log::warn!("[bridge] {}; skipping ticks until it recovers", err);
                self.camera.reported_invalid = true;
            }
            report.errors.push(err);
            return report;
        }
        self.camera.reported_invalid = false;

        let fov = projection.y_axis.y * self.half_size.y;
        report.perspective_written = self.update_perspective(fov, camera.is_orthographic());

        let camera_css = camera_css(fov, &css_camera_matrix(&world));
        if !self.config.legacy_compat_mode {
            report.camera_written = self.update_camera_style(&camera_css);
        }

        self.drop_stale(&mut report);

        let camera_translation = world.w_axis;
        let legacy = self.config.legacy_compat_mode;
        for (handle, binding) in self.bindings.iter_mut() {
            let node_world = binding.node.world_matrix();
            let scaling = binding.node.scaling();
            let bad_node = if !node_world.is_finite() {
                Some("world matrix")
            } else if !scaling.is_finite() {
                Some("scaling")
            } else {
                None
            };
            if let Some(what) = bad_node {
                let err = BridgeError::InvalidTransform {
                    handle: *handle,
                    what,
                };
                if !binding.reported_invalid {
                    log::warn!("[bridge] {}; skipping it", err);
                    binding.reported_invalid = true;
                }
                report.errors.push(err);
                continue;
            }

            let matrix = object_matrix(
                &node_world,
                scaling,
                binding.content_size,
                binding.element_px,
                camera_translation,
                legacy,
            );
            let style = object_style(
                &matrix,
                &camera_css,
                self.half_size,
                legacy,
            );
            if binding.last_style.as_deref() != Some(style.as_str()) {
                self.surface.set_element_transform(&binding.element, &style);
                binding.last_style = Some(style);
                report.styles_written += 1;
            }

            // Hosts may move elements around behind our back, so check every tick.
            if !self.surface.is_camera_child(&binding.element) {
                self.surface.attach_to_camera(&binding.element);
                report.reparented += 1;
            }
        }

        report
    }

    fn update_perspective(&mut self, fov: f64, orthographic: bool) -> bool {
        let key = (fov, orthographic);
        if self.camera.perspective == Some(key) {
            return false;
        }
        self.surface
            .set_perspective(if orthographic { None } else { Some(fov) });
        self.camera.perspective = Some(key);
        true
    }

    fn update_camera_style(&mut self, camera_css: &str) -> bool {
        let style = camera_style(camera_css, self.half_size);
        if self.camera.style.as_deref() == Some(style.as_str()) {
            return false;
        }
        self.surface.set_camera_transform(&style);
        self.camera.style = Some(style);
        true
    }

    fn drop_stale(&mut self, report: &mut TickReport) {
        let stale: SmallVec<[BindingHandle; 2]> = self
            .bindings
            .iter()
            .filter(|(_, b)| !b.node.is_alive())
            .map(|(h, _)| *h)
            .collect();
        for handle in stale {
            log::warn!("[bridge] {}", BridgeError::StaleBinding(handle));
            self.release(handle);
            report.stale.push(handle);
        }
    }

    fn release(&mut self, handle: BindingHandle) -> Option<N> {
        let binding = self.bindings.remove(&handle)?;
        if binding.focused {
            if let Some(state) = self.focus.lose() {
                self.surface.set_page_pointer_events(state);
            }
        }
        self.surface.detach(&binding.element);
        Some(binding.node)
    }
}

/// Camera world matrix with its rotation-only entries replaced from the
/// transposed rotation, so the container rotates opposite to the camera.
fn css_camera_matrix(world: &DMat4) -> DMat4 {
    let r = rotation_part(world).transpose().to_cols_array();
    let mut m = world.to_cols_array();
    m[1] = r[1];
    m[2] = -r[2];
    m[4] = -r[4];
    m[6] = -r[6];
    m[8] = -r[8];
    m[9] = -r[9];
    DMat4::from_cols_array(&m)
}

fn rotation_part(world: &DMat4) -> DMat4 {
    let degenerate = [world.x_axis, world.y_axis, world.z_axis]
        .iter()
        .any(|axis| axis.truncate().length_squared() == 0.0);
    if degenerate || world.determinant() == 0.0 {
        return DMat4::IDENTITY;
    }
    let (_, rotation, _) = world.to_scale_rotation_translation();
    DMat4::from_quat(rotation)
}

/// Object world matrix rescaled from element pixels to scene units and
/// expressed relative to the camera position. W is damped so the browser's
/// perspective divide happens far from the CSS perspective origin.
fn object_matrix(
    world: &DMat4,
    scaling: DVec3,
    content_size: DVec2,
    element_px: DVec2,
    camera_translation: DVec4,
    legacy_compat_mode: bool,
) -> DMat4 {
    let mut m = world.to_cols_array();
    let sx = content_size.x * scaling.x / element_px.x;
    let sy = content_size.y * scaling.y / element_px.y;
    m[0] *= sx;
    m[5] *= sy;
    m[6] *= sy;

    m[12] -= camera_translation.x;
    m[13] -= camera_translation.y;
    m[14] = camera_translation.z - m[14];
    m[15] = camera_translation.w * W_DAMPING;

    let matrix = DMat4::from_cols_array(&m);
    if legacy_compat_mode {
        matrix.mul_scalar(LEGACY_OBJECT_SCALE)
    } else {
        matrix
    }
}
