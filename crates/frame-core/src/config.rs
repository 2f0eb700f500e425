use crate::constants::{
    DEFAULT_RESOLUTION_PX_PER_UNIT, DRAG_MULTIPLIER, ORIENTATION_DAMPING, ORIENTATION_SLERP,
};
use glam::DVec2;

/// Where the frame container sits relative to the WebGL canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrameLayer {
    /// Frames are drawn on top of the canvas.
    #[default]
    Overlay,
    /// Frames are drawn behind the canvas; the host masks the target mesh so
    /// the frame shows through, and pointer input is passed through on focus.
    Embedded,
}

/// Construction-time configuration of a [`crate::SceneBridge`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Fold the camera transform into every object style instead of relying on
    /// nested `perspective`/`preserve-3d` contexts.
    pub legacy_compat_mode: bool,
    pub layer: FrameLayer,
}

/// Per-binding options passed to [`crate::SceneBridge::register`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BindOptions {
    /// How many element pixels represent one scene unit.
    pub resolution_px_per_unit: f64,
    /// Size of the frame in scene units; derived from the node bounds when `None`.
    pub content_size: Option<DVec2>,
    /// Must agree with [`crate::BridgeConfig::legacy_compat_mode`] when set.
    pub legacy_compat_mode: Option<bool>,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            resolution_px_per_unit: DEFAULT_RESOLUTION_PX_PER_UNIT,
            content_size: None,
            legacy_compat_mode: None,
        }
    }
}

impl BindOptions {
    pub fn with_resolution(resolution_px_per_unit: f64) -> Self {
        Self {
            resolution_px_per_unit,
            ..Self::default()
        }
    }

    pub fn content_size(mut self, size: DVec2) -> Self {
        self.content_size = Some(size);
        self
    }

    pub fn legacy_compat_mode(mut self, enabled: bool) -> Self {
        self.legacy_compat_mode = Some(enabled);
        self
    }
}

/// Tuning for [`crate::orientation::OrientationRig`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrientationConfig {
    pub manual_drag: bool,
    /// Drag rotation speed.
    pub multiplier: f64,
    /// Slerp factor applied per update toward the target rotation.
    pub smoothing: f64,
    /// Scale applied to the device rotation's Y and Z quaternion components.
    pub damping: f64,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            manual_drag: true,
            multiplier: DRAG_MULTIPLIER,
            smoothing: ORIENTATION_SLERP,
            damping: ORIENTATION_DAMPING,
        }
    }
}
