//! Camera rotation from device orientation and manual drag.
//!
//! The rig holds the camera's rotation and eases it toward a target every
//! [`OrientationRig::update`]. Device angles are calibrated against the first
//! usable sample after [`OrientationRig::connect`], so the camera starts where
//! it was authored and only follows relative device movement. Dragging takes
//! over from the device until it is released.

use crate::config::OrientationConfig;
use crate::constants::{DRAG_REFERENCE_HEIGHT, DRAG_REFERENCE_WIDTH};
use glam::{DQuat, DVec2, EulerRot};
use std::f64::consts::FRAC_PI_2;

/// Angles as delivered by `deviceorientation` events, in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DeviceAngles {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

/// Rotation of a screen-facing camera for the given device angles (radians).
pub fn device_quaternion(alpha: f64, beta: f64, gamma: f64, screen_orientation: f64) -> DQuat {
    let device = DQuat::from_euler(EulerRot::YXZ, alpha, beta, -gamma);
    let screen = DQuat::from_rotation_y(-screen_orientation);
    // the device reports with the screen facing up; look out of the back instead
    let world = DQuat::from_rotation_x(-FRAC_PI_2);
    device * screen * world
}

#[derive(Clone, Copy, Debug)]
struct Drag {
    start: DVec2,
    current: DVec2,
    speed: DVec2,
    origin: DQuat,
}

#[derive(Clone, Debug)]
pub struct OrientationRig {
    config: OrientationConfig,
    base: DQuat,
    rotation: DQuat,
    angles: DeviceAngles,
    screen_orientation_deg: f64,
    device: Option<DQuat>,
    calibration: Option<DQuat>,
    frozen: bool,
    drag: Option<Drag>,
}

impl OrientationRig {
    /// A frozen rig starting at `rotation`; call [`Self::connect`] to follow the device.
    pub fn new(rotation: DQuat, config: OrientationConfig) -> Self {
        Self {
            config,
            base: rotation,
            rotation,
            angles: DeviceAngles::default(),
            screen_orientation_deg: 0.0,
            device: None,
            calibration: None,
            frozen: true,
            drag: None,
        }
    }

    pub fn rotation(&self) -> DQuat {
        self.rotation
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Start following the device from the current rotation.
    pub fn connect(&mut self) {
        self.calibration = None;
        self.base = self.rotation;
        self.frozen = false;
        log::debug!("[orientation] connected");
    }

    pub fn disconnect(&mut self) {
        self.frozen = true;
        self.drag = None;
        log::debug!("[orientation] disconnected");
    }

    pub fn set_multiplier(&mut self, multiplier: f64) {
        self.config.multiplier = multiplier;
    }

    pub fn set_device_angles(&mut self, angles: DeviceAngles) {
        self.angles = angles;
    }

    pub fn set_screen_orientation(&mut self, degrees: f64) {
        self.screen_orientation_deg = degrees;
    }

    /// Begin a manual drag at `pointer`. Device input is ignored until
    /// [`Self::end_drag`]. Returns `false` when manual drag is disabled.
    pub fn begin_drag(&mut self, pointer: DVec2, viewport: DVec2) -> bool {
        if !self.config.manual_drag {
            return false;
        }
        let viewport = viewport.max(DVec2::ONE);
        self.frozen = true;
        self.drag = Some(Drag {
            start: pointer,
            current: pointer,
            speed: DVec2::new(
                DRAG_REFERENCE_WIDTH / viewport.x,
                DRAG_REFERENCE_HEIGHT / viewport.y,
            ) * self.config.multiplier,
            origin: self.rotation,
        });
        true
    }

    pub fn drag_to(&mut self, pointer: DVec2) {
        if let Some(drag) = self.drag.as_mut() {
            drag.current = pointer;
        }
    }

    pub fn end_drag(&mut self) {
        if self.drag.take().is_some() {
            self.frozen = false;
        }
    }

    /// Advance one frame and return the new rotation.
    pub fn update(&mut self) -> DQuat {
        self.update_device();
        if self.drag.is_some() {
            self.update_drag();
        }
        self.rotation
    }

    fn update_device(&mut self) {
        let alpha = self.angles.alpha.to_radians();
        let beta = self.angles.beta.to_radians();
        let gamma = self.angles.gamma.to_radians();
        let orient = self.screen_orientation_deg.to_radians();

        // browsers report all zeros until the sensor delivers real data
        if alpha == 0.0 || beta == 0.0 || gamma == 0.0 {
            return;
        }
        let device = device_quaternion(alpha, beta, gamma, orient);
        self.device = Some(device);
        let calibration = *self.calibration.get_or_insert_with(|| device.inverse());
        if self.frozen {
            return;
        }

        let relative = (device * calibration).normalize();
        let damped = DQuat::from_xyzw(
            relative.x,
            relative.y * self.config.damping,
            relative.z * self.config.damping,
            relative.w,
        )
        .normalize();
        // calibrating swaps the X and Z axes; swap them back
        let restored = DQuat::from_xyzw(-damped.z, damped.y, damped.x, damped.w);

        let target = (self.base * restored).normalize();
        self.rotation = self.rotation.slerp(target, self.config.smoothing);
    }

    fn update_drag(&mut self) {
        let device = self.device;
        let Some(drag) = self.drag.as_mut() else {
            return;
        };
        let lat = -(drag.start.y - drag.current.y) * drag.speed.y;
        let lon = -(drag.start.x - drag.current.x) * drag.speed.x;

        let mut target = drag.origin
            * DQuat::from_rotation_y(lon.to_radians())
            * DQuat::from_rotation_x(lat.to_radians());

        // keep the device's roll instead of the one the drag introduced
        let origin_z = roll(drag.origin);
        let target_z = roll(target);
        let real_z = roll(device.unwrap_or(drag.origin));
        drag.origin *= DQuat::from_rotation_z(real_z - origin_z);
        target *= DQuat::from_rotation_z(real_z - target_z);

        self.rotation = self.rotation.slerp(target, self.config.smoothing);
    }
}

fn roll(q: DQuat) -> f64 {
    q.to_euler(EulerRot::YXZ).2
}
