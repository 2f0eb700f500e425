// Shared projection and tuning constants used by the bridge and the web front-end.

// Projection
pub const EPSILON: f64 = 1e-10; // magnitudes below this are written as 0
pub const W_DAMPING: f64 = 0.00001; // object W scale; keeps the CSS perspective offset negligible
pub const LEGACY_OBJECT_SCALE: f64 = 100.0; // uniform matrix scale applied in legacy compat mode

// Frames
pub const DEFAULT_RESOLUTION_PX_PER_UNIT: f64 = 100.0; // frame pixels per scene unit

// Device orientation rig
pub const ORIENTATION_SLERP: f64 = 0.02; // per-update smoothing toward the target rotation
pub const ORIENTATION_DAMPING: f64 = 0.1; // yaw/roll damping applied to device rotation
pub const DRAG_MULTIPLIER: f64 = 0.2; // manual drag rotation speed
pub const DRAG_REFERENCE_WIDTH: f64 = 1200.0; // viewport width the drag speed is tuned for
pub const DRAG_REFERENCE_HEIGHT: f64 = 800.0; // viewport height the drag speed is tuned for
