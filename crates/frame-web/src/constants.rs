// DOM layout constants for the frame container.

pub const CONTAINER_ID: &str = "css-container";
pub const EMBEDDED_CONTAINER_Z_INDEX: &str = "-1"; // behind the WebGL canvas
pub const EMBEDDED_FRAME_Z_INDEX: &str = "1";
pub const FRAME_BACKGROUND: &str = "#0000"; // transparent so the mask shows through
