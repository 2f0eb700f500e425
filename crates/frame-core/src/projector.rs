//! Conversion of 4x4 transforms into CSS `matrix3d()` strings.
//!
//! Matrices are flattened column-major (`DMat4::to_cols_array`), so the
//! translation sits at indices 12, 13 and 14. The camera mapping negates the
//! Y components of every column (1, 5, 9, 13) to go from the engine's Y-up
//! space into CSS' Y-down space; object matrices are already expressed in
//! that flipped space and only have their Y basis vector (4..=7) negated.

use crate::constants::EPSILON;
use glam::{DMat4, DVec2};
use std::fmt::Write;

const CAMERA_FLIPS: [usize; 4] = [1, 5, 9, 13];
const OBJECT_FLIPS: [usize; 4] = [4, 5, 6, 7];

/// Snap values too small to matter to exactly zero so they never show up as
/// denormal noise in a style string.
#[inline]
pub fn epsilon_snap(value: f64) -> f64 {
    if value.abs() < EPSILON {
        0.0
    } else {
        value
    }
}

pub fn camera_matrix_to_css(matrix: &DMat4) -> String {
    matrix3d(matrix, &CAMERA_FLIPS)
}

pub fn object_matrix_to_css(matrix: &DMat4) -> String {
    matrix3d(matrix, &OBJECT_FLIPS)
}

/// Camera part shared by the container style and, in legacy mode, every
/// object style: `translateZ(<fov>px)matrix3d(..)`.
pub fn camera_css(fov_px: f64, camera_matrix: &DMat4) -> String {
    let mut out = String::with_capacity(200);
    let _ = write!(out, "translateZ({}px)", fov_px);
    out.push_str(&camera_matrix_to_css(camera_matrix));
    out
}

/// Style of the camera container: the camera part recentred on the viewport.
pub fn camera_style(camera_css: &str, half_size: DVec2) -> String {
    let mut out = String::with_capacity(camera_css.len() + 40);
    out.push_str(camera_css);
    let _ = write!(out, "translate({}px,{}px)", half_size.x, half_size.y);
    out
}

/// Style of a projected element.
///
/// In legacy compat mode the recentring and the camera transform are
/// composed by hand in front of the object matrix, since those engines do not
/// propagate the camera container's 3D context to its children.
pub fn object_style(
    matrix: &DMat4,
    camera_css: &str,
    half_size: DVec2,
    legacy_compat_mode: bool,
) -> String {
    let matrix3d = object_matrix_to_css(matrix);
    let mut out = String::with_capacity(matrix3d.len() + camera_css.len() + 60);
    out.push_str("translate(-50%,-50%)");
    if legacy_compat_mode {
        let _ = write!(out, "translate({}px,{}px)", half_size.x, half_size.y);
        out.push_str(camera_css);
    }
    out.push_str(&matrix3d);
    out
}

fn matrix3d(matrix: &DMat4, flips: &[usize]) -> String {
    let mut elements = matrix.to_cols_array();
    for &i in flips {
        elements[i] = -elements[i];
    }
    let mut out = String::with_capacity(160);
    out.push_str("matrix3d(");
    for (i, value) in elements.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{}", epsilon_snap(*value));
    }
    out.push(')');
    out
}
