//! Adapters from the page's 3D engine objects to the bridge's host traits.
//!
//! The engine side is plain JS objects exposing methods:
//!
//! - camera: `worldMatrix()`, `projectionMatrix()`, optional `isOrthographic()`
//! - node: `worldMatrix()`, `boundingBox()` returning `{ min, max }`,
//!   optional `scaling()` and `isDisposed()`
//!
//! Matrices are 16 numbers, column-major with the translation at 12..15 (the
//! layout of Babylon's `Matrix.m` and three.js' `Matrix4.elements`). Vectors
//! are `[x, y, z]` or objects with `x`, `y`, `z`. A call that throws or returns
//! something malformed yields NaNs, which the bridge reports and skips.

use anyhow::{anyhow, bail};
use frame_core::{BoundingBox, CameraSource, NodeSource};
use glam::{DMat4, DVec3};
use wasm_bindgen::{JsCast, JsValue};

fn js_err(e: JsValue) -> anyhow::Error {
    anyhow!("{:?}", e)
}

fn method(obj: &JsValue, name: &str) -> anyhow::Result<Option<js_sys::Function>> {
    let value = js_sys::Reflect::get(obj, &JsValue::from_str(name)).map_err(js_err)?;
    if value.is_undefined() || value.is_null() {
        return Ok(None);
    }
    value
        .dyn_into::<js_sys::Function>()
        .map(Some)
        .map_err(|_| anyhow!("{} is not a function", name))
}

fn call(obj: &JsValue, name: &str) -> anyhow::Result<JsValue> {
    let f = method(obj, name)?.ok_or_else(|| anyhow!("missing {}()", name))?;
    f.call0(obj).map_err(js_err)
}

fn to_matrix(value: &JsValue) -> anyhow::Result<DMat4> {
    let array = js_sys::Float64Array::new(value);
    if array.length() != 16 {
        bail!("expected 16 matrix entries, got {}", array.length());
    }
    let mut m = [0.0; 16];
    array.copy_to(&mut m);
    Ok(DMat4::from_cols_array(&m))
}

fn to_vec3(value: &JsValue) -> anyhow::Result<DVec3> {
    let component = |name: &str| {
        js_sys::Reflect::get(value, &JsValue::from_str(name))
            .ok()
            .and_then(|v| v.as_f64())
    };
    if let (Some(x), Some(y), Some(z)) = (component("x"), component("y"), component("z")) {
        return Ok(DVec3::new(x, y, z));
    }
    let array = js_sys::Float64Array::new(value);
    if array.length() < 3 {
        bail!("expected a 3-vector");
    }
    Ok(DVec3::new(
        array.get_index(0),
        array.get_index(1),
        array.get_index(2),
    ))
}

fn matrix_or_nan(obj: &JsValue, name: &str) -> DMat4 {
    match call(obj, name).and_then(|v| to_matrix(&v)) {
        Ok(m) => m,
        Err(e) => {
            log::debug!("[scene] {}(): {:#}", name, e);
            DMat4::NAN
        }
    }
}

fn optional_bool(obj: &JsValue, name: &str) -> Option<bool> {
    let f = method(obj, name).ok().flatten()?;
    f.call0(obj).ok().and_then(|v| v.as_bool())
}

pub struct JsCamera {
    obj: JsValue,
}

impl JsCamera {
    pub fn new(obj: JsValue) -> Self {
        Self { obj }
    }
}

impl CameraSource for JsCamera {
    fn world_matrix(&self) -> DMat4 {
        matrix_or_nan(&self.obj, "worldMatrix")
    }

    fn projection_matrix(&self) -> DMat4 {
        matrix_or_nan(&self.obj, "projectionMatrix")
    }

    fn is_orthographic(&self) -> bool {
        optional_bool(&self.obj, "isOrthographic").unwrap_or(false)
    }
}

pub struct JsNode {
    obj: JsValue,
}

impl JsNode {
    pub fn new(obj: JsValue) -> Self {
        Self { obj }
    }
}

impl NodeSource for JsNode {
    fn world_matrix(&self) -> DMat4 {
        matrix_or_nan(&self.obj, "worldMatrix")
    }

    fn bounding_box(&self) -> BoundingBox {
        let read = || -> anyhow::Result<BoundingBox> {
            let bb = call(&self.obj, "boundingBox")?;
            let min = js_sys::Reflect::get(&bb, &"min".into()).map_err(js_err)?;
            let max = js_sys::Reflect::get(&bb, &"max".into()).map_err(js_err)?;
            Ok(BoundingBox::new(to_vec3(&min)?, to_vec3(&max)?))
        };
        read().unwrap_or_else(|e| {
            log::warn!("[scene] boundingBox(): {:#}", e);
            BoundingBox::new(DVec3::ZERO, DVec3::ZERO)
        })
    }

    fn scaling(&self) -> DVec3 {
        match method(&self.obj, "scaling") {
            Ok(Some(f)) => f
                .call0(&self.obj)
                .map_err(js_err)
                .and_then(|v| to_vec3(&v))
                .unwrap_or(DVec3::NAN),
            _ => DVec3::ONE,
        }
    }

    fn is_alive(&self) -> bool {
        !optional_bool(&self.obj, "isDisposed").unwrap_or(false)
    }
}
