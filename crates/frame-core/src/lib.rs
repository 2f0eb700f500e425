//! Core of htmlframe: turns the transforms of a WebGL scene into CSS `matrix3d`
//! styles so that HTML elements track meshes on screen.
//!
//! Nothing in this crate touches web APIs. The page-facing side lives in
//! `frame-web`, which implements [`host::Surface`] on top of the DOM.

pub mod bridge;
pub mod config;
pub mod constants;
pub mod error;
pub mod focus;
pub mod host;
pub mod orientation;
pub mod projector;

pub use bridge::*;
pub use config::*;
pub use constants::*;
pub use error::*;
pub use host::*;
pub use projector::*;
