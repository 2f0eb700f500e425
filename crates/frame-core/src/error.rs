use crate::bridge::BindingHandle;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("binding {handle}: {what} contains non-finite values")]
    InvalidTransform {
        handle: BindingHandle,
        what: &'static str,
    },
    #[error("camera {what} contains non-finite values")]
    InvalidCamera { what: &'static str },
    #[error("binding {0} outlived its node; unregistering it")]
    StaleBinding(BindingHandle),
    #[error("element is already bound by binding {0}")]
    ElementAlreadyBound(BindingHandle),
    #[error("unknown binding {0}")]
    UnknownBinding(BindingHandle),
    #[error("invalid bind options: {0}")]
    InvalidOptions(&'static str),
    #[error("no binding handles left")]
    HandlesExhausted,
}
