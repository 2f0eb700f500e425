//! Pointer passthrough for embedded frames.
//!
//! An embedded frame sits behind the canvas, so it only receives input while
//! page pointer events are switched off. A frame gains focus when the host
//! picks its mesh and loses it when the pointer leaves the frame element.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PagePointerEvents {
    Auto,
    None,
}

impl PagePointerEvents {
    pub fn as_css(self) -> &'static str {
        match self {
            PagePointerEvents::Auto => "auto",
            PagePointerEvents::None => "none",
        }
    }
}

/// Number of focused frames. Page pointer events are off while it is non-zero.
#[derive(Clone, Copy, Debug, Default)]
pub struct FocusCount {
    focused: usize,
}

impl FocusCount {
    /// Returns the page state to apply when the first frame gains focus.
    pub fn gain(&mut self) -> Option<PagePointerEvents> {
        self.focused += 1;
        (self.focused == 1).then_some(PagePointerEvents::None)
    }

    /// Returns the page state to apply when the last focused frame lets go.
    pub fn lose(&mut self) -> Option<PagePointerEvents> {
        if self.focused == 0 {
            return None;
        }
        self.focused -= 1;
        (self.focused == 0).then_some(PagePointerEvents::Auto)
    }

    pub fn any(&self) -> bool {
        self.focused > 0
    }
}
