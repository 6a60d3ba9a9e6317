//! # Output Actions
//!
//! Abstract output events produced by the translator and realized by the
//! [`Emitter`](super::emitter::Emitter).

/// One output event, carrying everything needed to synthesize it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputAction {
    /// Keyboard key transition (Linux key code).
    Key { code: u16, pressed: bool },
    /// Mouse button transition (1 = left, 2 = middle, 3 = right, ...).
    MouseButton { index: u8, pressed: bool },
    /// Relative pointer motion in pixels.
    MouseMove { dx: i32, dy: i32 },
    /// Absolute pointer position as percent of half the screen from the
    /// centre (-100 to 100). Zero leaves that axis where it was.
    MouseMoveAbsolute { x: i32, y: i32 },
}

/// A digital output that can be held down and released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputTarget {
    Key(u16),
    MouseButton(u8),
}

impl OutputTarget {
    /// Action that presses this target.
    #[must_use]
    pub fn press(self) -> OutputAction {
        self.transition(true)
    }

    /// Action that releases this target.
    #[must_use]
    pub fn release(self) -> OutputAction {
        self.transition(false)
    }

    fn transition(self, pressed: bool) -> OutputAction {
        match self {
            OutputTarget::Key(code) => OutputAction::Key { code, pressed },
            OutputTarget::MouseButton(index) => OutputAction::MouseButton { index, pressed },
        }
    }
}
