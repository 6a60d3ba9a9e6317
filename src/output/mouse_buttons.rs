//! Mouse button index to kernel key code table.
//!
//! Indices follow the X11 pointer button numbering used in layout files.
//! Indices missing here (wheel 4 to 7 and anything above 9) have no kernel
//! key code and go through the windowing-server channel instead.

use evdev::Key;

/// Every mouse button the synthetic device can press itself.
pub const MOUSE_BUTTONS: [(u8, Key); 5] = [
    (1, Key::BTN_LEFT),
    (2, Key::BTN_MIDDLE),
    (3, Key::BTN_RIGHT),
    (8, Key::BTN_SIDE),
    (9, Key::BTN_EXTRA),
];

/// Kernel key code for a mouse button index, if the kernel models it.
#[must_use]
pub fn kernel_code(index: u8) -> Option<Key> {
    MOUSE_BUTTONS
        .iter()
        .find(|(candidate, _)| *candidate == index)
        .map(|&(_, key)| key)
}
