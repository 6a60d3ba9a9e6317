//! # Output Module
//!
//! Virtual keyboard and mouse output.
//!
//! The translator produces [`OutputAction`]s; the [`Emitter`] realizes them
//! through a uinput device and, for what the kernel cannot express, an X11
//! XTest connection.

pub mod action;
pub mod emitter;
pub mod mouse_buttons;
pub mod sink;
pub mod uinput;
pub mod x11;

pub use action::{OutputAction, OutputTarget};
pub use emitter::Emitter;
pub use sink::{PointerServer, VirtualInput};
