//! # Controller Module
//!
//! Physical joystick input handling.
//!
//! This module handles:
//! - Detecting whether a node speaks the legacy joydev or the evdev API
//! - Building a per-device code-to-index table
//! - Non-blocking draining of raw events into one normalized model
//! - Coalescing bursts down to the final value of each control

pub mod code_table;
pub mod coalescer;
pub mod device;
pub mod event_device;
pub mod joydev;

pub use coalescer::{coalesce, Coalesced, ControlKind, EventCoalescer, RawEvent};
pub use device::{discover, ApiKind, JoystickDevice};
