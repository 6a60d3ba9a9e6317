//! # Joypad Bridge Library
//!
//! Drive the keyboard and mouse with a joystick or gamepad on Linux.
//!
//! This library reads joystick devices through either the legacy joydev or
//! the evdev API, converts analog deflection into duty-cycled key presses
//! and pointer motion, and emits the result through a uinput device (with
//! an X11 XTest channel for absolute pointer placement).

pub mod config;
pub mod controller;
pub mod error;
pub mod layout;
pub mod output;
pub mod runtime;
pub mod translator;
