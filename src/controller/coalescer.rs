//! # Event Coalescer Module
//!
//! Reduces one drained burst of raw events to the final value of each control.
//!
//! Devices can report dozens of events per tick under vibration or sensor
//! noise. Only the value a control settled on before the next processing tick
//! matters, so intermediate values are discarded: for every axis index and
//! every button index the coalesced result holds the chronologically last
//! value seen in the burst.
//!
//! ## Usage
//!
//! ```
//! use joypad_bridge::controller::coalescer::{coalesce, RawEvent};
//!
//! let burst = vec![
//!     RawEvent::axis(0, 100),
//!     RawEvent::button(2, 1),
//!     RawEvent::axis(0, 250),
//! ];
//! let batch = coalesce(burst);
//!
//! assert_eq!(batch.axes.get(&0), Some(&250));
//! assert_eq!(batch.buttons.get(&2), Some(&1));
//! ```

use std::collections::BTreeMap;

/// Kind of control a raw event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    /// Analog axis (value in -32767..=32767 after normalization)
    Axis,
    /// Digital button (0 = released, non-zero = pressed)
    Button,
}

/// A normalized event from either kernel input API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: ControlKind,
    pub index: usize,
    pub value: i32,
}

impl RawEvent {
    /// Creates an axis event.
    #[must_use]
    pub fn axis(index: usize, value: i32) -> Self {
        Self {
            kind: ControlKind::Axis,
            index,
            value,
        }
    }

    /// Creates a button event.
    #[must_use]
    pub fn button(index: usize, value: i32) -> Self {
        Self {
            kind: ControlKind::Button,
            index,
            value,
        }
    }
}

/// Final values of one burst, at most one entry per index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coalesced {
    /// Axis index to last reported value.
    pub axes: BTreeMap<usize, i32>,
    /// Button index to last reported value.
    pub buttons: BTreeMap<usize, i32>,
}

impl Coalesced {
    /// Returns `true` if the burst touched no control.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.axes.is_empty() && self.buttons.is_empty()
    }
}

/// Accumulates raw events and hands out the coalesced result.
///
/// `EventCoalescer` is not thread-safe. Use from a single task only.
#[derive(Debug, Default)]
pub struct EventCoalescer {
    pending: Coalesced,
}

impl EventCoalescer {
    /// Creates an empty coalescer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one event, overwriting any earlier value of the same control.
    pub fn push(&mut self, event: RawEvent) {
        let slot = match event.kind {
            ControlKind::Axis => &mut self.pending.axes,
            ControlKind::Button => &mut self.pending.buttons,
        };
        slot.insert(event.index, event.value);
    }

    /// Takes the coalesced values and resets the coalescer.
    pub fn drain(&mut self) -> Coalesced {
        std::mem::take(&mut self.pending)
    }

    /// Number of distinct controls currently pending.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.axes.len() + self.pending.buttons.len()
    }
}

/// Coalesces a whole burst in one call.
pub fn coalesce<I>(events: I) -> Coalesced
where
    I: IntoIterator<Item = RawEvent>,
{
    let mut coalescer = EventCoalescer::new();
    for event in events {
        coalescer.push(event);
    }
    coalescer.drain()
}
