//! Device Drivers
//!
//! This module contains drivers for various hardware devices:
//! - PS/2 Keyboard (IRQ1)

pub mod ps2_keyboard;

pub use ps2_keyboard::{decode, Keyboard, ScancodeTable, US_QWERTY};
