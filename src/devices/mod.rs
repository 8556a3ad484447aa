//! Device Subsystem
//!
//! Hardware device drivers and abstractions:
//! - `drivers`: PS/2 keyboard driver
//! - `input`: where decoded key characters are delivered

pub mod drivers;
pub mod input;
