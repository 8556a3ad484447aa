//! # NanoSys
//!
//! Interrupt plumbing for a small protected-mode kernel: the gate table, the
//! chained 8259 controllers, the PIT tick source and the PS/2 keyboard.
//!
//! Everything that touches the machine goes through the capability traits in
//! [`arch`], so the rules themselves (descriptor layout, mask math, divisor
//! math, scan-code decoding, acknowledgment ordering) run on the host under
//! `cargo test`.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(target_os = "none", feature(abi_x86_interrupt))]

#[macro_use]
pub mod serial;

pub mod arch;
pub mod config;
pub mod console;
pub mod core;
pub mod devices;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::core::interrupts::{InterruptIndex, InterruptSystem};
pub use crate::core::kernel::init::{init_interrupts, BootError};
pub use config::BootConfig;
