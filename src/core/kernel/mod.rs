//! # Kernel Initialization Module
//!
//! Provides kernel bootstrap and status tracking infrastructure.
//!
//! ## Submodules
//!
//! - `init`: the one routine that brings interrupts up, in order
//! - `status`: component status tracking for the boot log
//!
//! ## Example
//!
//! ```ignore
//! use nanosys::core::kernel::{init_phase, register_component};
//!
//! register_component("Interrupt System");
//! let system = init_phase("Interrupt System", || init_interrupts(&SYSTEM, X86, queue, config, entries))?;
//! ```

pub mod init;
pub mod status;

pub use init::{init_interrupts, init_phase, BootError};
pub use status::{register_component, update_component_status, InitStatus};
