//! # Core Kernel Module
//!
//! This module contains the fundamental kernel infrastructure: interrupt
//! handling, the boot sequence that brings it up, and boot status tracking.
//!
//! ## Submodules
//!
//! - `kernel`: Boot sequencing, status tracking, and component registration
//! - `interrupts`: IDT setup, PIC configuration, timer
//!
//! ## Initialization Order
//!
//! 1. Gate table built and the timer/keyboard gates installed
//! 2. IDT loaded (`lidt`)
//! 3. PIC remapped, every line masked except IRQ0 and IRQ1
//! 4. PIT programmed
//! 5. Interrupt delivery enabled (`sti`)

pub mod interrupts;
pub mod kernel;
