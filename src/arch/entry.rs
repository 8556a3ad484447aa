//! Raw entry stubs the gates point at.
//!
//! The `x86-interrupt` ABI saves and restores every register the handler
//! clobbers and returns with `iret`. Each stub knows its own vector and hands
//! it to the one [`InterruptSystem`] living in [`SYSTEM`].

use spin::Once;

use super::x86::X86;
use crate::core::interrupts::idt::HandlerAddress;
use crate::core::interrupts::{EntryPoints, InterruptIndex, InterruptSystem};
use crate::core::kernel::init::BootError;
use crate::devices::input::InputQueue;

/// What the CPU pushes before entering a same-privilege handler.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InterruptFrame {
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
}

pub type KernelInterrupts = InterruptSystem<X86, InputQueue>;

/// Filled exactly once by `init_interrupts`, before `sti`.
pub static SYSTEM: Once<KernelInterrupts> = Once::new();

extern "x86-interrupt" fn timer_entry(_frame: InterruptFrame) {
    if let Some(system) = SYSTEM.get() {
        system.dispatch(InterruptIndex::Timer.vector());
    }
}

extern "x86-interrupt" fn keyboard_entry(_frame: InterruptFrame) {
    if let Some(system) = SYSTEM.get() {
        system.dispatch(InterruptIndex::Keyboard.vector());
    }
}

fn address_of(stub: usize) -> Result<HandlerAddress, BootError> {
    HandlerAddress::from_usize(stub).ok_or(BootError::EntryAddress(stub))
}

pub fn entry_points() -> Result<EntryPoints, BootError> {
    Ok(EntryPoints {
        timer: address_of(timer_entry as usize)?,
        keyboard: address_of(keyboard_entry as usize)?,
    })
}
