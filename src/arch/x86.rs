//! Port I/O and privileged instructions for x86 in protected mode.

use core::arch::asm;

use super::{Cpu, PortIo};
use crate::core::interrupts::idt::TableDescriptor;

/// The one processor this kernel runs on.
#[derive(Debug, Clone, Copy, Default)]
pub struct X86;

impl PortIo for X86 {
    fn read_u8(&self, port: u16) -> u8 {
        let value: u8;
        unsafe {
            asm!(
                "in al, dx",
                in("dx") port,
                out("al") value,
                options(nomem, nostack, preserves_flags),
            );
        }
        value
    }

    fn write_u8(&self, port: u16, value: u8) {
        unsafe {
            asm!(
                "out dx, al",
                in("dx") port,
                in("al") value,
                options(nomem, nostack, preserves_flags),
            );
        }
    }
}

impl Cpu for X86 {
    unsafe fn load_interrupt_table(&self, descriptor: &TableDescriptor) {
        asm!(
            "lidt [{}]",
            in(reg) descriptor,
            options(readonly, nostack, preserves_flags),
        );
    }

    fn enable_interrupts(&self) {
        unsafe { asm!("sti", options(nomem, nostack)) };
    }

    fn disable_interrupts(&self) {
        unsafe { asm!("cli", options(nomem, nostack)) };
    }

    fn halt(&self) {
        unsafe { asm!("hlt", options(nomem, nostack, preserves_flags)) };
    }

    fn enable_interrupts_and_halt(&self) {
        unsafe { asm!("sti", "hlt", options(nomem, nostack)) };
    }
}
