//! # Machine Capabilities
//!
//! The only doors between interrupt logic and the processor:
//!
//! - [`PortIo`]: byte reads and writes on the x86 I/O port bus
//! - [`Cpu`]: load the interrupt table register, gate interrupt delivery, halt
//!
//! [`x86::X86`] is the real implementation. Unit tests drive the same code
//! through a recording mock instead.

use crate::core::interrupts::idt::TableDescriptor;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub mod x86;

#[cfg(target_os = "none")]
pub mod entry;

/// Writes to this unused port take roughly one bus cycle, long enough for
/// slow chips like the 8259 to latch the previous byte.
pub const IO_WAIT_PORT: u16 = 0x80;

pub trait PortIo {
    fn read_u8(&self, port: u16) -> u8;

    fn write_u8(&self, port: u16, value: u8);

    fn io_wait(&self) {
        self.write_u8(IO_WAIT_PORT, 0);
    }
}

pub trait Cpu {
    /// Points the interrupt table register at `descriptor.base`.
    ///
    /// # Safety
    ///
    /// The table behind the descriptor must stay valid and unmodified for as
    /// long as interrupts can be delivered.
    unsafe fn load_interrupt_table(&self, descriptor: &TableDescriptor);

    fn enable_interrupts(&self);

    fn disable_interrupts(&self);

    /// Sleep until the next interrupt arrives.
    fn halt(&self);

    /// `sti` immediately followed by `hlt`. The CPU delivers nothing between
    /// the two, so an interrupt raised while delivery was off still wakes the
    /// halt.
    fn enable_interrupts_and_halt(&self);
}
