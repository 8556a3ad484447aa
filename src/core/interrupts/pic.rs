//! # Programmable Interrupt Controller (8259 PIC)
//!
//! Configures the legacy 8259 pair for interrupt routing.
//!
//! ## PIC Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐
//! │   PIC 1     │     │   PIC 2     │
//! │  (Master)   │◀────│  (Slave)    │
//! │ IRQ 0-7     │     │ IRQ 8-15    │
//! └─────────────┘     └─────────────┘
//!       │      (slave wired to master IRQ2)
//!       ▼
//!     CPU
//! ```
//!
//! ## Vector Remapping
//!
//! Out of reset, IRQ 0-7 land on vectors 8-15, on top of CPU exceptions.
//! We remap them:
//! - PIC 1: vectors 32-39 (IRQ 0-7)
//! - PIC 2: vectors 40-47 (IRQ 8-15)
//!
//! ## Acknowledgment
//!
//! A PIC that is never sent EOI stops raising that line for good. Lines 0-7
//! need EOI on the master; lines 8-15 need it on the slave and then the
//! master.

use core::sync::atomic::{AtomicU16, Ordering};

use bitflags::bitflags;

use super::idt::Vector;
use crate::arch::PortIo;

pub const PIC_1_OFFSET: u8 = 32; // Primary PIC handles IRQs 0-7
pub const PIC_2_OFFSET: u8 = 40; // Secondary PIC handles IRQs 8-15

pub const PIC1_COMMAND: u16 = 0x20;
pub const PIC1_DATA: u16 = 0x21;
pub const PIC2_COMMAND: u16 = 0xA0;
pub const PIC2_DATA: u16 = 0xA1;

pub const PIC_EOI: u8 = 0x20;

// ICW1: edge triggered, cascaded, ICW4 follows
const ICW1_INIT: u8 = 0x10;
const ICW1_ICW4: u8 = 0x01;
// ICW3
const CASCADE_LINE_MASK: u8 = 1 << 2;
const SLAVE_CASCADE_IDENTITY: u8 = 2;
// ICW4
const ICW4_8086: u8 = 0x01;

const LINES_PER_PIC: u8 = 8;

/// A hardware interrupt request line, 0-15.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct IrqLine(u8);

impl IrqLine {
    pub const TIMER: IrqLine = IrqLine(0);
    pub const KEYBOARD: IrqLine = IrqLine(1);
    pub const CASCADE: IrqLine = IrqLine(2);
    pub const COM2: IrqLine = IrqLine(3);
    pub const COM1: IrqLine = IrqLine(4);
    pub const LPT2: IrqLine = IrqLine(5);
    pub const FLOPPY: IrqLine = IrqLine(6);
    pub const LPT1: IrqLine = IrqLine(7);
    pub const RTC: IrqLine = IrqLine(8);
    pub const MOUSE: IrqLine = IrqLine(12);
    pub const FPU: IrqLine = IrqLine(13);
    pub const ATA_PRIMARY: IrqLine = IrqLine(14);
    pub const ATA_SECONDARY: IrqLine = IrqLine(15);

    pub const fn new(line: u8) -> Option<Self> {
        if line < 2 * LINES_PER_PIC {
            Some(IrqLine(line))
        } else {
            None
        }
    }

    pub const fn as_u8(self) -> u8 {
        self.0
    }

    pub const fn is_slave(self) -> bool {
        self.0 >= LINES_PER_PIC
    }
}

bitflags! {
    /// A set of IRQ lines, bit N for line N.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct IrqLines: u16 {
        const TIMER = 1 << 0;
        const KEYBOARD = 1 << 1;
        const CASCADE = 1 << 2;
        const COM2 = 1 << 3;
        const COM1 = 1 << 4;
        const LPT2 = 1 << 5;
        const FLOPPY = 1 << 6;
        const LPT1 = 1 << 7;
        const RTC = 1 << 8;
        const ACPI = 1 << 9;
        const PERIPHERAL_10 = 1 << 10;
        const PERIPHERAL_11 = 1 << 11;
        const MOUSE = 1 << 12;
        const FPU = 1 << 13;
        const ATA_PRIMARY = 1 << 14;
        const ATA_SECONDARY = 1 << 15;

        const SLAVE = 0xFF00;
    }
}

impl IrqLines {
    pub const fn line(line: IrqLine) -> Self {
        IrqLines::from_bits_retain(1 << line.0)
    }

    /// Mask bytes for (master, slave): 0 = delivered, 1 = blocked. Enabling
    /// any slave line also opens the cascade line, or nothing from the
    /// slave could reach the CPU.
    pub fn masks(self) -> (u8, u8) {
        let mut enabled = self;
        if enabled.intersects(IrqLines::SLAVE) {
            enabled |= IrqLines::CASCADE;
        }
        let mask = !enabled.bits();
        (mask as u8, (mask >> 8) as u8)
    }
}

impl From<IrqLine> for IrqLines {
    fn from(line: IrqLine) -> Self {
        IrqLines::line(line)
    }
}

/// First vector of one controller's eight lines. The 8259 drops the low
/// three bits of ICW2, and bases below 32 land on CPU exceptions, so only
/// multiples of 8 from 32 to 248 can be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct VectorBase(u8);

impl VectorBase {
    pub const MASTER: VectorBase = VectorBase(PIC_1_OFFSET);
    pub const SLAVE: VectorBase = VectorBase(PIC_2_OFFSET);

    pub const fn new(base: u8) -> Option<Self> {
        if base % LINES_PER_PIC == 0 && !Vector::new(base).is_reserved() {
            Some(VectorBase(base))
        } else {
            None
        }
    }

    pub const fn as_u8(self) -> u8 {
        self.0
    }
}

struct Pic {
    offset: u8,
    command_port: u16,
    data_port: u16,
}

impl Pic {
    fn handles_vector(&self, vector: Vector) -> bool {
        vector.as_u8() >= self.offset && vector.as_u8() - self.offset < LINES_PER_PIC
    }

    fn end_of_interrupt(&self, io: &impl PortIo) {
        io.write_u8(self.command_port, PIC_EOI);
    }
}

/// The master/slave pair behind one set of vector offsets.
pub struct ChainedPics {
    pics: [Pic; 2],
    mask: AtomicU16,
}

impl ChainedPics {
    /// `None` if both chips would answer on the same eight vectors.
    pub const fn new(master: VectorBase, slave: VectorBase) -> Option<Self> {
        if master.0 == slave.0 {
            return None;
        }
        Some(Self::with_offsets(master.0, slave.0))
    }

    /// Master at 32, slave at 40.
    pub const fn remapped() -> Self {
        Self::with_offsets(PIC_1_OFFSET, PIC_2_OFFSET)
    }

    const fn with_offsets(master_offset: u8, slave_offset: u8) -> Self {
        ChainedPics {
            pics: [
                Pic { offset: master_offset, command_port: PIC1_COMMAND, data_port: PIC1_DATA },
                Pic { offset: slave_offset, command_port: PIC2_COMMAND, data_port: PIC2_DATA },
            ],
            mask: AtomicU16::new(0xFFFF),
        }
    }

    /// Runs the four-word initialization on both chips, then unmasks exactly
    /// `enabled` (plus the cascade line when needed). The chips expect this
    /// order and nothing else.
    pub fn configure(&self, io: &impl PortIo, enabled: IrqLines) {
        let [master, slave] = &self.pics;

        // ICW1: begin initialization
        io.write_u8(master.command_port, ICW1_INIT | ICW1_ICW4);
        io.io_wait();
        io.write_u8(slave.command_port, ICW1_INIT | ICW1_ICW4);
        io.io_wait();

        // ICW2: vector offsets
        io.write_u8(master.data_port, master.offset);
        io.io_wait();
        io.write_u8(slave.data_port, slave.offset);
        io.io_wait();

        // ICW3: slave sits on master IRQ2
        io.write_u8(master.data_port, CASCADE_LINE_MASK);
        io.io_wait();
        io.write_u8(slave.data_port, SLAVE_CASCADE_IDENTITY);
        io.io_wait();

        // ICW4: 8086 mode
        io.write_u8(master.data_port, ICW4_8086);
        io.io_wait();
        io.write_u8(slave.data_port, ICW4_8086);
        io.io_wait();

        let (master_mask, slave_mask) = enabled.masks();
        self.write_masks(io, u16::from_le_bytes([master_mask, slave_mask]));
    }

    pub fn end_of_interrupt(&self, io: &impl PortIo, line: IrqLine) {
        let [master, slave] = &self.pics;
        if line.is_slave() {
            slave.end_of_interrupt(io);
        }
        master.end_of_interrupt(io);
    }

    pub fn vector_for(&self, line: IrqLine) -> Vector {
        let pic = &self.pics[usize::from(line.is_slave())];
        Vector::new(pic.offset + line.0 % LINES_PER_PIC)
    }

    pub fn line_for(&self, vector: Vector) -> Option<IrqLine> {
        self.pics
            .iter()
            .enumerate()
            .find(|(_, pic)| pic.handles_vector(vector))
            .map(|(index, pic)| IrqLine(index as u8 * LINES_PER_PIC + (vector.as_u8() - pic.offset)))
    }

    pub fn handles_vector(&self, vector: Vector) -> bool {
        self.line_for(vector).is_some()
    }

    pub fn enable_line(&self, io: &impl PortIo, line: IrqLine) {
        let mut mask = self.mask.load(Ordering::Relaxed) & !IrqLines::line(line).bits();
        if line.is_slave() {
            mask &= !IrqLines::CASCADE.bits();
        }
        self.write_masks(io, mask);
    }

    pub fn disable_line(&self, io: &impl PortIo, line: IrqLine) {
        let mask = self.mask.load(Ordering::Relaxed) | IrqLines::line(line).bits();
        self.write_masks(io, mask);
    }

    /// Last mask bytes written, (master, slave).
    pub fn masks(&self) -> (u8, u8) {
        let [master, slave] = self.mask.load(Ordering::Relaxed).to_le_bytes();
        (master, slave)
    }

    fn write_masks(&self, io: &impl PortIo, mask: u16) {
        let [master_mask, slave_mask] = mask.to_le_bytes();
        io.write_u8(self.pics[0].data_port, master_mask);
        io.write_u8(self.pics[1].data_port, slave_mask);
        self.mask.store(mask, Ordering::Relaxed);
    }
}
