//! # Interrupt Descriptor Table
//!
//! The 256-entry gate table the CPU consults on every interrupt, the 6-byte
//! descriptor `lidt` loads, and the dispatch table that records which Rust
//! handler each installed vector runs.
//!
//! ## Gate Layout (8 bytes, protected mode)
//!
//! | Offset | Size | Field                      |
//! |--------|------|----------------------------|
//! | 0      | 2    | handler address bits 0-15  |
//! | 2      | 2    | code segment selector      |
//! | 4      | 1    | reserved, always zero      |
//! | 5      | 1    | flags (P, DPL, type)       |
//! | 6      | 2    | handler address bits 16-31 |
//!
//! Vectors 0-31 belong to CPU exceptions and are left empty here.

use core::mem::size_of;
use core::num::NonZeroU32;

use bitflags::bitflags;
use x86_64::structures::gdt::SegmentSelector;
use x86_64::PrivilegeLevel;

use crate::arch::Cpu;

pub const GATE_COUNT: usize = 256;
pub const GATE_SIZE: usize = size_of::<GateDescriptor>();
pub const TABLE_LIMIT: u16 = (GATE_SIZE * GATE_COUNT - 1) as u16;

const _: () = assert!(GATE_SIZE == 8);
const _: () = assert!(size_of::<TableDescriptor>() == 6);

/// An interrupt vector. Every `u8` is a valid vector, so no bounds check is
/// ever needed when indexing the tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Vector(u8);

impl Vector {
    /// First vector not claimed by CPU exceptions.
    pub const FIRST_AVAILABLE: Vector = Vector(32);

    pub const fn new(vector: u8) -> Self {
        Vector(vector)
    }

    pub const fn as_u8(self) -> u8 {
        self.0
    }

    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    pub const fn is_reserved(self) -> bool {
        self.0 < Self::FIRST_AVAILABLE.0
    }
}

impl From<u8> for Vector {
    fn from(vector: u8) -> Self {
        Vector(vector)
    }
}

/// Linear address of an entry stub. Zero is not representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct HandlerAddress(NonZeroU32);

impl HandlerAddress {
    pub const fn new(address: u32) -> Option<Self> {
        match NonZeroU32::new(address) {
            Some(address) => Some(HandlerAddress(address)),
            None => None,
        }
    }

    /// Fails for null and for anything above 4 GiB.
    pub fn from_usize(address: usize) -> Option<Self> {
        u32::try_from(address).ok().and_then(Self::new)
    }

    pub const fn as_u32(self) -> u32 {
        self.0.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GateType {
    Task32 = 0x5,
    Interrupt16 = 0x6,
    Trap16 = 0x7,
    Interrupt32 = 0xE,
    Trap32 = 0xF,
}

impl GateType {
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits & 0x0F {
            0x5 => Some(GateType::Task32),
            0x6 => Some(GateType::Interrupt16),
            0x7 => Some(GateType::Trap16),
            0xE => Some(GateType::Interrupt32),
            0xF => Some(GateType::Trap32),
            _ => None,
        }
    }
}

bitflags! {
    /// Byte 5 of a gate: bit 7 present, bits 6-5 DPL, bits 3-0 gate type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GateFlags: u8 {
        const PRESENT = 1 << 7;
        const DPL = 0b11 << 5;
        const TYPE = 0x0F;
    }
}

impl GateFlags {
    /// Present, ring 0, 32-bit interrupt gate (0x8E). Delivery of further
    /// interrupts is held off until the handler returns.
    pub const KERNEL_INTERRUPT: GateFlags = GateFlags::gate(GateType::Interrupt32, PrivilegeLevel::Ring0);

    pub const fn gate(kind: GateType, dpl: PrivilegeLevel) -> Self {
        GateFlags::from_bits_retain(GateFlags::PRESENT.bits() | ((dpl as u8) << 5) | kind as u8)
    }

    pub fn privilege_level(self) -> PrivilegeLevel {
        PrivilegeLevel::from_u16(u16::from((self.bits() & GateFlags::DPL.bits()) >> 5))
    }

    pub fn gate_type(self) -> Option<GateType> {
        GateType::from_bits(self.bits())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C)]
pub struct GateDescriptor {
    offset_low: u16,
    selector: u16,
    reserved: u8,
    flags: u8,
    offset_high: u16,
}

impl GateDescriptor {
    pub const MISSING: GateDescriptor = GateDescriptor {
        offset_low: 0,
        selector: 0,
        reserved: 0,
        flags: 0,
        offset_high: 0,
    };

    pub const fn new(handler: HandlerAddress, selector: SegmentSelector, flags: GateFlags) -> Self {
        let address = handler.as_u32();
        GateDescriptor {
            offset_low: (address & 0xFFFF) as u16,
            selector: selector.0,
            reserved: 0,
            flags: flags.bits(),
            offset_high: ((address >> 16) & 0xFFFF) as u16,
        }
    }

    pub const fn offset_low(&self) -> u16 {
        self.offset_low
    }

    pub const fn offset_high(&self) -> u16 {
        self.offset_high
    }

    pub const fn handler_address(&self) -> u32 {
        ((self.offset_high as u32) << 16) | self.offset_low as u32
    }

    pub const fn selector(&self) -> SegmentSelector {
        SegmentSelector(self.selector)
    }

    pub const fn flags(&self) -> GateFlags {
        GateFlags::from_bits_retain(self.flags)
    }

    pub const fn is_present(&self) -> bool {
        self.flags & GateFlags::PRESENT.bits() != 0
    }

    /// The entry exactly as the CPU reads it from memory.
    pub fn to_bytes(&self) -> [u8; GATE_SIZE] {
        let mut bytes = [0u8; GATE_SIZE];
        bytes[0..2].copy_from_slice(&self.offset_low.to_le_bytes());
        bytes[2..4].copy_from_slice(&self.selector.to_le_bytes());
        bytes[4] = self.reserved;
        bytes[5] = self.flags;
        bytes[6..8].copy_from_slice(&self.offset_high.to_le_bytes());
        bytes
    }
}

/// Operand of `lidt`: byte length minus one, then the table's base address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C, packed(2))]
pub struct TableDescriptor {
    pub limit: u16,
    pub base: u32,
}

impl TableDescriptor {
    pub const fn new(base: u32) -> Self {
        TableDescriptor { limit: TABLE_LIMIT, base }
    }

    pub fn to_bytes(&self) -> [u8; 6] {
        let (limit, base) = (self.limit, self.base);
        let mut bytes = [0u8; 6];
        bytes[0..2].copy_from_slice(&limit.to_le_bytes());
        bytes[2..6].copy_from_slice(&base.to_le_bytes());
        bytes
    }
}

#[derive(Clone)]
#[repr(C, align(8))]
pub struct GateTable {
    entries: [GateDescriptor; GATE_COUNT],
}

impl Default for GateTable {
    fn default() -> Self {
        Self::new()
    }
}

impl GateTable {
    /// A table with every gate not-present. An all-zero table is the only
    /// safe starting point: a stray present bit would send the CPU into
    /// garbage.
    pub const fn new() -> Self {
        GateTable { entries: [GateDescriptor::MISSING; GATE_COUNT] }
    }

    /// Overwrites whatever was at `vector`.
    pub fn install(&mut self, vector: Vector, handler: HandlerAddress, selector: SegmentSelector, flags: GateFlags) {
        self.entries[vector.as_usize()] = GateDescriptor::new(handler, selector, flags);
    }

    pub fn entry(&self, vector: Vector) -> &GateDescriptor {
        &self.entries[vector.as_usize()]
    }

    pub fn installed(&self) -> impl Iterator<Item = (Vector, &GateDescriptor)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, gate)| gate.is_present())
            .map(|(vector, gate)| (Vector(vector as u8), gate))
    }

    pub fn descriptor(&self) -> TableDescriptor {
        TableDescriptor::new(self.entries.as_ptr() as usize as u32)
    }

    /// Loads this table into the CPU. The `'static` borrow keeps the table
    /// in place and unmodified for as long as the CPU may read it.
    pub fn activate(&'static self, cpu: &impl Cpu) -> TableDescriptor {
        let descriptor = self.descriptor();
        unsafe { cpu.load_interrupt_table(&descriptor) };
        descriptor
    }
}

/// Which Rust function runs for each vector. Filled in by the same call that
/// writes the gate, so gate and handler never disagree.
pub struct DispatchTable<F: Copy> {
    slots: [Option<F>; GATE_COUNT],
}

impl<F: Copy> Default for DispatchTable<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Copy> DispatchTable<F> {
    pub fn new() -> Self {
        DispatchTable { slots: [None; GATE_COUNT] }
    }

    pub fn set(&mut self, vector: Vector, handler: F) {
        self.slots[vector.as_usize()] = Some(handler);
    }

    pub fn get(&self, vector: Vector) -> Option<F> {
        self.slots[vector.as_usize()]
    }
}
