//! # Interrupt Handling Module
//!
//! Provides interrupt infrastructure for the kernel including:
//!
//! - **IDT**: the gate table and the per-vector dispatch table
//! - **PIC**: 8259 remapping, line masks and EOI
//! - **Timer**: PIT programming and the tick counter
//!
//! All of it lives in one [`InterruptSystem`], built once at boot and never
//! moved afterwards.
//!
//! ## Interrupt Vector Layout
//!
//! | Vector | Type                   | Handler                    |
//! |--------|------------------------|----------------------------|
//! | 0-31   | CPU Exceptions         | none installed             |
//! | 32     | Timer (IRQ0)           | timer_interrupt            |
//! | 33     | Keyboard (IRQ1)        | keyboard_interrupt         |
//!
//! ## Entry Path
//!
//! ```text
//! CPU ──▶ gate[V] ──▶ entry stub (saves context) ──▶ dispatch(V)
//!                                                      │
//!                                 handlers[V](system) ◀┘ ──▶ EOI
//! ```

use x86_64::structures::gdt::SegmentSelector;

use self::idt::{DispatchTable, GateFlags, GateTable, HandlerAddress, Vector};
use self::pic::{ChainedPics, IrqLine, PIC_1_OFFSET};
use self::timer::Timer;
use crate::arch::{Cpu, PortIo};
use crate::config::BootConfig;
use crate::devices::drivers::ps2_keyboard::Keyboard;
use crate::devices::input::KeySink;

pub mod idt;
pub mod pic;
pub mod timer;

// Interrupt indices - these are the actual vector numbers the CPU sees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InterruptIndex {
    Timer = PIC_1_OFFSET,        // 32 - IRQ0
    Keyboard = PIC_1_OFFSET + 1, // 33 - IRQ1
}

impl InterruptIndex {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn as_usize(self) -> usize {
        usize::from(self.as_u8())
    }

    pub fn vector(self) -> Vector {
        Vector::new(self.as_u8())
    }

    pub fn line(self) -> IrqLine {
        match self {
            InterruptIndex::Timer => IrqLine::TIMER,
            InterruptIndex::Keyboard => IrqLine::KEYBOARD,
        }
    }
}

/// Addresses of the raw entry stubs for each device vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPoints {
    pub timer: HandlerAddress,
    pub keyboard: HandlerAddress,
}

pub type Handler<H, S> = fn(&InterruptSystem<H, S>);

/// The single owner of the gate table, the controllers and both interrupt
/// sources. Handlers get `&self` only; every field they touch is either
/// read-only after boot or an atomic with the handler as sole writer.
pub struct InterruptSystem<H, S> {
    gates: GateTable,
    handlers: DispatchTable<Handler<H, S>>,
    pics: ChainedPics,
    timer: Timer,
    keyboard: Keyboard,
    hardware: H,
    sink: S,
    config: BootConfig,
}

impl<H: PortIo + Cpu, S: KeySink> InterruptSystem<H, S> {
    pub fn new(hardware: H, sink: S, config: BootConfig) -> Self {
        InterruptSystem {
            gates: GateTable::new(),
            handlers: DispatchTable::new(),
            pics: ChainedPics::remapped(),
            timer: Timer::new(),
            keyboard: Keyboard::new(),
            hardware,
            sink,
            config,
        }
    }

    /// Writes the gate for `vector` and records `handler` as what
    /// [`InterruptSystem::dispatch`] runs for it.
    pub fn install(&mut self, vector: Vector, entry: HandlerAddress, handler: Handler<H, S>) {
        self.install_with(vector, entry, self.config.code_selector, self.config.gate_flags, handler);
    }

    pub fn install_with(
        &mut self,
        vector: Vector,
        entry: HandlerAddress,
        selector: SegmentSelector,
        flags: GateFlags,
        handler: Handler<H, S>,
    ) {
        self.gates.install(vector, entry, selector, flags);
        self.handlers.set(vector, handler);
    }

    /// Wires the timer and keyboard stubs to their vectors.
    pub fn install_device_handlers(&mut self, entries: EntryPoints) {
        self.install(InterruptIndex::Timer.vector(), entries.timer, timer_interrupt::<H, S>);
        self.install(InterruptIndex::Keyboard.vector(), entries.keyboard, keyboard_interrupt::<H, S>);
    }

    /// Called by an entry stub with its own vector number. Returns `false`
    /// if nothing is installed there.
    pub fn dispatch(&self, vector: Vector) -> bool {
        match self.handlers.get(vector) {
            Some(handler) => {
                handler(self);
                true
            }
            None => false,
        }
    }

    pub fn ticks(&self) -> u32 {
        self.timer.ticks()
    }

    pub fn gates(&self) -> &GateTable {
        &self.gates
    }

    pub fn pics(&self) -> &ChainedPics {
        &self.pics
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn keyboard(&self) -> &Keyboard {
        &self.keyboard
    }

    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn config(&self) -> &BootConfig {
        &self.config
    }
}

fn timer_interrupt<H: PortIo + Cpu, S: KeySink>(system: &InterruptSystem<H, S>) {
    system.timer.on_interrupt(&system.hardware, &system.pics);
}

fn keyboard_interrupt<H: PortIo + Cpu, S: KeySink>(system: &InterruptSystem<H, S>) {
    system.keyboard.on_interrupt(&system.hardware, &system.pics, &system.sink);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::interrupts::pic::{PIC1_COMMAND, PIC_EOI};
    use crate::devices::drivers::ps2_keyboard::{KEYBOARD_DATA_PORT, KEYBOARD_STATUS_PORT};
    use crate::testing::{entry_points, MockMachine, RecordingSink};

    fn system() -> InterruptSystem<MockMachine, RecordingSink> {
        let mut system = InterruptSystem::new(MockMachine::new(), RecordingSink::default(), BootConfig::DEFAULT);
        system.install_device_handlers(entry_points());
        system
    }

    #[test]
    fn device_vectors_follow_master_offset() {
        assert_eq!(InterruptIndex::Timer.as_u8(), 32);
        assert_eq!(InterruptIndex::Keyboard.as_u8(), 33);
        let pics = ChainedPics::remapped();
        for index in [InterruptIndex::Timer, InterruptIndex::Keyboard] {
            assert_eq!(pics.vector_for(index.line()), index.vector());
        }
    }

    #[test]
    fn install_writes_gate_and_handler_together() {
        let system = system();
        let entries = entry_points();

        let timer_gate = system.gates().entry(InterruptIndex::Timer.vector());
        assert_eq!(timer_gate.handler_address(), entries.timer.as_u32());
        assert_eq!(timer_gate.selector(), BootConfig::DEFAULT.code_selector);
        assert_eq!(timer_gate.flags(), GateFlags::KERNEL_INTERRUPT);

        let keyboard_gate = system.gates().entry(InterruptIndex::Keyboard.vector());
        assert_eq!(keyboard_gate.handler_address(), entries.keyboard.as_u32());

        assert_eq!(system.gates().installed().count(), 2);
    }

    #[test]
    fn reinstall_replaces_gate_and_handler() {
        let mut system = system();
        let replacement = HandlerAddress::new(0x0010_1300).expect("non-zero");

        system.install(InterruptIndex::Timer.vector(), replacement, keyboard_interrupt::<MockMachine, RecordingSink>);
        system.hardware().queue_read(KEYBOARD_STATUS_PORT, 0x01);
        system.hardware().queue_read(KEYBOARD_DATA_PORT, 0x30);

        assert!(system.dispatch(InterruptIndex::Timer.vector()));

        assert_eq!(system.gates().entry(InterruptIndex::Timer.vector()).handler_address(), 0x0010_1300);
        assert_eq!(system.gates().installed().count(), 2);
        assert_eq!(system.ticks(), 0);
        assert_eq!(system.sink().received(), vec![b'b']);
    }

    #[test]
    fn timer_vector_only_ticks() {
        let system = system();

        for _ in 0..3 {
            assert!(system.dispatch(InterruptIndex::Timer.vector()));
        }

        assert_eq!(system.ticks(), 3);
        assert_eq!(system.hardware().writes(), vec![(PIC1_COMMAND, PIC_EOI); 3]);
        assert!(system.sink().received().is_empty());
    }

    #[test]
    fn keyboard_vector_never_ticks() {
        let system = system();
        system.hardware().queue_read(KEYBOARD_STATUS_PORT, 0x01);
        system.hardware().queue_read(KEYBOARD_DATA_PORT, 0x1E);

        assert!(system.dispatch(InterruptIndex::Keyboard.vector()));

        assert_eq!(system.ticks(), 0);
        assert_eq!(system.sink().received(), vec![b'a']);
        assert_eq!(system.hardware().writes(), vec![(PIC1_COMMAND, PIC_EOI)]);
    }

    #[test]
    fn empty_vector_does_nothing() {
        let system = system();

        assert!(!system.dispatch(Vector::new(34)));
        assert!(!system.dispatch(Vector::new(0)));

        assert!(system.hardware().events().is_empty());
    }

    #[test]
    fn mixed_delivery_counts_only_timer_interrupts() {
        let system = system();
        let mut delivered_timer = 0;
        for n in 0..20u32 {
            if n % 3 == 0 {
                system.hardware().queue_read(KEYBOARD_STATUS_PORT, 0x00);
                system.dispatch(InterruptIndex::Keyboard.vector());
            } else {
                system.dispatch(InterruptIndex::Timer.vector());
                delivered_timer += 1;
            }
        }

        assert_eq!(system.ticks(), delivered_timer);
        assert_eq!(system.hardware().writes().len(), 20);
    }
}
