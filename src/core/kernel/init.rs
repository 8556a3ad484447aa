/// Kernel initialization phases
use core::fmt;

use spin::Once;

use crate::arch::{Cpu, PortIo};
use crate::config::BootConfig;
use crate::core::interrupts::pic::IrqLines;
use crate::core::interrupts::timer::{Divisor, TimerError};
use crate::core::interrupts::{EntryPoints, InterruptSystem};
use crate::core::kernel::status::{update_component_status, InitStatus};
use crate::devices::input::KeySink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    AlreadyInitialized,
    /// An entry stub address that cannot be placed in a gate.
    EntryAddress(usize),
    Timer(TimerError),
}

impl BootError {
    pub const fn as_str(&self) -> &'static str {
        match self {
            BootError::AlreadyInitialized => "interrupt system already initialized",
            BootError::EntryAddress(_) => "entry stub outside 32-bit address space",
            BootError::Timer(err) => err.as_str(),
        }
    }
}

impl From<TimerError> for BootError {
    fn from(err: TimerError) -> Self {
        BootError::Timer(err)
    }
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootError::Timer(err) => write!(f, "{}", err),
            BootError::EntryAddress(address) => write!(f, "{} ({:#x})", self.as_str(), address),
            BootError::AlreadyInitialized => f.write_str(self.as_str()),
        }
    }
}

/// Brings interrupts up. This is the only way to build and load the gate
/// table, and it always runs the same order:
///
/// 1. reject a bad timer rate before any hardware is touched
/// 2. install the timer and keyboard gates and handlers
/// 3. move the system into `slot`, where it stays for good
/// 4. `lidt`
/// 5. remap the PICs, unmasking IRQ0 and IRQ1 only
/// 6. program the PIT
/// 7. `sti`
///
/// A second call leaves the hardware alone and fails.
pub fn init_interrupts<H, S>(
    slot: &'static Once<InterruptSystem<H, S>>,
    hardware: H,
    sink: S,
    config: BootConfig,
    entries: EntryPoints,
) -> Result<&'static InterruptSystem<H, S>, BootError>
where
    H: PortIo + Cpu + 'static,
    S: KeySink + 'static,
{
    let divisor = Divisor::for_frequency(config.timer_frequency_hz)?;

    let mut fresh = false;
    let system = slot.call_once(|| {
        fresh = true;
        let mut system = InterruptSystem::new(hardware, sink, config);
        system.install_device_handlers(entries);
        system
    });
    if !fresh {
        return Err(BootError::AlreadyInitialized);
    }
    let hw = system.hardware();

    let table = system.gates().activate(hw);
    log_info!("IDT loaded at {:#010x}, limit {}", { table.base }, { table.limit });

    let enabled = IrqLines::TIMER | IrqLines::KEYBOARD;
    system.pics().configure(hw, enabled);
    let (master, slave) = system.pics().masks();
    log_info!("PIC remapped, masks {:#04x}/{:#04x}", master, slave);

    system.timer().program(hw, divisor);
    log_info!("PIT initialized at {} Hz (divisor {})", system.timer().frequency(), divisor.value());

    hw.enable_interrupts();
    log_info!("Interrupts enabled");

    Ok(system)
}

/// Runs one boot phase, logging it and tracking its status.
pub fn init_phase<T>(name: &'static str, init_fn: impl FnOnce() -> Result<T, BootError>) -> Result<T, BootError> {
    update_component_status(name, InitStatus::InProgress);
    println!("Initializing {}...", name);

    match init_fn() {
        Ok(value) => {
            update_component_status(name, InitStatus::Completed);
            println!("    ✓ {} initialized successfully", name);
            Ok(value)
        }
        Err(e) => {
            update_component_status(name, InitStatus::Failed(e.as_str()));
            println!("    ✗ {} failed: {}", name, e);
            Err(e)
        }
    }
}
