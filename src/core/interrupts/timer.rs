//! # System Timer (8253/8254 PIT)
//!
//! Channel 0 of the PIT drives IRQ0 as a square wave. The tick counter is
//! written only by the IRQ0 handler and read by anyone.

use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

use super::pic::{ChainedPics, IrqLine};
use crate::arch::PortIo;

/// Oscillator feeding the PIT counters, in Hz.
pub const PIT_BASE_FREQUENCY_HZ: u32 = 1_193_180;
pub const PIT_DEFAULT_FREQUENCY_HZ: u32 = 100;

const PIT_CHANNEL0_PORT: u16 = 0x40;
const PIT_COMMAND_PORT: u16 = 0x43;

const PIT_COMMAND_CHANNEL0: u8 = 0x00;
const PIT_COMMAND_ACCESS_LOHI: u8 = 0x30;
const PIT_COMMAND_MODE_SQUARE: u8 = 0x06;
const PIT_COMMAND_BINARY: u8 = 0x00;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    ZeroFrequency,
    /// Faster than the oscillator itself.
    AboveBaseClock(u32),
    /// Slow enough that the divisor no longer fits the 16-bit counter.
    BelowMinimum(u32),
}

impl TimerError {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TimerError::ZeroFrequency => "timer frequency is zero",
            TimerError::AboveBaseClock(_) => "timer frequency above PIT base clock",
            TimerError::BelowMinimum(_) => "timer frequency too low for 16-bit divisor",
        }
    }
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerError::ZeroFrequency => write!(f, "{}", self.as_str()),
            TimerError::AboveBaseClock(hz) | TimerError::BelowMinimum(hz) => {
                write!(f, "{} ({} Hz)", self.as_str(), hz)
            }
        }
    }
}

/// Reload value for channel 0. Integer division, so the programmed rate is
/// only as close to the request as the truncation allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Divisor(u16);

impl Divisor {
    pub fn for_frequency(frequency_hz: u32) -> Result<Self, TimerError> {
        if frequency_hz == 0 {
            return Err(TimerError::ZeroFrequency);
        }
        if frequency_hz > PIT_BASE_FREQUENCY_HZ {
            return Err(TimerError::AboveBaseClock(frequency_hz));
        }
        u16::try_from(PIT_BASE_FREQUENCY_HZ / frequency_hz)
            .map(Divisor)
            .map_err(|_| TimerError::BelowMinimum(frequency_hz))
    }

    pub const fn value(self) -> u16 {
        self.0
    }

    pub const fn low_byte(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    pub const fn high_byte(self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    /// The rate the chip will really produce.
    pub const fn actual_frequency(self) -> u32 {
        PIT_BASE_FREQUENCY_HZ / self.0 as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uptime {
    pub minutes: u32,
    pub seconds: u32,
}

impl fmt::Display for Uptime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m {}s", self.minutes, self.seconds)
    }
}

pub struct Timer {
    ticks: AtomicU32,
    frequency_hz: AtomicU32,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    pub const fn new() -> Self {
        Timer { ticks: AtomicU32::new(0), frequency_hz: AtomicU32::new(0) }
    }

    /// Validates `frequency_hz` and programs channel 0. A rejected rate never
    /// reaches the chip.
    pub fn start(&self, io: &impl PortIo, frequency_hz: u32) -> Result<Divisor, TimerError> {
        let divisor = Divisor::for_frequency(frequency_hz)?;
        self.program(io, divisor);
        Ok(divisor)
    }

    pub fn program(&self, io: &impl PortIo, divisor: Divisor) {
        io.write_u8(
            PIT_COMMAND_PORT,
            PIT_COMMAND_CHANNEL0 | PIT_COMMAND_ACCESS_LOHI | PIT_COMMAND_MODE_SQUARE | PIT_COMMAND_BINARY,
        );
        io.write_u8(PIT_CHANNEL0_PORT, divisor.low_byte());
        io.write_u8(PIT_CHANNEL0_PORT, divisor.high_byte());
        self.frequency_hz.store(divisor.actual_frequency(), Ordering::Relaxed);
    }

    /// IRQ0 body: one increment, then EOI. Nothing else belongs here.
    pub fn on_interrupt(&self, io: &impl PortIo, pics: &ChainedPics) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        pics.end_of_interrupt(io, IrqLine::TIMER);
    }

    /// Wraps silently at `u32::MAX`.
    pub fn ticks(&self) -> u32 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Programmed rate, or 0 before [`Timer::start`].
    pub fn frequency(&self) -> u32 {
        self.frequency_hz.load(Ordering::Relaxed)
    }

    pub fn uptime(&self) -> Uptime {
        let seconds = match self.frequency() {
            0 => 0,
            hz => self.ticks() / hz,
        };
        Uptime { minutes: seconds / 60, seconds: seconds % 60 }
    }
}
