//! Boot-time settings for the interrupt system.

use x86_64::structures::gdt::SegmentSelector;
use x86_64::PrivilegeLevel;

use crate::core::interrupts::idt::GateFlags;
use crate::core::interrupts::timer::PIT_DEFAULT_FREQUENCY_HZ;

/// Flat ring-0 code segment, GDT slot 1 (0x08). The boot stub loads it.
pub const KERNEL_CODE_SELECTOR: SegmentSelector = SegmentSelector::new(1, PrivilegeLevel::Ring0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootConfig {
    pub timer_frequency_hz: u32,
    pub code_selector: SegmentSelector,
    pub gate_flags: GateFlags,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl BootConfig {
    pub const DEFAULT: BootConfig = BootConfig {
        timer_frequency_hz: PIT_DEFAULT_FREQUENCY_HZ, // 10 ms per tick
        code_selector: KERNEL_CODE_SELECTOR,
        gate_flags: GateFlags::KERNEL_INTERRUPT,
    };

    pub const fn with_timer_frequency(mut self, frequency_hz: u32) -> Self {
        self.timer_frequency_hz = frequency_hz;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protected_mode_setup() {
        let config = BootConfig::default();
        assert_eq!(config.timer_frequency_hz, 100);
        assert_eq!(config.code_selector.0, 0x08);
        assert_eq!(config.gate_flags.bits(), 0x8E);
    }

    #[test]
    fn frequency_override_keeps_the_rest() {
        let config = BootConfig::DEFAULT.with_timer_frequency(250);
        assert_eq!(config.timer_frequency_hz, 250);
        assert_eq!(config.code_selector, KERNEL_CODE_SELECTOR);
    }
}
