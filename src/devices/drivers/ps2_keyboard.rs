//! # PS/2 Keyboard Driver
//!
//! Handles PS/2 keyboard input via the IRQ1 interrupt.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐    IRQ1     ┌──────────────┐    char    ┌──────────┐
//! │  Keyboard   │────────────▶│ ScancodeTable│───────────▶│ KeySink  │
//! │ (Port 0x60) │             │  (set 1, US) │            │          │
//! └─────────────┘             └──────────────┘            └──────────┘
//! ```
//!
//! ## Scancode Processing
//!
//! 1. Status port 0x64 bit 0 says whether a byte is waiting; if not, the
//!    interrupt was spurious and only gets its EOI
//! 2. The scancode is read from port 0x60
//! 3. Bit 7 set means key release: no character
//! 4. Otherwise the make code indexes the translation table; keys with no
//!    character (modifiers, F-keys, arrows) produce nothing
//! 5. EOI on every path

use core::sync::atomic::{AtomicU8, Ordering};

use bitflags::bitflags;

use crate::arch::PortIo;
use crate::core::interrupts::pic::{ChainedPics, IrqLine};
use crate::devices::input::KeySink;

pub const KEYBOARD_DATA_PORT: u16 = 0x60;
pub const KEYBOARD_STATUS_PORT: u16 = 0x64;

const BREAK_BIT: u8 = 0x80;
const MAKE_CODE_MASK: u8 = 0x7F;

bitflags! {
    /// 8042 controller status register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct KeyboardStatus: u8 {
        const OUTPUT_FULL = 1 << 0;
        const INPUT_FULL = 1 << 1;
        const SYSTEM = 1 << 2;
        const COMMAND = 1 << 3;
        const TIMEOUT = 1 << 6;
        const PARITY_ERROR = 1 << 7;
    }
}

/// Make code to character. Zero marks keys that produce no character.
pub struct ScancodeTable([u8; 128]);

impl ScancodeTable {
    /// Total over 0-127; the break bit is stripped before indexing.
    pub const fn lookup(&self, make_code: u8) -> Option<u8> {
        match self.0[(make_code & MAKE_CODE_MASK) as usize] {
            0 => None,
            character => Some(character),
        }
    }
}

/// Scancode set 1, US QWERTY, unshifted.
#[rustfmt::skip]
pub static US_QWERTY: ScancodeTable = ScancodeTable([
    0, 27, b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9', b'0', b'-', b'=', b'\x08', // backspace
    b'\t',
    b'q', b'w', b'e', b'r', b't', b'y', b'u', b'i', b'o', b'p', b'[', b']', b'\n',
    0,                                                      // 0x1D control
    b'a', b's', b'd', b'f', b'g', b'h', b'j', b'k', b'l', b';', b'\'', b'`',
    0,                                                      // 0x2A left shift
    b'\\', b'z', b'x', b'c', b'v', b'b', b'n', b'm', b',', b'.', b'/',
    0,                                                      // 0x36 right shift
    b'*',
    0,                                                      // 0x38 alt
    b' ',
    0,                                                      // 0x3A caps lock
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0,                           // 0x3B-0x44 F1-F10
    0,                                                      // 0x45 num lock
    0,                                                      // 0x46 scroll lock
    0,                                                      // 0x47 home
    0,                                                      // 0x48 up
    0,                                                      // 0x49 page up
    b'-',
    0,                                                      // 0x4B left
    0,
    0,                                                      // 0x4D right
    b'+',
    0,                                                      // 0x4F end
    0,                                                      // 0x50 down
    0,                                                      // 0x51 page down
    0,                                                      // 0x52 insert
    0,                                                      // 0x53 delete
    0, 0, 0,
    0,                                                      // 0x57 F11
    0,                                                      // 0x58 F12
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0,
]);

/// Character for a raw scancode, `None` for releases and unmapped keys.
pub fn decode(scancode: u8) -> Option<u8> {
    if scancode & BREAK_BIT != 0 {
        return None;
    }
    US_QWERTY.lookup(scancode)
}

pub struct Keyboard {
    last: AtomicU8,
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Keyboard {
    pub const fn new() -> Self {
        Keyboard { last: AtomicU8::new(0) }
    }

    /// IRQ1 body. Never blocks on the sink; the EOI goes out on every path.
    pub fn on_interrupt(&self, io: &impl PortIo, pics: &ChainedPics, sink: &impl KeySink) {
        let status = KeyboardStatus::from_bits_retain(io.read_u8(KEYBOARD_STATUS_PORT));
        if status.contains(KeyboardStatus::OUTPUT_FULL) {
            let scancode = io.read_u8(KEYBOARD_DATA_PORT);
            if let Some(character) = decode(scancode) {
                self.last.store(character, Ordering::Relaxed);
                sink.accept(character);
            }
        }
        pics.end_of_interrupt(io, IrqLine::KEYBOARD);
    }

    /// Most recent decoded character, if any key has produced one yet.
    pub fn last_character(&self) -> Option<u8> {
        match self.last.load(Ordering::Relaxed) {
            0 => None,
            character => Some(character),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::interrupts::pic::{PIC1_COMMAND, PIC_EOI};
    use crate::testing::{Event, MockMachine, RecordingSink};

    fn eoi_count(machine: &MockMachine) -> usize {
        machine.writes().iter().filter(|&&write| write == (PIC1_COMMAND, PIC_EOI)).count()
    }

    #[test]
    fn decodes_make_codes() {
        assert_eq!(decode(0x1E), Some(b'a'));
        assert_eq!(decode(0x10), Some(b'q'));
        assert_eq!(decode(0x02), Some(b'1'));
        assert_eq!(decode(0x0B), Some(b'0'));
        assert_eq!(decode(0x1C), Some(b'\n'));
        assert_eq!(decode(0x0E), Some(b'\x08'));
        assert_eq!(decode(0x0F), Some(b'\t'));
        assert_eq!(decode(0x39), Some(b' '));
        assert_eq!(decode(0x01), Some(27));
        assert_eq!(decode(0x2B), Some(b'\\'));
        assert_eq!(decode(0x35), Some(b'/'));
        assert_eq!(decode(0x37), Some(b'*'));
        assert_eq!(decode(0x4A), Some(b'-'));
        assert_eq!(decode(0x4E), Some(b'+'));
    }

    #[test]
    fn releases_produce_nothing() {
        assert_eq!(decode(0x9E), None);
        assert_eq!(decode(0x80 | 0x1C), None);
        assert_eq!(decode(0xFF), None);
    }

    #[test]
    fn unmapped_keys_produce_nothing() {
        for code in [0x00, 0x1D, 0x2A, 0x36, 0x38, 0x3A, 0x3B, 0x44, 0x48, 0x4B, 0x4D, 0x50, 0x57, 0x58, 0x7F] {
            assert_eq!(decode(code), None, "scancode {code:#x}");
        }
    }

    #[test]
    fn lookup_masks_break_bit() {
        assert_eq!(US_QWERTY.lookup(0x9E), Some(b'a'));
    }

    #[test]
    fn key_press_is_forwarded_then_acknowledged() {
        let machine = MockMachine::new();
        machine.queue_read(KEYBOARD_STATUS_PORT, 0x01);
        machine.queue_read(KEYBOARD_DATA_PORT, 0x1E);
        let pics = ChainedPics::remapped();
        let sink = RecordingSink::default();
        let keyboard = Keyboard::new();

        keyboard.on_interrupt(&machine, &pics, &sink);

        assert_eq!(sink.received(), vec![b'a']);
        assert_eq!(keyboard.last_character(), Some(b'a'));
        assert_eq!(
            machine.events(),
            vec![
                Event::PortRead(KEYBOARD_STATUS_PORT, 0x01),
                Event::PortRead(KEYBOARD_DATA_PORT, 0x1E),
                Event::PortWrite(PIC1_COMMAND, PIC_EOI),
            ]
        );
    }

    #[test]
    fn spurious_interrupt_skips_data_port() {
        let machine = MockMachine::new();
        machine.queue_read(KEYBOARD_STATUS_PORT, 0x00);
        let pics = ChainedPics::remapped();
        let sink = RecordingSink::default();
        let keyboard = Keyboard::new();

        keyboard.on_interrupt(&machine, &pics, &sink);

        assert!(sink.received().is_empty());
        assert_eq!(keyboard.last_character(), None);
        assert_eq!(
            machine.events(),
            vec![Event::PortRead(KEYBOARD_STATUS_PORT, 0x00), Event::PortWrite(PIC1_COMMAND, PIC_EOI)]
        );
    }

    #[test]
    fn release_and_modifier_are_acknowledged_without_output() {
        let machine = MockMachine::new();
        let pics = ChainedPics::remapped();
        let sink = RecordingSink::default();
        let keyboard = Keyboard::new();

        for scancode in [0x9E, 0x2A, 0xAA] {
            machine.queue_read(KEYBOARD_STATUS_PORT, 0x01);
            machine.queue_read(KEYBOARD_DATA_PORT, scancode);
            keyboard.on_interrupt(&machine, &pics, &sink);
        }

        assert!(sink.received().is_empty());
        assert_eq!(eoi_count(&machine), 3);
    }

    #[test]
    fn one_eoi_per_interrupt_on_every_path() {
        let machine = MockMachine::new();
        let pics = ChainedPics::remapped();
        let sink = RecordingSink::default();
        let keyboard = Keyboard::new();

        // press h, release h, spurious, press i, shift
        let script: [(u8, Option<u8>); 5] =
            [(0x01, Some(0x23)), (0x01, Some(0xA3)), (0x00, None), (0x01, Some(0x17)), (0x01, Some(0x2A))];
        for (n, (status, data)) in script.into_iter().enumerate() {
            machine.queue_read(KEYBOARD_STATUS_PORT, status);
            if let Some(data) = data {
                machine.queue_read(KEYBOARD_DATA_PORT, data);
            }
            keyboard.on_interrupt(&machine, &pics, &sink);
            assert_eq!(eoi_count(&machine), n + 1);
        }

        assert_eq!(sink.received(), b"hi".to_vec());
        assert_eq!(keyboard.last_character(), Some(b'i'));
    }
}
