//! # Input Device Module
//!
//! Where decoded characters go once the keyboard handler lets go of them.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  accept()  ┌──────────────┐   pop()   ┌──────────────┐
//! │   Keyboard   │───────────▶│  InputQueue  │──────────▶│  main loop / │
//! │ (IRQ1 only)  │            │ (SPSC ring)  │           │  line editor │
//! └──────────────┘            └──────────────┘           └──────────────┘
//! ```
//!
//! The handler is the only producer and the main program the only consumer,
//! so head and tail each have exactly one writer and no lock is needed.

use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use crate::arch::Cpu;

/// Receives one decoded character at a time, from interrupt context.
/// Implementations must not block and own their overflow policy.
pub trait KeySink {
    fn accept(&self, character: u8);
}

const BUFFER_SIZE: usize = 256;

pub struct InputQueue {
    buf: [AtomicU8; BUFFER_SIZE],
    head: AtomicUsize,
    tail: AtomicUsize,
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InputQueue {
    pub const fn new() -> Self {
        #[allow(clippy::declare_interior_mutable_const)]
        const EMPTY: AtomicU8 = AtomicU8::new(0);
        InputQueue { buf: [EMPTY; BUFFER_SIZE], head: AtomicUsize::new(0), tail: AtomicUsize::new(0) }
    }

    /// Producer side. Returns `false` and drops `character` when full.
    pub fn push(&self, character: u8) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let next = (head + 1) % BUFFER_SIZE;
        if next == self.tail.load(Ordering::Acquire) {
            return false;
        }
        self.buf[head].store(character, Ordering::Relaxed);
        self.head.store(next, Ordering::Release);
        true
    }

    /// Consumer side.
    pub fn pop(&self) -> Option<u8> {
        let tail = self.tail.load(Ordering::Relaxed);
        if tail == self.head.load(Ordering::Acquire) {
            return None;
        }
        let character = self.buf[tail].load(Ordering::Relaxed);
        self.tail.store((tail + 1) % BUFFER_SIZE, Ordering::Release);
        Some(character)
    }

    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    pub const fn capacity(&self) -> usize {
        BUFFER_SIZE - 1
    }

    /// One idle step for the consumer. The queue is checked with delivery
    /// off; if it is empty the CPU sleeps through `sti; hlt`, so a key that
    /// arrives after the check still ends the sleep. Returns `None` after a
    /// wake-up.
    pub fn pop_or_halt(&self, cpu: &impl Cpu) -> Option<u8> {
        cpu.disable_interrupts();
        match self.pop() {
            Some(character) => {
                cpu.enable_interrupts();
                Some(character)
            }
            None => {
                cpu.enable_interrupts_and_halt();
                None
            }
        }
    }
}

impl KeySink for InputQueue {
    fn accept(&self, character: u8) {
        // full: newest keystroke is lost
        let _ = self.push(character);
    }
}
