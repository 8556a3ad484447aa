//! Recording stand-ins for the machine, used by unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use crate::arch::{Cpu, PortIo, IO_WAIT_PORT};
use crate::core::interrupts::idt::{HandlerAddress, TableDescriptor};
use crate::core::interrupts::EntryPoints;
use crate::devices::input::KeySink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    PortRead(u16, u8),
    PortWrite(u16, u8),
    LoadTable(TableDescriptor),
    EnableInterrupts,
    DisableInterrupts,
    Halt,
}

/// Logs every port access and CPU instruction in order. Reads are served
/// from per-port queues and return 0 once a queue runs dry.
#[derive(Default)]
pub struct MockMachine {
    events: RefCell<Vec<Event>>,
    reads: RefCell<HashMap<u16, VecDeque<u8>>>,
}

impl MockMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_read(&self, port: u16, value: u8) {
        self.reads.borrow_mut().entry(port).or_default().push_back(value);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn writes(&self) -> Vec<(u16, u8)> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match *event {
                Event::PortWrite(port, value) => Some((port, value)),
                _ => None,
            })
            .collect()
    }

    pub fn writes_excluding_wait(&self) -> Vec<(u16, u8)> {
        self.writes().into_iter().filter(|&(port, _)| port != IO_WAIT_PORT).collect()
    }

    pub fn writes_to(&self, port: u16) -> Vec<u8> {
        self.writes().into_iter().filter(|&(p, _)| p == port).map(|(_, value)| value).collect()
    }

    fn record(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }
}

impl PortIo for MockMachine {
    fn read_u8(&self, port: u16) -> u8 {
        let value = self.reads.borrow_mut().get_mut(&port).and_then(VecDeque::pop_front).unwrap_or(0);
        self.record(Event::PortRead(port, value));
        value
    }

    fn write_u8(&self, port: u16, value: u8) {
        self.record(Event::PortWrite(port, value));
    }
}

impl Cpu for MockMachine {
    unsafe fn load_interrupt_table(&self, descriptor: &TableDescriptor) {
        self.record(Event::LoadTable(*descriptor));
    }

    fn enable_interrupts(&self) {
        self.record(Event::EnableInterrupts);
    }

    fn disable_interrupts(&self) {
        self.record(Event::DisableInterrupts);
    }

    fn halt(&self) {
        self.record(Event::Halt);
    }

    fn enable_interrupts_and_halt(&self) {
        self.record(Event::EnableInterrupts);
        self.record(Event::Halt);
    }
}

#[derive(Default)]
pub struct RecordingSink {
    received: RefCell<Vec<u8>>,
}

impl RecordingSink {
    pub fn received(&self) -> Vec<u8> {
        self.received.borrow().clone()
    }
}

impl KeySink for RecordingSink {
    fn accept(&self, character: u8) {
        self.received.borrow_mut().push(character);
    }
}

pub fn entry_points() -> EntryPoints {
    EntryPoints {
        timer: HandlerAddress::new(0x0010_1200).expect("non-zero"),
        keyboard: HandlerAddress::new(0x0010_1280).expect("non-zero"),
    }
}
