#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io::{Error, ErrorKind};
use std::rc::Rc;

use turnbus::arbiter::{Arbiter, ArbiterConfig, SlotTiming};
use turnbus::frame;
use turnbus::{Address, Clock, Direction, Transport};

/// Round numbers make the slot arithmetic in the tests easy to follow.
pub const TIMING: SlotTiming = SlotTiming {
    cycle_us: 1000,
    symbol_us: 10,
};

pub type SimArbiter = Arbiter<BusInterface, SimClock>;

/// Shared microsecond counter, advanced by hand.
#[derive(Clone, Default)]
pub struct SimClock(Rc<Cell<u32>>);

impl SimClock {
    pub fn new() -> SimClock {
        Default::default()
    }

    pub fn set(&self, now: u32) {
        self.0.set(now);
    }

    pub fn advance(&self, us: u32) {
        self.0.set(self.0.get().wrapping_add(us));
    }

    pub fn now(&self) -> u32 {
        self.0.get()
    }
}

impl Clock for SimClock {
    fn now_micros(&mut self) -> u32 {
        self.0.get()
    }
}

#[derive(Default)]
struct Node {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    directions: Vec<Direction>,
}

/// Multi-drop bus where every byte written by one interface shows up in the
/// receive queue of all the others.
#[derive(Clone, Default)]
pub struct SimBus {
    nodes: Rc<RefCell<Vec<Node>>>,
}

impl SimBus {
    pub fn new() -> SimBus {
        Default::default()
    }

    pub fn new_interface(&self) -> BusInterface {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(Node::default());
        BusInterface {
            bus: self.clone(),
            id: nodes.len() - 1,
            do_write_error: Rc::new(Cell::new(false)),
        }
    }

    fn broadcast(&self, from: usize, data: &[u8]) {
        let mut nodes = self.nodes.borrow_mut();
        nodes[from].tx.extend_from_slice(data);
        for (id, node) in nodes.iter_mut().enumerate() {
            if id != from {
                node.rx.extend(data);
            }
        }
    }
}

#[derive(Clone)]
pub struct BusInterface {
    bus: SimBus,
    id: usize,
    pub do_write_error: Rc<Cell<bool>>,
}

impl BusInterface {
    /// Queue bytes as if a peer had sent them.
    pub fn inject(&self, data: &[u8]) {
        self.bus.nodes.borrow_mut()[self.id].rx.extend(data);
    }

    pub fn pending(&self) -> usize {
        self.bus.nodes.borrow()[self.id].rx.len()
    }

    /// Everything this interface has written so far.
    pub fn sent(&self) -> Vec<u8> {
        self.bus.nodes.borrow()[self.id].tx.clone()
    }

    pub fn directions(&self) -> Vec<Direction> {
        self.bus.nodes.borrow()[self.id].directions.clone()
    }

    pub fn direction(&self) -> Option<Direction> {
        self.bus.nodes.borrow()[self.id].directions.last().copied()
    }
}

impl Transport for BusInterface {
    type Error = Error;

    fn read_byte(&mut self) -> Option<u8> {
        self.bus.nodes.borrow_mut()[self.id].rx.pop_front()
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), Error> {
        if self.do_write_error.replace(false) {
            return Err(Error::new(ErrorKind::BrokenPipe, "simulated write error"));
        }
        if self.direction() != Some(Direction::Transmit) {
            return Err(Error::new(ErrorKind::Other, "write while in receive mode"));
        }
        self.bus.broadcast(self.id, data);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn set_direction(&mut self, direction: Direction) {
        self.bus.nodes.borrow_mut()[self.id].directions.push(direction);
    }
}

pub fn framed(payload: &[u8]) -> Vec<u8> {
    frame::encode(payload).expect("payload can be framed").to_vec()
}

pub fn config(address: Address) -> ArbiterConfig {
    ArbiterConfig::new(address).with_timing(TIMING)
}

pub fn new_arbiter(bus: &SimBus, clock: &SimClock, address: Address) -> (SimArbiter, BusInterface) {
    new_arbiter_with(bus, clock, config(address))
}

pub fn new_arbiter_with(
    bus: &SimBus,
    clock: &SimClock,
    config: ArbiterConfig,
) -> (SimArbiter, BusInterface) {
    let io = bus.new_interface();
    (Arbiter::new(io.clone(), clock.clone(), config), io)
}

/// Poll until the receive queue is empty, returning the decoded messages.
pub fn drain(arbiter: &mut SimArbiter, io: &BusInterface) -> Vec<turnbus::Message> {
    let mut messages = Vec::new();
    while io.pending() > 0 {
        messages.extend(arbiter.recv());
    }
    messages
}
