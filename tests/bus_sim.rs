mod common;

use common::{config, drain, new_arbiter_with, BusInterface, SimArbiter, SimBus, SimClock, TIMING};
use turnbus::{addr, button, Address, ArbiterConfig, Message};

struct Device {
    arbiter: SimArbiter,
    io: BusInterface,
    sent_this_turn: bool,
    sent: usize,
    received: Vec<Message>,
}

impl Device {
    fn new(bus: &SimBus, clock: &SimClock, config: ArbiterConfig) -> Device {
        let (arbiter, io) = new_arbiter_with(bus, clock, config);
        Device {
            arbiter,
            io,
            sent_this_turn: false,
            sent: 0,
            received: Vec::new(),
        }
    }

    /// One pass of the device main loop. Returns true if a frame was sent.
    fn tick(&mut self) -> bool {
        self.received.extend(self.arbiter.recv());
        if !self.arbiter.can_send() {
            self.sent_this_turn = false;
            return false;
        }
        if self.sent_this_turn {
            return false;
        }
        let msg = Message::new(self.arbiter.address()).with_button(button((self.sent % 6) as u8));
        self.arbiter.send_message(&msg).unwrap();
        self.sent_this_turn = true;
        self.sent += 1;
        true
    }
}

#[test]
fn devices_take_turns() {
    let bus = SimBus::new();
    let clock = SimClock::new();
    let mut devices: Vec<Device> = [1, 4, 7]
        .iter()
        .map(|a| Device::new(&bus, &clock, config(addr(*a)).with_warmup_slots(1)))
        .collect();

    let mut sends: Vec<(u32, Address)> = Vec::new();
    let mut now = 0;
    while now < 200 * TIMING.cycle_us {
        clock.set(now);
        for dev in devices.iter_mut() {
            if dev.tick() {
                sends.push((now, dev.arbiter.address()));
            }
        }
        // each device reads at most one byte per symbol time
        now += TIMING.symbol_us;
    }
    for dev in devices.iter_mut() {
        let msgs = drain(&mut dev.arbiter, &dev.io);
        dev.received.extend(msgs);
    }

    for dev in devices.iter() {
        assert!(dev.sent >= 5, "{:?} sent only {}", dev.arbiter.address(), dev.sent);
        let others: usize = devices
            .iter()
            .filter(|d| d.arbiter.address() != dev.arbiter.address())
            .map(|d| d.sent)
            .sum();
        assert_eq!(dev.received.len(), others);
        assert!(dev
            .received
            .iter()
            .all(|m| m.address != dev.arbiter.address()));
    }

    // round robin order, with at least one slot between senders
    for pair in sends.windows(2) {
        let ((t0, a0), (t1, a1)) = (pair[0], pair[1]);
        assert_ne!(a0, a1);
        assert!(t1 - t0 >= TIMING.cycle_us, "{:?}", pair);
    }
    let order: Vec<u8> = sends.iter().take(6).map(|(_, a)| **a).collect();
    assert_eq!(order, vec![1, 4, 7, 1, 4, 7]);
}

#[test]
fn late_joiner_syncs_on_first_message() {
    let bus = SimBus::new();
    let clock = SimClock::new();
    let mut early = Device::new(&bus, &clock, config(addr(2)));
    let mut late = Device::new(&bus, &clock, config(addr(3)));

    // the early device has been on the bus long enough to reach its slot
    clock.set(129 * TIMING.cycle_us + TIMING.symbol_us);
    assert!(!early.tick());
    clock.advance(TIMING.cycle_us);
    assert!(early.tick());

    late.arbiter = SimArbiter::new(late.io.clone(), clock.clone(), *late.arbiter.config());
    assert!(!late.arbiter.can_send());
    let msgs = drain(&mut late.arbiter, &late.io);
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].address, addr(2));

    clock.advance(TIMING.cycle_us + TIMING.symbol_us);
    assert!(late.tick());
    assert_eq!(late.sent, 1);
}
