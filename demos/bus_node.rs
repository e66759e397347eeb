//! A bus node on a real serial port.
//!
//! Usage: `bus_node [PORT] [ADDRESS] [BAUD]`
//!
//! The RTS line is used as the RS-485 driver enable. Every turn the node
//! sends a message with a rolling voltage value, and prints what the other
//! nodes send.

use anyhow::{Context, Result};
use log::{info, warn};
use std::time::Duration;

use turnbus::transport::io::{IoTransport, StdClock};
use turnbus::{Address, Arbiter, ArbiterConfig, Direction, Message, SlotTiming, Voltage};

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args();
    args.next(); // Skip program name
    let port = args.next().unwrap_or_else(|| "/dev/ttyUSB0".to_string());
    let address: u8 = args
        .next()
        .map(|a| a.parse())
        .transpose()
        .context("Address is not a number")?
        .unwrap_or(12);
    let address = Address::new(address).context("Address must be in 0..=15")?;
    let baud: u32 = args
        .next()
        .map(|b| b.parse())
        .transpose()
        .context("Baud rate is not a number")?
        .unwrap_or(SlotTiming::DEFAULT_BAUD);
    let timing = SlotTiming::from_baud(baud, SlotTiming::DEFAULT_SYMBOLS_PER_SLOT)
        .context("Baud rate must be greater than 0")?;

    let serial = serialport::new(&port, baud)
        .timeout(Duration::from_micros(10))
        .open()
        .with_context(|| format!("Failed to open serial port {}", port))?;
    let mut driver_enable = serial.try_clone().context("Failed to clone serial port")?;
    let transport = IoTransport::new(serial, move |dir| {
        if let Err(err) = driver_enable.write_request_to_send(dir == Direction::Transmit) {
            warn!("Failed to set RTS: {}", err);
        }
    });

    let config = ArbiterConfig::new(address).with_timing(timing);
    info!("Node {} on {} at {} baud, {:?}", *address, port, baud, config.timing);
    let mut arbiter = Arbiter::new(transport, StdClock::new(), config);

    let mut counter: u16 = 0;
    let mut sent_this_turn = false;
    loop {
        if let Some(msg) = arbiter.recv() {
            println!("{:?}", msg);
        }

        if !arbiter.can_send() {
            sent_this_turn = false;
        } else if !sent_this_turn {
            let msg = Message::new(address).with_voltage(Voltage::new(counter)?);
            arbiter.send_message(&msg)?;
            sent_this_turn = true;
            counter = (counter + 1) % 10_000;
        }
    }
}
