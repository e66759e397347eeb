//! Sans-io access to a shared half-duplex serial bus without a bus master.
//!
//! Devices on the bus exchange short text frames like
//! `:A3 V1234 T-56|291279db\n`, carrying the sender address and optional
//! voltage, temperature and button readings, protected by a CRC-32.
//!
//! [`Parser`] decodes frames one byte at a time. [`Arbiter`] owns a parser,
//! watches the bus traffic and silence to work out whose turn it is to
//! transmit, and frames outgoing messages. The byte transport and clock are
//! supplied by the caller through the [`Transport`] and [`Clock`] traits.
#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]

pub mod arbiter;
pub mod checksum;
pub mod frame;
pub mod message;
pub mod parser;
pub mod transport;
pub mod types;

pub use arbiter::{Arbiter, ArbiterConfig, SlotTiming, Turn};
pub use message::Message;
pub use parser::{ChecksumPolicy, Parser};
pub use transport::{Clock, Direction, Transport};
pub use types::{addr, button, temp, volts, Address, Button, Temperature, Voltage, NUM_SLOTS};
