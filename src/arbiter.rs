//! Leaderless round-robin bus access. See [`Arbiter`] for more details.

use core::fmt::Debug;

use log::{debug, trace, warn};
use snafu::Snafu;

use crate::frame::{self, PayloadError, MAX_PAYLOAD_LEN};
use crate::message::Message;
use crate::parser::{ChecksumPolicy, Parser};
use crate::transport::{Clock, Transport, TransmitGuard};
use crate::types::{addr, Address};

/// Error type for [`Arbiter::send()`].
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error<E: Debug> {
    /// The payload doesn't fit in a frame.
    #[snafu(display("Payload of {} bytes exceeds {} bytes", len, MAX_PAYLOAD_LEN))]
    PayloadTooLong { len: usize },
    /// The payload contains a byte reserved for framing.
    #[snafu(display("Payload contains framing byte {:#04x}", byte))]
    InvalidPayloadByte { byte: u8 },
    /// The transport failed while the frame was being written.
    #[snafu(display("Transport error: {:?}", error))]
    Transport { error: E },
}

impl<E: Debug> From<PayloadError> for Error<E> {
    fn from(err: PayloadError) -> Self {
        match err {
            PayloadError::TooLong(len) => Self::PayloadTooLong { len },
            PayloadError::FramingByte(byte) => Self::InvalidPayloadByte { byte },
        }
    }
}

/// Bits per byte on the wire: start bit, 8 data bits and stop bit.
const BITS_PER_SYMBOL: u32 = 10;

/// Time budget of one turn slot on the bus.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SlotTiming {
    /// Nominal time one sender holds the bus, in microseconds.
    pub cycle_us: u32,
    /// Transmission time of one byte, in microseconds.
    pub symbol_us: u32,
}

impl SlotTiming {
    pub const DEFAULT_BAUD: u32 = 115_200;
    pub const DEFAULT_SYMBOLS_PER_SLOT: u32 = 32;

    /// Slot of `symbols_per_slot` byte times at the given baud rate, or `None`
    /// if `baud` is zero.
    ///
    /// ```
    /// use turnbus::SlotTiming;
    /// let timing = SlotTiming::from_baud(115_200, 32).unwrap();
    /// assert_eq!(timing.symbol_us, 86);
    /// assert_eq!(timing.cycle_us, 2777);
    /// ```
    pub const fn from_baud(baud: u32, symbols_per_slot: u32) -> Option<Self> {
        if baud == 0 {
            return None;
        }
        Some(Self::at_baud(baud, symbols_per_slot))
    }

    const fn at_baud(baud: u32, symbols_per_slot: u32) -> Self {
        let bit_time = BITS_PER_SYMBOL as u64 * 1_000_000;
        Self {
            cycle_us: (symbols_per_slot as u64 * bit_time / baud as u64) as u32,
            symbol_us: (bit_time / baud as u64) as u32,
        }
    }

    /// Number of whole slots covered by `elapsed_us` of silence.
    ///
    /// Right after a received byte (`idle == false`) the first symbol time is
    /// not counted, since the timestamp was taken when that byte arrived.
    pub fn slots_elapsed(&self, elapsed_us: u32, idle: bool) -> u32 {
        let grace = if idle { 0 } else { self.symbol_us };
        match self.cycle_us {
            0 => 0,
            cycle => elapsed_us.saturating_sub(grace) / cycle,
        }
    }

    /// Number of whole byte times in one slot.
    pub fn symbols_per_slot(&self) -> u32 {
        match self.symbol_us {
            0 => 0,
            symbol => self.cycle_us / symbol,
        }
    }
}

impl Default for SlotTiming {
    fn default() -> Self {
        Self::at_baud(Self::DEFAULT_BAUD, Self::DEFAULT_SYMBOLS_PER_SLOT)
    }
}

/// Which address this device believes holds the bus.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Turn {
    /// No traffic seen yet. Slot 0 is assumed after `warmup` more slots of silence.
    Unsynced { warmup: u32 },
    Slot(Address),
}

impl Turn {
    /// The estimate after `slots` turns went by without traffic.
    pub fn advance(self, slots: u32) -> Self {
        match self {
            Self::Unsynced { warmup } if slots < warmup => Self::Unsynced {
                warmup: warmup - slots,
            },
            Self::Unsynced { warmup } => {
                Self::Slot(addr(0).next_wrapping(slots - warmup))
            }
            Self::Slot(addr) => Self::Slot(addr.next_wrapping(slots)),
        }
    }

    pub fn address(self) -> Option<Address> {
        match self {
            Self::Slot(addr) => Some(addr),
            Self::Unsynced { .. } => None,
        }
    }
}

/// Static configuration of an [`Arbiter`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ArbiterConfig {
    pub address: Address,
    pub timing: SlotTiming,
    pub policy: ChecksumPolicy,
    /// Slots of silence before an unsynced device assumes slot 0.
    pub warmup_slots: u32,
}

impl ArbiterConfig {
    pub const DEFAULT_WARMUP_SLOTS: u32 = 128;

    pub fn new(address: Address) -> Self {
        Self {
            address,
            timing: SlotTiming::default(),
            policy: ChecksumPolicy::default(),
            warmup_slots: Self::DEFAULT_WARMUP_SLOTS,
        }
    }

    pub fn with_timing(mut self, timing: SlotTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_policy(mut self, policy: ChecksumPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_warmup_slots(mut self, warmup_slots: u32) -> Self {
        self.warmup_slots = warmup_slots;
        self
    }
}

/// Shares a bus with up to 15 peers without a coordinator.
///
/// Every device runs the same rule: the address of the last message seen on
/// the bus holds the turn, and each slot period of silence passes the turn
/// to the next address. A device may transmit when the turn is its own.
///
/// Call [`recv()`](Self::recv) on every tick of the main loop, and
/// [`send()`](Self::send) only when [`can_send()`](Self::can_send) is true.
///
/// # Example
///
/// ```
/// use turnbus::{addr, Arbiter, ArbiterConfig, Message};
/// use turnbus::transport::io::{IoTransport, StdClock};
/// # use std::io::Cursor;
/// # fn open_serial_port() -> Result<Cursor<Vec<u8>>, &'static str>
/// # { Ok(Cursor::new(Vec::new())) }
/// #
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let port = open_serial_port()?;
/// let transport = IoTransport::auto_direction(port);
/// let mut arbiter = Arbiter::new(transport, StdClock::new(), ArbiterConfig::new(addr(12)));
///
/// loop {
///     # break; // this snippet is only for show
///     if let Some(msg) = arbiter.recv() {
///         println!("{:?}", msg);
///     }
///     if arbiter.can_send() {
///         arbiter.send_message(&Message::new(addr(12)))?;
///     }
/// }
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct Arbiter<T, C> {
    transport: T,
    clock: C,
    config: ArbiterConfig,
    parser: Parser,
    turn: Turn,
    last_event: u32,
    idle: bool,
}

impl<T, C> Arbiter<T, C>
where
    T: Transport,
    C: Clock,
{
    pub fn new(transport: T, mut clock: C, config: ArbiterConfig) -> Self {
        let now = clock.now_micros();
        Self {
            transport,
            clock,
            config,
            parser: Parser::with_policy(config.policy),
            turn: Turn::Unsynced {
                warmup: config.warmup_slots,
            },
            last_event: now,
            idle: false,
        }
    }

    /// True when the turn estimate is this device's address.
    pub fn can_send(&self) -> bool {
        self.turn == Turn::Slot(self.config.address)
    }

    pub fn turn(&self) -> Turn {
        self.turn
    }

    pub fn address(&self) -> Address {
        self.config.address
    }

    pub fn config(&self) -> &ArbiterConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> (T, C) {
        (self.transport, self.clock)
    }

    /// Frame and transmit `payload`, then take the turn.
    ///
    /// Only call this when [`can_send()`](Self::can_send) is true, it is not
    /// checked here. The transport is back in receive mode when this returns,
    /// also on errors.
    /// # Errors
    /// Returns an error if the payload can't be framed, or if the transport fails.
    /// The turn is left unchanged on errors.
    pub fn send(&mut self, payload: &[u8]) -> Result<(), Error<T::Error>> {
        let frame = frame::encode(payload)?;
        if frame.len() as u32 > self.config.timing.symbols_per_slot() {
            warn!(
                "Frame of {} bytes is longer than the {} byte slot",
                frame.len(),
                self.config.timing.symbols_per_slot()
            );
        }

        {
            let mut tx = TransmitGuard::new(&mut self.transport);
            tx.write_all(&frame)
                .and_then(|_| tx.flush())
                .map_err(|error| Error::Transport { error })?;
        }

        debug!("Sent {} byte frame in slot {}", frame.len(), *self.config.address);
        self.turn = Turn::Slot(self.config.address);
        self.last_event = self.clock.now_micros();
        self.idle = false;
        Ok(())
    }

    /// Encode and transmit `message`, see [`send()`](Self::send).
    pub fn send_message(&mut self, message: &Message) -> Result<(), Error<T::Error>> {
        self.send(&message.to_payload())
    }

    /// Poll the bus once.
    ///
    /// Reads at most one byte from the transport. Returns a message when that
    /// byte completed one. When no byte is available, the turn estimate is
    /// moved forward by the number of slot periods the bus has been silent.
    pub fn recv(&mut self) -> Option<Message> {
        let now = self.clock.now_micros();
        match self.transport.read_byte() {
            Some(byte) => {
                self.last_event = now;
                self.idle = false;
                let msg = self.parser.parse(byte)?;
                self.parser.reset();
                if self.turn != Turn::Slot(msg.address) {
                    debug!("Turn resync {:?} -> {}", self.turn, *msg.address);
                }
                self.turn = Turn::Slot(msg.address);
                Some(msg)
            }
            None => {
                let elapsed = now.wrapping_sub(self.last_event);
                let slots = self.config.timing.slots_elapsed(elapsed, self.idle);
                if slots > 0 {
                    if self.parser.is_in_frame() {
                        debug!("Dropping stalled frame");
                    }
                    self.parser.reset();
                    self.turn = self.turn.advance(slots);
                    trace!("{} silent slot(s), turn now {:?}", slots, self.turn);
                    self.last_event = now;
                    self.idle = true;
                }
                None
            }
        }
    }
}
