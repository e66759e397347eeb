//! Streaming frame parser. See [`Parser`] for more details.

use core::fmt;

use log::{trace, warn};

use crate::checksum::{Running, CKSUM};
use crate::frame::{CHECKSUM_DIGITS, CHECKSUM_START, FRAME_END, FRAME_START};
use crate::message::Message;
use crate::types::{Address, Button, Temperature, Voltage};

/// Most digits accepted in a voltage or temperature field.
const MAX_READING_DIGITS: u8 = 4;

/// What to do with a frame whose checksum doesn't match its contents.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ChecksumPolicy {
    /// Log the mismatch and emit the frame anyway.
    Accept,
    /// Discard the frame.
    Reject,
}

impl Default for ChecksumPolicy {
    fn default() -> Self {
        Self::Accept
    }
}

/// Numeric accumulator for the field currently being parsed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Digits {
    value: u32,
    count: u8,
    negative: bool,
}

impl Digits {
    fn push_decimal(self, byte: u8) -> Self {
        Self {
            value: self.value * 10 + u32::from(byte - b'0'),
            count: self.count + 1,
            ..self
        }
    }

    fn push_hex(self, nibble: u8) -> Self {
        Self {
            value: (self.value << 4) | u32::from(nibble),
            count: self.count.saturating_add(1),
            ..self
        }
    }
}

/// Parser states. The numeric field states carry their own accumulator.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum State {
    /// Waiting for the `:` that starts a frame.
    Initial,
    /// Between fields.
    Idle,
    /// Inside a field with an unknown tag.
    Skipping,
    /// Syntax error, everything is ignored until the parser is reset.
    Invalid,
    Address,
    Voltage(Digits),
    Temperature(Digits),
    Button,
    Checksum(Digits),
}

/// Byte-at-a-time parser for frames of the form `:A3 V1234 T-56 B2|291279db\n`.
///
/// Call [`parse()`](Self::parse) with every byte received from the bus. When
/// a frame with an address field has been terminated, the decoded [`Message`]
/// is returned. The parser does not reset itself after a message or a syntax
/// error, call [`reset()`](Self::reset) before the next frame.
///
/// # Example
///
/// ```
/// use turnbus::Parser;
///
/// let mut parser = Parser::new();
/// let msg = b":A3 V1234 T-56|291279db\n"
///     .iter()
///     .find_map(|b| parser.parse(*b))
///     .unwrap();
/// parser.reset();
///
/// assert_eq!(msg.address, 3);
/// assert_eq!(msg.voltage.unwrap(), 1234);
/// assert_eq!(msg.temperature.unwrap(), -56);
/// assert_eq!(msg.button, None);
/// ```
#[derive(Clone)]
pub struct Parser {
    state: State,
    policy: ChecksumPolicy,
    crc: Running,
    address: Option<Address>,
    voltage: Option<Voltage>,
    temperature: Option<Temperature>,
    button: Option<Button>,
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("state", &self.state)
            .field("policy", &self.policy)
            .field("address", &self.address)
            .field("voltage", &self.voltage)
            .field("temperature", &self.temperature)
            .field("button", &self.button)
            .finish_non_exhaustive()
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self::with_policy(ChecksumPolicy::default())
    }

    pub fn with_policy(policy: ChecksumPolicy) -> Self {
        Self {
            state: State::Initial,
            policy,
            crc: CKSUM.digest(),
            address: None,
            voltage: None,
            temperature: None,
            button: None,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn policy(&self) -> ChecksumPolicy {
        self.policy
    }

    /// True while a frame has been started but not yet terminated or invalidated.
    pub fn is_in_frame(&self) -> bool {
        !matches!(self.state, State::Initial | State::Invalid)
    }

    /// Forget the frame in progress and wait for the next `:`.
    pub fn reset(&mut self) {
        self.state = State::Initial;
        self.crc = CKSUM.digest();
        self.address = None;
        self.voltage = None;
        self.temperature = None;
        self.button = None;
    }

    /// Feed one byte into the parser.
    ///
    /// Returns a message if this byte terminated a frame which contained an address.
    pub fn parse(&mut self, byte: u8) -> Option<Message> {
        match self.state {
            State::Checksum(_) | State::Invalid => (),
            State::Initial if byte != FRAME_START => (),
            _ => self.crc.update(&[byte]),
        }

        let next = match self.state {
            State::Initial => Self::initial(byte),
            State::Idle => Self::idle(byte),
            State::Skipping => Self::skipping(byte),
            State::Invalid => State::Invalid,
            State::Address => self.field_address(byte),
            State::Voltage(digits) => self.field_voltage(digits, byte),
            State::Temperature(digits) => self.field_temperature(digits, byte),
            State::Button => self.field_button(byte),
            State::Checksum(digits) => self.checksum(digits, byte),
        };
        if next == State::Invalid && self.state != State::Invalid {
            trace!("Unexpected byte {:#04x} in state {:?}", byte, self.state);
        }
        self.state = next;

        match (self.state, self.address) {
            (State::Initial, Some(address)) => Some(Message {
                address,
                voltage: self.voltage,
                temperature: self.temperature,
                button: self.button,
            }),
            _ => None,
        }
    }

    fn initial(byte: u8) -> State {
        if byte == FRAME_START {
            State::Idle
        } else {
            State::Initial
        }
    }

    fn idle(byte: u8) -> State {
        match byte {
            b'A' => State::Address,
            b'V' => State::Voltage(Digits::default()),
            b'T' => State::Temperature(Digits::default()),
            b'B' => State::Button,
            b' ' => State::Idle,
            CHECKSUM_START => State::Checksum(Digits::default()),
            b'A'..=b'Z' => State::Skipping,
            _ => State::Invalid,
        }
    }

    fn skipping(byte: u8) -> State {
        match byte {
            b' ' => State::Idle,
            CHECKSUM_START => State::Checksum(Digits::default()),
            _ => State::Skipping,
        }
    }

    fn field_address(&mut self, byte: u8) -> State {
        match Address::from_hex_byte(byte) {
            Some(address) => {
                self.address = Some(address);
                State::Idle
            }
            None => State::Invalid,
        }
    }

    fn field_voltage(&mut self, digits: Digits, byte: u8) -> State {
        match reading(digits, byte, false) {
            Reading::More(digits) => State::Voltage(digits),
            Reading::Done(digits, next) => {
                self.voltage = Some(Voltage::from_digits(digits.value));
                next
            }
            Reading::Invalid => State::Invalid,
        }
    }

    fn field_temperature(&mut self, digits: Digits, byte: u8) -> State {
        match reading(digits, byte, true) {
            Reading::More(digits) => State::Temperature(digits),
            Reading::Done(digits, next) => {
                self.temperature = Some(Temperature::from_digits(digits.value, digits.negative));
                next
            }
            Reading::Invalid => State::Invalid,
        }
    }

    fn field_button(&mut self, byte: u8) -> State {
        match Button::from_byte(byte) {
            Some(button) => {
                self.button = Some(button);
                State::Idle
            }
            None => State::Invalid,
        }
    }

    fn checksum(&self, digits: Digits, byte: u8) -> State {
        match byte {
            b'0'..=b'9' => State::Checksum(digits.push_hex(byte - b'0')),
            b'a'..=b'f' => State::Checksum(digits.push_hex(byte - b'a' + 10)),
            b' ' | b'\r' => State::Checksum(digits),
            FRAME_END if usize::from(digits.count) == CHECKSUM_DIGITS => {
                let computed = self.crc.clone().finalize();
                if computed == digits.value {
                    State::Initial
                } else {
                    warn!(
                        "Checksum mismatch: received {:08x}, computed {:08x}",
                        digits.value, computed
                    );
                    match self.policy {
                        ChecksumPolicy::Accept => State::Initial,
                        ChecksumPolicy::Reject => State::Invalid,
                    }
                }
            }
            _ => State::Invalid,
        }
    }
}

enum Reading {
    More(Digits),
    Done(Digits, State),
    Invalid,
}

/// Shared digit handling for the voltage and temperature fields.
fn reading(digits: Digits, byte: u8, signed: bool) -> Reading {
    match byte {
        b' ' | CHECKSUM_START if digits.count == 0 => Reading::Invalid,
        b' ' => Reading::Done(digits, State::Idle),
        CHECKSUM_START => Reading::Done(digits, State::Checksum(Digits::default())),
        b'-' if signed && digits.count == 0 && !digits.negative => Reading::More(Digits {
            negative: true,
            ..digits
        }),
        b'0'..=b'9' if digits.count < MAX_READING_DIGITS => {
            Reading::More(digits.push_decimal(byte))
        }
        _ => Reading::Invalid,
    }
}
