//! This module defines range-checked types for bus addresses and the
//! message fields carried in a frame, meant to simplify correct usage of the API.

use snafu::{ensure, OptionExt, Snafu};

use core::convert::{TryFrom, TryInto};
use core::ops::{Deref, RangeInclusive};

/// Number of addresses (turn slots) on the bus.
pub const NUM_SLOTS: u8 = 16;

/// Error type for this module
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// The value isn't a valid bus address.
    #[snafu(display("Invalid address"))]
    InvalidAddress,
    /// The value isn't a valid voltage reading.
    #[snafu(display("Invalid voltage"))]
    InvalidVoltage,
    /// The value isn't a valid temperature reading.
    #[snafu(display("Invalid temperature"))]
    InvalidTemperature,
    /// The value isn't a valid button number.
    #[snafu(display("Invalid button"))]
    InvalidButton,
}

const fn invalid_address() -> InvalidAddressSnafu {
    InvalidAddressSnafu
}

const fn invalid_voltage() -> InvalidVoltageSnafu {
    InvalidVoltageSnafu
}

const fn invalid_temperature() -> InvalidTemperatureSnafu {
    InvalidTemperatureSnafu
}

const fn invalid_button() -> InvalidButtonSnafu {
    InvalidButtonSnafu
}

/// Address is a range-checked [0, 15] integer, identifying a sender and its turn slot.
///
/// ## Example
/// ```
/// use turnbus::Address;
/// use std::convert::TryInto;
/// let a = Address::new(10).unwrap();
/// let a: Address = 10usize.try_into().unwrap();
/// ```
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Copy, Clone, Hash)]
#[repr(transparent)]
pub struct Address(u8);

/// Create a new [`Address`], panics if it is out of range.
pub const fn addr(a: u8) -> Address {
    if a < NUM_SLOTS {
        return Address(a);
    }
    panic!("Invalid address.")
}

impl Address {
    /// Create a new address, checking that the address is in \[0, 15\].
    /// # Errors
    /// Returns [`Error::InvalidAddress`] if `address` is out of range.
    pub fn new(address: impl TryInto<u8>) -> Result<Self, Error> {
        let address = address.try_into().ok().with_context(invalid_address)?;
        ensure!(address < NUM_SLOTS, invalid_address());
        Ok(Self(address))
    }

    /// Parse the single lowercase hex digit used on the wire.
    pub(crate) const fn from_hex_byte(byte: u8) -> Option<Self> {
        match byte {
            b'0'..=b'9' => Some(Self(byte - b'0')),
            b'a'..=b'f' => Some(Self(byte - b'a' + 10)),
            _ => None,
        }
    }

    pub(crate) const fn to_hex_byte(self) -> u8 {
        if self.0 < 10 {
            b'0' + self.0
        } else {
            b'a' + self.0 - 10
        }
    }

    /// Returns the address `slots` turns after this one, wrapping around after 15.
    pub const fn next_wrapping(self, slots: u32) -> Self {
        Self(((self.0 as u32 + slots % NUM_SLOTS as u32) % NUM_SLOTS as u32) as u8)
    }
}

impl Deref for Address {
    type Target = u8;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq<u8> for Address {
    fn eq(&self, other: &u8) -> bool {
        self.0 == *other
    }
}

impl TryFrom<usize> for Address {
    type Error = Error;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}


const READING_RANGE: RangeInclusive<i16> = -9999..=9999;

/// `Voltage` is a range-checked \[0, 9999\] reading.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Copy, Clone, Hash)]
#[repr(transparent)]
pub struct Voltage(u16);

/// Create a new [`Voltage`], panics if it is out of range.
pub const fn volts(v: u16) -> Voltage {
    if v <= 9999 {
        Voltage(v)
    } else {
        panic!("Invalid voltage.")
    }
}

impl Voltage {
    /// Create a new `Voltage`, checking that the given value is in the range [0, 9999].
    /// # Errors
    /// Returns [`Error::InvalidVoltage`] if `voltage` is out of range.
    pub fn new(voltage: impl TryInto<u16>) -> Result<Self, Error> {
        let voltage = voltage.try_into().ok().with_context(invalid_voltage)?;
        ensure!(voltage <= 9999, invalid_voltage());
        Ok(Self(voltage))
    }

    // The parser caps the field at four digits.
    pub(crate) const fn from_digits(value: u32) -> Self {
        Self(value as u16)
    }
}

impl Deref for Voltage {
    type Target = u16;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq<u16> for Voltage {
    fn eq(&self, other: &u16) -> bool {
        self.0 == *other
    }
}

/// `Temperature` is a signed reading with a magnitude of at most 9999.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Copy, Clone, Hash)]
#[repr(transparent)]
pub struct Temperature(i16);

/// Create a new [`Temperature`], panics if it is out of range.
pub const fn temp(t: i16) -> Temperature {
    if t >= *READING_RANGE.start() && t <= *READING_RANGE.end() {
        Temperature(t)
    } else {
        panic!("Invalid temperature.")
    }
}

impl Temperature {
    /// Create a new `Temperature`, checking that the given value is in the range [-9999, 9999].
    /// # Errors
    /// Returns [`Error::InvalidTemperature`] if `temperature` is out of range.
    pub fn new(temperature: impl TryInto<i16>) -> Result<Self, Error> {
        let temperature = temperature
            .try_into()
            .ok()
            .with_context(invalid_temperature)?;
        ensure!(
            READING_RANGE.contains(&temperature),
            invalid_temperature()
        );
        Ok(Self(temperature))
    }

    pub(crate) const fn from_digits(value: u32, negative: bool) -> Self {
        let value = value as i16;
        if negative {
            Self(-value)
        } else {
            Self(value)
        }
    }
}

impl Deref for Temperature {
    type Target = i16;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq<i16> for Temperature {
    fn eq(&self, other: &i16) -> bool {
        self.0 == *other
    }
}

/// `Button` is a range-checked \[0, 5\] button number.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Copy, Clone, Hash)]
#[repr(transparent)]
pub struct Button(u8);

/// Create a new [`Button`], panics if it is out of range.
pub const fn button(b: u8) -> Button {
    if b <= 5 {
        Button(b)
    } else {
        panic!("Invalid button.")
    }
}

impl Button {
    /// Create a new `Button`, checking that the given value is in the range [0, 5].
    /// # Errors
    /// Returns [`Error::InvalidButton`] if `button` is out of range.
    pub fn new(button: impl TryInto<u8>) -> Result<Self, Error> {
        let button = button.try_into().ok().with_context(invalid_button)?;
        ensure!(button <= 5, invalid_button());
        Ok(Self(button))
    }

    pub(crate) const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'0'..=b'5' => Some(Self(byte - b'0')),
            _ => None,
        }
    }
}

impl Deref for Button {
    type Target = u8;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq<u8> for Button {
    fn eq(&self, other: &u8) -> bool {
        self.0 == *other
    }
}
