//! The decoded form of a frame, and its on-wire payload encoding.

use arrayvec::ArrayVec;

use crate::types::{Address, Button, Temperature, Voltage};

/// Longest payload `Message::to_payload` can produce: `A3 V9999 T-9999 B5`.
pub const MESSAGE_PAYLOAD_LEN: usize = 18;

pub type MessagePayload = ArrayVec<u8, MESSAGE_PAYLOAD_LEN>;

/// A fully validated frame received from the bus.
///
/// Only the address is mandatory, the readings are present only if their
/// field occurred in the frame.
#[derive(PartialEq, Eq, Debug, Copy, Clone, Hash)]
pub struct Message {
    pub address: Address,
    pub voltage: Option<Voltage>,
    pub temperature: Option<Temperature>,
    pub button: Option<Button>,
}

impl Message {
    /// Create a message carrying only an address.
    ///
    /// ```
    /// use turnbus::{addr, temp, volts, Message};
    /// let msg = Message::new(addr(3))
    ///     .with_voltage(volts(1234))
    ///     .with_temperature(temp(-56));
    /// assert_eq!(msg.to_payload().as_slice(), b"A3 V1234 T-56");
    /// ```
    pub const fn new(address: Address) -> Self {
        Self {
            address,
            voltage: None,
            temperature: None,
            button: None,
        }
    }

    pub const fn with_voltage(mut self, voltage: Voltage) -> Self {
        self.voltage = Some(voltage);
        self
    }

    pub const fn with_temperature(mut self, temperature: Temperature) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub const fn with_button(mut self, button: Button) -> Self {
        self.button = Some(button);
        self
    }

    /// Format the fields into the space separated on-wire body, in the
    /// order address, voltage, temperature, button.
    pub fn to_payload(&self) -> MessagePayload {
        let mut buf = MessagePayload::new();
        buf.push(b'A');
        buf.push(self.address.to_hex_byte());
        if let Some(voltage) = self.voltage {
            buf.push(b' ');
            buf.push(b'V');
            push_decimal(&mut buf, u32::from(*voltage));
        }
        if let Some(temperature) = self.temperature {
            buf.push(b' ');
            buf.push(b'T');
            if *temperature < 0 {
                buf.push(b'-');
            }
            push_decimal(&mut buf, u32::from(temperature.unsigned_abs()));
        }
        if let Some(button) = self.button {
            buf.push(b' ');
            buf.push(b'B');
            buf.push(b'0' + *button);
        }
        buf
    }
}

fn push_decimal(buf: &mut MessagePayload, mut val: u32) {
    let mut digits = ArrayVec::<u8, 4>::new();
    loop {
        digits.push(b'0' + (val % 10) as u8); // push panics on overflow
        val /= 10;
        if val == 0 {
            break;
        }
    }
    buf.extend(digits.into_iter().rev());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{addr, button, temp, volts};

    #[test]
    fn test_payload() {
        assert_eq!(Message::new(addr(0)).to_payload().as_slice(), b"A0");
        assert_eq!(
            Message::new(addr(15))
                .with_button(button(2))
                .with_voltage(volts(7))
                .to_payload()
                .as_slice(),
            b"Af V7 B2"
        );
        assert_eq!(
            Message::new(addr(10)).with_temperature(temp(0)).to_payload().as_slice(),
            b"Aa T0"
        );
    }

    #[test]
    fn test_longest_payload() {
        let msg = Message::new(addr(3))
            .with_voltage(volts(9999))
            .with_temperature(temp(-9999))
            .with_button(button(5));
        let payload = msg.to_payload();
        assert_eq!(payload.as_slice(), b"A3 V9999 T-9999 B5");
        assert!(payload.is_full());
    }
}
