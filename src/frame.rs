//! Frame encoding: `:<payload>|<crc>\n`.

use arrayvec::ArrayVec;

use crate::checksum::CKSUM;

pub const FRAME_START: u8 = b':';
pub const CHECKSUM_START: u8 = b'|';
pub const FRAME_END: u8 = b'\n';

/// Number of hex digits in the checksum field.
pub const CHECKSUM_DIGITS: usize = 8;

pub const MAX_PAYLOAD_LEN: usize = 48;

// length: ':' <payload> '|' <crc (8)> '\n'
pub const MAX_FRAME_LEN: usize = MAX_PAYLOAD_LEN + CHECKSUM_DIGITS + 3;

pub type FrameBytes = ArrayVec<u8, MAX_FRAME_LEN>;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Why a payload can't be framed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadError {
    TooLong(usize),
    FramingByte(u8),
}

/// Bytes that would break the framing if they appeared in a payload.
pub(crate) const fn is_framing_byte(byte: u8) -> bool {
    matches!(byte, FRAME_START | CHECKSUM_START | b'\r' | FRAME_END)
}

pub fn check_payload(payload: &[u8]) -> Result<(), PayloadError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(PayloadError::TooLong(payload.len()));
    }
    match payload.iter().find(|b| is_framing_byte(**b)) {
        Some(byte) => Err(PayloadError::FramingByte(*byte)),
        None => Ok(()),
    }
}

/// Wrap `payload` in frame markers and append the checksum.
/// The checksum covers everything from the opening `:` up to and including the `|`.
pub fn encode(payload: &[u8]) -> Result<FrameBytes, PayloadError> {
    check_payload(payload)?;

    let mut frame = FrameBytes::new();
    frame.push(FRAME_START);
    frame
        .try_extend_from_slice(payload)
        .map_err(|_| PayloadError::TooLong(payload.len()))?;
    frame.push(CHECKSUM_START);

    let crc = CKSUM.checksum(&frame);
    push_checksum(&mut frame, crc);
    frame.push(FRAME_END);
    Ok(frame)
}

fn push_checksum(frame: &mut FrameBytes, crc: u32) {
    for shift in (0..CHECKSUM_DIGITS as u32).rev() {
        frame.push(HEX_DIGITS[((crc >> (shift * 4)) & 0xf) as usize]);
    }
}
