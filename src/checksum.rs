//! CRC-32 used for the frame checksum.
//!
//! This is the `cksum` variant: polynomial 0x04C11DB7, initial value 0,
//! final XOR 0xFFFFFFFF, no bit reflection.

use crc::{Crc, Digest, CRC_32_CKSUM};

/// A `static` so running digests can borrow it for `'static`.
pub static CKSUM: Crc<u32> = Crc::<u32>::new(&CRC_32_CKSUM);

/// Running checksum over a byte stream.
pub type Running = Digest<'static, u32>;

/// Checksum of `data` in one go.
pub fn checksum(data: &[u8]) -> u32 {
    CKSUM.checksum(data)
}
