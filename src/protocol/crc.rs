//! Checksum engine for the command and data planes.
//!
//! The control-plane header carries a CRC-16 over the first 18 header bytes
//! (everything before the two checksum fields); command payloads and
//! point-cloud frame payloads carry a CRC-32. Both must match the wire
//! partner bit-for-bit; interoperability depends on exact equivalence, not
//! "a" checksum.

use crc::{Crc, CRC_16_IBM_3740, CRC_32_ISO_HDLC};

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);
const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// CRC-16 over a command packet header (excluding the checksum fields).
pub fn crc16(bytes: &[u8]) -> u16 {
    CRC16.checksum(bytes)
}

/// CRC-32 over a command or data-frame payload.
pub fn crc32(bytes: &[u8]) -> u32 {
    CRC32.checksum(bytes)
}
