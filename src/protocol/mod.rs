//! Wire protocol for the emulated Mid-360 device.
//!
//! This module contains the binary codecs for both planes of the protocol.
//! All functions are pure (no I/O) and bounds-checked: every decode is a
//! `&[u8]` → `Result<T, DecodeError>` function.
//!
//! # Structure
//!
//! - [`crc`] - CRC-16 (headers) and CRC-32 (payloads)
//! - [`packet`] - command envelope, device ack, parameter bodies
//! - [`types`] - fixed-layout configuration records
//! - [`data`] - point-cloud frame envelope and point records
//!
//! # Byte order
//!
//! Little-endian throughout, except IP addresses which travel as four octets
//! in network order and are modelled as `[u8; 4]` so no swapping ever
//! happens. Fixed-size string fields are zero-padded to their declared
//! width.

pub mod crc;
pub mod data;
pub mod packet;
pub mod types;

/// Largest datagram either plane will ever send or receive.
pub const MAX_UDP_PACKET: usize = 1400;

// UDP port map. The "device" side is ours, the "host" side is the SDK
// talking to us.
pub const BROADCAST_PORT: u16 = 56000;
pub const CTRL_CMD_PORT_DEVICE: u16 = 56100;
pub const CTRL_CMD_PORT_HOST: u16 = 56101;
pub const PUSH_CMD_PORT_DEVICE: u16 = 56200;
pub const PUSH_CMD_PORT_HOST: u16 = 56201;
pub const POINT_DATA_PORT_DEVICE: u16 = 56300;
pub const POINT_DATA_PORT_HOST: u16 = 56301;
pub const IMU_DATA_PORT_DEVICE: u16 = 56400;
pub const IMU_DATA_PORT_HOST: u16 = 56401;
pub const LOG_DATA_PORT_DEVICE: u16 = 56500;
pub const LOG_DATA_PORT_HOST: u16 = 56501;

/// Device type byte reported in the discovery acknowledgment.
pub const DEVICE_TYPE_MID360: u8 = 9;

/// Copy `s` into a zero-padded fixed-width field, truncating if necessary.
pub fn fixed_bytes<const N: usize>(s: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    let n = s.len().min(N);
    out[..n].copy_from_slice(&s[..n]);
    out
}

/// Extract a null-terminated C string from a fixed-width field.
pub fn c_string(bytes: &[u8]) -> Option<String> {
    let null_pos = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    std::str::from_utf8(&bytes[..null_pos])
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_bytes() {
        assert_eq!(fixed_bytes::<4>(b"ab"), [b'a', b'b', 0, 0]);
        assert_eq!(fixed_bytes::<2>(b"abcd"), [b'a', b'b']);
    }

    #[test]
    fn test_c_string() {
        assert_eq!(c_string(b"hello\0world"), Some("hello".to_string()));
        assert_eq!(c_string(b"hello"), Some("hello".to_string()));
        assert_eq!(c_string(b"\0"), None);
    }
}
