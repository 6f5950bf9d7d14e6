//! Point-cloud data-plane codec.
//!
//! Each data datagram is a 36-byte frame envelope followed by packed point
//! records:
//!
//! ```text
//! version(1) length(2) time_interval(2) dot_num(2) udp_cnt(2) frame_cnt(1)
//! data_type(1) time_type(1) rsvd(12) crc32(4) timestamp(8) | points...
//! ```
//!
//! `length` counts envelope plus points, `crc32` covers the packed points
//! only, and `timestamp` is the timestamp of the frame's first point.

use enum_primitive_derive::Primitive;
use num_traits::FromPrimitive;
use serde::Deserialize;

use crate::error::DecodeError;
use crate::protocol::crc::crc32;

/// Envelope size in bytes.
pub const FRAME_HEADER_SIZE: usize = 36;
/// Frame envelope version byte.
pub const FRAME_VERSION: u8 = 0;
/// Most points one datagram carries.
pub const MAX_POINTS_PER_FRAME: usize = 96;
/// Nanoseconds between consecutive point timestamps.
pub const POINT_INTERVAL_NS: u64 = 480_765;
/// Per-point interval in the envelope's 0.1 µs unit.
pub const POINT_INTERVAL_0_1US: u16 = (POINT_INTERVAL_NS / 100) as u16;

/// Wire encoding of a single point record.
#[derive(Primitive, PartialEq, Eq, Debug, Copy, Clone)]
pub enum DataType {
    /// 32-bit cartesian, millimetre units, 14 bytes per point.
    CartesianHigh = 1,
    /// 16-bit cartesian, saturating, 8 bytes per point.
    CartesianLow = 2,
}

impl DataType {
    pub fn point_size(&self) -> usize {
        match self {
            DataType::CartesianHigh => 14,
            DataType::CartesianLow => 8,
        }
    }

    /// Interpret a raw `pcl_data_type` registry byte, falling back to the
    /// high-resolution encoding for values outside the known set.
    pub fn from_registry_byte(b: u8) -> Self {
        DataType::from_u8(b).unwrap_or(DataType::CartesianHigh)
    }

    /// Append one point in this encoding. Coordinates saturate to the
    /// record's integer width; reflectivity is already a byte.
    pub fn encode_point(&self, point: &RawPoint, buf: &mut Vec<u8>) {
        match self {
            DataType::CartesianHigh => {
                buf.extend_from_slice(&clamp_i32(point.x_mm).to_le_bytes());
                buf.extend_from_slice(&clamp_i32(point.y_mm).to_le_bytes());
                buf.extend_from_slice(&clamp_i32(point.z_mm).to_le_bytes());
                buf.push(point.reflectivity);
                buf.push(point.tag);
            }
            DataType::CartesianLow => {
                buf.extend_from_slice(&clamp_i16(point.x_mm).to_le_bytes());
                buf.extend_from_slice(&clamp_i16(point.y_mm).to_le_bytes());
                buf.extend_from_slice(&clamp_i16(point.z_mm).to_le_bytes());
                buf.push(point.reflectivity);
                buf.push(point.tag);
            }
        }
    }
}

fn clamp_i32(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

fn clamp_i16(v: i64) -> i16 {
    v.clamp(i16::MIN as i64, i16::MAX as i64) as i16
}

/// One replayed point before wire encoding. Coordinates in millimetres.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RawPoint {
    pub x_mm: i64,
    pub y_mm: i64,
    pub z_mm: i64,
    pub reflectivity: u8,
    pub tag: u8,
}

/// Monotonic per-point timestamp generator.
///
/// Seeded once from the configured time base; every point advances the clock
/// by [`POINT_INTERVAL_NS`] regardless of real time.
#[derive(Debug, Clone)]
pub struct PointClock {
    next_ns: u64,
}

impl PointClock {
    pub fn new(base_ns: u64) -> Self {
        Self { next_ns: base_ns }
    }

    /// Timestamp for the next point.
    pub fn tick(&mut self) -> u64 {
        let now = self.next_ns;
        self.next_ns = self.next_ns.wrapping_add(POINT_INTERVAL_NS);
        now
    }
}

#[derive(Deserialize, Debug, Copy, Clone)]
#[repr(C, packed)]
struct RawFrameHeader {
    version: u8,
    length: u16,
    time_interval: u16,
    dot_num: u16,
    udp_cnt: u16,
    frame_cnt: u8,
    data_type: u8,
    time_type: u8,
    rsvd: [u8; 12],
    crc32: u32,
    timestamp: u64,
}

/// One data-plane frame: envelope fields plus the packed point payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    pub time_interval: u16,
    pub dot_num: u16,
    pub udp_cnt: u16,
    pub frame_cnt: u8,
    pub data_type: u8,
    pub time_type: u8,
    pub timestamp: u64,
    pub payload: Vec<u8>,
}

impl DataFrame {
    /// Pack `points` into a frame. The envelope timestamp is taken from the
    /// first point; `points` must not be empty.
    pub fn assemble(
        points: &[(RawPoint, u64)],
        data_type: DataType,
        udp_cnt: u16,
        frame_cnt: u8,
    ) -> Self {
        let mut payload = Vec::with_capacity(points.len() * data_type.point_size());
        for (point, _) in points {
            data_type.encode_point(point, &mut payload);
        }
        Self {
            time_interval: POINT_INTERVAL_0_1US,
            dot_num: points.len() as u16,
            udp_cnt,
            frame_cnt,
            data_type: data_type as u8,
            time_type: 0,
            timestamp: points[0].1,
            payload,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let length = (FRAME_HEADER_SIZE + self.payload.len()) as u16;
        let mut buf = Vec::with_capacity(length as usize);
        buf.push(FRAME_VERSION);
        buf.extend_from_slice(&length.to_le_bytes());
        buf.extend_from_slice(&self.time_interval.to_le_bytes());
        buf.extend_from_slice(&self.dot_num.to_le_bytes());
        buf.extend_from_slice(&self.udp_cnt.to_le_bytes());
        buf.push(self.frame_cnt);
        buf.push(self.data_type);
        buf.push(self.time_type);
        buf.extend_from_slice(&[0u8; 12]);
        buf.extend_from_slice(&crc32(&self.payload).to_le_bytes());
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }

    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < FRAME_HEADER_SIZE {
            return Err(DecodeError::TruncatedInput {
                expected: FRAME_HEADER_SIZE,
                actual: data.len(),
            });
        }
        let header: RawFrameHeader = bincode::deserialize(&data[..FRAME_HEADER_SIZE])
            .expect("fixed-size header deserialization cannot fail");
        let length = header.length as usize;
        if length < FRAME_HEADER_SIZE || length > data.len() {
            return Err(DecodeError::MalformedLength {
                declared: length,
                remaining: data.len(),
            });
        }
        Ok(Self {
            time_interval: header.time_interval,
            dot_num: header.dot_num,
            udp_cnt: header.udp_cnt,
            frame_cnt: header.frame_cnt,
            data_type: header.data_type,
            time_type: header.time_type,
            timestamp: header.timestamp,
            payload: data[FRAME_HEADER_SIZE..length].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: i64, y: i64, z: i64, refl: u8) -> RawPoint {
        RawPoint {
            x_mm: x,
            y_mm: y,
            z_mm: z,
            reflectivity: refl,
            tag: 0,
        }
    }

    #[test]
    fn test_header_size() {
        assert_eq!(std::mem::size_of::<RawFrameHeader>(), FRAME_HEADER_SIZE);
    }

    #[test]
    fn test_point_sizes() {
        assert_eq!(DataType::CartesianHigh.point_size(), 14);
        assert_eq!(DataType::CartesianLow.point_size(), 8);
        assert_eq!(DataType::from_registry_byte(1), DataType::CartesianHigh);
        assert_eq!(DataType::from_registry_byte(2), DataType::CartesianLow);
        assert_eq!(DataType::from_registry_byte(0xFF), DataType::CartesianHigh);
    }

    #[test]
    fn test_low_resolution_saturates() {
        let mut buf = Vec::new();
        DataType::CartesianLow.encode_point(&point(100_000, -100_000, 5, 7), &mut buf);
        assert_eq!(&buf[0..2], &i16::MAX.to_le_bytes());
        assert_eq!(&buf[2..4], &i16::MIN.to_le_bytes());
        assert_eq!(&buf[4..6], &5i16.to_le_bytes());
        assert_eq!(buf[6], 7);
        assert_eq!(buf[7], 0);
    }

    #[test]
    fn test_high_resolution_layout() {
        let mut buf = Vec::new();
        DataType::CartesianHigh.encode_point(&point(1, -2, 3, 200), &mut buf);
        assert_eq!(buf.len(), 14);
        assert_eq!(&buf[0..4], &1i32.to_le_bytes());
        assert_eq!(&buf[4..8], &(-2i32).to_le_bytes());
        assert_eq!(&buf[8..12], &3i32.to_le_bytes());
        assert_eq!(buf[12], 200);
    }

    #[test]
    fn test_point_clock() {
        let mut clock = PointClock::new(1000);
        assert_eq!(clock.tick(), 1000);
        assert_eq!(clock.tick(), 1000 + POINT_INTERVAL_NS);
        assert_eq!(clock.tick(), 1000 + 2 * POINT_INTERVAL_NS);
    }

    #[test]
    fn test_frame_round_trip() {
        let points: Vec<(RawPoint, u64)> = (0..3)
            .map(|i| (point(i, i * 2, i * 3, i as u8), 5000 + i as u64))
            .collect();
        let frame = DataFrame::assemble(&points, DataType::CartesianHigh, 42, 7);
        assert_eq!(frame.dot_num, 3);
        assert_eq!(frame.timestamp, 5000);

        let bytes = frame.encode();
        assert_eq!(bytes.len(), FRAME_HEADER_SIZE + 3 * 14);
        let decoded = DataFrame::decode(&bytes).unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(
            u16::from_le_bytes([bytes[1], bytes[2]]) as usize,
            bytes.len()
        );
    }

    #[test]
    fn test_frame_crc_covers_payload_only() {
        let points = vec![(point(10, 20, 30, 1), 999u64)];
        let bytes = DataFrame::assemble(&points, DataType::CartesianLow, 0, 0).encode();
        let wire_crc = u32::from_le_bytes([bytes[21], bytes[22], bytes[23], bytes[24]]);
        assert_eq!(wire_crc, crc32(&bytes[FRAME_HEADER_SIZE..]));
    }

    #[test]
    fn test_full_frame_fits_udp_budget() {
        let points: Vec<(RawPoint, u64)> = (0..MAX_POINTS_PER_FRAME)
            .map(|i| (point(i as i64, 0, 0, 0), i as u64))
            .collect();
        let bytes = DataFrame::assemble(&points, DataType::CartesianHigh, 0, 0).encode();
        assert_eq!(bytes.len(), FRAME_HEADER_SIZE + MAX_POINTS_PER_FRAME * 14);
        assert!(bytes.len() <= crate::protocol::MAX_UDP_PACKET);
    }

    #[test]
    fn test_frame_decode_truncated() {
        assert!(matches!(
            DataFrame::decode(&[0u8; 20]),
            Err(DecodeError::TruncatedInput { .. })
        ));
    }
}
