//! Control-plane packet codec.
//!
//! Every command travels in a 24-byte envelope:
//!
//! ```text
//! sof(1) version(1) length(2) seq_num(4) cmd_id(2) cmd_type(1)
//! sender_type(1) rsvd(6) crc16(2) crc32(4) | payload...
//! ```
//!
//! `length` counts header plus payload. `crc16` covers the first 18 header
//! bytes, `crc32` covers the payload only. The same envelope is used on the
//! broadcast discovery port and the unicast control port; only `cmd_id`
//! distinguishes them.

use enum_primitive_derive::Primitive;
use num_traits::FromPrimitive;
use serde::Deserialize;

use crate::error::DecodeError;
use crate::protocol::crc::{crc16, crc32};

/// Start-of-frame marker, first byte of every command packet.
pub const SOF: u8 = 0xAA;
/// Protocol version byte carried in the envelope.
pub const PROTOCOL_VERSION: u8 = 0;
/// Envelope size in bytes.
pub const CMD_HEADER_SIZE: usize = 24;
/// How many leading header bytes the crc16 covers.
pub const CRC16_COVERAGE: usize = 18;
/// `sender_type` value for packets originating at the device.
pub const SENDER_TYPE_DEVICE: u8 = 0x01;

#[derive(Primitive, PartialEq, Eq, Debug, Copy, Clone)]
pub enum CmdId {
    DeviceTypeQuery = 0x0000,
    ParamConfigure = 0x0100,
    ParamInquire = 0x0101,
}

#[derive(Primitive, PartialEq, Eq, Debug, Copy, Clone)]
pub enum CmdType {
    Req = 0x00,
    Ack = 0x01,
    Push = 0x02,
}

#[derive(Deserialize, Debug, Copy, Clone)]
#[repr(C, packed)]
struct RawHeader {
    sof: u8,
    version: u8,
    length: u16,
    seq_num: u32,
    cmd_id: u16,
    cmd_type: u8,
    sender_type: u8,
    rsvd: [u8; 6],
    crc16: u16,
    crc32: u32,
}

/// A decoded command packet, header fields plus owned payload.
///
/// `cmd_id` and `cmd_type` stay raw on the struct; dispatch goes through the
/// typed accessors so unknown ids fall out as `None` instead of panicking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPacket {
    pub seq_num: u32,
    pub cmd_id: u16,
    pub cmd_type: u8,
    pub sender_type: u8,
    pub payload: Vec<u8>,
}

impl CommandPacket {
    /// Build a device-originated packet (acks and pushes).
    pub fn from_device(seq_num: u32, cmd_id: CmdId, cmd_type: CmdType, payload: Vec<u8>) -> Self {
        Self {
            seq_num,
            cmd_id: cmd_id as u16,
            cmd_type: cmd_type as u8,
            sender_type: SENDER_TYPE_DEVICE,
            payload,
        }
    }

    pub fn command(&self) -> Option<CmdId> {
        CmdId::from_u16(self.cmd_id)
    }

    pub fn packet_type(&self) -> Option<CmdType> {
        CmdType::from_u8(self.cmd_type)
    }

    /// Decode one datagram. `data` must be exactly the received bytes, not
    /// the full receive buffer.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < CMD_HEADER_SIZE {
            return Err(DecodeError::TruncatedInput {
                expected: CMD_HEADER_SIZE,
                actual: data.len(),
            });
        }
        let header: RawHeader = bincode::deserialize(&data[..CMD_HEADER_SIZE])
            .expect("fixed-size header deserialization cannot fail");
        let length = header.length as usize;
        if length < CMD_HEADER_SIZE || length > data.len() {
            return Err(DecodeError::MalformedLength {
                declared: length,
                remaining: data.len(),
            });
        }
        Ok(Self {
            seq_num: header.seq_num,
            cmd_id: header.cmd_id,
            cmd_type: header.cmd_type,
            sender_type: header.sender_type,
            payload: data[CMD_HEADER_SIZE..length].to_vec(),
        })
    }

    /// Encode to wire bytes, computing `length` and both checksums.
    pub fn encode(&self) -> Vec<u8> {
        let length = (CMD_HEADER_SIZE + self.payload.len()) as u16;
        let mut buf = Vec::with_capacity(length as usize);
        buf.push(SOF);
        buf.push(PROTOCOL_VERSION);
        buf.extend_from_slice(&length.to_le_bytes());
        buf.extend_from_slice(&self.seq_num.to_le_bytes());
        buf.extend_from_slice(&self.cmd_id.to_le_bytes());
        buf.push(self.cmd_type);
        buf.push(self.sender_type);
        buf.extend_from_slice(&[0u8; 6]);
        buf.extend_from_slice(&crc16(&buf[..CRC16_COVERAGE]).to_le_bytes());
        buf.extend_from_slice(&crc32(&self.payload).to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }
}

// ============================================================================
// Discovery
// ============================================================================

/// Acknowledgment to a device-type query: who we are and where to talk to us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfoAck {
    pub ret: u8,
    pub dev_type: u8,
    pub serial: [u8; 16],
    pub ip: [u8; 4],
    pub cmd_port: u16,
}

pub const DEVICE_INFO_ACK_SIZE: usize = 24;

impl DeviceInfoAck {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(DEVICE_INFO_ACK_SIZE);
        buf.push(self.ret);
        buf.push(self.dev_type);
        buf.extend_from_slice(&self.serial);
        buf.extend_from_slice(&self.ip);
        buf.extend_from_slice(&self.cmd_port.to_le_bytes());
        buf
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < DEVICE_INFO_ACK_SIZE {
            return Err(DecodeError::TruncatedInput {
                expected: DEVICE_INFO_ACK_SIZE,
                actual: data.len(),
            });
        }
        let mut serial = [0u8; 16];
        serial.copy_from_slice(&data[2..18]);
        let mut ip = [0u8; 4];
        ip.copy_from_slice(&data[18..22]);
        Ok(Self {
            ret: data[0],
            dev_type: data[1],
            serial,
            ip,
            cmd_port: u16::from_le_bytes([data[22], data[23]]),
        })
    }
}

// ============================================================================
// Parameter bodies
// ============================================================================

/// One key/value record: `key(2) len(2) value(len)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: u16,
    pub value: Vec<u8>,
}

impl KeyValue {
    pub fn new(key: u16, value: Vec<u8>) -> Self {
        Self { key, value }
    }

    pub fn append_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.key.to_le_bytes());
        buf.extend_from_slice(&(self.value.len() as u16).to_le_bytes());
        buf.extend_from_slice(&self.value);
    }

    /// Decode one record at `*offset`, advancing the cursor past it.
    ///
    /// Running out of buffer mid-list is a malformed container, not a
    /// truncated record, so both short-header and short-value overruns
    /// report `MalformedLength`.
    pub fn decode_at(data: &[u8], offset: &mut usize) -> Result<Self, DecodeError> {
        let remaining = data.len() - *offset;
        if remaining < 4 {
            return Err(DecodeError::MalformedLength {
                declared: 4,
                remaining,
            });
        }
        let key = u16::from_le_bytes([data[*offset], data[*offset + 1]]);
        let len = u16::from_le_bytes([data[*offset + 2], data[*offset + 3]]) as usize;
        if len > remaining - 4 {
            return Err(DecodeError::MalformedLength {
                declared: len,
                remaining: remaining - 4,
            });
        }
        let value = data[*offset + 4..*offset + 4 + len].to_vec();
        *offset += 4 + len;
        Ok(Self { key, value })
    }
}

/// Inquire request body: `key_num(2) rsvd(2)` then `key_num` bare keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamInquireReq {
    pub keys: Vec<u16>,
}

impl ParamInquireReq {
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < 4 {
            return Err(DecodeError::TruncatedInput {
                expected: 4,
                actual: data.len(),
            });
        }
        let key_num = u16::from_le_bytes([data[0], data[1]]) as usize;
        let needed = 2 * key_num;
        if needed > data.len() - 4 {
            return Err(DecodeError::MalformedLength {
                declared: needed,
                remaining: data.len() - 4,
            });
        }
        let keys = (0..key_num)
            .map(|i| u16::from_le_bytes([data[4 + 2 * i], data[5 + 2 * i]]))
            .collect();
        Ok(Self { keys })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + 2 * self.keys.len());
        buf.extend_from_slice(&(self.keys.len() as u16).to_le_bytes());
        buf.extend_from_slice(&[0u8; 2]);
        for key in &self.keys {
            buf.extend_from_slice(&key.to_le_bytes());
        }
        buf
    }
}

/// Inquire acknowledgment body: `ret(1) key_num(2)` then key/value records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamInquireAck {
    pub ret: u8,
    pub kvs: Vec<KeyValue>,
}

impl ParamInquireAck {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.push(self.ret);
        buf.extend_from_slice(&(self.kvs.len() as u16).to_le_bytes());
        for kv in &self.kvs {
            kv.append_to(&mut buf);
        }
        buf
    }

    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < 3 {
            return Err(DecodeError::TruncatedInput {
                expected: 3,
                actual: data.len(),
            });
        }
        let ret = data[0];
        let key_num = u16::from_le_bytes([data[1], data[2]]) as usize;
        let mut offset = 3;
        let mut kvs = Vec::with_capacity(key_num);
        for _ in 0..key_num {
            kvs.push(KeyValue::decode_at(data, &mut offset)?);
        }
        Ok(Self { ret, kvs })
    }
}

/// Configure request body: `key_num(2) rsvd(2)` then key/value records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamConfigReq {
    pub kvs: Vec<KeyValue>,
}

impl ParamConfigReq {
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < 4 {
            return Err(DecodeError::TruncatedInput {
                expected: 4,
                actual: data.len(),
            });
        }
        let key_num = u16::from_le_bytes([data[0], data[1]]) as usize;
        let mut offset = 4;
        let mut kvs = Vec::with_capacity(key_num);
        for _ in 0..key_num {
            kvs.push(KeyValue::decode_at(data, &mut offset)?);
        }
        Ok(Self { kvs })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(self.kvs.len() as u16).to_le_bytes());
        buf.extend_from_slice(&[0u8; 2]);
        for kv in &self.kvs {
            kv.append_to(&mut buf);
        }
        buf
    }
}

/// Configure acknowledgment body: `ret(1) error_key(2)`.
///
/// `error_key` names the first rejected key, or 0 when all records applied
/// (and also when the failure had no attributable key).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlResponse {
    pub ret: u8,
    pub error_key: u16,
}

impl ControlResponse {
    pub const OK: Self = Self {
        ret: 0,
        error_key: 0,
    };

    pub fn failure(error_key: u16) -> Self {
        Self { ret: 1, error_key }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(3);
        buf.push(self.ret);
        buf.extend_from_slice(&self.error_key.to_le_bytes());
        buf
    }

    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < 3 {
            return Err(DecodeError::TruncatedInput {
                expected: 3,
                actual: data.len(),
            });
        }
        Ok(Self {
            ret: data[0],
            error_key: u16::from_le_bytes([data[1], data[2]]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_size() {
        assert_eq!(std::mem::size_of::<RawHeader>(), CMD_HEADER_SIZE);
    }

    #[test]
    fn test_command_packet_round_trip() {
        let packet = CommandPacket::from_device(
            7,
            CmdId::ParamInquire,
            CmdType::Ack,
            vec![1, 2, 3, 4, 5],
        );
        let bytes = packet.encode();
        assert_eq!(bytes[0], SOF);
        assert_eq!(bytes.len(), CMD_HEADER_SIZE + 5);
        assert_eq!(
            u16::from_le_bytes([bytes[2], bytes[3]]) as usize,
            bytes.len()
        );

        let decoded = CommandPacket::decode(&bytes).unwrap();
        assert_eq!(decoded, packet);
        assert_eq!(decoded.command(), Some(CmdId::ParamInquire));
        assert_eq!(decoded.packet_type(), Some(CmdType::Ack));
    }

    #[test]
    fn test_command_packet_checksums() {
        let packet =
            CommandPacket::from_device(1, CmdId::DeviceTypeQuery, CmdType::Req, vec![0xDE, 0xAD]);
        let bytes = packet.encode();
        let wire_crc16 = u16::from_le_bytes([bytes[18], bytes[19]]);
        let wire_crc32 = u32::from_le_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
        assert_eq!(wire_crc16, crc16(&bytes[..CRC16_COVERAGE]));
        assert_eq!(wire_crc32, crc32(&[0xDE, 0xAD]));
    }

    #[test]
    fn test_decode_trailing_bytes_ignored() {
        // A datagram longer than the declared length decodes the declared
        // part and ignores the rest.
        let mut bytes =
            CommandPacket::from_device(2, CmdId::ParamConfigure, CmdType::Req, vec![9, 9]).encode();
        bytes.extend_from_slice(&[0xFF; 8]);
        let decoded = CommandPacket::decode(&bytes).unwrap();
        assert_eq!(decoded.payload, vec![9, 9]);
    }

    #[test]
    fn test_decode_truncated() {
        assert!(matches!(
            CommandPacket::decode(&[0xAA; 10]),
            Err(DecodeError::TruncatedInput {
                expected: 24,
                actual: 10
            })
        ));
    }

    #[test]
    fn test_decode_bad_declared_length() {
        let mut bytes =
            CommandPacket::from_device(3, CmdId::ParamInquire, CmdType::Req, vec![]).encode();
        // Declare more bytes than the datagram carries
        bytes[2..4].copy_from_slice(&100u16.to_le_bytes());
        assert!(matches!(
            CommandPacket::decode(&bytes),
            Err(DecodeError::MalformedLength {
                declared: 100,
                remaining: 24
            })
        ));
    }

    #[test]
    fn test_unknown_command_id() {
        let mut packet =
            CommandPacket::from_device(4, CmdId::DeviceTypeQuery, CmdType::Req, vec![]);
        packet.cmd_id = 0x7777;
        let decoded = CommandPacket::decode(&packet.encode()).unwrap();
        assert_eq!(decoded.command(), None);
    }

    #[test]
    fn test_device_info_ack_round_trip() {
        let ack = DeviceInfoAck {
            ret: 0,
            dev_type: 9,
            serial: crate::protocol::fixed_bytes(b"Tux-LivoxLidar1"),
            ip: [192, 168, 1, 44],
            cmd_port: 56100,
        };
        let bytes = ack.to_bytes();
        assert_eq!(bytes.len(), DEVICE_INFO_ACK_SIZE);
        assert_eq!(DeviceInfoAck::from_bytes(&bytes).unwrap(), ack);
    }

    #[test]
    fn test_inquire_req_round_trip() {
        let req = ParamInquireReq {
            keys: vec![0x8000, 0x0004, 0x001A],
        };
        assert_eq!(ParamInquireReq::decode(&req.encode()).unwrap(), req);
    }

    #[test]
    fn test_inquire_req_key_count_overrun() {
        let mut bytes = ParamInquireReq { keys: vec![1, 2] }.encode();
        bytes[0..2].copy_from_slice(&50u16.to_le_bytes());
        assert!(matches!(
            ParamInquireReq::decode(&bytes),
            Err(DecodeError::MalformedLength { .. })
        ));
    }

    #[test]
    fn test_config_req_round_trip() {
        let req = ParamConfigReq {
            kvs: vec![
                KeyValue::new(0x001A, vec![1]),
                KeyValue::new(0x0015, vec![0; 20]),
            ],
        };
        assert_eq!(ParamConfigReq::decode(&req.encode()).unwrap(), req);
    }

    #[test]
    fn test_config_req_value_overrun() {
        // Second record declares a value running past the end of the body
        let mut buf = Vec::new();
        buf.extend_from_slice(&2u16.to_le_bytes());
        buf.extend_from_slice(&[0u8; 2]);
        KeyValue::new(0x001A, vec![1]).append_to(&mut buf);
        buf.extend_from_slice(&0x0015u16.to_le_bytes());
        buf.extend_from_slice(&20u16.to_le_bytes());
        buf.extend_from_slice(&[0u8; 3]);
        assert!(matches!(
            ParamConfigReq::decode(&buf),
            Err(DecodeError::MalformedLength {
                declared: 20,
                remaining: 3
            })
        ));
    }

    #[test]
    fn test_config_req_record_header_overrun() {
        // Body declares two records but cuts off inside the second header
        let mut buf = Vec::new();
        buf.extend_from_slice(&2u16.to_le_bytes());
        buf.extend_from_slice(&[0u8; 2]);
        KeyValue::new(0x001A, vec![1]).append_to(&mut buf);
        buf.extend_from_slice(&[0x15, 0x00]);
        assert!(matches!(
            ParamConfigReq::decode(&buf),
            Err(DecodeError::MalformedLength {
                declared: 4,
                remaining: 2
            })
        ));
    }

    #[test]
    fn test_inquire_ack_round_trip() {
        let ack = ParamInquireAck {
            ret: 1,
            kvs: vec![KeyValue::new(0x8005, vec![0x7C, 0x7A, 0x91, 0x33, 0xBE, 0x3B])],
        };
        assert_eq!(ParamInquireAck::decode(&ack.encode()).unwrap(), ack);
    }

    #[test]
    fn test_control_response_round_trip() {
        assert_eq!(
            ControlResponse::decode(&ControlResponse::OK.encode()).unwrap(),
            ControlResponse::OK
        );
        let failed = ControlResponse::failure(0x0016);
        assert_eq!(ControlResponse::decode(&failed.encode()).unwrap(), failed);
    }
}
