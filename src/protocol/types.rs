//! Fixed-layout configuration records carried as parameter values.
//!
//! Each record is a `#[repr(C, packed)]` struct with a known wire layout.
//! Decoding goes through [`bincode`] (fixed-width little-endian integers);
//! encoding is explicit byte appending so the two cannot drift apart in
//! field order without a test catching it.
//!
//! IP addresses are `[u8; 4]` octet arrays in network order.

use serde::Deserialize;

use crate::error::DecodeError;

/// Device IP / netmask / gateway triple (key 0x0004), 12 bytes.
#[derive(Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(C, packed)]
pub struct IpMaskGw {
    pub ip: [u8; 4],
    pub mask: [u8; 4],
    pub gateway: [u8; 4],
}

pub const IP_MASK_GW_SIZE: usize = std::mem::size_of::<IpMaskGw>();

/// Host IP + destination/source port pair for one data stream, 8 bytes.
///
/// Used by the state/pointcloud/imu/ctl/log host configuration keys.
#[derive(Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(C, packed)]
pub struct HostIpPort {
    pub ip: [u8; 4],
    pub dest_port: u16,
    pub src_port: u16,
}

pub const HOST_IP_PORT_SIZE: usize = std::mem::size_of::<HostIpPort>();

/// Installation attitude (key 0x0012), 24 bytes.
#[derive(Deserialize, Debug, Copy, Clone, PartialEq)]
#[repr(C, packed)]
pub struct InstallAttitude {
    pub roll_deg: f32,
    pub pitch_deg: f32,
    pub yaw_deg: f32,
    pub x_mm: i32,
    pub y_mm: i32,
    pub z_mm: i32,
}

pub const INSTALL_ATTITUDE_SIZE: usize = std::mem::size_of::<InstallAttitude>();

/// Field-of-view window (keys 0x0015/0x0016), 20 bytes.
#[derive(Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(C, packed)]
pub struct FovCfg {
    pub yaw_start: i32,
    pub yaw_stop: i32,
    pub pitch_start: i32,
    pub pitch_stop: i32,
    pub rsvd: u32,
}

pub const FOV_CFG_SIZE: usize = std::mem::size_of::<FovCfg>();

fn check_len(bytes: &[u8], expected: usize) -> Result<(), DecodeError> {
    if bytes.len() < expected {
        return Err(DecodeError::TruncatedInput {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

impl IpMaskGw {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(IP_MASK_GW_SIZE);
        buf.extend_from_slice(&self.ip);
        buf.extend_from_slice(&self.mask);
        buf.extend_from_slice(&self.gateway);
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        check_len(bytes, IP_MASK_GW_SIZE)?;
        Ok(bincode::deserialize(&bytes[..IP_MASK_GW_SIZE])
            .expect("fixed-size record deserialization cannot fail"))
    }
}

impl HostIpPort {
    pub fn new(ip: std::net::Ipv4Addr, dest_port: u16, src_port: u16) -> Self {
        Self {
            ip: ip.octets(),
            dest_port,
            src_port,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HOST_IP_PORT_SIZE);
        buf.extend_from_slice(&self.ip);
        buf.extend_from_slice(&{ self.dest_port }.to_le_bytes());
        buf.extend_from_slice(&{ self.src_port }.to_le_bytes());
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        check_len(bytes, HOST_IP_PORT_SIZE)?;
        Ok(bincode::deserialize(&bytes[..HOST_IP_PORT_SIZE])
            .expect("fixed-size record deserialization cannot fail"))
    }

    pub fn ip_addr(&self) -> std::net::Ipv4Addr {
        std::net::Ipv4Addr::new(self.ip[0], self.ip[1], self.ip[2], self.ip[3])
    }

    /// The destination the device should send this stream to.
    pub fn dest_addr(&self) -> std::net::SocketAddrV4 {
        std::net::SocketAddrV4::new(self.ip_addr(), { self.dest_port })
    }
}

impl InstallAttitude {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(INSTALL_ATTITUDE_SIZE);
        buf.extend_from_slice(&{ self.roll_deg }.to_le_bytes());
        buf.extend_from_slice(&{ self.pitch_deg }.to_le_bytes());
        buf.extend_from_slice(&{ self.yaw_deg }.to_le_bytes());
        buf.extend_from_slice(&{ self.x_mm }.to_le_bytes());
        buf.extend_from_slice(&{ self.y_mm }.to_le_bytes());
        buf.extend_from_slice(&{ self.z_mm }.to_le_bytes());
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        check_len(bytes, INSTALL_ATTITUDE_SIZE)?;
        Ok(bincode::deserialize(&bytes[..INSTALL_ATTITUDE_SIZE])
            .expect("fixed-size record deserialization cannot fail"))
    }
}

impl FovCfg {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(FOV_CFG_SIZE);
        buf.extend_from_slice(&{ self.yaw_start }.to_le_bytes());
        buf.extend_from_slice(&{ self.yaw_stop }.to_le_bytes());
        buf.extend_from_slice(&{ self.pitch_start }.to_le_bytes());
        buf.extend_from_slice(&{ self.pitch_stop }.to_le_bytes());
        buf.extend_from_slice(&{ self.rsvd }.to_le_bytes());
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        check_len(bytes, FOV_CFG_SIZE)?;
        Ok(bincode::deserialize(&bytes[..FOV_CFG_SIZE])
            .expect("fixed-size record deserialization cannot fail"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_record_sizes() {
        assert_eq!(IP_MASK_GW_SIZE, 12);
        assert_eq!(HOST_IP_PORT_SIZE, 8);
        assert_eq!(INSTALL_ATTITUDE_SIZE, 24);
        assert_eq!(FOV_CFG_SIZE, 20);
    }

    #[test]
    fn test_ip_mask_gw_round_trip() {
        let cfg = IpMaskGw {
            ip: [192, 168, 1, 44],
            mask: [255, 255, 255, 0],
            gateway: [192, 168, 68, 1],
        };
        let bytes = cfg.to_bytes();
        assert_eq!(bytes.len(), IP_MASK_GW_SIZE);
        assert_eq!(IpMaskGw::from_bytes(&bytes).unwrap(), cfg);
    }

    #[test]
    fn test_host_ip_port_round_trip() {
        let cfg = HostIpPort::new(Ipv4Addr::new(192, 168, 1, 47), 56301, 56300);
        let bytes = cfg.to_bytes();
        // Octets first (network order), then little-endian ports
        assert_eq!(&bytes[..4], &[192, 168, 1, 47]);
        assert_eq!(&bytes[4..6], &56301u16.to_le_bytes());
        assert_eq!(HostIpPort::from_bytes(&bytes).unwrap(), cfg);
        assert_eq!(
            cfg.dest_addr(),
            std::net::SocketAddrV4::new(Ipv4Addr::new(192, 168, 1, 47), 56301)
        );
    }

    #[test]
    fn test_attitude_round_trip() {
        let att = InstallAttitude {
            roll_deg: 1.5,
            pitch_deg: -2.25,
            yaw_deg: 90.0,
            x_mm: 10,
            y_mm: -20,
            z_mm: 30,
        };
        assert_eq!(InstallAttitude::from_bytes(&att.to_bytes()).unwrap(), att);
    }

    #[test]
    fn test_fov_round_trip() {
        let fov = FovCfg {
            yaw_start: 0,
            yaw_stop: 360,
            pitch_start: -10,
            pitch_stop: 60,
            rsvd: 0,
        };
        assert_eq!(FovCfg::from_bytes(&fov.to_bytes()).unwrap(), fov);
    }

    #[test]
    fn test_truncated_input() {
        assert!(matches!(
            FovCfg::from_bytes(&[0u8; 10]),
            Err(DecodeError::TruncatedInput {
                expected: 20,
                actual: 10
            })
        ));
    }
}
