//! Emulated device identity and addressing.
//!
//! Everything the emulator needs to impersonate one Mid-360 unit lives here:
//! its network identity, the full UDP port map, and the clock base used to
//! seed point timestamps. Defaults match the reference unit; tests override
//! the addresses with loopback and ephemeral ports.

use std::net::{Ipv4Addr, SocketAddrV4};

use crate::protocol;

#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// IP the device claims and binds its control port on.
    pub device_ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub gateway: Ipv4Addr,
    /// Host the device initially streams data to.
    pub host_ip: Ipv4Addr,

    pub broadcast_port: u16,
    pub ctrl_port_device: u16,
    pub ctrl_port_host: u16,
    pub push_port_device: u16,
    pub push_port_host: u16,
    pub point_port_device: u16,
    pub point_port_host: u16,
    pub imu_port_device: u16,
    pub imu_port_host: u16,
    pub log_port_device: u16,
    pub log_port_host: u16,

    pub serial: String,
    pub product_info: String,
    pub mac: [u8; 6],
    pub version_app: [u8; 4],
    pub version_loader: [u8; 4],
    pub version_hardware: [u8; 4],

    /// Nanosecond base for the per-point clock and `local_time_now`.
    pub time_base_ns: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_ip: Ipv4Addr::new(192, 168, 1, 44),
            netmask: Ipv4Addr::new(255, 255, 255, 0),
            gateway: Ipv4Addr::new(192, 168, 68, 1),
            host_ip: Ipv4Addr::new(192, 168, 1, 47),
            broadcast_port: protocol::BROADCAST_PORT,
            ctrl_port_device: protocol::CTRL_CMD_PORT_DEVICE,
            ctrl_port_host: protocol::CTRL_CMD_PORT_HOST,
            push_port_device: protocol::PUSH_CMD_PORT_DEVICE,
            push_port_host: protocol::PUSH_CMD_PORT_HOST,
            point_port_device: protocol::POINT_DATA_PORT_DEVICE,
            point_port_host: protocol::POINT_DATA_PORT_HOST,
            imu_port_device: protocol::IMU_DATA_PORT_DEVICE,
            imu_port_host: protocol::IMU_DATA_PORT_HOST,
            log_port_device: protocol::LOG_DATA_PORT_DEVICE,
            log_port_host: protocol::LOG_DATA_PORT_HOST,
            serial: "Tux-LivoxLidar1".to_string(),
            product_info: "Livox Lidar Mid-360 2021/12/01".to_string(),
            mac: [0x7C, 0x7A, 0x91, 0x33, 0xBE, 0x3B],
            version_app: [1, 2, 3, 4],
            version_loader: [1, 2, 3, 4],
            version_hardware: [1, 2, 3, 4],
            time_base_ns: 3_875_213_548_323_846_324,
        }
    }
}

impl DeviceConfig {
    /// Where the discovery listener binds. Broadcasts arrive on the wildcard
    /// address, not the device IP.
    pub fn broadcast_bind(&self) -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, self.broadcast_port)
    }

    pub fn ctrl_bind(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.device_ip, self.ctrl_port_device)
    }

    pub fn point_bind(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.device_ip, self.point_port_device)
    }

    /// Initial point-cloud destination, before any host reconfigures it.
    pub fn point_dest(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.host_ip, self.point_port_host)
    }
}
