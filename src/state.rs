//! Live device parameter state.
//!
//! [`DeviceState`] is the typed backing store behind the wire-visible
//! parameter registry: one field per [`ParamKey`], read and written through
//! the keyed [`get`](DeviceState::get)/[`set`](DeviceState::set) pair that
//! the command dispatcher uses. Writes that redirect the point-cloud stream
//! surface as a [`StateUpdate`] so the streamer can rebind without the
//! command server knowing anything about sockets.

use std::net::SocketAddrV4;
use std::sync::{Arc, Mutex};

use crate::config::DeviceConfig;
use crate::error::RegistryError;
use crate::protocol::packet::KeyValue;
use crate::protocol::types::{FovCfg, HostIpPort, InstallAttitude, IpMaskGw};
use crate::protocol::fixed_bytes;
use crate::registry::ParamKey;

/// Side effect of a parameter write that another worker must act on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StateUpdate {
    /// The point-cloud destination changed.
    PointHost(SocketAddrV4),
}

#[derive(Debug, Clone)]
pub struct DeviceState {
    pcl_data_type: u8,
    pattern_mode: u8,
    dual_emit_en: u8,
    point_send_en: u8,
    lidar_ip_cfg: IpMaskGw,
    state_info_host: HostIpPort,
    point_data_host: HostIpPort,
    imu_host: HostIpPort,
    ctl_host: HostIpPort,
    log_host: HostIpPort,
    install_attitude: InstallAttitude,
    fov_cfg0: FovCfg,
    fov_cfg1: FovCfg,
    fov_cfg_en: u8,
    detect_mode: u8,
    func_io_cfg: [u8; 4],
    work_mode: u8,
    glass_heat: u8,
    imu_data_en: u8,
    fusa_en: u8,
    sn: Vec<u8>,
    product_info: Vec<u8>,
    version_app: [u8; 4],
    version_loader: [u8; 4],
    version_hardware: [u8; 4],
    mac: [u8; 6],
    cur_work_state: u8,
    core_temp: i32,
    powerup_cnt: u32,
    local_time_now: u64,
    last_sync_time: u64,
    time_offset: i64,
    time_sync_type: u8,
    lidar_diag_status: u16,
    fw_type: u8,
    hms_code: [u32; 8],
}

impl DeviceState {
    pub fn new(config: &DeviceConfig) -> Self {
        let default_fov = FovCfg {
            yaw_start: 0,
            yaw_stop: 360,
            pitch_start: -10,
            pitch_stop: 60,
            rsvd: 0,
        };
        Self {
            pcl_data_type: 1,
            pattern_mode: 0,
            dual_emit_en: 0,
            point_send_en: 0,
            lidar_ip_cfg: IpMaskGw {
                ip: config.device_ip.octets(),
                mask: config.netmask.octets(),
                gateway: config.gateway.octets(),
            },
            state_info_host: HostIpPort::new(
                config.host_ip,
                config.push_port_host,
                config.push_port_device,
            ),
            point_data_host: HostIpPort::new(
                config.host_ip,
                config.point_port_host,
                config.point_port_device,
            ),
            imu_host: HostIpPort::new(
                config.host_ip,
                config.imu_port_host,
                config.imu_port_device,
            ),
            ctl_host: HostIpPort::new(
                config.host_ip,
                config.ctrl_port_host,
                config.ctrl_port_device,
            ),
            log_host: HostIpPort::new(
                config.host_ip,
                config.log_port_host,
                config.log_port_device,
            ),
            install_attitude: InstallAttitude {
                roll_deg: 0.0,
                pitch_deg: 0.0,
                yaw_deg: 0.0,
                x_mm: 0,
                y_mm: 0,
                z_mm: 0,
            },
            fov_cfg0: default_fov,
            fov_cfg1: default_fov,
            fov_cfg_en: 0x03,
            detect_mode: 0,
            func_io_cfg: [0; 4],
            work_mode: 1,
            glass_heat: 0,
            imu_data_en: 1,
            fusa_en: 0,
            sn: config.serial.as_bytes().to_vec(),
            product_info: config.product_info.as_bytes().to_vec(),
            version_app: config.version_app,
            version_loader: config.version_loader,
            version_hardware: config.version_hardware,
            mac: config.mac,
            cur_work_state: 1,
            core_temp: 30,
            powerup_cnt: 10,
            local_time_now: config.time_base_ns,
            last_sync_time: config.time_base_ns.saturating_sub(4),
            time_offset: 4,
            time_sync_type: 2,
            lidar_diag_status: 0,
            fw_type: 1,
            hms_code: [0; 8],
        }
    }

    /// Read one key as a wire record. `None` for keys outside the registry.
    pub fn get(&self, key: u16) -> Option<KeyValue> {
        let param = ParamKey::resolve(key).ok()?;
        let value = match param {
            ParamKey::PclDataType => vec![self.pcl_data_type],
            ParamKey::PatternMode => vec![self.pattern_mode],
            ParamKey::DualEmitEn => vec![self.dual_emit_en],
            ParamKey::PointSendEn => vec![self.point_send_en],
            ParamKey::LidarIpCfg => self.lidar_ip_cfg.to_bytes(),
            ParamKey::StateInfoHostIpCfg => self.state_info_host.to_bytes(),
            ParamKey::PointDataHostIpCfg => self.point_data_host.to_bytes(),
            ParamKey::ImuHostIpCfg => self.imu_host.to_bytes(),
            ParamKey::CtlHostIpCfg => self.ctl_host.to_bytes(),
            ParamKey::LogHostIpCfg => self.log_host.to_bytes(),
            ParamKey::InstallAttitude => self.install_attitude.to_bytes(),
            ParamKey::FovCfg0 => self.fov_cfg0.to_bytes(),
            ParamKey::FovCfg1 => self.fov_cfg1.to_bytes(),
            ParamKey::FovCfgEn => vec![self.fov_cfg_en],
            ParamKey::DetectMode => vec![self.detect_mode],
            ParamKey::FuncIoCfg => self.func_io_cfg.to_vec(),
            ParamKey::WorkMode => vec![self.work_mode],
            ParamKey::GlassHeat => vec![self.glass_heat],
            ParamKey::ImuDataEn => vec![self.imu_data_en],
            ParamKey::FusaEn => vec![self.fusa_en],
            ParamKey::Sn => fixed_bytes::<16>(&self.sn).to_vec(),
            ParamKey::ProductInfo => fixed_bytes::<64>(&self.product_info).to_vec(),
            ParamKey::VersionApp => self.version_app.to_vec(),
            ParamKey::VersionLoader => self.version_loader.to_vec(),
            ParamKey::VersionHardware => self.version_hardware.to_vec(),
            ParamKey::Mac => self.mac.to_vec(),
            ParamKey::CurWorkState => vec![self.cur_work_state],
            ParamKey::CoreTemp => self.core_temp.to_le_bytes().to_vec(),
            ParamKey::PowerUpCnt => self.powerup_cnt.to_le_bytes().to_vec(),
            ParamKey::LocalTimeNow => self.local_time_now.to_le_bytes().to_vec(),
            ParamKey::LastSyncTime => self.last_sync_time.to_le_bytes().to_vec(),
            ParamKey::TimeOffset => self.time_offset.to_le_bytes().to_vec(),
            ParamKey::TimeSyncType => vec![self.time_sync_type],
            ParamKey::LidarDiagStatus => self.lidar_diag_status.to_le_bytes().to_vec(),
            ParamKey::FwType => vec![self.fw_type],
            ParamKey::HmsCode => {
                let mut buf = Vec::with_capacity(32);
                for code in &self.hms_code {
                    buf.extend_from_slice(&code.to_le_bytes());
                }
                buf
            }
        };
        Some(KeyValue::new(key, value))
    }

    /// Write one key. On success, reports the side effect (if any) that
    /// another worker must pick up. The previous value is untouched on error.
    pub fn set(&mut self, key: u16, value: &[u8]) -> Result<Option<StateUpdate>, RegistryError> {
        let param = ParamKey::resolve(key)?;
        param.check_len(value)?;
        // Length is validated above, so the fixed-record decodes cannot fail.
        let infallible = |_| RegistryError::InvalidLength {
            key,
            expected: param.wire_len(),
            actual: value.len(),
        };
        match param {
            ParamKey::PclDataType => self.pcl_data_type = value[0],
            ParamKey::PatternMode => self.pattern_mode = value[0],
            ParamKey::DualEmitEn => self.dual_emit_en = value[0],
            ParamKey::PointSendEn => self.point_send_en = value[0],
            ParamKey::LidarIpCfg => {
                self.lidar_ip_cfg = IpMaskGw::from_bytes(value).map_err(infallible)?
            }
            ParamKey::StateInfoHostIpCfg => {
                self.state_info_host = HostIpPort::from_bytes(value).map_err(infallible)?
            }
            ParamKey::PointDataHostIpCfg => {
                let host = HostIpPort::from_bytes(value).map_err(infallible)?;
                self.point_data_host = host;
                return Ok(Some(StateUpdate::PointHost(host.dest_addr())));
            }
            ParamKey::ImuHostIpCfg => {
                self.imu_host = HostIpPort::from_bytes(value).map_err(infallible)?
            }
            ParamKey::CtlHostIpCfg => {
                self.ctl_host = HostIpPort::from_bytes(value).map_err(infallible)?
            }
            ParamKey::LogHostIpCfg => {
                self.log_host = HostIpPort::from_bytes(value).map_err(infallible)?
            }
            ParamKey::InstallAttitude => {
                self.install_attitude = InstallAttitude::from_bytes(value).map_err(infallible)?
            }
            ParamKey::FovCfg0 => self.fov_cfg0 = FovCfg::from_bytes(value).map_err(infallible)?,
            ParamKey::FovCfg1 => self.fov_cfg1 = FovCfg::from_bytes(value).map_err(infallible)?,
            ParamKey::FovCfgEn => self.fov_cfg_en = value[0],
            ParamKey::DetectMode => self.detect_mode = value[0],
            ParamKey::FuncIoCfg => self.func_io_cfg.copy_from_slice(value),
            ParamKey::WorkMode => self.work_mode = value[0],
            ParamKey::GlassHeat => self.glass_heat = value[0],
            ParamKey::ImuDataEn => self.imu_data_en = value[0],
            ParamKey::FusaEn => self.fusa_en = value[0],
            ParamKey::Sn => self.sn = value.to_vec(),
            ParamKey::ProductInfo => self.product_info = value.to_vec(),
            ParamKey::VersionApp => self.version_app.copy_from_slice(value),
            ParamKey::VersionLoader => self.version_loader.copy_from_slice(value),
            ParamKey::VersionHardware => self.version_hardware.copy_from_slice(value),
            ParamKey::Mac => self.mac.copy_from_slice(value),
            ParamKey::CurWorkState => self.cur_work_state = value[0],
            ParamKey::CoreTemp => {
                self.core_temp = i32::from_le_bytes([value[0], value[1], value[2], value[3]])
            }
            ParamKey::PowerUpCnt => {
                self.powerup_cnt = u32::from_le_bytes([value[0], value[1], value[2], value[3]])
            }
            ParamKey::LocalTimeNow => {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(value);
                self.local_time_now = u64::from_le_bytes(bytes);
            }
            ParamKey::LastSyncTime => {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(value);
                self.last_sync_time = u64::from_le_bytes(bytes);
            }
            ParamKey::TimeOffset => {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(value);
                self.time_offset = i64::from_le_bytes(bytes);
            }
            ParamKey::TimeSyncType => self.time_sync_type = value[0],
            ParamKey::LidarDiagStatus => {
                self.lidar_diag_status = u16::from_le_bytes([value[0], value[1]])
            }
            ParamKey::FwType => self.fw_type = value[0],
            ParamKey::HmsCode => {
                for (i, chunk) in value.chunks_exact(4).enumerate() {
                    self.hms_code[i] = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                }
            }
        }
        Ok(None)
    }

    pub fn serial(&self) -> &[u8] {
        &self.sn
    }

    pub fn pcl_data_type(&self) -> u8 {
        self.pcl_data_type
    }

    pub fn point_dest(&self) -> SocketAddrV4 {
        self.point_data_host.dest_addr()
    }
}

/// Handle shared between the command server and the streamer.
///
/// The lock is only ever held for a single get/set, never across an await.
#[derive(Clone, Debug)]
pub struct SharedDeviceState {
    inner: Arc<Mutex<DeviceState>>,
}

impl SharedDeviceState {
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DeviceState::new(config))),
        }
    }

    pub fn get(&self, key: u16) -> Option<KeyValue> {
        self.inner.lock().unwrap().get(key)
    }

    pub fn set(&self, key: u16, value: &[u8]) -> Result<Option<StateUpdate>, RegistryError> {
        self.inner.lock().unwrap().set(key, value)
    }

    pub fn serial(&self) -> Vec<u8> {
        self.inner.lock().unwrap().serial().to_vec()
    }

    pub fn pcl_data_type(&self) -> u8 {
        self.inner.lock().unwrap().pcl_data_type()
    }

    pub fn point_dest(&self) -> SocketAddrV4 {
        self.inner.lock().unwrap().point_dest()
    }
}
