//! Closed registry of device parameter keys.
//!
//! The key space is the Mid-360 parameter table: the 0x0000 range is
//! host-writable configuration, the 0x8000 range is device-reported status.
//! Every key has a fixed wire length except [`ParamKey::Sn`] and
//! [`ParamKey::ProductInfo`], which are capped strings padded to their
//! maximum width when read back.

use enum_primitive_derive::Primitive;
use num_traits::FromPrimitive;

use crate::error::RegistryError;

#[derive(Primitive, PartialEq, Eq, Debug, Copy, Clone, Hash)]
pub enum ParamKey {
    PclDataType = 0x0000,
    PatternMode = 0x0001,
    DualEmitEn = 0x0002,
    PointSendEn = 0x0003,
    LidarIpCfg = 0x0004,
    StateInfoHostIpCfg = 0x0005,
    PointDataHostIpCfg = 0x0006,
    ImuHostIpCfg = 0x0007,
    CtlHostIpCfg = 0x0008,
    LogHostIpCfg = 0x0009,
    InstallAttitude = 0x0012,
    FovCfg0 = 0x0015,
    FovCfg1 = 0x0016,
    FovCfgEn = 0x0017,
    DetectMode = 0x0018,
    FuncIoCfg = 0x0019,
    WorkMode = 0x001A,
    GlassHeat = 0x001B,
    ImuDataEn = 0x001C,
    FusaEn = 0x001D,
    Sn = 0x8000,
    ProductInfo = 0x8001,
    VersionApp = 0x8002,
    VersionLoader = 0x8003,
    VersionHardware = 0x8004,
    Mac = 0x8005,
    CurWorkState = 0x8006,
    CoreTemp = 0x8007,
    PowerUpCnt = 0x8008,
    LocalTimeNow = 0x8009,
    LastSyncTime = 0x800A,
    TimeOffset = 0x800B,
    TimeSyncType = 0x800C,
    LidarDiagStatus = 0x800E,
    FwType = 0x8010,
    HmsCode = 0x8011,
}

impl ParamKey {
    /// Resolve a raw wire key, rejecting anything outside the registry.
    pub fn resolve(key: u16) -> Result<Self, RegistryError> {
        Self::from_u16(key).ok_or(RegistryError::Unsupported(key))
    }

    /// Wire length of this key's value. For the two capped string keys this
    /// is the padded maximum.
    pub fn wire_len(&self) -> usize {
        match self {
            ParamKey::PclDataType
            | ParamKey::PatternMode
            | ParamKey::DualEmitEn
            | ParamKey::PointSendEn
            | ParamKey::FovCfgEn
            | ParamKey::DetectMode
            | ParamKey::WorkMode
            | ParamKey::GlassHeat
            | ParamKey::ImuDataEn
            | ParamKey::FusaEn
            | ParamKey::CurWorkState
            | ParamKey::TimeSyncType
            | ParamKey::FwType => 1,
            ParamKey::LidarDiagStatus => 2,
            ParamKey::FuncIoCfg
            | ParamKey::VersionApp
            | ParamKey::VersionLoader
            | ParamKey::VersionHardware
            | ParamKey::CoreTemp
            | ParamKey::PowerUpCnt => 4,
            ParamKey::Mac => 6,
            ParamKey::StateInfoHostIpCfg
            | ParamKey::PointDataHostIpCfg
            | ParamKey::ImuHostIpCfg
            | ParamKey::CtlHostIpCfg
            | ParamKey::LogHostIpCfg
            | ParamKey::LocalTimeNow
            | ParamKey::LastSyncTime
            | ParamKey::TimeOffset => 8,
            ParamKey::LidarIpCfg => 12,
            ParamKey::Sn => 16,
            ParamKey::FovCfg0 | ParamKey::FovCfg1 => 20,
            ParamKey::InstallAttitude => 24,
            ParamKey::HmsCode => 32,
            ParamKey::ProductInfo => 64,
        }
    }

    /// Whether the value may be shorter than [`wire_len`](Self::wire_len)
    /// on write (zero-padded on read).
    pub fn is_variable(&self) -> bool {
        matches!(self, ParamKey::Sn | ParamKey::ProductInfo)
    }

    /// Validate a candidate value's length for a write to this key.
    pub fn check_len(&self, value: &[u8]) -> Result<(), RegistryError> {
        let expected = self.wire_len();
        let ok = if self.is_variable() {
            value.len() <= expected
        } else {
            value.len() == expected
        };
        if ok {
            Ok(())
        } else {
            Err(RegistryError::InvalidLength {
                key: *self as u16,
                expected,
                actual: value.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_keys() {
        assert_eq!(ParamKey::resolve(0x0000).unwrap(), ParamKey::PclDataType);
        assert_eq!(ParamKey::resolve(0x001D).unwrap(), ParamKey::FusaEn);
        assert_eq!(ParamKey::resolve(0x8011).unwrap(), ParamKey::HmsCode);
    }

    #[test]
    fn test_resolve_unknown_key() {
        // 0x800D and 0x800F are gaps in the table, not just out-of-range
        for key in [0x000A, 0x800D, 0x800F, 0x9000, 0xFFFF] {
            assert_eq!(ParamKey::resolve(key), Err(RegistryError::Unsupported(key)));
        }
    }

    #[test]
    fn test_wire_lengths() {
        assert_eq!(ParamKey::PclDataType.wire_len(), 1);
        assert_eq!(ParamKey::LidarIpCfg.wire_len(), 12);
        assert_eq!(ParamKey::PointDataHostIpCfg.wire_len(), 8);
        assert_eq!(ParamKey::InstallAttitude.wire_len(), 24);
        assert_eq!(ParamKey::FovCfg0.wire_len(), 20);
        assert_eq!(ParamKey::Sn.wire_len(), 16);
        assert_eq!(ParamKey::ProductInfo.wire_len(), 64);
        assert_eq!(ParamKey::Mac.wire_len(), 6);
        assert_eq!(ParamKey::HmsCode.wire_len(), 32);
        assert_eq!(ParamKey::LidarDiagStatus.wire_len(), 2);
    }

    #[test]
    fn test_check_len_exact_keys() {
        assert!(ParamKey::WorkMode.check_len(&[1]).is_ok());
        assert_eq!(
            ParamKey::WorkMode.check_len(&[1, 2]),
            Err(RegistryError::InvalidLength {
                key: 0x001A,
                expected: 1,
                actual: 2
            })
        );
    }

    #[test]
    fn test_check_len_capped_keys() {
        assert!(ParamKey::Sn.check_len(b"short").is_ok());
        assert!(ParamKey::Sn.check_len(&[0u8; 16]).is_ok());
        assert!(ParamKey::Sn.check_len(&[0u8; 17]).is_err());
    }
}
