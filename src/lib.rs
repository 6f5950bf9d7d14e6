//! Network emulator for a Livox Mid-360-class LiDAR.
//!
//! The emulator impersonates one device on the local segment well enough for
//! an SDK to discover it, read and write its parameters, and receive a point
//! cloud, without any hardware present. Points come from a pre-recorded
//! replay file.
//!
//! ## Architecture
//!
//! Two independent workers run as subsystems under a graceful-shutdown
//! toplevel:
//!
//! - [`server::CommandServer`] - listens on the broadcast discovery port and
//!   the unicast control port, answering device-type queries and parameter
//!   inquire/configure requests.
//! - [`streamer::PointCloudStreamer`] - packs replayed points into wire
//!   frames and sends them to the configured host on a fixed cadence.
//!
//! They share one [`state::SharedDeviceState`]; parameter writes that move
//! the point-cloud destination reach the streamer over a broadcast channel,
//! so the streamer retargets mid-stream without restarting.
//!
//! ## Key Components
//!
//! - [`protocol`] - pure wire codecs for both planes
//! - [`registry::ParamKey`] - the closed parameter key table
//! - [`state::DeviceState`] - typed backing store behind the registry
//! - [`replay::ReplaySource`] - line-oriented point source
//!
//! A datagram that fails to decode is dropped and logged; neither worker
//! ever dies on bad input. The streamer ends on its own once the replay file
//! is exhausted, which leaves the command server running.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::Parser;

use crate::config::DeviceConfig;

pub mod config;
pub mod error;
pub mod network;
pub mod protocol;
pub mod registry;
pub mod replay;
pub mod server;
pub mod state;
pub mod streamer;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "Livox Mid-360 LiDAR network emulator")]
pub struct Cli {
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    /// Replay file: one point per line, `x y z reflectivity` in millimetres
    pub replay_file: PathBuf,

    /// IP address the emulated device claims
    #[arg(short, long)]
    pub device_ip: Option<Ipv4Addr>,

    /// Initial host to stream point data to
    #[arg(long)]
    pub host_ip: Option<Ipv4Addr>,
}

impl Cli {
    /// Device configuration with the command-line overrides applied.
    pub fn device_config(&self) -> DeviceConfig {
        let mut config = DeviceConfig::default();
        if let Some(device_ip) = self.device_ip {
            config.device_ip = device_ip;
        }
        if let Some(host_ip) = self.host_ip {
            config.host_ip = host_ip;
        }
        config
    }
}
