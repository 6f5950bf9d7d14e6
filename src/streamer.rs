//! Point-cloud streamer worker.
//!
//! Replays the recorded points as wire frames on a 10 ms cadence, up to 96
//! points per frame, until the replay file runs out. The destination starts
//! at the configured host and follows `point_data_host_ip_cfg` rewrites,
//! which arrive over the update channel from the command server. Running out
//! of points ends this worker only; the command server keeps answering.

use std::net::SocketAddrV4;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_graceful_shutdown::SubsystemHandle;

use crate::config::DeviceConfig;
use crate::error::EmuError;
use crate::network::create_udp_send;
use crate::protocol::data::{DataFrame, DataType, PointClock, RawPoint, MAX_POINTS_PER_FRAME};
use crate::replay::ReplaySource;
use crate::state::{SharedDeviceState, StateUpdate};

/// Delay between consecutive frames.
const FRAME_INTERVAL: Duration = Duration::from_millis(10);

pub struct PointCloudStreamer {
    config: DeviceConfig,
    state: SharedDeviceState,
    source: ReplaySource,
    update_rx: broadcast::Receiver<StateUpdate>,
}

impl PointCloudStreamer {
    pub fn new(
        config: DeviceConfig,
        state: SharedDeviceState,
        source: ReplaySource,
        update_rx: broadcast::Receiver<StateUpdate>,
    ) -> Self {
        Self {
            config,
            state,
            source,
            update_rx,
        }
    }

    pub async fn run(mut self, subsys: SubsystemHandle) -> Result<(), EmuError> {
        let socket = create_udp_send(&self.config.point_bind())?;
        let mut dest: SocketAddrV4 = self.state.point_dest();
        log::info!(
            "Streaming point cloud from {} to {}",
            self.config.point_bind(),
            dest
        );

        let mut clock = PointClock::new(self.config.time_base_ns);
        let mut udp_cnt: u16 = 0;
        let mut frame_cnt: u8 = 0;
        // If the update channel ever closes we fall back to polling the
        // shared state once per frame.
        let mut watch_updates = true;

        let mut interval = tokio::time::interval(FRAME_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = subsys.on_shutdown_requested() => {
                    log::info!("Point-cloud streamer shutting down");
                    return Ok(());
                },
                update = self.update_rx.recv(), if watch_updates => {
                    match update {
                        Ok(StateUpdate::PointHost(addr)) => {
                            log::info!("Point-cloud destination changed to {addr}");
                            dest = addr;
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            log::warn!("Missed {n} state updates, re-reading destination");
                            dest = self.state.point_dest();
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            watch_updates = false;
                        }
                    }
                },
                _ = interval.tick() => {
                    if !watch_updates {
                        dest = self.state.point_dest();
                    }
                    let points = collect_frame(&mut self.source, &mut clock, MAX_POINTS_PER_FRAME);
                    if points.is_empty() {
                        log::info!("Replay exhausted after {udp_cnt} frames, streamer done");
                        return Ok(());
                    }
                    let data_type = DataType::from_registry_byte(self.state.pcl_data_type());
                    let frame = DataFrame::assemble(&points, data_type, udp_cnt, frame_cnt);
                    if let Err(e) = socket.send_to(&frame.encode(), dest).await {
                        log::warn!("Failed to send frame {udp_cnt} to {dest}: {e}");
                    }
                    udp_cnt = udp_cnt.wrapping_add(1);
                    frame_cnt = frame_cnt.wrapping_add(1);
                },
            }
        }
    }
}

/// Pull the next frame's worth of points, stamping each with the per-point
/// clock. An empty result means the replay is exhausted.
pub fn collect_frame(
    source: &mut ReplaySource,
    clock: &mut PointClock,
    max_points: usize,
) -> Vec<(RawPoint, u64)> {
    let mut points = Vec::with_capacity(max_points);
    while points.len() < max_points {
        match source.next_point() {
            Some(point) => points.push((point, clock.tick())),
            None => break,
        }
    }
    points
}
