//! Command server worker.
//!
//! Listens on two endpoints: the broadcast discovery port (device-type
//! queries from SDKs scanning the segment) and the unicast control port
//! (parameter inquire/configure). Each datagram is handled independently;
//! anything that does not decode into a well-formed request is dropped and
//! the loop keeps running.

use tokio::sync::broadcast;
use tokio_graceful_shutdown::SubsystemHandle;

use crate::config::DeviceConfig;
use crate::error::EmuError;
use crate::network::create_udp_listen;
use crate::protocol::packet::{
    CmdId, CmdType, CommandPacket, DeviceInfoAck, KeyValue, ParamInquireAck, ParamInquireReq,
    ControlResponse,
};
use crate::protocol::{fixed_bytes, DEVICE_TYPE_MID360, MAX_UDP_PACKET};
use crate::state::{SharedDeviceState, StateUpdate};

pub struct CommandServer {
    config: DeviceConfig,
    state: SharedDeviceState,
    update_tx: broadcast::Sender<StateUpdate>,
}

impl CommandServer {
    pub fn new(
        config: DeviceConfig,
        state: SharedDeviceState,
        update_tx: broadcast::Sender<StateUpdate>,
    ) -> Self {
        Self {
            config,
            state,
            update_tx,
        }
    }

    pub async fn run(self, subsys: SubsystemHandle) -> Result<(), EmuError> {
        let broadcast_sock = create_udp_listen(&self.config.broadcast_bind(), true)?;
        let ctrl_sock = create_udp_listen(&self.config.ctrl_bind(), false)?;
        log::info!(
            "Command server listening on {} (discovery) and {} (control)",
            self.config.broadcast_bind(),
            self.config.ctrl_bind()
        );

        let mut discovery_buf = [0u8; MAX_UDP_PACKET];
        let mut ctrl_buf = [0u8; MAX_UDP_PACKET];
        loop {
            tokio::select! {
                _ = subsys.on_shutdown_requested() => {
                    log::info!("Command server shutting down");
                    return Ok(());
                },
                r = broadcast_sock.recv_from(&mut discovery_buf) => {
                    match r {
                        Ok((len, addr)) => {
                            if let Some(reply) = self.handle_datagram(&discovery_buf[..len]) {
                                if let Err(e) = broadcast_sock.send_to(&reply, addr).await {
                                    log::warn!("Failed to reply to {addr}: {e}");
                                }
                            }
                        }
                        Err(e) => log::warn!("Discovery receive failed: {e}"),
                    }
                },
                r = ctrl_sock.recv_from(&mut ctrl_buf) => {
                    match r {
                        Ok((len, addr)) => {
                            if let Some(reply) = self.handle_datagram(&ctrl_buf[..len]) {
                                if let Err(e) = ctrl_sock.send_to(&reply, addr).await {
                                    log::warn!("Failed to reply to {addr}: {e}");
                                }
                            }
                        }
                        Err(e) => log::warn!("Control receive failed: {e}"),
                    }
                },
            }
        }
    }

    /// Handle one received datagram, returning the encoded reply if the
    /// request warrants one. Pure apart from state access, so tests drive it
    /// without sockets.
    pub fn handle_datagram(&self, data: &[u8]) -> Option<Vec<u8>> {
        let request = match CommandPacket::decode(data) {
            Ok(packet) => packet,
            Err(e) => {
                log::debug!("Dropping undecodable datagram: {e}");
                return None;
            }
        };
        if request.packet_type() != Some(CmdType::Req) {
            return None;
        }
        match request.command() {
            Some(CmdId::DeviceTypeQuery) => Some(self.handle_device_query(&request)),
            Some(CmdId::ParamInquire) => self.handle_inquire(&request),
            Some(CmdId::ParamConfigure) => Some(self.handle_configure(&request)),
            None => {
                log::debug!("Ignoring unknown command id {:#06x}", request.cmd_id);
                None
            }
        }
    }

    fn handle_device_query(&self, request: &CommandPacket) -> Vec<u8> {
        let ack = DeviceInfoAck {
            ret: 0,
            dev_type: DEVICE_TYPE_MID360,
            serial: fixed_bytes(&self.state.serial()),
            ip: self.config.device_ip.octets(),
            cmd_port: self.config.ctrl_port_device,
        };
        log::debug!("Answering device-type query (seq {})", request.seq_num);
        CommandPacket::from_device(
            request.seq_num,
            CmdId::DeviceTypeQuery,
            CmdType::Ack,
            ack.to_bytes(),
        )
        .encode()
    }

    fn handle_inquire(&self, request: &CommandPacket) -> Option<Vec<u8>> {
        let req = match ParamInquireReq::decode(&request.payload) {
            Ok(req) => req,
            Err(e) => {
                log::debug!("Dropping malformed inquire body: {e}");
                return None;
            }
        };
        // Resolve keys in order; the first unknown key truncates the answer
        // and flags the whole inquiry as partial.
        let mut ret = 0;
        let mut kvs = Vec::with_capacity(req.keys.len());
        for &key in &req.keys {
            match self.state.get(key) {
                Some(kv) => kvs.push(kv),
                None => {
                    log::debug!("Inquire for unsupported key {key:#06x}");
                    ret = 1;
                    break;
                }
            }
        }
        let ack = ParamInquireAck { ret, kvs };
        Some(
            CommandPacket::from_device(
                request.seq_num,
                CmdId::ParamInquire,
                CmdType::Ack,
                ack.encode(),
            )
            .encode(),
        )
    }

    fn handle_configure(&self, request: &CommandPacket) -> Vec<u8> {
        let response = self.apply_configure(&request.payload);
        CommandPacket::from_device(
            request.seq_num,
            CmdId::ParamConfigure,
            CmdType::Ack,
            response.encode(),
        )
        .encode()
    }

    /// Apply a configure body record by record, stopping at the first bad
    /// one. Records applied before the failure stay applied; the response
    /// names the offending key (0 when the failure precedes a readable key).
    fn apply_configure(&self, payload: &[u8]) -> ControlResponse {
        if payload.len() < 4 {
            return ControlResponse::failure(0);
        }
        let key_num = u16::from_le_bytes([payload[0], payload[1]]) as usize;
        let mut offset = 4;
        for _ in 0..key_num {
            if payload.len() - offset < 4 {
                return ControlResponse::failure(0);
            }
            let kv = match KeyValue::decode_at(payload, &mut offset) {
                Ok(kv) => kv,
                Err(_) => {
                    let key = u16::from_le_bytes([payload[offset], payload[offset + 1]]);
                    log::debug!("Configure record for key {key:#06x} overruns body");
                    return ControlResponse::failure(key);
                }
            };
            match self.state.set(kv.key, &kv.value) {
                Ok(Some(update)) => {
                    log::info!("Parameter write triggered {update:?}");
                    // No receiver just means the streamer is gone already
                    let _ = self.update_tx.send(update);
                }
                Ok(None) => {}
                Err(e) => {
                    log::debug!("Configure rejected: {e}");
                    return ControlResponse::failure(kv.key);
                }
            }
        }
        ControlResponse::OK
    }
}
