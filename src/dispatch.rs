use std::io;
use std::net::SocketAddrV4;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::task::JoinSet;

use crate::common::{self, MagicPacket, WOL_PORT};
use crate::error::WakeError;
use crate::iface::{self, BroadcastTarget, InterfaceSource, SystemInterfaces};

/// Sends one magic packet towards one broadcast target.
///
/// Implementations own the whole socket lifecycle for the call: the socket
/// must be closed when `send` returns, on every path.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, target: &BroadcastTarget, packet: &MagicPacket) -> io::Result<()>;
}

/// A fresh broadcast UDP socket per target, bound to the interface's own address.
#[derive(Debug, Default, Clone, Copy)]
pub struct UdpTransport;

#[async_trait]
impl Transport for UdpTransport {
    async fn send(&self, target: &BroadcastTarget, packet: &MagicPacket) -> io::Result<()> {
        let socket = UdpSocket::bind(SocketAddrV4::new(target.source_address, 0)).await?;
        socket.set_broadcast(true)?;

        let dest = SocketAddrV4::new(target.broadcast_address, WOL_PORT);
        let sent = socket.send_to(packet.as_bytes(), dest).await?;
        if sent != packet.as_bytes().len() {
            return Err(io::Error::new(io::ErrorKind::WriteZero,
                format!("short send ({sent} of {} bytes)", packet.as_bytes().len())));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WakeReport {
    pub mac: String,
    pub targets: Vec<BroadcastTarget>,
}

pub type WakeOutcome = Result<WakeReport, WakeError>;

pub struct Dispatcher {
    interfaces: Arc<dyn InterfaceSource>,
    transport: Arc<dyn Transport>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Arc::new(SystemInterfaces), Arc::new(UdpTransport))
    }
}

impl Dispatcher {
    pub fn new(interfaces: Arc<dyn InterfaceSource>, transport: Arc<dyn Transport>) -> Self {
        Self { interfaces, transport }
    }

    /// Broadcasts a magic packet for `mac` from every eligible interface.
    ///
    /// Succeeds only if every per-interface send succeeded. All sends run
    /// to completion even when some of them fail.
    pub async fn send_wake(&self, mac: &str) -> WakeOutcome {
        let packet = common::encode_magic_packet(mac)?;

        let surveyed = self.interfaces.survey();
        let targets = iface::broadcast_targets(&surveyed);
        if targets.is_empty() {
            log::error!("no suitable interface to wake {:?} from ({} address(es) surveyed)",
                packet, surveyed.len());
            return Err(WakeError::NoEligibleInterfaces);
        }

        let mut sends = JoinSet::new();
        for target in targets.iter().cloned() {
            let transport = self.transport.clone();
            let packet = packet.clone();
            sends.spawn(async move {
                let res = transport.send(&target, &packet).await;
                (target, res)
            });
        }

        let attempted = targets.len();
        let mut failed = 0;
        while let Some(joined) = sends.join_next().await {
            match joined {
                Ok((target, Ok(()))) => {
                    log::debug!("[dispatch][{}] sent {:?} to {}:{}",
                        target.interface_name, packet, target.broadcast_address, WOL_PORT);
                }
                Ok((target, Err(e))) => {
                    log::warn!("[dispatch][{}] send to {} failed: {}",
                        target.interface_name, target.broadcast_address, e);
                    failed += 1;
                }
                Err(e) => {
                    log::warn!("[dispatch] send task aborted: {}", e);
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(WakeError::PartialOrTotalSendFailure { failed, attempted });
        }

        log::info!("woke {:?} via {} interface(s)", packet, attempted);
        Ok(WakeReport { mac: common::normalize_mac(mac), targets })
    }
}

/// Wakes `mac` using the host's interfaces and real UDP sockets.
pub async fn send_wake(mac: &str) -> WakeOutcome {
    Dispatcher::default().send_wake(mac).await
}
