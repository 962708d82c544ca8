// Copyright the QCN Core contributors.
// SPDX-License-Identifier: Apache-2.0

//! The two feedback transports: a UDP datagram to a loopback port, or a
//! raw Ethernet frame handed to the host's device transmit path.

use super::frame::{EthernetFrame, FeedbackFrame};
use crate::packet::DeviceId;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::debug;

/// Sends a single feedback item, reporting whether it actually reached the
/// wire. A `false` return is counted by the [`super::Emitter`] as lost
/// feedback, not surfaced as an error — losing an occasional feedback frame
/// is an accepted, unreliable-by-design outcome.
pub trait FeedbackTransport<T>: Send + Sync + 'static {
    fn send(&self, item: T) -> impl std::future::Future<Output = bool> + Send;
}

/// Host hook for transmitting a raw Ethernet frame on a given device.
/// Implemented by the host's device layer; this crate only builds the
/// frame and hands it off.
pub trait EthernetTransmit: Send + Sync + 'static {
    fn transmit(&self, device: DeviceId, frame: &EthernetFrame) -> bool;
}

/// Sends [`FeedbackFrame`]s as UDP datagrams to a fixed loopback address.
#[derive(Clone)]
pub struct DatagramTransport {
    socket: Arc<UdpSocket>,
    destination: SocketAddr,
}

impl DatagramTransport {
    pub fn new(socket: Arc<UdpSocket>, destination: SocketAddr) -> Self {
        Self { socket, destination }
    }
}

impl FeedbackTransport<FeedbackFrame> for DatagramTransport {
    async fn send(&self, item: FeedbackFrame) -> bool {
        match self.socket.send_to(item.as_bytes(), self.destination).await {
            Ok(_) => true,
            Err(error) => {
                debug!(%error, "feedback datagram send failed");
                false
            }
        }
    }
}

/// Sends [`EthernetFrame`]s through a host-provided [`EthernetTransmit`] on
/// a fixed ingress device.
#[derive(Clone)]
pub struct EthernetDeviceTransport<E: EthernetTransmit> {
    device: DeviceId,
    transmit: Arc<E>,
}

impl<E: EthernetTransmit> EthernetDeviceTransport<E> {
    pub fn new(device: DeviceId, transmit: Arc<E>) -> Self {
        Self { device, transmit }
    }
}

impl<E: EthernetTransmit> FeedbackTransport<EthernetFrame> for EthernetDeviceTransport<E> {
    async fn send(&self, item: EthernetFrame) -> bool {
        self.transmit.transmit(self.device, &item)
    }
}
