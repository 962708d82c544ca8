// Copyright the QCN Core contributors.
// SPDX-License-Identifier: Apache-2.0

//! The feedback wire format.

use crate::{
    inet::{EtherType, IpV4Address, MacAddress},
    qcn::FeedbackSample,
    packet::Packet,
};
use byteorder::NetworkEndian;
use zerocopy::{
    byteorder::{I32, U32},
    FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
};

type BigEndianU32 = U32<NetworkEndian>;
type BigEndianI32 = I32<NetworkEndian>;

/// The 20-byte datagram payload: `DA(4) | SA(4) | Fb(4) | qoff(4) | qdelta(4)`,
/// all big-endian.
#[derive(Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct FeedbackFrame {
    da: IpV4Address,
    sa: IpV4Address,
    fb: BigEndianU32,
    qoff: BigEndianI32,
    qdelta: BigEndianI32,
}

impl core::fmt::Debug for FeedbackFrame {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FeedbackFrame")
            .field("da", &self.da)
            .field("sa", &self.sa)
            .field("fb", &self.fb.get())
            .field("qoff", &self.qoff.get())
            .field("qdelta", &self.qdelta.get())
            .finish()
    }
}

impl FeedbackFrame {
    pub fn new(da: IpV4Address, sa: IpV4Address, sample: FeedbackSample) -> Self {
        Self {
            da,
            sa,
            fb: U32::new(u32::from(sample.qntz_fb)),
            qoff: I32::new(sample.qoff as i32),
            qdelta: I32::new(sample.qdelta as i32),
        }
    }

    /// Builds the frame for a sampled packet: `DA` is the original packet's
    /// destination, `SA` its source.
    pub fn for_packet<P: Packet>(packet: &P, sample: FeedbackSample) -> Option<Self> {
        let da = packet.destination_ipv4()?;
        let sa = packet.source_ipv4()?;
        Some(Self::new(da, sa, sample))
    }

    pub fn destination(&self) -> IpV4Address {
        self.da
    }

    pub fn source(&self) -> IpV4Address {
        self.sa
    }

    /// The 6-bit quantized feedback value (low 6 bits significant).
    pub fn qntz_fb(&self) -> u8 {
        (self.fb.get() & 0x3F) as u8
    }

    pub fn qoff(&self) -> i32 {
        self.qoff.get()
    }

    pub fn qdelta(&self) -> i32 {
        self.qdelta.get()
    }

    pub fn as_bytes(&self) -> &[u8] {
        zerocopy::IntoBytes::as_bytes(self)
    }
}

/// The Ethernet-encapsulated feedback frame: `DMAC(6) | SMAC(6) |
/// EtherType=0xA9A9(2) | FeedbackFrame(20)` = 34 bytes on the wire.
///
/// `qcnskb_create` in the reference kernel qdisc only ever writes
/// `2*ETH_ALEN + 2 + sizeof(struct qcn_frame)` = `6+6+2+20` = 34 bytes onto
/// the skb it builds (its 64-byte `alloc_skb` call is headroom, not
/// payload) — see `DESIGN.md` for why this crate follows that figure.
#[derive(Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct EthernetFrame {
    destination_mac: MacAddress,
    source_mac: MacAddress,
    ether_type: EtherType,
    payload: FeedbackFrame,
}

impl EthernetFrame {
    /// Builds the Ethernet encapsulation for a sampled packet. The feedback
    /// frame's source is the sampled packet's destination and vice versa —
    /// the inversion that sends feedback back toward the sender.
    pub fn for_packet<P: Packet>(packet: &P, payload: FeedbackFrame) -> Self {
        Self {
            destination_mac: packet.source_mac(),
            source_mac: packet.destination_mac(),
            ether_type: EtherType::QCN_FEEDBACK,
            payload,
        }
    }

    pub fn payload(&self) -> FeedbackFrame {
        self.payload
    }

    pub fn as_bytes(&self) -> &[u8] {
        zerocopy::IntoBytes::as_bytes(self)
    }
}
