// Copyright the QCN Core contributors.
// SPDX-License-Identifier: Apache-2.0

//! Fixed-width, network-byte-order wire types.
//!
//! Each type is a `#[repr(C)]`, zerocopy-derived byte array with a
//! `Display` impl for the conventional human-readable form. These types
//! carry no RFC-scope classification logic (`unicast_scope` and friends) —
//! this crate only needs to move addresses and MAC pairs between a sampled
//! packet and a feedback frame, not reason about them.

use core::fmt;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// A 48-bit Ethernet hardware address.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, Hash, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned,
)]
#[repr(C)]
pub struct MacAddress {
    octets: [u8; 6],
}

impl MacAddress {
    pub const UNSPECIFIED: Self = Self { octets: [0; 6] };

    pub const fn new(octets: [u8; 6]) -> Self {
        Self { octets }
    }

    pub const fn octets(self) -> [u8; 6] {
        self.octets
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(octets: [u8; 6]) -> Self {
        Self::new(octets)
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MacAddress").field(&format_args!("{self}")).finish()
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.octets;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// A two-octet EtherType, as carried in an Ethernet II header.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, Hash, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned,
)]
#[repr(C)]
pub struct EtherType {
    id: [u8; 2],
}

impl EtherType {
    pub const IPV4: Self = Self { id: [0x08, 0x00] };
    /// The QCN feedback EtherType used by `sch_tbf_switch.c` (`ETH_QCN`).
    pub const QCN_FEEDBACK: Self = Self { id: [0xA9, 0xA9] };
}

impl fmt::Debug for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::IPV4 => write!(f, "EtherType(IPv4)"),
            Self::QCN_FEEDBACK => write!(f, "EtherType(QCN)"),
            Self { id: [a, b] } => write!(f, "EtherType(0x{a:02x}{b:02x})"),
        }
    }
}

/// A 32-bit IPv4 address.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, Hash, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned,
)]
#[repr(C)]
pub struct IpV4Address {
    octets: [u8; 4],
}

impl IpV4Address {
    pub const UNSPECIFIED: Self = Self { octets: [0; 4] };

    pub const fn new(octets: [u8; 4]) -> Self {
        Self { octets }
    }

    pub const fn octets(self) -> [u8; 4] {
        self.octets
    }
}

impl From<[u8; 4]> for IpV4Address {
    fn from(octets: [u8; 4]) -> Self {
        Self::new(octets)
    }
}

impl From<std::net::Ipv4Addr> for IpV4Address {
    fn from(addr: std::net::Ipv4Addr) -> Self {
        Self::new(addr.octets())
    }
}

impl From<IpV4Address> for std::net::Ipv4Addr {
    fn from(addr: IpV4Address) -> Self {
        Self::from(addr.octets)
    }
}

impl fmt::Debug for IpV4Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for IpV4Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.octets;
        write!(f, "{a}.{b}.{c}.{d}")
    }
}
