//! Link, Network and Transport Header Decoding
//!
//! Captured frames are peeled layer by layer until the TCP payload is
//! reached:
//!
//! ```text
//! ┌───────────┬──────────────┬────────────┬──────────────────────┐
//! │ link hdr  │ IPv4 / IPv6  │ TCP header │ payload (memcached)  │
//! └───────────┴──────────────┴────────────┴──────────────────────┘
//! ```
//!
//! Header slicing is done by `etherparse`. Link-layer padding is trimmed
//! using the IP length fields, and non-initial IPv4 fragments carry no
//! transport layer. Only segments addressed to the watched destination port
//! with a non-empty payload are kept.

use etherparse::{EtherType, SlicedPacket, TransportSlice};

/// BSD loopback address family header
const NULL_HEADER_LEN: usize = 4;
/// Linux cooked v2 header, protocol type first
const SLL2_HEADER_LEN: usize = 20;

/// Link-layer framing of captured packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    /// BSD and OpenBSD loopback: 4-byte address family
    Null,
    /// Ethernet II, optionally 802.1Q / 802.1ad tagged
    Ethernet,
    /// Bare IPv4 or IPv6 packets
    Raw,
    /// Linux "cooked" capture, used for the `any` device
    LinuxSll,
    /// Linux "cooked" capture v2
    LinuxSll2,
}

impl LinkType {
    /// Maps a pcap `LINKTYPE_*` value.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            // LINKTYPE_NULL and LINKTYPE_LOOP differ only in byte order
            0 | 108 => Some(LinkType::Null),
            1 => Some(LinkType::Ethernet),
            // LINKTYPE_RAW, DLT_RAW as written on some BSDs, LINKTYPE_IPV4/IPV6
            12 | 14 | 101 | 228 | 229 => Some(LinkType::Raw),
            113 => Some(LinkType::LinuxSll),
            276 => Some(LinkType::LinuxSll2),
            _ => None,
        }
    }
}

/// Slices a frame down to its transport layer.
fn slice(link: LinkType, frame: &[u8]) -> Option<SlicedPacket<'_>> {
    match link {
        LinkType::Ethernet => SlicedPacket::from_ethernet(frame).ok(),
        LinkType::LinuxSll => SlicedPacket::from_linux_sll(frame).ok(),
        LinkType::LinuxSll2 => {
            let protocol = EtherType(u16::from_be_bytes([*frame.first()?, *frame.get(1)?]));
            if protocol != EtherType::IPV4 && protocol != EtherType::IPV6 {
                return None;
            }
            SlicedPacket::from_ip(frame.get(SLL2_HEADER_LEN..)?).ok()
        }
        // The address family's byte order varies; the IP version nibble is enough
        LinkType::Null => SlicedPacket::from_ip(frame.get(NULL_HEADER_LEN..)?).ok(),
        LinkType::Raw => SlicedPacket::from_ip(frame).ok(),
    }
}

/// Extracts the application payload of a TCP segment sent to `port`.
///
/// Returns `None` for anything else: other protocols, other ports,
/// malformed headers and empty payloads (bare ACKs, handshakes).
pub fn tcp_payload(link: LinkType, frame: &[u8], port: u16) -> Option<&[u8]> {
    let Some(TransportSlice::Tcp(tcp)) = slice(link, frame)?.transport else {
        return None;
    };
    if tcp.destination_port() != port {
        return None;
    }

    let payload = tcp.payload();
    if payload.is_empty() {
        None
    } else {
        Some(payload)
    }
}
