//! Live Interface Capture
//!
//! Opens a network interface through libpcap with a kernel-side BPF filter
//! so only requests to the watched port reach user space.

use crate::capture::frame::{tcp_payload, LinkType};
use crate::capture::{CaptureError, PacketSource, CAPTURE_SIZE};
use bytes::Bytes;
use pcap::{Active, Capture};
use tracing::info;

/// Read timeout so the capture loop wakes up on idle interfaces.
const READ_TIMEOUT_MS: i32 = 1000;

/// A [`PacketSource`] backed by a live libpcap handle.
pub struct LiveCapture {
    capture: Capture<Active>,
    link: LinkType,
    port: u16,
}

impl LiveCapture {
    /// Opens `interface` (`any` for all interfaces) in promiscuous mode.
    pub fn open(interface: &str, port: u16) -> Result<Self, CaptureError> {
        let mut capture = Capture::from_device(interface)?
            .snaplen(CAPTURE_SIZE)
            .promisc(true)
            .timeout(READ_TIMEOUT_MS)
            .immediate_mode(true)
            .open()?;

        let filter = format!("tcp and dst port {}", port);
        capture.filter(&filter, true)?;

        let code = capture.get_datalink().0 as u32;
        let link = LinkType::from_code(code).ok_or(CaptureError::UnsupportedLinkType(code))?;

        info!(interface, filter = %filter, link = ?link, "Live capture started");

        Ok(Self {
            capture,
            link,
            port,
        })
    }
}

impl PacketSource for LiveCapture {
    fn next_payload(&mut self) -> Result<Option<Bytes>, CaptureError> {
        let (link, port) = (self.link, self.port);
        loop {
            match self.capture.next_packet() {
                Ok(packet) => {
                    if let Some(payload) = tcp_payload(link, packet.data, port) {
                        return Ok(Some(Bytes::copy_from_slice(payload)));
                    }
                }
                Err(pcap::Error::TimeoutExpired) => continue,
                Err(pcap::Error::NoMorePackets) => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }
    }
}
