//! Classic pcap Stream Reader
//!
//! Reads the libpcap savefile format from any [`Read`]er, which covers both
//! replaying a capture file and consuming a live pipe such as
//! `tcpdump -i any -w - 'tcp dst port 11211' | keyheat --read -`.
//!
//! Record framing (byte order, microsecond or nanosecond timestamps) is
//! handled by `pcap-file`; frames are then decoded with
//! [`tcp_payload`](crate::capture::tcp_payload).

use crate::capture::frame::{tcp_payload, LinkType};
use crate::capture::{CaptureError, PacketSource};
use bytes::Bytes;
use pcap_file::PcapError;
use std::io::{ErrorKind, Read};
use tracing::{debug, warn};

/// A [`PacketSource`] reading a pcap stream.
pub struct PcapReader<R: Read> {
    reader: pcap_file::pcap::PcapReader<R>,
    link: LinkType,
    port: u16,
    frames_read: u64,
}

impl<R: Read> PcapReader<R> {
    /// Reads the global header and prepares to yield payloads sent to `port`.
    pub fn new(reader: R, port: u16) -> Result<Self, CaptureError> {
        let reader = pcap_file::pcap::PcapReader::new(reader)?;
        let header = reader.header();

        let code = u32::from(header.datalink);
        let link = LinkType::from_code(code).ok_or(CaptureError::UnsupportedLinkType(code))?;

        debug!(
            link = ?link,
            endianness = ?header.endianness,
            resolution = ?header.ts_resolution,
            "Opened pcap stream"
        );

        Ok(Self {
            reader,
            link,
            port,
            frames_read: 0,
        })
    }

    pub fn link_type(&self) -> LinkType {
        self.link
    }

    /// Frames read so far, including those that carried no payload.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }
}

impl<R: Read> PacketSource for PcapReader<R> {
    fn next_payload(&mut self) -> Result<Option<Bytes>, CaptureError> {
        let (link, port) = (self.link, self.port);

        loop {
            let packet = match self.reader.next_packet() {
                None => return Ok(None),
                Some(Ok(packet)) => packet,
                // A capture cut short while being written
                Some(Err(PcapError::IncompleteBuffer)) => {
                    warn!(frames = self.frames_read, "Capture ends inside a record");
                    return Ok(None);
                }
                Some(Err(PcapError::IoError(e))) if e.kind() == ErrorKind::UnexpectedEof => {
                    warn!(frames = self.frames_read, "Capture ends inside a record");
                    return Ok(None);
                }
                Some(Err(e)) => return Err(e.into()),
            };

            self.frames_read += 1;
            if let Some(payload) = tcp_payload(link, &packet.data, port) {
                return Ok(Some(Bytes::copy_from_slice(payload)));
            }
        }
    }
}
