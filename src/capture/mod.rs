//! Packet Capture Module
//!
//! This module turns captured traffic into the stream of TCP payloads the
//! ingestion loop consumes. No TCP reassembly is attempted: each captured
//! segment is delivered, and later parsed, on its own.
//!
//! ## Sources
//!
//! - [`PcapReader`]: classic pcap from a file or stdin
//! - `LiveCapture`: a live interface through libpcap (`live-capture` feature)
//! - [`IterSource`]: any iterator of payloads
//!
//! ## Example
//!
//! ```no_run
//! use keyheat::capture::{PacketSource, PcapReader};
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! let file = BufReader::new(File::open("memcached.pcap")?);
//! let mut source = PcapReader::new(file, 11211)?;
//! while let Some(payload) = source.next_payload()? {
//!     println!("{} bytes", payload.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod frame;
#[cfg(feature = "live-capture")]
pub mod live;
pub mod pcap_file;
pub mod source;

use thiserror::Error;

// Re-export commonly used types
pub use frame::{tcp_payload, LinkType};
#[cfg(feature = "live-capture")]
pub use live::LiveCapture;
pub use pcap_file::PcapReader;
pub use source::{IterSource, PacketSource};

/// Snapshot length for live captures, enough for jumbo frames
pub const CAPTURE_SIZE: i32 = 9000;

/// Errors raised by packet sources.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The stream is not a readable classic pcap capture
    #[error("invalid pcap stream (pcapng is not supported): {0}")]
    File(#[from] ::pcap_file::PcapError),

    /// The capture uses a link layer we cannot decode
    #[error("unsupported link type {0}")]
    UnsupportedLinkType(u32),

    /// libpcap reported an error
    #[cfg(feature = "live-capture")]
    #[error("capture error: {0}")]
    Pcap(#[from] pcap::Error),

    /// Live capture was requested but is not compiled in
    #[error("live capture is not available: {0}")]
    Unavailable(String),
}

/// Opens a live capture on `interface` for requests to `port`.
pub fn open_live(interface: &str, port: u16) -> Result<Box<dyn PacketSource + Send>, CaptureError> {
    #[cfg(feature = "live-capture")]
    {
        Ok(Box::new(LiveCapture::open(interface, port)?))
    }

    #[cfg(not(feature = "live-capture"))]
    {
        let _ = port;
        Err(CaptureError::Unavailable(format!(
            "built without the `live-capture` feature, cannot open {interface}; \
             replay a capture with --read instead"
        )))
    }
}
