//! The Packet Source Boundary
//!
//! The ingestion loop only needs one thing from the capture layer: the next
//! TCP payload sent to the watched port. Everything about where packets come
//! from (a live interface, a capture file, a test fixture) stays behind
//! [`PacketSource`].

use crate::capture::CaptureError;
use bytes::Bytes;

/// A blocking stream of application payloads.
pub trait PacketSource {
    /// Blocks until the next payload is available.
    ///
    /// Returns `Ok(None)` once the source is exhausted.
    fn next_payload(&mut self) -> Result<Option<Bytes>, CaptureError>;
}

impl<S: PacketSource + ?Sized> PacketSource for Box<S> {
    fn next_payload(&mut self) -> Result<Option<Bytes>, CaptureError> {
        (**self).next_payload()
    }
}

/// Adapts any iterator of payloads into a [`PacketSource`].
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use keyheat::capture::{IterSource, PacketSource};
///
/// let mut source = IterSource::new(vec![Bytes::from_static(b"get a\r\n")]);
/// assert!(source.next_payload().unwrap().is_some());
/// assert!(source.next_payload().unwrap().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct IterSource<I> {
    payloads: I,
}

impl<I> IterSource<I>
where
    I: Iterator<Item = Bytes>,
{
    pub fn new(payloads: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            payloads: payloads.into_iter(),
        }
    }
}

impl<I> PacketSource for IterSource<I>
where
    I: Iterator<Item = Bytes>,
{
    fn next_payload(&mut self) -> Result<Option<Bytes>, CaptureError> {
        Ok(self.payloads.next())
    }
}
