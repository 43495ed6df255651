//! Voice transport frame definitions.

use bytes::Bytes;

/// One audio frame as delivered by (or handed to) the voice transport.
///
/// Frames are consumed immediately by the engines and never retained; the
/// payload is a cheaply-clonable [`Bytes`] so a frame can cross a channel
/// without copying the encoded audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    /// Opaque identifier of the remote speaker this frame belongs to
    /// (the RTP SSRC on most transports).
    pub source: u32,
    /// Transport sequence number; non-decreasing per source.
    pub sequence: u16,
    /// Transport timestamp, in sample units.
    pub timestamp: u32,
    /// Raw Opus payload.
    pub payload: Bytes,
}

impl AudioFrame {
    /// Builds a frame from its transport fields.
    pub fn new(source: u32, sequence: u16, timestamp: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            source,
            sequence,
            timestamp,
            payload: payload.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_clone_is_shallow() {
        let frame = AudioFrame::new(111, 1, 960, vec![0xfc, 0xff, 0xfe]);
        let clone = frame.clone();
        assert_eq!(frame, clone);
        // Bytes clones share the underlying buffer.
        assert_eq!(frame.payload.as_ptr(), clone.payload.as_ptr());
    }
}
