//! Ogg framing shared by playback (demux) and recording (mux).
//!
//! Playback reads the transcoder's Opus-in-Ogg stdout as a sequence of pages
//! and reassembles logical packets from the lacing table; recording wraps
//! raw Opus packets back into minimal single-packet pages. The demuxer makes
//! no attempt to resynchronize after a framing violation: the transcoder
//! pipe is page-aligned, so a bad capture pattern means the stream is
//! unusable.

use std::collections::VecDeque;
use std::io::Write;

use bytes::Bytes;
use parley_types::SAMPLES_PER_FRAME;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::VoiceError;

/// Capture pattern opening every Ogg page.
pub const CAPTURE_PATTERN: [u8; 4] = *b"OggS";

/// Length of the fixed page header, up to but excluding the segment table.
pub const PAGE_HEADER_LEN: usize = 27;

/// Header-type flag marking the beginning of a logical stream.
const HEADER_TYPE_BOS: u8 = 0x02;

/// Fixed fields of an Ogg page header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    pub version: u8,
    pub header_type: u8,
    pub granule_position: u64,
    pub serial: u32,
    pub sequence: u32,
    pub checksum: u32,
    pub segment_count: u8,
}

impl PageHeader {
    /// Parses the 27 fixed header bytes, validating the capture pattern.
    pub fn parse(buf: &[u8; PAGE_HEADER_LEN]) -> Result<Self, VoiceError> {
        if buf[..4] != CAPTURE_PATTERN {
            return Err(VoiceError::MalformedStream(format!(
                "bad capture pattern {:02x?}",
                &buf[..4]
            )));
        }
        Ok(Self {
            version: buf[4],
            header_type: buf[5],
            granule_position: u64_le(buf, 6),
            serial: u32_le(buf, 14),
            sequence: u32_le(buf, 18),
            checksum: u32_le(buf, 22),
            segment_count: buf[26],
        })
    }
}

fn u32_le(buf: &[u8; PAGE_HEADER_LEN], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn u64_le(buf: &[u8; PAGE_HEADER_LEN], at: usize) -> u64 {
    u64::from_le_bytes([
        buf[at],
        buf[at + 1],
        buf[at + 2],
        buf[at + 3],
        buf[at + 4],
        buf[at + 5],
        buf[at + 6],
        buf[at + 7],
    ])
}

/// Incremental packet reader over an Ogg byte stream.
///
/// Yields logical packets in order. A packet boundary occurs at any segment
/// whose lacing value is < 255; a packet whose final segment is exactly 255
/// bytes continues on the next page and is carried across the boundary.
pub struct OggPacketReader<R> {
    reader: R,
    /// Lacing values not yet consumed from the current page.
    lacing: VecDeque<u8>,
    /// Bytes of a packet still waiting for its terminating segment.
    partial: Vec<u8>,
}

impl<R: AsyncRead + Unpin> OggPacketReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            lacing: VecDeque::new(),
            partial: Vec::new(),
        }
    }

    /// Reads the next logical packet, or `None` at end of stream.
    ///
    /// End of stream is only clean at a page boundary; EOF inside a page or
    /// mid-packet is a [`VoiceError::MalformedStream`].
    pub async fn read_packet(&mut self) -> Result<Option<Bytes>, VoiceError> {
        loop {
            while let Some(len) = self.lacing.pop_front() {
                let start = self.partial.len();
                self.partial.resize(start + len as usize, 0);
                self.reader
                    .read_exact(&mut self.partial[start..])
                    .await
                    .map_err(truncated("segment payload"))?;
                if len < 255 {
                    let packet = std::mem::take(&mut self.partial);
                    return Ok(Some(Bytes::from(packet)));
                }
            }
            if !self.next_page().await? {
                if !self.partial.is_empty() {
                    return Err(VoiceError::MalformedStream(
                        "stream ended mid-packet".to_string(),
                    ));
                }
                return Ok(None);
            }
        }
    }

    /// Reads the next page header and queues its lacing values. Returns
    /// `false` on a clean end of stream.
    async fn next_page(&mut self) -> Result<bool, VoiceError> {
        let mut header = [0u8; PAGE_HEADER_LEN];
        let mut filled = 0;
        while filled < PAGE_HEADER_LEN {
            let n = self.reader.read(&mut header[filled..]).await?;
            if n == 0 {
                if filled == 0 {
                    return Ok(false);
                }
                return Err(VoiceError::MalformedStream(
                    "truncated page header".to_string(),
                ));
            }
            filled += n;
        }

        let parsed = PageHeader::parse(&header)?;
        let mut table = vec![0u8; parsed.segment_count as usize];
        self.reader
            .read_exact(&mut table)
            .await
            .map_err(truncated("segment table"))?;
        self.lacing.extend(table);
        Ok(true)
    }
}

fn truncated(what: &'static str) -> impl Fn(std::io::Error) -> VoiceError {
    move |err| match err.kind() {
        std::io::ErrorKind::UnexpectedEof => {
            VoiceError::MalformedStream(format!("truncated {what}"))
        }
        _ => VoiceError::Stream(err),
    }
}

/// Ogg stream writer producing a minimal Opus-in-Ogg stream: an `OpusHead`
/// page, an `OpusTags` page, then one page per Opus packet with
/// monotonically increasing page sequence and granule position.
pub struct OggStreamWriter<W: Write> {
    writer: W,
    serial: u32,
    sequence: u32,
    granule_position: u64,
}

impl<W: Write> OggStreamWriter<W> {
    /// Creates the writer and emits the two Opus header pages.
    pub fn new(
        writer: W,
        serial: u32,
        sample_rate: u32,
        channels: u8,
    ) -> Result<Self, VoiceError> {
        let mut stream = Self {
            writer,
            serial,
            sequence: 0,
            granule_position: 0,
        };
        stream.write_page(&opus_head(sample_rate, channels), HEADER_TYPE_BOS, 0)?;
        stream.write_page(&opus_tags(), 0, 0)?;
        Ok(stream)
    }

    /// Writes one Opus packet as its own page, advancing the granule
    /// position by one 20 ms frame.
    pub fn write_packet(&mut self, packet: &[u8]) -> Result<(), VoiceError> {
        self.granule_position += u64::from(SAMPLES_PER_FRAME);
        let granule = self.granule_position;
        self.write_page(packet, 0, granule)
    }

    /// Flushes buffered page data to the backing writer.
    pub fn flush(&mut self) -> Result<(), VoiceError> {
        self.writer.flush()?;
        Ok(())
    }

    fn write_page(
        &mut self,
        payload: &[u8],
        header_type: u8,
        granule: u64,
    ) -> Result<(), VoiceError> {
        let lacing = lacing_values(payload.len())?;
        let mut page = Vec::with_capacity(PAGE_HEADER_LEN + lacing.len() + payload.len());
        page.extend_from_slice(&CAPTURE_PATTERN);
        page.push(0); // stream structure version
        page.push(header_type);
        page.extend_from_slice(&granule.to_le_bytes());
        page.extend_from_slice(&self.serial.to_le_bytes());
        page.extend_from_slice(&self.sequence.to_le_bytes());
        page.extend_from_slice(&0u32.to_le_bytes()); // checksum, patched below
        page.push(lacing.len() as u8);
        page.extend_from_slice(&lacing);
        page.extend_from_slice(payload);

        let checksum = crc32(&page);
        page[22..26].copy_from_slice(&checksum.to_le_bytes());

        self.writer.write_all(&page)?;
        self.sequence += 1;
        Ok(())
    }
}

/// Lacing values for a packet that must terminate within one page: a run of
/// 255s followed by one value < 255.
fn lacing_values(len: usize) -> Result<Vec<u8>, VoiceError> {
    let full = len / 255;
    if full + 1 > 255 {
        return Err(VoiceError::MalformedStream(format!(
            "packet of {len} bytes exceeds single-page capacity"
        )));
    }
    let mut values = vec![255u8; full];
    values.push((len % 255) as u8);
    Ok(values)
}

/// Opus identification header (RFC 7845 §5.1).
fn opus_head(sample_rate: u32, channels: u8) -> Vec<u8> {
    let mut head = Vec::with_capacity(19);
    head.extend_from_slice(b"OpusHead");
    head.push(1); // version
    head.push(channels);
    head.extend_from_slice(&0u16.to_le_bytes()); // pre-skip
    head.extend_from_slice(&sample_rate.to_le_bytes());
    head.extend_from_slice(&0i16.to_le_bytes()); // output gain
    head.push(0); // channel mapping family
    head
}

/// Opus comment header (RFC 7845 §5.2) with no user comments.
fn opus_tags() -> Vec<u8> {
    const VENDOR: &[u8] = b"parley-voice";
    let mut tags = Vec::with_capacity(8 + 4 + VENDOR.len() + 4);
    tags.extend_from_slice(b"OpusTags");
    tags.extend_from_slice(&(VENDOR.len() as u32).to_le_bytes());
    tags.extend_from_slice(VENDOR);
    tags.extend_from_slice(&0u32.to_le_bytes()); // user comment count
    tags
}

/// Ogg page CRC: polynomial 0x04c11db7, no reflection, zero initial value.
fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0u32;
    for &byte in data {
        crc = (crc << 8) ^ CRC_TABLE[(((crc >> 24) as u8) ^ byte) as usize];
    }
    crc
}

const CRC_TABLE: [u32; 256] = crc_table();

const fn crc_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut r = (i as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            r = if r & 0x8000_0000 != 0 {
                (r << 1) ^ 0x04c1_1db7
            } else {
                r << 1
            };
            bit += 1;
        }
        table[i] = r;
        i += 1;
    }
    table
}
