//! Binary snapshot packet sent to WebSocket clients.
//!
//! Every reply is exactly [`PACKET_LEN`] bytes, little-endian:
//!
//! ```text
//! offset  size  field
//! 0       4     count (u32), number of meaningful slots
//! 4       4     padding (zero)
//! 8       72*N  N = MAX_EVENTS record slots
//! ```
//!
//! Each slot is nine 8-byte fields in this order: `event_id` (i64),
//! `origin_time` (i64), `latitude`, `longitude`, `magnitude`, `small_x`,
//! `small_y`, `large_x`, `large_y` (all f64). Slots past `count` are zero.
//!
//! When the registry holds more than [`MAX_EVENTS`] records the packet
//! carries the newest ones (the tail of first-seen order), still in
//! registry order.

use eew2sock_types::{EewRecord, MapCoordinates, MapPoint};
use tracing::warn;

/// Maximum number of record slots in one packet.
pub const MAX_EVENTS: usize = 64;

/// Size of the packet header in bytes.
pub const HEADER_LEN: usize = 8;

/// Size of one record slot in bytes.
pub const RECORD_LEN: usize = 72;

/// Total size of every packet in bytes.
pub const PACKET_LEN: usize = HEADER_LEN + MAX_EVENTS * RECORD_LEN;

/// Errors raised when decoding a packet.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The buffer is not exactly [`PACKET_LEN`] bytes.
    #[error("packet length {actual} does not match the fixed packet size")]
    Length {
        /// Length of the received buffer.
        actual: usize,
    },

    /// The header count exceeds the slot capacity.
    #[error("event count {count} exceeds packet capacity")]
    Count {
        /// Count read from the header.
        count: u32,
    },
}

/// The records a packet will carry: at most [`MAX_EVENTS`], newest kept.
pub fn packet_window(records: &[EewRecord]) -> &[EewRecord] {
    let skip = records.len().saturating_sub(MAX_EVENTS);
    records.get(skip..).unwrap_or_default()
}

/// Encode a registry snapshot into one fixed-size packet.
pub fn encode_snapshot(records: &[EewRecord]) -> Vec<u8> {
    let window = packet_window(records);
    if window.len() < records.len() {
        warn!(
            held = records.len(),
            sent = window.len(),
            "Registry exceeds packet capacity, sending newest events only"
        );
    }

    // The window never exceeds MAX_EVENTS, which fits in u32.
    let count = u32::try_from(window.len()).unwrap_or(u32::MAX);

    let mut buf = Vec::with_capacity(PACKET_LEN);
    buf.extend_from_slice(&count.to_le_bytes());
    buf.extend_from_slice(&[0_u8; 4]);
    for record in window {
        buf.extend_from_slice(&record.event_id.to_le_bytes());
        buf.extend_from_slice(&record.origin_time.to_le_bytes());
        for value in [
            record.latitude,
            record.longitude,
            record.magnitude,
            record.coordinates.small.x,
            record.coordinates.small.y,
            record.coordinates.large.x,
            record.coordinates.large.y,
        ] {
            buf.extend_from_slice(&value.to_le_bytes());
        }
    }
    buf.resize(PACKET_LEN, 0);
    buf
}

/// Decode a packet produced by [`encode_snapshot`].
///
/// # Errors
///
/// Returns [`ProtocolError::Length`] for a buffer of the wrong size and
/// [`ProtocolError::Count`] if the header claims more than
/// [`MAX_EVENTS`] records.
pub fn decode_packet(bytes: &[u8]) -> Result<Vec<EewRecord>, ProtocolError> {
    if bytes.len() != PACKET_LEN {
        return Err(ProtocolError::Length {
            actual: bytes.len(),
        });
    }

    let mut reader = FieldReader { buf: bytes };
    let count = reader.u32()?;
    reader.skip(4)?;

    let slots = usize::try_from(count).unwrap_or(usize::MAX);
    if slots > MAX_EVENTS {
        return Err(ProtocolError::Count { count });
    }

    let mut records = Vec::with_capacity(slots);
    for _ in 0..slots {
        let event_id = reader.i64()?;
        let origin_time = reader.i64()?;
        let latitude = reader.f64()?;
        let longitude = reader.f64()?;
        let magnitude = reader.f64()?;
        let small = MapPoint {
            x: reader.f64()?,
            y: reader.f64()?,
        };
        let large = MapPoint {
            x: reader.f64()?,
            y: reader.f64()?,
        };
        records.push(EewRecord {
            event_id,
            origin_time,
            latitude,
            longitude,
            magnitude,
            coordinates: MapCoordinates { small, large },
        });
    }
    Ok(records)
}

/// Sequential little-endian reader over a length-checked packet.
struct FieldReader<'a> {
    buf: &'a [u8],
}

impl FieldReader<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let (head, rest) = self
            .buf
            .split_first_chunk::<N>()
            .ok_or(ProtocolError::Length { actual: PACKET_LEN })?;
        self.buf = rest;
        Ok(*head)
    }

    fn skip(&mut self, n: usize) -> Result<(), ProtocolError> {
        let (_, rest) = self
            .buf
            .split_at_checked(n)
            .ok_or(ProtocolError::Length { actual: PACKET_LEN })?;
        self.buf = rest;
        Ok(())
    }

    fn u32(&mut self) -> Result<u32, ProtocolError> {
        self.take().map(u32::from_le_bytes)
    }

    fn i64(&mut self) -> Result<i64, ProtocolError> {
        self.take().map(i64::from_le_bytes)
    }

    fn f64(&mut self) -> Result<f64, ProtocolError> {
        self.take().map(f64::from_le_bytes)
    }
}
