//! Self-describing message frames with an XOR integrity checksum.
//!
//! Wire format, native byte order of the host:
//!
//! ```text
//! [type:1][checksum:2][size:1][payload:size]
//! ```
//!
//! The header carries the payload length, so a frame can be decoded from
//! the ring without any external length information. The checksum is the
//! XOR of every byte of the fully encoded frame with the checksum field
//! itself treated as zero. XOR detects any odd number of flipped bits at a
//! given bit position; an even number of flips at positions whose
//! contributions cancel passes undetected. That blind spot is part of the
//! format, not something this module compensates for.

use crate::error::Error;
use crate::ring::RingBuffer;

/// Fixed frame header: type, checksum, size.
pub const HEADER_LEN: usize = 4;

/// The size field is one byte.
pub const MAX_PAYLOAD: usize = 255;

/// Largest possible encoded frame.
pub const MAX_ENCODED: usize = HEADER_LEN + MAX_PAYLOAD;

// Byte offsets within the encoded header.
const OFF_TYPE: usize = 0;
const OFF_CHECKSUM: usize = 1;
const OFF_SIZE: usize = 3;

/// One variable-length message. Transient: built by a producer, consumed
/// and validated by a consumer, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Application tag; opaque to the transport.
    pub tag: u8,

    /// Stored integrity field, as encoded on the wire.
    pub checksum: u16,

    payload: Vec<u8>,
}

impl Message {
    /// Build a message over `payload` with the checksum computed last.
    ///
    /// # Panics
    ///
    /// Panics if `payload` exceeds [`MAX_PAYLOAD`] bytes.
    pub fn new(tag: u8, payload: Vec<u8>) -> Self {
        assert!(
            payload.len() <= MAX_PAYLOAD,
            "payload of {} bytes exceeds the one-byte size field",
            payload.len()
        );
        let mut message = Self {
            tag,
            checksum: 0,
            payload,
        };
        message.checksum = message.compute_checksum();
        message
    }

    /// A message with a pseudo-random tag, length in `0..=255`, and
    /// pseudo-random payload bytes.
    pub fn random() -> Self {
        let tag = fastrand::u8(..);
        let len = fastrand::usize(..=MAX_PAYLOAD);
        let mut payload = vec![0u8; len];
        for byte in &mut payload {
            *byte = fastrand::u8(..);
        }
        Self::new(tag, payload)
    }

    pub fn size(&self) -> u8 {
        self.payload.len() as u8
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Total encoded length of this frame.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }

    /// Encode to wire bytes, with the stored checksum field as-is.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.push(self.tag);
        out.extend_from_slice(&self.checksum.to_ne_bytes());
        out.push(self.size());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Checksum over the encoded frame with the checksum field zeroed.
    pub fn compute_checksum(&self) -> u16 {
        let mut bytes = self.encode();
        bytes[OFF_CHECKSUM] = 0;
        bytes[OFF_CHECKSUM + 1] = 0;
        checksum(&bytes)
    }

    /// Recompute and compare against the stored field.
    ///
    /// A mismatch indicates corruption and is surfaced as
    /// [`Error::ChecksumMismatch`]; the message itself remains usable —
    /// detection, not discard.
    pub fn verify(&self) -> Result<(), Error> {
        let computed = self.compute_checksum();
        if computed != self.checksum {
            return Err(Error::ChecksumMismatch {
                stored: self.checksum,
                computed,
            });
        }
        Ok(())
    }

    /// Append the encoded frame to the ring in one transfer, blocking
    /// until space is available.
    pub fn send_to(&self, ring: &RingBuffer) -> Result<(), Error> {
        ring.send(&self.encode())
    }

    /// One send attempt; `Ok(false)` when the ring has no space right now.
    pub fn try_send_to(&self, ring: &RingBuffer) -> Result<bool, Error> {
        ring.try_send(&self.encode())
    }

    /// Decode one frame from the ring, blocking until it arrives.
    ///
    /// Reads the fixed header first to learn the payload length, then
    /// exactly that many more bytes, all under a single read-mutex
    /// acquisition so concurrent consumers cannot interleave.
    pub fn read_from(ring: &RingBuffer) -> Self {
        let mut reader = ring.reader();
        let mut header = [0u8; HEADER_LEN];
        reader.pull(&mut header);
        Self::finish_decode(header, |payload| reader.pull(payload))
    }

    /// One decode attempt; `None` when no complete header is stored yet.
    pub fn try_read_from(ring: &RingBuffer) -> Option<Self> {
        let mut reader = ring.reader();
        let mut header = [0u8; HEADER_LEN];
        if !reader.try_pull(&mut header) {
            return None;
        }
        // A producer writes a whole frame in one transfer, so once the
        // header is visible the payload is too; this pull does not spin.
        Some(Self::finish_decode(header, |payload| reader.pull(payload)))
    }

    fn finish_decode(header: [u8; HEADER_LEN], pull: impl FnOnce(&mut [u8])) -> Self {
        let size = header[OFF_SIZE] as usize;
        let mut payload = vec![0u8; size];
        pull(&mut payload);
        Self {
            tag: header[OFF_TYPE],
            checksum: u16::from_ne_bytes([header[OFF_CHECKSUM], header[OFF_CHECKSUM + 1]]),
            payload,
        }
    }
}

/// XOR of every byte, widened into the two-byte wire field.
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes.iter().fold(0u16, |acc, &byte| acc ^ byte as u16)
}

/// `AA:BB:CC` rendering of payload bytes for progress reports.
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(':');
        }
        out.push_str(&format!("{byte:02X}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_byte_xor() {
        assert_eq!(checksum(&[]), 0);
        assert_eq!(checksum(&[0xFF]), 0xFF);
        assert_eq!(checksum(&[0xF0, 0x0F]), 0xFF);
        assert_eq!(checksum(&[0xAA, 0xAA]), 0);
    }

    #[test]
    fn new_message_verifies() {
        let message = Message::new(7, vec![1, 2, 3]);
        message.verify().unwrap();
        assert_eq!(message.size(), 3);
        assert_eq!(message.encoded_len(), HEADER_LEN + 3);
    }

    #[test]
    fn hex_rendering() {
        assert_eq!(to_hex(&[]), "");
        assert_eq!(to_hex(&[0x0A]), "0A");
        assert_eq!(to_hex(&[0x0A, 0xFF, 0x00]), "0A:FF:00");
    }
}
