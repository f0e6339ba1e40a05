//! Wire-format definitions for BEARDOWN-TP segments.
//!
//! Every datagram exchanged between peers is a [`Packet`].  This module is
//! responsible for:
//! - Defining the on-wire binary layout (header fields, flags, payload).
//! - Encoding a [`Packet`] into a byte buffer ready for the channel.
//! - Decoding a raw byte slice back into a [`Packet`].
//! - Validating a raw datagram (length + checksum) before any field is trusted.
//!
//! No I/O happens here — this is pure data transformation.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian**.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |    Seq Num    |    Ack Num    |     Flags     |    Length ... |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |  ... Length   |           Checksum            |  Payload ...  |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Total header size: [`HEADER_LEN`] = 7 bytes.
//! seq(1) + ack(1) + flags(1) + length(2) + checksum(2)

use thiserror::Error;

use crate::checksum;

/// Bit-flag constants for the `flags` header field.
pub mod flags {
    /// Synchronise sequence numbers.  Reserved; no handshake is defined.
    pub const SYN: u8 = 0x01;
    /// Acknowledgement field is valid.
    pub const ACK: u8 = 0x02;
    /// Finish.  Reserved; no teardown is defined.
    pub const FIN: u8 = 0x04;
    /// Payload carries stream data.
    pub const DATA: u8 = 0x08;
}

/// Byte length of the fixed-size header on the wire.
pub const HEADER_LEN: usize = 7;

/// Largest payload a single segment may carry.
pub const MAX_PAYLOAD: usize = 1000;

/// Largest datagram on the wire.
pub const MAX_PACKET: usize = HEADER_LEN + MAX_PAYLOAD;

// Byte offsets of each field within the serialised header.
const OFF_SEQ: usize = 0;
const OFF_ACK: usize = 1;
const OFF_FLAGS: usize = 2;
const OFF_LENGTH: usize = 3;
const OFF_CHECKSUM: usize = 5;

/// Fixed-size protocol header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Sequence number of this segment (0 or 1 for stop-and-wait).
    pub seq: u8,
    /// Next sequence number the sender of this packet expects.
    pub ack: u8,
    /// Bitmask of [`flags`] constants.
    pub flags: u8,
    /// Length of the payload in bytes.
    pub length: u16,
    /// Internet checksum over the whole packet with this field zeroed.
    pub checksum: u16,
}

impl Header {
    /// `true` when every bit of `flag` is set.
    pub fn has(&self, flag: u8) -> bool {
        self.flags & flag == flag
    }
}

/// A complete protocol datagram: header + payload bytes.
///
/// Built once through [`Packet::new`] or [`Packet::decode`] and never mutated
/// afterwards; the checksum stored in the header always matches the contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    header: Header,
    payload: Vec<u8>,
}

impl Packet {
    /// Build a packet and compute its checksum.
    ///
    /// Fails with [`PacketError::PayloadTooLarge`] when `payload` exceeds
    /// [`MAX_PAYLOAD`].
    pub fn new(seq: u8, ack: u8, flags: u8, payload: Vec<u8>) -> Result<Self, PacketError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(PacketError::PayloadTooLarge { len: payload.len() });
        }
        let mut packet = Packet {
            header: Header {
                seq,
                ack,
                flags,
                length: payload.len() as u16,
                checksum: 0,
            },
            payload,
        };
        // The checksum field is still zero here.
        packet.header.checksum = checksum::calculate(&packet.encode());
        Ok(packet)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn seq(&self) -> u8 {
        self.header.seq
    }

    pub fn ack(&self) -> u8 {
        self.header.ack
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Size of this packet on the wire.
    pub fn wire_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }

    /// Serialise this packet into a newly allocated byte vector.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.wire_len()];

        buf[OFF_SEQ] = self.header.seq;
        buf[OFF_ACK] = self.header.ack;
        buf[OFF_FLAGS] = self.header.flags;
        buf[OFF_LENGTH..OFF_LENGTH + 2].copy_from_slice(&self.header.length.to_be_bytes());
        buf[OFF_CHECKSUM..OFF_CHECKSUM + 2].copy_from_slice(&self.header.checksum.to_be_bytes());
        buf[HEADER_LEN..].copy_from_slice(&self.payload);

        buf
    }

    /// Parse a [`Packet`] from a raw byte slice.
    ///
    /// Returns [`Err`] if `buf` is shorter than [`HEADER_LEN`] or the length
    /// field disagrees with the bytes that follow the header.  The checksum is
    /// **not** verified here; run [`Packet::validate`] first.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        let header = read_header(buf)?;
        Ok(Packet {
            header,
            payload: buf[HEADER_LEN..].to_vec(),
        })
    }

    /// Check that `buf` is a well-formed, uncorrupted packet.
    ///
    /// Malformed datagrams are routine on a lossy channel, so failures come
    /// back as a plain [`PacketError`] whose `Display` text is the reason.
    pub fn validate(buf: &[u8]) -> Result<(), PacketError> {
        let header = read_header(buf)?;

        let mut scratch = buf.to_vec();
        scratch[OFF_CHECKSUM..OFF_CHECKSUM + 2].fill(0);
        let computed = checksum::calculate(&scratch);
        if computed != header.checksum {
            return Err(PacketError::ChecksumMismatch {
                stored: header.checksum,
                computed,
            });
        }
        Ok(())
    }
}

/// Encode a packet straight to wire bytes.
pub fn encode(seq: u8, ack: u8, flags: u8, payload: &[u8]) -> Result<Vec<u8>, PacketError> {
    Packet::new(seq, ack, flags, payload.to_vec()).map(|p| p.encode())
}

/// Read the header fields and check the length framing.
fn read_header(buf: &[u8]) -> Result<Header, PacketError> {
    if buf.len() < HEADER_LEN {
        return Err(PacketError::TooShort { len: buf.len() });
    }

    let length = u16::from_be_bytes([buf[OFF_LENGTH], buf[OFF_LENGTH + 1]]);
    let checksum = u16::from_be_bytes([buf[OFF_CHECKSUM], buf[OFF_CHECKSUM + 1]]);

    let actual = buf.len() - HEADER_LEN;
    if actual != length as usize {
        return Err(PacketError::LengthMismatch {
            declared: length as usize,
            actual,
        });
    }

    Ok(Header {
        seq: buf[OFF_SEQ],
        ack: buf[OFF_ACK],
        flags: buf[OFF_FLAGS],
        length,
        checksum,
    })
}

/// Errors that can arise when building or parsing a datagram.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    /// Payload larger than [`MAX_PAYLOAD`] handed to the encoder.
    #[error("payload of {len} bytes exceeds maximum {MAX_PAYLOAD}")]
    PayloadTooLarge { len: usize },
    /// Buffer shorter than the fixed header size.
    #[error("packet too short: {len} bytes")]
    TooShort { len: usize },
    /// `length` field does not match the bytes after the header.
    #[error("length mismatch: header declares {declared} payload bytes, found {actual}")]
    LengthMismatch { declared: usize, actual: usize },
    /// Checksum did not match the recomputed value.
    #[error("checksum mismatch: stored {stored:04x}, computed {computed:04x}")]
    ChecksumMismatch { stored: u16, computed: u16 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let pkt = Packet::new(1, 0, flags::DATA, b"hello".to_vec()).unwrap();
        let bytes = pkt.encode();
        assert_eq!(Packet::validate(&bytes), Ok(()));
        let decoded = Packet::decode(&bytes).unwrap();
        assert_eq!(decoded, pkt);
        assert_eq!(decoded.header().length, 5);
    }

    #[test]
    fn header_layout_is_big_endian() {
        let payload = vec![0u8; 0x0102];
        let bytes = encode(1, 0, flags::ACK | flags::DATA, &payload).unwrap();
        assert_eq!(bytes[OFF_SEQ], 1);
        assert_eq!(bytes[OFF_ACK], 0);
        assert_eq!(bytes[OFF_FLAGS], 0x0a);
        assert_eq!(&bytes[OFF_LENGTH..OFF_LENGTH + 2], &[0x01, 0x02]);
    }

    #[test]
    fn stored_checksum_covers_zeroed_field() {
        let bytes = encode(0, 1, flags::ACK, b"").unwrap();
        let stored = u16::from_be_bytes([bytes[OFF_CHECKSUM], bytes[OFF_CHECKSUM + 1]]);
        let mut zeroed = bytes.clone();
        zeroed[OFF_CHECKSUM..OFF_CHECKSUM + 2].fill(0);
        assert!(checksum::verify(&zeroed, stored));
    }

    #[test]
    fn encoded_length_equals_header_plus_payload() {
        let bytes = encode(0, 0, flags::DATA, b"exactly twelve!").unwrap();
        assert_eq!(bytes.len(), HEADER_LEN + 15);
    }

    #[test]
    fn max_payload_is_accepted() {
        let bytes = encode(0, 0, flags::DATA, &[7u8; MAX_PAYLOAD]).unwrap();
        assert_eq!(bytes.len(), MAX_PACKET);
        assert_eq!(Packet::validate(&bytes), Ok(()));
    }

    #[test]
    fn oversized_payload_is_rejected() {
        assert_eq!(
            encode(0, 0, flags::DATA, &[0u8; MAX_PAYLOAD + 1]),
            Err(PacketError::PayloadTooLarge { len: MAX_PAYLOAD + 1 })
        );
    }

    #[test]
    fn decode_short_header_returns_error() {
        assert_eq!(Packet::decode(&[]), Err(PacketError::TooShort { len: 0 }));
        assert_eq!(
            Packet::decode(&[0u8; HEADER_LEN - 1]),
            Err(PacketError::TooShort { len: HEADER_LEN - 1 })
        );
    }

    #[test]
    fn decode_truncated_payload_returns_error() {
        let mut bytes = encode(0, 0, flags::DATA, b"data").unwrap();
        bytes.pop();
        assert_eq!(
            Packet::decode(&bytes),
            Err(PacketError::LengthMismatch { declared: 4, actual: 3 })
        );
        assert!(Packet::validate(&bytes).is_err());
    }

    #[test]
    fn decode_does_not_check_checksum() {
        let mut bytes = encode(0, 0, flags::DATA, b"data").unwrap();
        bytes[HEADER_LEN] ^= 0x01;
        assert!(Packet::decode(&bytes).is_ok());
        assert!(matches!(
            Packet::validate(&bytes),
            Err(PacketError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn corrupt_header_byte_is_detected() {
        let mut bytes = encode(1, 0, flags::DATA, b"test").unwrap();
        bytes[OFF_SEQ] ^= 0x01;
        assert!(Packet::validate(&bytes).is_err());
    }

    #[test]
    fn validation_reason_is_readable() {
        let reason = Packet::validate(&[1, 2, 3]).unwrap_err().to_string();
        assert_eq!(reason, "packet too short: 3 bytes");
    }

    #[test]
    fn header_flag_query() {
        let pkt = Packet::new(0, 1, flags::ACK, Vec::new()).unwrap();
        assert!(pkt.header().has(flags::ACK));
        assert!(!pkt.header().has(flags::DATA));
    }
}
