//! Inbound segment validation, deduplication and reassembly.
//!
//! The [`Receiver`] is responsible for everything that happens between a
//! raw datagram arriving and the bytes landing in the delivered stream:
//! - Validating length framing and checksum before trusting any field.
//! - Telling a new in-order segment from a retransmitted duplicate using
//!   the alternating bit.
//! - Appending new payloads to the delivered-byte accumulator.
//! - Building the ACK to send back.
//!
//! The [`Receiver`] does **not** send ACKs itself; it returns them to the
//! caller, which owns the channel.

use crate::packet::{flags, Packet};
use crate::sequence::SequenceNumber;
use crate::stats::Statistics;

/// Stop-and-wait receive-side state for one transfer.
#[derive(Debug, Default)]
pub struct Receiver {
    /// Next expected sequence number.
    expected: SequenceNumber,
    /// In-order payload bytes delivered so far.  Only ever grows.
    delivered: Vec<u8>,
    stats: Statistics,
}

impl Receiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the delivered bytes and expect sequence 0 again.
    pub fn reset(&mut self) {
        self.expected.reset();
        self.delivered.clear();
    }

    /// Process one raw datagram and return the ACK to send back, if any.
    ///
    /// - Invalid or non-DATA datagrams: dropped, no ACK.
    /// - Repeat of the last delivered segment: not re-buffered, but ACKed
    ///   again so a sender whose ACK was lost can move on.
    /// - The expected segment: delivered, sequence advanced, ACKed.
    /// - Any other sequence number: dropped, no ACK.
    ///
    /// Every ACK carries the sequence number now expected.
    pub fn on_packet(&mut self, raw: &[u8]) -> Option<Packet> {
        if let Err(e) = Packet::validate(raw) {
            log::trace!("[receiver] dropping invalid packet: {e}");
            self.stats.record_rejected();
            return None;
        }
        let segment = Packet::decode(raw).ok()?;
        if !segment.header().has(flags::DATA) {
            log::trace!("[receiver] ignoring packet without DATA flag");
            return None;
        }

        let seq = segment.seq();
        if self.expected.is_duplicate(seq) {
            self.stats.record_duplicate();
            log::debug!(
                "[receiver] ← duplicate seq={seq}; → ACK ack={}",
                self.expected.current()
            );
            return self.build_ack(seq);
        }
        if !self.expected.is_expected(seq) {
            log::trace!(
                "[receiver] ignoring seq={seq} (expecting {})",
                self.expected.current()
            );
            return None;
        }

        self.delivered.extend_from_slice(segment.payload());
        self.expected.increment();
        self.stats.record_receive(segment.payload().len());
        log::debug!(
            "[receiver] ← DATA seq={seq} len={} total={}; → ACK ack={}",
            segment.payload().len(),
            self.delivered.len(),
            self.expected.current()
        );
        self.build_ack(seq)
    }

    /// Everything delivered so far, in order.
    pub fn delivered_bytes(&self) -> &[u8] {
        &self.delivered
    }

    /// Consume the receiver and return the delivered bytes.
    pub fn into_delivered(self) -> Vec<u8> {
        self.delivered
    }

    /// Sequence number the receiver is waiting for.
    pub fn expected_seq(&self) -> u8 {
        self.expected.current()
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    /// Pure ACK confirming `seq`, carrying the next expected sequence number.
    fn build_ack(&self, seq: u8) -> Option<Packet> {
        match Packet::new(seq, self.expected.current(), flags::ACK, Vec::new()) {
            Ok(ack) => Some(ack),
            Err(e) => {
                log::error!("[receiver] cannot build ack: {e}");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
