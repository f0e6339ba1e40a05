//! Outbound segment state for stop-and-wait reliability.
//!
//! [`Sender`] segments a loaded payload, tracks the alternating sequence
//! number and the single in-flight segment.  It does **not** touch the
//! channel; the driver in [`crate::transfer`] or the UDP loop in
//! [`crate::connection`] calls these methods and moves the bytes.
//!
//! # Stop-and-Wait contract
//! - At most **one** segment is in flight at any moment (`unacked`).
//! - A new segment may only be built once `unacked` is `None`.
//! - On a matching ACK: sample the RTT, advance the sequence number and the
//!   buffer cursor, clear `unacked`.
//! - On timeout: back off the RTO and resend the same packet unchanged.

use std::time::Duration;

use tokio::time::Instant;

use crate::packet::{flags, Packet, MAX_PAYLOAD};
use crate::sequence::SequenceNumber;
use crate::state::SenderState;
use crate::stats::Statistics;
use crate::timer::{TimeoutEstimator, TimerConfig};

// ---------------------------------------------------------------------------
// RetransmitEntry
// ---------------------------------------------------------------------------

/// A segment that has been sent but not yet acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetransmitEntry {
    /// The segment on the wire.
    pub packet: Packet,
    /// How many times this segment has been transmitted (1 = first send).
    pub tx_count: u32,
    /// Time of the most recent transmission.
    pub sent_at: Instant,
}

// ---------------------------------------------------------------------------
// Sender
// ---------------------------------------------------------------------------

/// Stop-and-wait send-side state for one transfer.
#[derive(Debug)]
pub struct Sender {
    data: Vec<u8>,
    /// First byte not yet acknowledged.  Only moves forward.
    offset: usize,
    loaded: bool,
    seq: SequenceNumber,
    estimator: TimeoutEstimator,
    /// The in-flight segment, or `None` when nothing is outstanding.
    unacked: Option<RetransmitEntry>,
    stats: Statistics,
}

impl Default for Sender {
    fn default() -> Self {
        Self::new()
    }
}

impl Sender {
    pub fn new() -> Self {
        Self::with_config(TimerConfig::default())
    }

    pub fn with_config(config: TimerConfig) -> Self {
        Self {
            data: Vec::new(),
            offset: 0,
            loaded: false,
            seq: SequenceNumber::default(),
            estimator: TimeoutEstimator::new(config),
            unacked: None,
            stats: Statistics::new(),
        }
    }

    /// Start a new transfer of `data`.
    ///
    /// Must not be called while a previous transfer still has a segment in
    /// flight; if it is, that segment is abandoned.
    pub fn load(&mut self, data: impl Into<Vec<u8>>) {
        if self.unacked.is_some() {
            log::warn!("[sender] load() abandons an outstanding segment");
        }
        self.data = data.into();
        self.offset = 0;
        self.loaded = true;
        self.seq.reset();
        self.unacked = None;
        log::debug!("[sender] loaded {} bytes", self.data.len());
    }

    /// Return the next packet to put on the channel, if any.
    ///
    /// - Outstanding segment timed out: performs the retransmission (see
    ///   [`handle_timeout`](Self::handle_timeout)) and returns the same packet.
    /// - Outstanding segment still within its timeout: `None`.
    /// - All data acknowledged: `None`.
    /// - Otherwise: builds the next DATA segment of at most [`MAX_PAYLOAD`]
    ///   bytes, marks it outstanding and returns it.
    pub fn next_packet_to_send(&mut self) -> Option<Packet> {
        if self.retransmit_due() {
            return self.handle_timeout();
        }
        if self.unacked.is_some() || self.offset >= self.data.len() {
            return None;
        }

        let end = (self.offset + MAX_PAYLOAD).min(self.data.len());
        let chunk = self.data[self.offset..end].to_vec();
        let packet = match Packet::new(self.seq.current(), 0, flags::DATA, chunk) {
            Ok(p) => p,
            Err(e) => {
                log::error!("[sender] cannot build segment at offset {}: {e}", self.offset);
                return None;
            }
        };

        self.stats.record_send(packet.wire_len());
        log::debug!(
            "[sender] → DATA seq={} offset={} len={}",
            packet.seq(),
            self.offset,
            packet.payload().len()
        );
        self.unacked = Some(RetransmitEntry {
            packet: packet.clone(),
            tx_count: 1,
            sent_at: Instant::now(),
        });
        Some(packet)
    }

    /// Retransmit the outstanding segment.
    ///
    /// Backs off the RTO, restarts the send clock and counts the timeout,
    /// then returns the outstanding packet unchanged.  Returns `None` when
    /// nothing is outstanding (the segment was already retired).
    pub fn handle_timeout(&mut self) -> Option<Packet> {
        let entry = self.unacked.as_mut()?;
        entry.tx_count += 1;
        entry.sent_at = Instant::now();

        self.estimator.on_retransmission();
        self.stats.record_timeout();
        self.stats.record_retransmission(entry.packet.wire_len());
        log::debug!(
            "[sender] timeout, retransmitting seq={} (tx #{}), rto now {:?}",
            entry.packet.seq(),
            entry.tx_count,
            self.estimator.timeout()
        );
        Some(entry.packet.clone())
    }

    /// Process a raw datagram from the receiver.
    ///
    /// Returns `true` only when it is a valid ACK confirming the outstanding
    /// segment, i.e. its ack number is the sequence number after ours.
    /// Anything else (corrupt, not an ACK, an ACK for the previous segment,
    /// nothing outstanding) is ignored without touching any state.
    pub fn on_ack(&mut self, raw: &[u8]) -> bool {
        if let Err(e) = Packet::validate(raw) {
            log::trace!("[sender] dropping invalid ack: {e}");
            return false;
        }
        let ack = match Packet::decode(raw) {
            Ok(p) => p,
            Err(_) => return false,
        };
        if !ack.header().has(flags::ACK) {
            log::trace!("[sender] ignoring packet without ACK flag");
            return false;
        }
        let want = self.seq.next();
        if ack.ack() != want {
            log::trace!("[sender] ignoring ack={} (want {want})", ack.ack());
            return false;
        }
        let Some(entry) = self.unacked.take() else {
            log::trace!("[sender] ignoring ack={}: nothing outstanding", ack.ack());
            return false;
        };

        self.estimator.record_rtt(entry.sent_at.elapsed());
        self.seq.increment();
        self.offset += entry.packet.payload().len();
        self.stats.record_ack();
        log::debug!(
            "[sender] ← ACK ack={} offset={}/{} rto={:?}",
            ack.ack(),
            self.offset,
            self.data.len(),
            self.estimator.timeout()
        );
        true
    }

    /// `true` once every loaded byte has been acknowledged.
    pub fn is_complete(&self) -> bool {
        self.offset >= self.data.len() && self.unacked.is_none()
    }

    pub fn state(&self) -> SenderState {
        if !self.loaded {
            SenderState::Idle
        } else if self.unacked.is_some() {
            SenderState::AwaitingAck
        } else if self.offset >= self.data.len() {
            SenderState::Complete
        } else {
            SenderState::Sending
        }
    }

    /// When the outstanding segment times out, or `None` if idle.
    pub fn retransmit_deadline(&self) -> Option<Instant> {
        self.unacked
            .as_ref()
            .map(|e| e.sent_at + self.estimator.timeout())
    }

    /// `true` when the outstanding segment has been in flight for at least
    /// the current timeout.
    fn retransmit_due(&self) -> bool {
        self.retransmit_deadline()
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Current retransmission timeout.
    pub fn timeout(&self) -> Duration {
        self.estimator.timeout()
    }

    pub fn has_unacked(&self) -> bool {
        self.unacked.is_some()
    }

    /// Bytes acknowledged so far.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Size of the loaded payload.
    pub fn total(&self) -> usize {
        self.data.len()
    }

    pub fn current_seq(&self) -> u8 {
        self.seq.current()
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet;

    fn ack_bytes(ack: u8) -> Vec<u8> {
        packet::encode(0, ack, flags::ACK, &[]).unwrap()
    }

    #[test]
    fn initial_state_is_idle() {
        let s = Sender::new();
        assert_eq!(s.state(), SenderState::Idle);
        assert!(s.is_complete());
    }

    #[test]
    fn empty_load_is_immediately_complete() {
        let mut s = Sender::new();
        s.load(Vec::new());
        assert_eq!(s.state(), SenderState::Complete);
        assert!(s.next_packet_to_send().is_none());
    }

    #[test]
    fn first_segment_carries_seq_zero_and_data_flag() {
        let mut s = Sender::new();
        s.load(b"hello".to_vec());
        let p = s.next_packet_to_send().unwrap();
        assert_eq!(p.seq(), 0);
        assert!(p.header().has(flags::DATA));
        assert_eq!(p.payload(), b"hello");
        assert_eq!(s.state(), SenderState::AwaitingAck);
    }

    #[test]
    fn only_one_segment_in_flight() {
        let mut s = Sender::new();
        s.load(vec![1u8; 3000]);
        assert!(s.next_packet_to_send().is_some());
        assert!(s.next_packet_to_send().is_none());
        assert_eq!(s.stats().segments_sent, 1);
    }

    #[test]
    fn matching_ack_advances() {
        let mut s = Sender::new();
        s.load(vec![1u8; 1500]);
        s.next_packet_to_send().unwrap();

        assert!(s.on_ack(&ack_bytes(1)));
        assert_eq!(s.offset(), 1000);
        assert_eq!(s.current_seq(), 1);
        assert_eq!(s.state(), SenderState::Sending);

        let p = s.next_packet_to_send().unwrap();
        assert_eq!(p.seq(), 1);
        assert_eq!(p.payload().len(), 500);
        assert!(s.on_ack(&ack_bytes(0)));
        assert!(s.is_complete());
        assert_eq!(s.state(), SenderState::Complete);
    }

    #[test]
    fn ack_for_previous_segment_is_rejected() {
        let mut s = Sender::new();
        s.load(vec![1u8; 1500]);
        s.next_packet_to_send().unwrap();
        assert!(s.on_ack(&ack_bytes(1)));
        s.next_packet_to_send().unwrap();

        // Duplicate of the ack that retired segment 0.
        assert!(!s.on_ack(&ack_bytes(1)));
        assert_eq!(s.offset(), 1000);
        assert_eq!(s.current_seq(), 1);
        assert!(s.has_unacked());
    }

    #[test]
    fn ack_without_outstanding_segment_is_rejected() {
        let mut s = Sender::new();
        s.load(vec![1u8; 10]);
        assert!(!s.on_ack(&ack_bytes(1)));
        assert_eq!(s.offset(), 0);
    }

    #[test]
    fn corrupt_ack_is_rejected() {
        let mut s = Sender::new();
        s.load(vec![1u8; 10]);
        s.next_packet_to_send().unwrap();
        let mut ack = ack_bytes(1);
        ack[1] ^= 0x80;
        assert!(!s.on_ack(&ack));
        assert!(!s.on_ack(&ack[..3]));
        assert!(s.has_unacked());
    }

    #[test]
    fn packet_without_ack_flag_is_rejected() {
        let mut s = Sender::new();
        s.load(vec![1u8; 10]);
        s.next_packet_to_send().unwrap();
        let not_ack = packet::encode(0, 1, flags::DATA, &[]).unwrap();
        assert!(!s.on_ack(&not_ack));
        assert_eq!(s.stats().acks_received, 0);
    }

    #[test]
    fn handle_timeout_resends_same_packet() {
        let mut s = Sender::new();
        s.load(b"abc".to_vec());
        let first = s.next_packet_to_send().unwrap();
        let rto = s.timeout();

        let again = s.handle_timeout().unwrap();
        assert_eq!(again, first);
        assert_eq!(s.timeout(), rto * 2);
        assert_eq!(s.stats().timeouts, 1);
        assert_eq!(s.stats().segments_retransmitted, 1);
    }

    #[test]
    fn handle_timeout_when_idle_is_noop() {
        let mut s = Sender::new();
        s.load(b"abc".to_vec());
        assert!(s.handle_timeout().is_none());
        assert_eq!(s.stats().timeouts, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_segment_is_retransmitted_by_next_packet() {
        let mut s = Sender::new();
        s.load(b"abc".to_vec());
        let first = s.next_packet_to_send().unwrap();

        tokio::time::advance(Duration::from_millis(100)).await;
        assert!(s.next_packet_to_send().is_none());

        tokio::time::advance(Duration::from_millis(400)).await;
        let again = s.next_packet_to_send().unwrap();
        assert_eq!(again, first);
        assert_eq!(s.timeout(), Duration::from_secs(1));
        // The send clock restarted with the retransmission.
        assert!(s.next_packet_to_send().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn ack_samples_rtt() {
        let mut s = Sender::new();
        s.load(vec![0u8; 2000]);
        s.next_packet_to_send().unwrap();
        tokio::time::advance(Duration::from_millis(250)).await;
        assert!(s.on_ack(&ack_bytes(1)));
        assert_eq!(s.timeout(), Duration::from_millis(250));
    }

    #[test]
    fn reload_resets_cursor_and_sequence() {
        let mut s = Sender::new();
        s.load(vec![0u8; 10]);
        s.next_packet_to_send().unwrap();
        assert!(s.on_ack(&ack_bytes(1)));

        s.load(vec![0u8; 20]);
        assert_eq!(s.offset(), 0);
        assert_eq!(s.current_seq(), 0);
        assert_eq!(s.state(), SenderState::Sending);
    }
}
