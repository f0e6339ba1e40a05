//! Per-engine transfer counters.
//!
//! Each [`crate::sender::Sender`] and [`crate::receiver::Receiver`] owns its
//! own [`Statistics`]; nothing is process-wide, so independent transfers can
//! run side by side in one test binary.  Counters only ever increase.

use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Fresh segments handed to the channel (retransmissions excluded).
    pub segments_sent: u64,
    /// In-order segments accepted and delivered.
    pub segments_received: u64,
    /// Retransmissions of an already-sent segment.
    pub segments_retransmitted: u64,
    /// ACKs that retired an outstanding segment.
    pub acks_received: u64,
    /// Retransmission timeouts that fired.
    pub timeouts: u64,
    /// Wire bytes sent, retransmissions included.
    pub bytes_sent: u64,
    /// Payload bytes delivered.
    pub bytes_received: u64,
    /// Segments recognised as a repeat of the last delivered one.
    pub duplicates_received: u64,
    /// Datagrams dropped for failing validation.
    pub packets_rejected: u64,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_send(&mut self, size: usize) {
        self.segments_sent += 1;
        self.bytes_sent += size as u64;
    }

    pub fn record_receive(&mut self, size: usize) {
        self.segments_received += 1;
        self.bytes_received += size as u64;
    }

    pub fn record_ack(&mut self) {
        self.acks_received += 1;
    }

    pub fn record_timeout(&mut self) {
        self.timeouts += 1;
    }

    pub fn record_retransmission(&mut self, size: usize) {
        self.segments_retransmitted += 1;
        self.bytes_sent += size as u64;
    }

    pub fn record_duplicate(&mut self) {
        self.duplicates_received += 1;
    }

    pub fn record_rejected(&mut self) {
        self.packets_rejected += 1;
    }

    /// Retransmissions as a percentage of fresh segments.
    pub fn retransmission_rate(&self) -> f64 {
        if self.segments_sent == 0 {
            return 0.0;
        }
        self.segments_retransmitted as f64 / self.segments_sent as f64 * 100.0
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Protocol Statistics:")?;
        writeln!(f, "  Segments sent:        {}", self.segments_sent)?;
        writeln!(f, "  Segments received:    {}", self.segments_received)?;
        writeln!(
            f,
            "  Retransmissions:      {} ({:.1}%)",
            self.segments_retransmitted,
            self.retransmission_rate()
        )?;
        writeln!(f, "  ACKs received:        {}", self.acks_received)?;
        writeln!(f, "  Timeouts:             {}", self.timeouts)?;
        writeln!(f, "  Duplicates received:  {}", self.duplicates_received)?;
        writeln!(f, "  Packets rejected:     {}", self.packets_rejected)?;
        writeln!(f, "  Total bytes sent:     {}", self.bytes_sent)?;
        write!(f, "  Total bytes received: {}", self.bytes_received)
    }
}
