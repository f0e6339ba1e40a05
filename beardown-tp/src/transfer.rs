//! In-process transfer driver.
//!
//! [`run`] pumps one [`Sender`] and one [`Receiver`] through a [`Channel`]
//! in the calling discipline the engines expect:
//!
//! ```text
//!  sender.next_packet_to_send ──▶ channel ──▶ receiver.on_packet
//!        ▲                                          │ ack
//!        │ handle_timeout (no ack accepted)         ▼
//!  sender.on_ack ◀──────────────── channel ◀────────┘
//! ```
//!
//! Transit delays are slept on the tokio clock, so RTT samples see them and
//! tests running with a paused clock finish instantly.

use std::time::Duration;

use tokio::time::Instant;

use crate::packet::Packet;
use crate::receiver::Receiver;
use crate::sender::Sender;
use crate::simulator::Channel;
use crate::stats::Statistics;

/// What a driven transfer produced.
#[derive(Debug, Clone)]
pub struct TransferReport {
    /// Bytes the receiver delivered.
    pub delivered: Vec<u8>,
    /// `true` when the sender saw every byte acknowledged.
    pub completed: bool,
    /// Driver iterations used.
    pub steps: usize,
    pub elapsed: Duration,
    pub sender_stats: Statistics,
    pub receiver_stats: Statistics,
}

/// Drive `sender` (already loaded) and `receiver` over `channel` until the
/// sender completes or `max_steps` iterations have run.
pub async fn run<C: Channel + ?Sized>(
    mut sender: Sender,
    mut receiver: Receiver,
    channel: &mut C,
    max_steps: usize,
) -> TransferReport {
    let started = Instant::now();
    let mut steps = 0;
    let mut retransmission: Option<Packet> = None;

    while !sender.is_complete() && steps < max_steps {
        steps += 1;

        let Some(packet) = retransmission.take().or_else(|| sender.next_packet_to_send()) else {
            // Outstanding and not yet timed out: wait for the deadline.
            if let Some(deadline) = sender.retransmit_deadline() {
                tokio::time::sleep_until(deadline).await;
            }
            continue;
        };

        let mut acked = false;
        for copy in channel.transmit(&packet.encode()) {
            tokio::time::sleep(copy.delay).await;
            let Some(ack) = receiver.on_packet(&copy.bytes) else {
                continue;
            };
            for ack_copy in channel.transmit(&ack.encode()) {
                tokio::time::sleep(ack_copy.delay).await;
                acked |= sender.on_ack(&ack_copy.bytes);
            }
        }

        if !acked {
            retransmission = sender.handle_timeout();
        }
    }

    let completed = sender.is_complete();
    if !completed {
        log::warn!(
            "[transfer] gave up after {steps} steps at offset {}/{}",
            sender.offset(),
            sender.total()
        );
    }

    TransferReport {
        completed,
        steps,
        elapsed: started.elapsed(),
        sender_stats: sender.stats().clone(),
        receiver_stats: receiver.stats().clone(),
        delivered: receiver.into_delivered(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::Simulator;

    #[tokio::test(start_paused = true)]
    async fn empty_payload_needs_no_steps() {
        let mut sender = Sender::new();
        sender.load(Vec::new());
        let report = run(sender, Receiver::new(), &mut Simulator::perfect(), 10).await;
        assert!(report.completed);
        assert_eq!(report.steps, 0);
        assert!(report.delivered.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn perfect_channel_uses_one_step_per_segment() {
        let mut sender = Sender::new();
        sender.load(vec![9u8; 2500]);
        let report = run(sender, Receiver::new(), &mut Simulator::perfect(), 100).await;
        assert!(report.completed);
        assert_eq!(report.steps, 3);
        assert_eq!(report.sender_stats.segments_retransmitted, 0);
        assert_eq!(report.delivered, vec![9u8; 2500]);
    }

    #[tokio::test(start_paused = true)]
    async fn step_budget_bounds_the_loop() {
        struct BlackHole;
        impl Channel for BlackHole {
            fn transmit(&mut self, _: &[u8]) -> Vec<crate::simulator::Transit> {
                Vec::new()
            }
        }

        let mut sender = Sender::new();
        sender.load(vec![1u8; 10]);
        let report = run(sender, Receiver::new(), &mut BlackHole, 5).await;
        assert!(!report.completed);
        assert_eq!(report.steps, 5);
        assert_eq!(report.sender_stats.timeouts, 5);
        assert!(report.delivered.is_empty());
    }
}
