//! Stop-and-wait transfer over a real UDP socket.
//!
//! ```text
//!  send()                                   receive()
//!    Sender ──▶ Channel ──▶ Socket ~~~~~~~▶ Socket ──▶ Receiver
//!      ▲                                                  │
//!      └────────────── Socket ◀~~~~~~~~~~~~ Socket ◀── ACK ┘
//! ```
//!
//! The sending side multiplexes the ack socket and the retransmission timer
//! with `tokio::select!` inside one task.  An ack is fully processed before
//! the next timer is armed, and a fired timer only resends if the segment is
//! still outstanding, so a late ack and an expiring timer cannot both act
//! on the same segment.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::packet::PacketError;
use crate::receiver::Receiver;
use crate::sender::Sender;
use crate::simulator::Channel;
use crate::socket::Socket;
use crate::stats::Statistics;
use crate::timer::TimerConfig;

/// Retransmissions of one segment before [`send`] gives up.
pub const DEFAULT_MAX_RETRIES: u32 = 10;

#[derive(Debug, Error)]
pub enum ConnError {
    #[error("socket I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("no acknowledgement after {retries} retransmissions")]
    MaxRetriesExceeded { retries: u32 },
    #[error("malformed packet: {0}")]
    Packet(#[from] PacketError),
}

/// Tunables for [`send`].
#[derive(Debug, Clone)]
pub struct SendOptions {
    pub timer: TimerConfig,
    pub max_retries: u32,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            timer: TimerConfig::default(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Reliably deliver `data` to `peer`.
///
/// Every outgoing datagram passes through `channel` first (use
/// [`Simulator::perfect`](crate::simulator::Simulator::perfect) for a plain
/// socket).  Datagrams from any address other than `peer` are ignored.
/// Returns the sender's statistics once every byte has been acknowledged.
pub async fn send<C: Channel + ?Sized>(
    socket: &Socket,
    peer: SocketAddr,
    data: &[u8],
    options: &SendOptions,
    channel: &mut C,
) -> Result<Statistics, ConnError> {
    let mut sender = Sender::with_config(options.timer.clone());
    sender.load(data.to_vec());
    // Timeout count at the last accepted ack.
    let mut timeouts_at_ack = 0;

    log::info!("[conn] sending {} bytes to {peer}", data.len());
    while !sender.is_complete() {
        if let Some(packet) = sender.next_packet_to_send() {
            let consecutive = sender.stats().timeouts - timeouts_at_ack;
            if consecutive > u64::from(options.max_retries) {
                log::warn!(
                    "[conn] giving up on seq={} after {} retransmissions",
                    packet.seq(),
                    options.max_retries
                );
                return Err(ConnError::MaxRetriesExceeded {
                    retries: options.max_retries,
                });
            }
            transmit(socket, peer, &packet.encode(), channel).await?;
        }

        let Some(deadline) = sender.retransmit_deadline() else {
            continue;
        };

        tokio::select! {
            result = socket.recv_from() => {
                let (bytes, addr) = result?;
                if addr != peer {
                    log::trace!("[conn] ignoring datagram from {addr}");
                    continue;
                }
                if sender.on_ack(&bytes) {
                    timeouts_at_ack = sender.stats().timeouts;
                }
            }
            // The retransmission itself happens in `next_packet_to_send`.
            _ = tokio::time::sleep_until(deadline) => {}
        }
    }

    log::info!(
        "[conn] delivered {} bytes to {peer} ({} retransmissions)",
        data.len(),
        sender.stats().segments_retransmitted
    );
    Ok(sender.stats().clone())
}

/// Accept one transfer on `socket`.
///
/// Every datagram is handed to a [`Receiver`] and its ACK, if any, is sent
/// back to the datagram's source.  Waits indefinitely for the first segment;
/// after that, returns once no datagram has arrived for `idle`.  `idle`
/// should exceed the sender's largest retransmission timeout, or a sender
/// whose final ACK was lost keeps retrying after the receiver has left.
pub async fn receive(
    socket: &Socket,
    idle: Duration,
) -> Result<(Vec<u8>, Statistics), ConnError> {
    let mut receiver = Receiver::new();

    loop {
        let (bytes, addr) = if receiver.stats().segments_received == 0 {
            socket.recv_from().await?
        } else {
            match tokio::time::timeout(idle, socket.recv_from()).await {
                Ok(result) => result?,
                Err(_elapsed) => break,
            }
        };

        if let Some(ack) = receiver.on_packet(&bytes) {
            socket.send_to(&ack.encode(), addr).await?;
        }
    }

    log::info!(
        "[conn] peer idle for {idle:?}; received {} bytes",
        receiver.delivered_bytes().len()
    );
    let stats = receiver.stats().clone();
    Ok((receiver.into_delivered(), stats))
}

/// Put `bytes` through `channel` and send every surviving copy to `peer`.
async fn transmit<C: Channel + ?Sized>(
    socket: &Socket,
    peer: SocketAddr,
    bytes: &[u8],
    channel: &mut C,
) -> io::Result<()> {
    for copy in channel.transmit(bytes) {
        tokio::time::sleep(copy.delay).await;
        socket.send_to(&copy.bytes, peer).await?;
    }
    Ok(())
}
