//! `beardown-tp`: a stop-and-wait reliable transfer protocol over unreliable
//! datagrams.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────┐   DATA    ┌─────────┐   DATA    ┌──────────┐
//!  │  Sender  │──────────▶│ Channel │──────────▶│ Receiver │
//!  └────┬─────┘           │ (loss,  │           └─────┬────┘
//!       │                 │ corrupt,│                 │
//!       │       ACK       │ dup,    │       ACK       │
//!       │◀────────────────│ delay)  │◀────────────────┘
//!       │                 └─────────┘
//!  ┌────▼─────────────────────────────────────────────┐
//!  │  transfer::run (in-process)                      │
//!  │  connection::send / receive (UDP socket)         │
//!  └──────────────────────────────────────────────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`checksum`]    — RFC 1071 Internet checksum
//! - [`packet`]      — 7-byte header wire format and validation
//! - [`sequence`]    — alternating-bit sequence arithmetic
//! - [`timer`]       — adaptive retransmission timeout
//! - [`stats`]       — protocol counters
//! - [`state`]       — sender lifecycle states
//! - [`sender`]      — stop-and-wait outbound engine
//! - [`receiver`]    — stop-and-wait inbound engine
//! - [`simulator`]   — fault-injecting channel for testing
//! - [`transfer`]    — drives a sender and receiver over a channel
//! - [`scenario`]    — reference fault scenarios and scorecard
//! - [`socket`]      — async UDP socket abstraction
//! - [`connection`]  — transfers over a real socket

pub mod checksum;
pub mod connection;
pub mod packet;
pub mod receiver;
pub mod scenario;
pub mod sender;
pub mod sequence;
pub mod simulator;
pub mod socket;
pub mod state;
pub mod stats;
pub mod timer;
pub mod transfer;
