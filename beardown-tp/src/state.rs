//! Sender finite-state machine (FSM) types.
//!
//! The receiver has a single state ("expecting sequence X") and needs no
//! type here.  State transitions live in [`crate::sender`]; the state is
//! derived from the sender's buffer cursor and in-flight slot rather than
//! stored, so it can never disagree with them.
//!
//! ```text
//!  IDLE ──load──▶ SENDING ──segment out──▶ AWAITING_ACK ──ack──▶ SENDING
//!                    │                        │    ▲                │
//!                    │ (empty load)           └────┘ timeout        │ offset ≥ total
//!                    ▼                                              ▼
//!                 COMPLETE ◀────────────────────────────────────────┘
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SenderState {
    /// No data loaded.
    #[default]
    Idle,
    /// Data remains and no segment is outstanding.
    Sending,
    /// One segment is outstanding.
    AwaitingAck,
    /// Every byte has been acknowledged.
    Complete,
}

impl fmt::Display for SenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SenderState::Idle => "IDLE",
            SenderState::Sending => "SENDING",
            SenderState::AwaitingAck => "AWAITING_ACK",
            SenderState::Complete => "COMPLETE",
        };
        f.write_str(name)
    }
}
