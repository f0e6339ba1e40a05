//! Modulo-N sequence counter.
//!
//! With `modulo = 2` this is the alternating bit: any sequence number that
//! reaches an endpoint is either the one it expects or the one it has just
//! retired.  The sender owns a counter for "next to send", the receiver an
//! independent one for "next expected".

/// Modulus used by the stop-and-wait engines.
pub const STOP_AND_WAIT_MODULO: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceNumber {
    value: u8,
    modulo: u8,
}

impl Default for SequenceNumber {
    fn default() -> Self {
        Self::new(STOP_AND_WAIT_MODULO)
    }
}

impl SequenceNumber {
    /// Create a counter starting at 0.
    ///
    /// # Panics
    ///
    /// Panics if `modulo < 2`; a single value cannot tell a new segment from
    /// a retransmission.
    pub fn new(modulo: u8) -> Self {
        assert!(modulo >= 2, "sequence modulo must be at least 2");
        Self { value: 0, modulo }
    }

    pub fn current(&self) -> u8 {
        self.value
    }

    pub fn modulo(&self) -> u8 {
        self.modulo
    }

    /// The value [`increment`](Self::increment) would produce.
    pub fn next(&self) -> u8 {
        ((u16::from(self.value) + 1) % u16::from(self.modulo)) as u8
    }

    /// The value before the current one, with wraparound.
    pub fn previous(&self) -> u8 {
        ((u16::from(self.value) + u16::from(self.modulo) - 1) % u16::from(self.modulo)) as u8
    }

    pub fn increment(&mut self) {
        self.value = self.next();
    }

    pub fn reset(&mut self) {
        self.value = 0;
    }

    pub fn is_expected(&self, received: u8) -> bool {
        received == self.value
    }

    pub fn is_duplicate(&self, received: u8) -> bool {
        received == self.previous()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alternates_between_zero_and_one() {
        let mut s = SequenceNumber::default();
        assert_eq!(s.current(), 0);
        s.increment();
        assert_eq!(s.current(), 1);
        s.increment();
        assert_eq!(s.current(), 0);
    }

    #[test]
    fn expected_and_duplicate_partition_modulo_two() {
        let mut s = SequenceNumber::default();
        assert!(s.is_expected(0));
        assert!(s.is_duplicate(1));
        s.increment();
        assert!(s.is_expected(1));
        assert!(s.is_duplicate(0));
        assert!(!s.is_expected(0));
    }

    #[test]
    fn larger_modulo_leaves_unexpected_values() {
        let mut s = SequenceNumber::new(8);
        s.increment();
        s.increment();
        assert!(s.is_expected(2));
        assert!(s.is_duplicate(1));
        assert!(!s.is_expected(5) && !s.is_duplicate(5));
    }

    #[test]
    fn wraps_at_max_modulo_without_overflow() {
        let mut s = SequenceNumber::new(u8::MAX);
        assert_eq!(s.previous(), 254);
        for _ in 0..254 {
            s.increment();
        }
        assert_eq!(s.current(), 254);
        s.increment();
        assert_eq!(s.current(), 0);
    }

    #[test]
    fn reset_returns_to_zero() {
        let mut s = SequenceNumber::default();
        s.increment();
        s.reset();
        assert_eq!(s.current(), 0);
    }

    #[test]
    #[should_panic(expected = "at least 2")]
    fn modulo_one_is_rejected() {
        let _ = SequenceNumber::new(1);
    }
}
