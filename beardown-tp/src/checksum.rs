//! Internet checksum (RFC 1071).
//!
//! Sum consecutive 16-bit big-endian words with end-around carry and return
//! the one's-complement.  An odd trailing byte is padded with a zero byte on
//! the right.  Any input, including the empty slice, is valid.

/// Compute the Internet checksum over `data`.
///
/// The caller must zero any checksum field within `data` before calling.
pub fn calculate(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;

    let mut words = data.chunks_exact(2);
    for word in &mut words {
        sum += u32::from(u16::from_be_bytes([word[0], word[1]]));
        // Fold eagerly so very long inputs cannot overflow the accumulator.
        if sum > 0xffff {
            sum = (sum & 0xffff) + (sum >> 16);
        }
    }
    if let [last] = words.remainder() {
        sum += u32::from(*last) << 8;
    }

    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }

    !(sum as u16)
}

/// Recompute the checksum of `data` (checksum field already zeroed) and
/// compare it with `expected`.
pub fn verify(data: &[u8], expected: u16) -> bool {
    calculate(data) == expected
}
