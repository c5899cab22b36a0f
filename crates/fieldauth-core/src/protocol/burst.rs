//! Burst planning: how a long payload is cut into transport-sized writes.
//!
//! A Modbus "write multiple registers" request carries at most
//! [`MAX_WRITE_REGISTERS`](super::MAX_WRITE_REGISTERS) words.  The 256-word
//! challenge therefore travels as several *bursts*:
//!
//! ```text
//! payload (256 words, max_write = 123)
//! ├── burst 0: words   0..123  (123)
//! ├── burst 1: words 123..246  (123)
//! └── burst 2: words 246..256  ( 10)   remainder, omitted when zero
//! ```
//!
//! Every burst is written at the *same* base address.  The slave reassembles
//! the payload by arrival order, not by address.

use std::num::NonZeroU16;

/// A contiguous slice of the payload sent in one write call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Burst<'a> {
    /// Zero-based position of this burst in the sequence.
    pub index: usize,
    /// Offset of the first word within the payload.
    pub offset: usize,
    /// The words carried by this burst.
    pub words: &'a [u16],
}

/// Number of write calls needed for `len` words: `ceil(len / max_write)`.
pub fn burst_count(len: usize, max_write: NonZeroU16) -> usize {
    len.div_ceil(usize::from(max_write.get()))
}

/// Cuts `payload` into bursts of at most `max_write` words.
///
/// All bursts but the last are full; the last carries `len % max_write`
/// words, or is full when that remainder is zero.  An empty payload yields
/// no bursts at all.
///
/// # Examples
///
/// ```rust
/// use std::num::NonZeroU16;
/// use fieldauth_core::protocol::burst::plan_bursts;
///
/// let payload: Vec<u16> = (0..10).collect();
/// let sizes: Vec<usize> = plan_bursts(&payload, NonZeroU16::new(4).unwrap())
///     .map(|b| b.words.len())
///     .collect();
/// assert_eq!(sizes, vec![4, 4, 2]);
/// ```
pub fn plan_bursts(payload: &[u16], max_write: NonZeroU16) -> impl Iterator<Item = Burst<'_>> {
    let size = usize::from(max_write.get());
    payload
        .chunks(size)
        .enumerate()
        .map(move |(index, words)| Burst {
            index,
            offset: index * size,
            words,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MAX_WRITE_REGISTERS;
    use proptest::prelude::*;

    fn nz(value: u16) -> NonZeroU16 {
        NonZeroU16::new(value).expect("non-zero")
    }

    #[test]
    fn test_challenge_with_modbus_limit_uses_two_full_bursts_and_remainder() {
        // Arrange
        let payload: Vec<u16> = (0..256).collect();

        // Act
        let bursts: Vec<Burst<'_>> = plan_bursts(&payload, MAX_WRITE_REGISTERS).collect();

        // Assert
        assert_eq!(bursts.len(), 3);
        assert_eq!(bursts[0].words.len(), 123);
        assert_eq!(bursts[1].words.len(), 123);
        assert_eq!(bursts[2].words.len(), 10);
        assert_eq!(bursts[2].offset, 246);
    }

    #[test]
    fn test_exact_multiple_has_no_remainder_burst() {
        let payload = vec![7u16; 256];
        let sizes: Vec<usize> = plan_bursts(&payload, nz(64)).map(|b| b.words.len()).collect();
        assert_eq!(sizes, vec![64, 64, 64, 64]);
    }

    #[test]
    fn test_empty_payload_yields_no_bursts() {
        assert_eq!(plan_bursts(&[], nz(123)).count(), 0);
        assert_eq!(burst_count(0, nz(123)), 0);
    }

    #[test]
    fn test_payload_shorter_than_limit_is_single_burst() {
        let payload = [1u16, 2, 3];
        let bursts: Vec<Burst<'_>> = plan_bursts(&payload, nz(123)).collect();
        assert_eq!(bursts.len(), 1);
        assert_eq!(bursts[0].words, &payload);
    }

    proptest! {
        #[test]
        fn prop_bursts_cover_payload_in_order(
            payload in proptest::collection::vec(any::<u16>(), 0..600),
            max in 1u16..=123,
        ) {
            let max_write = nz(max);
            let bursts: Vec<Burst<'_>> = plan_bursts(&payload, max_write).collect();

            prop_assert_eq!(bursts.len(), burst_count(payload.len(), max_write));
            prop_assert!(bursts.iter().all(|b| !b.words.is_empty()));
            prop_assert!(bursts.iter().all(|b| b.words.len() <= usize::from(max)));

            let joined: Vec<u16> = bursts.iter().flat_map(|b| b.words.iter().copied()).collect();
            prop_assert_eq!(joined, payload.clone());

            if let Some(last) = bursts.last() {
                let remainder = payload.len() % usize::from(max);
                let expected = if remainder == 0 { usize::from(max) } else { remainder };
                prop_assert_eq!(last.words.len(), expected);
            }
        }
    }
}
