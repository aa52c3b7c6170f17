use std::cmp::Ordering;
use std::fmt;

use tracing::info;

/// Half-range comparison of wrap-around `u32` counters.
///
/// `a` orders before `b` iff the forward distance from `a` to `b` is less
/// than half the counter space. Near the wraparound boundary this orders
/// `u32::MAX` before `0`, which plain integer comparison gets backwards.
/// Counters exactly half the space apart have no meaningful order; the
/// forward-distance rule then calls `a` the greater, and live keys never
/// legitimately span that far.
pub fn seq_cmp(a: u32, b: u32) -> Ordering {
    if a == b {
        Ordering::Equal
    } else if b.wrapping_sub(a) < 1 << 31 {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

/// Half-range comparison of wrap-around `u16` counters. See [`seq_cmp`].
pub fn block_cmp(a: u16, b: u16) -> Ordering {
    if a == b {
        Ordering::Equal
    } else if b.wrapping_sub(a) < 1 << 15 {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

/// A frame's position in the logical stream.
///
/// Ordered lexicographically on (epoch, sequence, block): epochs are
/// strictly increasing across transmitter restarts and compare as plain
/// integers; the sequence and block counters are finite-width and compare
/// under the half-range wraparound rule. Immutable once constructed.
///
/// Deployments that key on (run, sequence) pairs map the run number to an
/// epoch through [`UplinkMap`] and leave the block at zero — wraparound
/// comparison subsumes the non-wrapping case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameKey {
    epoch: u64,
    seq: u32,
    block: u16,
}

impl FrameKey {
    pub fn new(epoch: u64, seq: u32, block: u16) -> Self {
        Self { epoch, seq, block }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn seq(&self) -> u32 {
        self.seq
    }

    pub fn block(&self) -> u16 {
        self.block
    }

    /// Whether this key comes immediately after `prev` in the stream:
    /// the next block of the same sequence, or the first block of the next
    /// sequence.
    pub fn follows(&self, prev: &FrameKey) -> bool {
        self.epoch == prev.epoch
            && ((self.seq == prev.seq && self.block == prev.block.wrapping_add(1))
                || (self.seq == prev.seq.wrapping_add(1) && self.block == 0))
    }
}

impl Ord for FrameKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| seq_cmp(self.seq, other.seq))
            .then_with(|| block_cmp(self.block, other.block))
    }
}

impl PartialOrd for FrameKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FrameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.epoch, self.seq, self.block)
    }
}

/// Maps raw uplink transmitter ids to strictly increasing epoch ids.
///
/// The raw id is whatever the transmitter stamps into the frame header; it
/// changes when the uplink site changes and may be reused later. Assigning
/// each newly observed id the next epoch value keeps [`FrameKey`] ordering
/// monotonic across restarts. Only the current and the immediately previous
/// mapping are retained — frames from older uplinks are already unorderable.
///
/// Owned by whoever constructs keys (one per buffer, shared across producer
/// threads behind a mutex).
#[derive(Debug, Default)]
pub struct UplinkMap {
    next_epoch: u64,
    current: Option<(u32, u64)>,
    previous: Option<(u32, u64)>,
}

impl UplinkMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The epoch for `source`, assigning the next epoch value if the source
    /// has not been seen as current or previous uplink.
    pub fn epoch_for(&mut self, source: u32) -> u64 {
        if let Some((src, epoch)) = self.current {
            if src == source {
                return epoch;
            }
        }
        if let Some((src, epoch)) = self.previous {
            if src == source {
                return epoch;
            }
        }

        if let Some((prev_src, _)) = self.current {
            info!(from = prev_src, to = source, "data transmission source changed");
        }

        let epoch = self.next_epoch;
        self.next_epoch += 1;
        self.previous = self.current.take();
        self.current = Some((source, epoch));
        epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_cmp_plain_ordering() {
        assert_eq!(seq_cmp(1, 2), Ordering::Less);
        assert_eq!(seq_cmp(2, 1), Ordering::Greater);
        assert_eq!(seq_cmp(7, 7), Ordering::Equal);
    }

    #[test]
    fn seq_cmp_across_wraparound() {
        assert_eq!(seq_cmp(u32::MAX, 0), Ordering::Less);
        assert_eq!(seq_cmp(u32::MAX - 3, 2), Ordering::Less);
        assert_eq!(seq_cmp(0, u32::MAX), Ordering::Greater);
    }

    #[test]
    fn block_cmp_across_wraparound() {
        assert_eq!(block_cmp(u16::MAX, 0), Ordering::Less);
        assert_eq!(block_cmp(0, u16::MAX), Ordering::Greater);
        assert_eq!(block_cmp(9, 9), Ordering::Equal);
    }

    #[test]
    fn key_orders_on_epoch_first() {
        // A restarted uplink gets a higher epoch; its counters reset but its
        // frames still order after everything from the old epoch.
        let old = FrameKey::new(0, u32::MAX - 5, 100);
        let new = FrameKey::new(1, 0, 0);
        assert!(old < new);
    }

    #[test]
    fn key_orders_on_seq_then_block() {
        let a = FrameKey::new(0, 5, 0);
        let b = FrameKey::new(0, 5, 1);
        let c = FrameKey::new(0, 6, 0);
        assert!(a < b);
        assert!(b < c);
        assert_eq!(a.cmp(&a), Ordering::Equal);
    }

    #[test]
    fn follows_within_and_across_sequences() {
        let base = FrameKey::new(0, 5, 1);
        assert!(FrameKey::new(0, 5, 2).follows(&base));
        assert!(FrameKey::new(0, 6, 0).follows(&base));
        assert!(!FrameKey::new(0, 5, 3).follows(&base));
        assert!(!FrameKey::new(0, 6, 1).follows(&base));
        assert!(!FrameKey::new(1, 5, 2).follows(&base));
    }

    #[test]
    fn follows_across_counter_wraparound() {
        let last_block = FrameKey::new(0, 8, u16::MAX);
        assert!(FrameKey::new(0, 8, 0).follows(&last_block));

        let last_seq = FrameKey::new(0, u32::MAX, 3);
        assert!(FrameKey::new(0, 0, 0).follows(&last_seq));
    }

    #[test]
    fn uplink_map_assigns_increasing_epochs() {
        let mut map = UplinkMap::new();
        assert_eq!(map.epoch_for(40), 0);
        assert_eq!(map.epoch_for(40), 0);
        assert_eq!(map.epoch_for(41), 1);
        assert_eq!(map.epoch_for(42), 2);
    }

    #[test]
    fn uplink_map_retains_previous_mapping() {
        let mut map = UplinkMap::new();
        assert_eq!(map.epoch_for(40), 0);
        assert_eq!(map.epoch_for(41), 1);
        // Flapping back to the previous uplink reuses its epoch.
        assert_eq!(map.epoch_for(40), 0);
    }

    #[test]
    fn uplink_map_evicts_older_mappings() {
        let mut map = UplinkMap::new();
        map.epoch_for(40);
        map.epoch_for(41);
        map.epoch_for(42);
        // 40 was evicted; seeing it again starts a fresh epoch.
        assert_eq!(map.epoch_for(40), 3);
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn matches_plain_ordering_within_half_range(
                a in any::<u32>(),
                d in 1u32..(1 << 31),
            ) {
                // Whenever b is within half the counter space ahead of a,
                // a must order before b — including across the wrap.
                let b = a.wrapping_add(d);
                prop_assert_eq!(seq_cmp(a, b), Ordering::Less);
                prop_assert_eq!(seq_cmp(b, a), Ordering::Greater);
            }

            #[test]
            fn antisymmetric_off_the_half_range_boundary(
                a in any::<u32>(),
                b in any::<u32>(),
            ) {
                prop_assume!(b.wrapping_sub(a) != 1 << 31);
                prop_assert_eq!(seq_cmp(a, b), seq_cmp(b, a).reverse());
            }

            #[test]
            fn equal_only_when_identical(a in any::<u32>(), b in any::<u32>()) {
                prop_assert_eq!(seq_cmp(a, b) == Ordering::Equal, a == b);
            }

            #[test]
            fn transitive_within_a_window(
                base in any::<u32>(),
                d1 in 1u32..(1 << 30),
                d2 in 1u32..(1 << 30),
            ) {
                // Three counters spanning less than half the space must form
                // a chain no matter where the window sits relative to the
                // wrap point.
                let mid = base.wrapping_add(d1);
                let high = mid.wrapping_add(d2);
                prop_assert_eq!(seq_cmp(base, mid), Ordering::Less);
                prop_assert_eq!(seq_cmp(mid, high), Ordering::Less);
                prop_assert_eq!(seq_cmp(base, high), Ordering::Less);
            }

            #[test]
            fn block_cmp_matches_plain_ordering_within_half_range(
                a in any::<u16>(),
                d in 1u16..(1 << 15),
            ) {
                let b = a.wrapping_add(d);
                prop_assert_eq!(block_cmp(a, b), Ordering::Less);
                prop_assert_eq!(block_cmp(b, a), Ordering::Greater);
            }

            #[test]
            fn keys_near_the_boundary_order_consistently(
                seq in (u32::MAX - 64)..=u32::MAX,
                ahead in 1u32..64,
            ) {
                let a = FrameKey::new(3, seq, 0);
                let b = FrameKey::new(3, seq.wrapping_add(ahead), 0);
                prop_assert!(a < b);
                prop_assert!(b > a);
            }
        }
    }
}
