//! Minimal covering set of address ranges
//!
//! Overlapping and touching ranges are merged on insert, so iteration always
//! yields disjoint, non-adjacent ranges in address order.

use std::collections::BTreeMap;

use crate::domain::AddrRange;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeSet {
    /// start -> end
    ranges: BTreeMap<u64, u64>,
}

impl RangeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, range: AddrRange) {
        let mut start = range.start;
        let mut end = range.end;

        if let Some((&prev_start, &prev_end)) = self.ranges.range(..=start).next_back() {
            if prev_end >= start {
                start = prev_start;
                end = end.max(prev_end);
            }
        }

        let absorbed: Vec<u64> = self.ranges.range(start..=end).map(|(&s, _)| s).collect();
        for s in absorbed {
            if let Some(e) = self.ranges.remove(&s) {
                end = end.max(e);
            }
        }

        self.ranges.insert(start, end);
    }

    pub fn iter(&self) -> impl Iterator<Item = AddrRange> + '_ {
        self.ranges.iter().map(|(&start, &end)| AddrRange { start, end })
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<AddrRange> {
        self.iter().collect()
    }
}

impl FromIterator<AddrRange> for RangeSet {
    fn from_iter<I: IntoIterator<Item = AddrRange>>(iter: I) -> Self {
        let mut set = RangeSet::new();
        for range in iter {
            set.insert(range);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: u64, end: u64) -> AddrRange {
        AddrRange::new(start, end).unwrap()
    }

    #[test]
    fn test_disjoint_ranges_kept_in_order() {
        let set: RangeSet = [range(32, 40), range(0, 8), range(16, 24)].into_iter().collect();
        assert_eq!(set.to_vec(), vec![range(0, 8), range(16, 24), range(32, 40)]);
    }

    #[test]
    fn test_overlapping_and_touching_ranges_merge() {
        let mut set = RangeSet::new();
        set.insert(range(0, 8));
        set.insert(range(8, 12));
        set.insert(range(4, 6));
        assert_eq!(set.to_vec(), vec![range(0, 12)]);
    }

    #[test]
    fn test_insert_bridges_several_ranges() {
        let mut set: RangeSet = [range(0, 4), range(8, 12), range(16, 20)].into_iter().collect();
        set.insert(range(2, 17));
        assert_eq!(set.to_vec(), vec![range(0, 20)]);
    }

    #[test]
    fn test_repeated_access_is_deduplicated() {
        let mut set = RangeSet::new();
        for _ in 0..100 {
            set.insert(range(0x1000, 0x1008));
        }
        assert_eq!(set.to_vec(), vec![range(0x1000, 0x1008)]);
    }

    #[test]
    fn test_range_at_top_of_address_space() {
        let mut set = RangeSet::new();
        set.insert(range(u64::MAX - 8, u64::MAX));
        set.insert(range(u64::MAX - 16, u64::MAX - 8));
        assert_eq!(set.to_vec(), vec![range(u64::MAX - 16, u64::MAX)]);
    }
}
