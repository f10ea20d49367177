//! Block ranges
//!
//! Half-open spans of block numbers, `[start_block, exclusive_end_block)`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A contiguous span of blocks processed as one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockRange {
    /// First block of the range (inclusive)
    pub start_block: u64,

    /// Block at which the range ends (exclusive)
    pub exclusive_end_block: u64,
}

impl BlockRange {
    /// Create a range; panics if `end < start`
    pub fn new(start_block: u64, exclusive_end_block: u64) -> Self {
        assert!(
            exclusive_end_block >= start_block,
            "invalid block range: end {} is before start {}",
            exclusive_end_block,
            start_block
        );
        Self {
            start_block,
            exclusive_end_block,
        }
    }

    /// Number of blocks covered
    pub fn len(&self) -> u64 {
        self.exclusive_end_block - self.start_block
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, block_num: u64) -> bool {
        block_num >= self.start_block && block_num < self.exclusive_end_block
    }

    /// Iterate block numbers in order
    pub fn blocks(&self) -> std::ops::Range<u64> {
        self.start_block..self.exclusive_end_block
    }

    /// Split `[start, stop)` into consecutive ranges aligned on `interval`
    /// boundaries. The first and last ranges may be shorter.
    pub fn split(start: u64, stop: u64, interval: u64) -> Vec<BlockRange> {
        assert!(interval > 0, "split interval must be greater than zero");

        let mut ranges = Vec::new();
        let mut current = start;
        while current < stop {
            let boundary = (current / interval + 1) * interval;
            let end = boundary.min(stop);
            ranges.push(BlockRange::new(current, end));
            current = end;
        }
        ranges
    }
}

impl fmt::Display for BlockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start_block, self.exclusive_end_block)
    }
}
