//! Height-dependent parameter selection.
//!
//! A [`RangeSelector`] maps block heights onto values that change at known
//! heights, such as a contract redeployed with a new ABI. Each entry applies
//! from its start block (inclusive) up to the next entry's start block.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A value that applies from `start_block` onwards.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BlockRange<T> {
    pub start_block: u64,
    pub value: T,
}

impl<T> BlockRange<T> {
    pub fn new(start_block: u64, value: T) -> Self {
        Self { start_block, value }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("Start block must be greater than 0")]
    InvalidStartBlock,

    #[error("Ranges overlap: start block {start_block} appears more than once")]
    OverlappingRanges { start_block: u64 },
}

/// Validated set of ranges, kept sorted by descending start block.
#[derive(Debug, Clone)]
pub struct RangeSelector<T> {
    ranges: Vec<BlockRange<T>>,
}

impl<T> RangeSelector<T> {
    /// Validate and sort. Fails on a zero start block or a repeated start block.
    pub fn new(mut ranges: Vec<BlockRange<T>>) -> Result<Self, RangeError> {
        if ranges.iter().any(|r| r.start_block == 0) {
            return Err(RangeError::InvalidStartBlock);
        }

        ranges.sort_by(|a, b| b.start_block.cmp(&a.start_block));
        if let Some(pair) = ranges
            .windows(2)
            .find(|pair| pair[0].start_block == pair[1].start_block)
        {
            return Err(RangeError::OverlappingRanges {
                start_block: pair[0].start_block,
            });
        }

        Ok(Self { ranges })
    }

    /// Add one range, keeping the selector valid. On error nothing changes.
    pub fn add_range(&mut self, range: BlockRange<T>) -> Result<(), RangeError> {
        if range.start_block == 0 {
            return Err(RangeError::InvalidStartBlock);
        }
        match self
            .ranges
            .binary_search_by(|r| range.start_block.cmp(&r.start_block))
        {
            Ok(_) => Err(RangeError::OverlappingRanges {
                start_block: range.start_block,
            }),
            Err(pos) => {
                self.ranges.insert(pos, range);
                Ok(())
            }
        }
    }

    /// Value of the range containing `height`, `None` below every range.
    pub fn get(&self, height: u64) -> Option<&T> {
        self.ranges
            .iter()
            .find(|r| r.start_block <= height)
            .map(|r| &r.value)
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Ranges in descending start block order.
    pub fn ranges(&self) -> &[BlockRange<T>] {
        &self.ranges
    }
}

impl<T: Default + Clone> RangeSelector<T> {
    /// Value for `height`; the default value below every range.
    pub fn lookup(&self, height: u64) -> T {
        self.get(height).cloned().unwrap_or_default()
    }

    /// Run `handler` on the value for `height` (default below every range).
    pub fn handle<R>(&self, height: u64, handler: impl FnOnce(&T) -> R) -> R {
        match self.get(height) {
            Some(value) => handler(value),
            None => handler(&T::default()),
        }
    }
}

impl<T> Default for RangeSelector<T> {
    fn default() -> Self {
        Self { ranges: Vec::new() }
    }
}
