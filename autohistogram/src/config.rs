#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

use crate::{BuildError, Error};
use core::ops::RangeInclusive;

/// The bucket layout of the integer histogram.
///
/// Codes below `2^(grouping_power + 1)` are stored with unit resolution. Above
/// that cutoff, each power of two is divided into `2^grouping_power` buckets of
/// equal width. This means consecutive powers of two start at indices which
/// are exactly `2^grouping_power` apart, which is what allows the stored
/// counts to be rescaled by moving whole runs of buckets.
///
/// # Constraints:
/// * `max_value_power` must be less than or equal to 64
/// * `max_value_power` must be greater than `grouping_power + 1`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Config {
    max: u64,
    grouping_power: u8,
    max_value_power: u8,
    cutoff_power: u8,
    cutoff_value: u64,
    lower_bin_count: u32,
    upper_bin_divisions: u32,
    upper_bin_count: u32,
}

impl Config {
    pub fn new(grouping_power: u8, max_value_power: u8) -> Result<Self, BuildError> {
        // we only allow values up to 2^64
        if max_value_power > 64 {
            return Err(BuildError::MaxPowerTooHigh);
        }

        // the logarithmic range must hold at least one power of two
        if grouping_power as u32 + 1 >= max_value_power as u32 {
            return Err(BuildError::MaxPowerTooLow);
        }

        // the cutoff is the point at which the linear range divisions and the
        // logarithmic range subdivisions diverge.
        //
        // for example:
        // if grouping_power = 7 the logarithmic range has 128 subdivisions.
        // this means that for 0..128 we must be representing the values exactly
        // but we also represent 128..256 exactly since the subdivisions divide
        // that range into bins with the same width as the linear portion.
        //
        // therefore our cutoff power = grouping_power + 1
        let cutoff_power = grouping_power + 1;
        let cutoff_value = 1_u64 << cutoff_power;
        let upper_bin_divisions = 1_u32 << grouping_power;

        let max = if max_value_power == 64 {
            u64::MAX
        } else {
            (1_u64 << max_value_power) - 1
        };

        let lower_bin_count = cutoff_value as u32;
        let upper_bin_count = (max_value_power - cutoff_power) as u32 * upper_bin_divisions;

        Ok(Self {
            max,
            grouping_power,
            max_value_power,
            cutoff_power,
            cutoff_value,
            lower_bin_count,
            upper_bin_divisions,
            upper_bin_count,
        })
    }

    /// Returns the grouping power that was used to create this configuration.
    pub fn grouping_power(&self) -> u8 {
        self.grouping_power
    }

    /// Returns the max value power that was used to create this configuration.
    pub fn max_value_power(&self) -> u8 {
        self.max_value_power
    }

    /// Returns the largest code which can be stored.
    pub fn max(&self) -> u64 {
        self.max
    }

    /// Returns the number of buckets spanning one power of two in the
    /// logarithmic range.
    pub(crate) fn half_count(&self) -> usize {
        self.upper_bin_divisions as usize
    }

    /// Returns the index of the bucket which holds the provided code.
    pub fn value_to_index(&self, value: u64) -> Result<usize, Error> {
        if value < self.cutoff_value {
            return Ok(value as usize);
        }

        if value > self.max {
            return Err(Error::OutOfRange);
        }

        let power = 63 - value.leading_zeros();
        let log_bin = power - self.cutoff_power as u32;
        let offset = (value - (1 << power)) >> (power - self.grouping_power as u32);

        Ok((self.lower_bin_count + log_bin * self.upper_bin_divisions + offset as u32) as usize)
    }

    /// Returns the inclusive lower bound of the bucket at the index.
    pub fn index_to_lower_bound(&self, index: usize) -> u64 {
        let index = index as u64;

        if index < self.lower_bin_count as u64 {
            return index;
        }

        let g = (index - self.lower_bin_count as u64) >> self.grouping_power;
        let h = (index - self.lower_bin_count as u64) & (self.upper_bin_divisions as u64 - 1);
        let power = self.cutoff_power as u64 + g;

        (1 << power) + (h << (power - self.grouping_power as u64))
    }

    /// Returns the inclusive upper bound of the bucket at the index.
    pub fn index_to_upper_bound(&self, index: usize) -> u64 {
        let lower = self.index_to_lower_bound(index);

        if (index as u64) < self.lower_bin_count as u64 {
            return lower;
        }

        let g = (index as u64 - self.lower_bin_count as u64) >> self.grouping_power;
        let power = self.cutoff_power as u64 + g;

        lower + ((1 << (power - self.grouping_power as u64)) - 1)
    }

    /// Returns the inclusive range of codes held by the bucket at the index.
    pub fn index_to_range(&self, index: usize) -> RangeInclusive<u64> {
        self.index_to_lower_bound(index)..=self.index_to_upper_bound(index)
    }

    /// Returns the total number of buckets.
    pub fn total_buckets(&self) -> usize {
        (self.lower_bin_count + self.upper_bin_count) as usize
    }
}
