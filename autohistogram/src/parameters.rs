#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

use crate::{BuildError, Config};

/// Upper bound on `ratio * 10^significant_figures`, which keeps every integer
/// code comfortably inside a `u64`.
const CODE_SPACE_LIMIT: u128 = 1 << 61;

/// The most significant figures supported by the integer histogram.
const MAX_SIGNIFICANT_FIGURES: u8 = 5;

/// The parameters that determine the histogram bucketing.
/// * `highest_to_lowest_value_ratio` - the dynamic range which must be
///   representable at once. A ratio of `1000` allows the histogram to hold
///   values from `1.0` to `1000.0` (or `1e-9` to `1e-6`) without having to
///   shift its covering range. Values outside the current range are still
///   accepted if the range can be moved without discarding recorded data.
/// * `significant_figures` - the number of decimal digits of precision that
///   are maintained for each value. With `3` significant figures, a recorded
///   value can be recovered to within `0.05%`.
///
/// # Memory
///
/// The histogram allocates `(log2(internal_ratio) + 1) * 2^grouping_power`
/// 64bit counters, where `internal_ratio` is the smallest power of two that
/// is at least twice the requested ratio and `2^(grouping_power + 1)` is the
/// smallest power of two that is at least `2 * 10^significant_figures`.
///
/// | figures | ratio 1e3 | ratio 1e6 | ratio 1e9 |
/// |---------|-----------|-----------|-----------|
/// |       1 |   1.5 KiB |   2.8 KiB |     4 KiB |
/// |       2 |    12 KiB |    22 KiB |    32 KiB |
/// |       3 |    96 KiB |   176 KiB |   256 KiB |
/// |       4 |   1.5 MiB |   2.8 MiB |     4 MiB |
/// |       5 |    12 MiB |    22 MiB |    32 MiB |
///
/// # Constraints:
/// * `highest_to_lowest_value_ratio` must be at least 2
/// * `significant_figures` must be in the range `1..=5`
/// * `highest_to_lowest_value_ratio * 10^significant_figures` must be less
///   than `2^61`
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Parameters {
    pub highest_to_lowest_value_ratio: u64,
    pub significant_figures: u8,
}

impl Parameters {
    /// Create a new set of parameters, returning an error if they are invalid.
    pub fn new(highest_to_lowest_value_ratio: u64, significant_figures: u8) -> Result<Self, BuildError> {
        let parameters = Self {
            highest_to_lowest_value_ratio,
            significant_figures,
        };

        parameters.validate()?;

        Ok(parameters)
    }

    /// Checks the parameters against the constraints listed above.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.highest_to_lowest_value_ratio < 2 {
            return Err(BuildError::RatioTooSmall);
        }

        if !(1..=MAX_SIGNIFICANT_FIGURES).contains(&self.significant_figures) {
            return Err(BuildError::InvalidSignificantFigures);
        }

        let precision = 10_u128.pow(self.significant_figures as u32);
        if self.highest_to_lowest_value_ratio as u128 * precision >= CODE_SPACE_LIMIT {
            return Err(BuildError::CodeSpaceOverflow);
        }

        Ok(())
    }

    /// Validates the parameters and calculates the resulting bucket layout.
    pub fn layout(&self) -> Result<Layout, BuildError> {
        self.validate()?;

        let sub_bucket_count = sub_bucket_count(self.significant_figures)?;
        let internal_ratio =
            internal_ratio(self.highest_to_lowest_value_ratio).ok_or(BuildError::CodeSpaceOverflow)?;
        let integer_code_range = (sub_bucket_count / 2)
            .checked_mul(internal_ratio)
            .ok_or(BuildError::CodeSpaceOverflow)?;

        let grouping_power = (sub_bucket_count / 2).trailing_zeros() as u8;
        let max_value_power = integer_code_range.trailing_zeros() as u8;
        let config = Config::new(grouping_power, max_value_power)?;

        Ok(Layout {
            sub_bucket_count,
            internal_ratio,
            integer_code_range,
            config,
        })
    }
}

/// The bucket layout derived from a set of [`Parameters`].
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub struct Layout {
    sub_bucket_count: u64,
    internal_ratio: u64,
    integer_code_range: u64,
    config: Config,
}

impl Layout {
    /// Number of unit-width codes below the first logarithmic bucket.
    pub fn sub_bucket_count(&self) -> u64 {
        self.sub_bucket_count
    }

    /// The integer code that the lowest value of the covering range maps to.
    pub fn sub_bucket_half_count(&self) -> u64 {
        self.sub_bucket_count / 2
    }

    /// Ratio of the highest to the lowest value of the covering range. Always
    /// a power of two.
    pub fn internal_ratio(&self) -> u64 {
        self.internal_ratio
    }

    /// Number of distinct integer codes the histogram must be able to store.
    pub fn integer_code_range(&self) -> u64 {
        self.integer_code_range
    }

    /// The bucket configuration for the integer histogram.
    pub fn config(&self) -> Config {
        self.config
    }
}

/// Returns the smallest power of two that provides unit resolution up to
/// `2 * 10^significant_figures`. Adjacent codes above half of that count then
/// differ by no more than one part in `10^significant_figures`.
pub fn sub_bucket_count(significant_figures: u8) -> Result<u64, BuildError> {
    if !(1..=MAX_SIGNIFICANT_FIGURES).contains(&significant_figures) {
        return Err(BuildError::InvalidSignificantFigures);
    }

    let largest_value_with_single_unit_resolution = 2 * 10_u64.pow(significant_figures as u32);

    Ok(largest_value_with_single_unit_resolution.next_power_of_two())
}

/// Returns the smallest power of two which is at least twice the requested
/// ratio, or `None` if that does not fit in a `u64`.
pub fn internal_ratio(highest_to_lowest_value_ratio: u64) -> Option<u64> {
    highest_to_lowest_value_ratio
        .checked_mul(2)?
        .checked_next_power_of_two()
}

/// Returns the size of the integer code space for the provided parameters.
pub fn integer_code_range(
    highest_to_lowest_value_ratio: u64,
    significant_figures: u8,
) -> Result<u64, BuildError> {
    Parameters::new(highest_to_lowest_value_ratio, significant_figures)?
        .layout()
        .map(|layout| layout.integer_code_range())
}
