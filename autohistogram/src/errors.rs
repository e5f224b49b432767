use thiserror::Error;

/// Errors returned when constructing a histogram or its configuration.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum BuildError {
    #[error("highest to lowest value ratio is too small, must be at least 2")]
    RatioTooSmall,
    #[error("significant figures must be in the range 1..=5")]
    InvalidSignificantFigures,
    #[error("ratio and significant figures exceed the 61 bit integer code space")]
    CodeSpaceOverflow,
    #[error("max power is too high, check that n <= 64")]
    MaxPowerTooHigh,
    #[error("max power is too low, check that grouping power < n")]
    MaxPowerTooLow,
    #[error("unable to allocate storage for the histogram buckets")]
    OutOfMemory,
}

impl BuildError {
    /// Returns true if the error was caused by the provided parameters rather
    /// than by a failure to allocate.
    pub fn is_invalid_argument(&self) -> bool {
        !matches!(self, Self::OutOfMemory)
    }
}

/// Errors returned for histogram recording and rescaling operations.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    #[error("the value is outside of the storable range")]
    OutOfRange,
    #[error("the recorded counts cannot be shifted without losing data")]
    ShiftFailed,
    #[error("an overflow occurred")]
    Overflow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_argument() {
        assert!(BuildError::RatioTooSmall.is_invalid_argument());
        assert!(BuildError::InvalidSignificantFigures.is_invalid_argument());
        assert!(BuildError::CodeSpaceOverflow.is_invalid_argument());
        assert!(BuildError::MaxPowerTooLow.is_invalid_argument());
        assert!(!BuildError::OutOfMemory.is_invalid_argument());
    }
}
