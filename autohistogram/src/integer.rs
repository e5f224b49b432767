use crate::{BuildError, Config, Error};

/// A histogram of integer codes that uses plain 64bit counters for each
/// bucket.
///
/// Besides recording, the stored counts can be rescaled by a power of two in
/// either direction. A rescale either moves every count or fails without
/// changing anything.
#[derive(Clone, Debug)]
pub struct IntegerHistogram {
    config: Config,
    total: u64,
    buckets: Box<[u64]>,
}

impl IntegerHistogram {
    /// Construct a new histogram from the provided parameters. See the
    /// documentation for [`crate::Config`] to understand their meaning.
    pub fn new(grouping_power: u8, max_value_power: u8) -> Result<Self, BuildError> {
        let config = Config::new(grouping_power, max_value_power)?;

        Self::with_config(&config)
    }

    /// Creates a new histogram using a provided [`crate::Config`].
    pub fn with_config(config: &Config) -> Result<Self, BuildError> {
        let len = config.total_buckets();

        let mut buckets: Vec<u64> = Vec::new();
        buckets
            .try_reserve_exact(len)
            .map_err(|_| BuildError::OutOfMemory)?;
        buckets.resize(len, 0);

        Ok(Self {
            config: *config,
            total: 0,
            buckets: buckets.into_boxed_slice(),
        })
    }

    /// Increment the counter for the bucket corresponding to the provided code
    /// by one.
    pub fn record(&mut self, code: u64) -> Result<(), Error> {
        self.record_n(code, 1)
    }

    /// Add some count to the counter for the bucket corresponding to the
    /// provided code.
    pub fn record_n(&mut self, code: u64, count: u64) -> Result<(), Error> {
        let index = self.config.value_to_index(code)?;
        let total = self.total.checked_add(count).ok_or(Error::Overflow)?;
        let bucket = self.buckets[index]
            .checked_add(count)
            .ok_or(Error::Overflow)?;

        self.buckets[index] = bucket;
        self.total = total;

        Ok(())
    }

    /// Returns the count in the bucket at the index, or zero if the index is
    /// out of bounds.
    pub fn count_at(&self, index: usize) -> u64 {
        self.buckets.get(index).copied().unwrap_or(0)
    }

    /// Returns the sum of all bucket counts.
    pub fn total_count(&self) -> u64 {
        self.total
    }

    /// Get a reference to the raw counters.
    pub fn as_slice(&self) -> &[u64] {
        &self.buckets
    }

    /// Returns the bucket configuration of the histogram.
    pub fn config(&self) -> Config {
        self.config
    }

    /// Zero all the counters.
    pub fn clear(&mut self) {
        self.buckets.fill(0);
        self.total = 0;
    }

    /// Moves every recorded count to the bucket holding its code multiplied by
    /// `2^n`.
    ///
    /// Returns `Error::ShiftFailed` without modifying the histogram if any
    /// count would move past the largest storable code.
    pub fn shift_left(&mut self, n: u32) -> Result<(), Error> {
        if n == 0 {
            return Ok(());
        }

        // the code at index zero is zero, which is unchanged by any shift
        let top = match self.buckets.iter().rposition(|count| *count != 0) {
            Some(index) if index > 0 => index,
            _ => return Ok(()),
        };

        // destinations increase with the source index, so the highest
        // occupied bucket decides whether the shift fits
        if self.shifted_left_index(top, n).is_none() {
            return Err(Error::ShiftFailed);
        }

        for index in (1..=top).rev() {
            let count = self.buckets[index];
            if count == 0 {
                continue;
            }

            let destination = self.shifted_left_index(index, n).ok_or(Error::ShiftFailed)?;
            self.buckets[index] = 0;
            self.buckets[destination] = count;
        }

        Ok(())
    }

    /// Moves every recorded count to the bucket holding its code divided by
    /// `2^n`.
    ///
    /// Returns `Error::ShiftFailed` without modifying the histogram if any
    /// count would be truncated. Buckets at or above `2^(grouping_power + n)`
    /// always move exactly. Below that, only unit-width buckets whose code is
    /// a multiple of `2^n` can move, since no bits of the code are lost.
    pub fn shift_right(&mut self, n: u32) -> Result<(), Error> {
        if n == 0 {
            return Ok(());
        }

        let half = self.config.half_count();
        let len = self.buckets.len();
        let cutoff = 2 * half;

        let floor = (n as usize)
            .checked_add(1)
            .and_then(|groups| groups.checked_mul(half))
            .unwrap_or(usize::MAX)
            .min(len);

        let truncated = self.buckets[1..floor]
            .iter()
            .enumerate()
            .filter(|(_, count)| **count != 0)
            .any(|(offset, _)| {
                let index = offset + 1;
                index >= cutoff || index.trailing_zeros() < n
            });

        if truncated {
            return Err(Error::ShiftFailed);
        }

        for index in 1..len {
            let count = self.buckets[index];
            if count == 0 {
                continue;
            }

            // below the floor only exact unit-width codes remain
            let destination = if index < floor {
                index >> n
            } else {
                index - n as usize * half
            };

            self.buckets[index] = 0;
            self.buckets[destination] = count;
        }

        Ok(())
    }

    fn shifted_left_index(&self, index: usize, n: u32) -> Option<usize> {
        let half = self.config.half_count();

        let destination = if index >= half {
            // every power of two spans exactly `half` buckets from here up
            index.checked_add((n as usize).checked_mul(half)?)?
        } else {
            // unit width buckets, so the index is the code
            let code = (index as u64).checked_mul(1_u64.checked_shl(n)?)?;
            self.config.value_to_index(code).ok()?
        };

        (destination < self.buckets.len()).then_some(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record() {
        let mut histogram = IntegerHistogram::new(7, 64).unwrap();
        assert_eq!(histogram.total_count(), 0);

        histogram.record(0).unwrap();
        histogram.record(1).unwrap();
        histogram.record_n(1024, 3).unwrap();
        histogram.record(1031).unwrap();

        assert_eq!(histogram.count_at(0), 1);
        assert_eq!(histogram.count_at(1), 1);
        assert_eq!(histogram.count_at(512), 4);
        assert_eq!(histogram.total_count(), 6);

        // out of bounds index reads as empty
        assert_eq!(histogram.count_at(usize::MAX), 0);

        histogram.clear();
        assert_eq!(histogram.total_count(), 0);
        assert!(histogram.as_slice().iter().all(|count| *count == 0));
    }

    #[test]
    fn record_errors() {
        let mut histogram = IntegerHistogram::new(7, 32).unwrap();
        assert_eq!(histogram.record(1 << 32), Err(Error::OutOfRange));

        histogram.record_n(5, u64::MAX).unwrap();
        assert_eq!(histogram.record(6), Err(Error::Overflow));
        assert_eq!(histogram.total_count(), u64::MAX);
        assert_eq!(histogram.count_at(6), 0);
    }

    #[test]
    fn shift_left() {
        let mut histogram = IntegerHistogram::new(2, 8).unwrap();
        histogram.record(0).unwrap();
        histogram.record(3).unwrap();
        histogram.record(6).unwrap();
        histogram.record_n(20, 2).unwrap();

        histogram.shift_left(2).unwrap();

        let config = histogram.config();
        assert_eq!(histogram.count_at(0), 1);
        assert_eq!(histogram.count_at(config.value_to_index(12).unwrap()), 1);
        assert_eq!(histogram.count_at(config.value_to_index(24).unwrap()), 1);
        assert_eq!(histogram.count_at(config.value_to_index(80).unwrap()), 2);
        assert_eq!(histogram.as_slice().iter().sum::<u64>(), 5);
        assert_eq!(histogram.total_count(), 5);
    }

    #[test]
    fn shift_left_overflow() {
        let mut histogram = IntegerHistogram::new(2, 8).unwrap();
        histogram.record(3).unwrap();
        histogram.record(100).unwrap();

        let before = histogram.as_slice().to_vec();
        assert_eq!(histogram.shift_left(2), Err(Error::ShiftFailed));
        assert_eq!(histogram.as_slice(), &before[..]);

        // 100 * 2 is still below 256
        histogram.shift_left(1).unwrap();
        assert_eq!(histogram.total_count(), 2);
        assert_eq!(histogram.count_at(histogram.config().value_to_index(200).unwrap()), 1);
        assert_eq!(histogram.count_at(histogram.config().value_to_index(6).unwrap()), 1);
    }

    #[test]
    fn shift_right() {
        let mut histogram = IntegerHistogram::new(2, 8).unwrap();
        histogram.record(0).unwrap();
        histogram.record(16).unwrap();
        histogram.record_n(200, 4).unwrap();

        histogram.shift_right(2).unwrap();

        let config = histogram.config();
        assert_eq!(histogram.count_at(0), 1);
        assert_eq!(histogram.count_at(config.value_to_index(4).unwrap()), 1);
        assert_eq!(histogram.count_at(config.value_to_index(50).unwrap()), 4);
        assert_eq!(histogram.total_count(), 6);
    }

    #[test]
    fn shift_right_truncation() {
        let mut histogram = IntegerHistogram::new(2, 8).unwrap();
        histogram.record(0).unwrap();
        histogram.record(8).unwrap();
        histogram.record(200).unwrap();

        // 8 >> 2 would fall below the grouping cutoff
        let before = histogram.as_slice().to_vec();
        assert_eq!(histogram.shift_right(2), Err(Error::ShiftFailed));
        assert_eq!(histogram.as_slice(), &before[..]);

        histogram.shift_right(1).unwrap();
        assert_eq!(histogram.count_at(histogram.config().value_to_index(4).unwrap()), 1);
        assert_eq!(histogram.count_at(histogram.config().value_to_index(100).unwrap()), 1);
    }

    #[test]
    fn shift_right_unit_width() {
        let mut histogram = IntegerHistogram::new(2, 8).unwrap();
        histogram.record(4).unwrap();
        histogram.record(200).unwrap();

        // 4 >> 2 is exact
        histogram.shift_right(2).unwrap();
        assert_eq!(histogram.count_at(1), 1);
        assert_eq!(histogram.count_at(histogram.config().value_to_index(50).unwrap()), 1);

        // but 6 >> 2 drops a bit
        let mut histogram = IntegerHistogram::new(2, 8).unwrap();
        histogram.record(6).unwrap();
        assert_eq!(histogram.shift_right(2), Err(Error::ShiftFailed));
        assert_eq!(histogram.count_at(6), 1);

        // and shifting back restores the original code
        let mut histogram = IntegerHistogram::new(2, 8).unwrap();
        histogram.record(4).unwrap();
        histogram.shift_right(2).unwrap();
        histogram.shift_left(2).unwrap();
        assert_eq!(histogram.count_at(4), 1);
        assert_eq!(histogram.total_count(), 1);
    }

    #[test]
    fn shift_round_trip() {
        let mut histogram = IntegerHistogram::new(7, 24).unwrap();
        for code in (128..1 << 20).step_by(997) {
            histogram.record(code).unwrap();
        }
        let before = histogram.as_slice().to_vec();

        histogram.shift_left(3).unwrap();
        assert_ne!(histogram.as_slice(), &before[..]);
        histogram.shift_right(3).unwrap();
        assert_eq!(histogram.as_slice(), &before[..]);
    }

    #[test]
    fn shift_empty() {
        let mut histogram = IntegerHistogram::new(2, 8).unwrap();
        histogram.record_n(0, 7).unwrap();

        assert_eq!(histogram.shift_left(60), Ok(()));
        assert_eq!(histogram.shift_right(60), Ok(()));
        assert_eq!(histogram.count_at(0), 7);
    }
}
