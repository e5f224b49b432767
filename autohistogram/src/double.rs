//! An auto-ranging histogram for `f64` values.
//!
//! The histogram covers a window `[lowest, highest)` whose width is a fixed
//! power of two. Values are mapped onto integer codes in the window with a
//! bounded relative error and stored in an [`IntegerHistogram`]. When a value
//! arrives outside of the window, the window is moved by whole binary orders
//! of magnitude and the stored counts are moved along with it. If the counts
//! can't be moved without losing data, the value is rejected and nothing
//! changes.

use crate::math::{bit_length, next_up, scale};
use crate::{BuildError, Error, IntegerHistogram, Layout, Parameters};
use core::cell::Cell;
use core::fmt;
use core::marker::PhantomData;
use core::ops::Range;
use log::{debug, trace};

/// The initial lowest value is `2^800`, leaving room to move the window far in
/// both directions.
const ANCHOR_POWER: i32 = 800;

/// Values above this are rejected so that the window never overflows.
const HIGHEST_ALLOWED_VALUE: f64 = 4.49423283715579e307;

/// Limit on the number of binary orders of magnitude in a single step.
const MAX_STEP: u32 = 50;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Window {
    lowest: f64,
    highest: f64,
    // binary orders of magnitude from the anchor to `lowest`
    shift: i32,
}

impl Window {
    fn anchored(internal_ratio: u64) -> Self {
        let lowest = scale(1.0, ANCHOR_POWER);

        Self {
            lowest,
            highest: lowest * internal_ratio as f64,
            shift: 0,
        }
    }

    fn contains(&self, value: f64) -> bool {
        self.lowest <= value && value < self.highest
    }

    fn shifted(self, orders: i32) -> Self {
        let multiplier = scale(1.0, orders);

        Self {
            lowest: self.lowest * multiplier,
            highest: self.highest * multiplier,
            shift: self.shift + orders,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Direction {
    Down,
    Up,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Down => write!(f, "down"),
            Self::Up => write!(f, "up"),
        }
    }
}

/// A histogram of `f64` values which moves its covering range to admit values
/// outside of it.
///
/// This type is meant for a single writer. Recording requires `&mut self` and
/// the histogram is not `Sync`. To record from several threads, use one
/// histogram per thread.
///
/// ```
/// use autohistogram::DoubleHistogram;
///
/// let mut histogram = DoubleHistogram::new(1000, 3).unwrap();
///
/// assert!(histogram.record_value(1.0));
/// assert!(histogram.record_value(500_000.0));
/// assert!(!histogram.record_value(-1.0));
///
/// assert_eq!(histogram.total_count(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct DoubleHistogram {
    parameters: Parameters,
    layout: Layout,
    window: Window,
    // both fixed for the anchored window, never recomputed
    to_code_ratio: f64,
    to_value_ratio: f64,
    // exclusive upper bound on the integer codes
    code_limit: f64,
    max_step: u32,
    values: IntegerHistogram,
    _not_sync: PhantomData<Cell<()>>,
}

impl DoubleHistogram {
    /// Construct a new histogram which covers a dynamic range of at least
    /// `highest_to_lowest_value_ratio` while maintaining the provided number
    /// of significant figures. See [`crate::Parameters`] for details.
    pub fn new(highest_to_lowest_value_ratio: u64, significant_figures: u8) -> Result<Self, BuildError> {
        let parameters = Parameters::new(highest_to_lowest_value_ratio, significant_figures)?;

        Self::with_parameters(&parameters)
    }

    /// Creates a new histogram using the provided [`crate::Parameters`].
    pub fn with_parameters(parameters: &Parameters) -> Result<Self, BuildError> {
        let layout = parameters.layout()?;
        let values = IntegerHistogram::with_config(&layout.config())?;

        let window = Window::anchored(layout.internal_ratio());
        let half_count = layout.sub_bucket_half_count() as f64;
        let to_code_ratio = half_count / window.lowest;

        // the shortest step that still covers the requested ratio
        let ratio_power = u64::BITS - 1 - parameters.highest_to_lowest_value_ratio.leading_zeros();

        Ok(Self {
            parameters: *parameters,
            layout,
            window,
            to_code_ratio,
            to_value_ratio: 1.0 / to_code_ratio,
            code_limit: scale(1.0, layout.config().max_value_power() as i32),
            max_step: ratio_power.min(MAX_STEP),
            values,
            _not_sync: PhantomData,
        })
    }

    /// Record a single value, returning `true` if it was accepted.
    ///
    /// See [`DoubleHistogram::record`] for the reasons a value is rejected.
    pub fn record_value(&mut self, value: f64) -> bool {
        self.record(value).is_ok()
    }

    /// Record a single value.
    ///
    /// Zero is always accepted. A value outside of the current covering range
    /// moves the range first, which fails with:
    /// * `Error::OutOfRange` if the value is negative, `NaN`, or too large to
    ///   ever be covered
    /// * `Error::ShiftFailed` if previously recorded values would fall out of
    ///   the moved range
    ///
    /// On error the histogram is left unchanged.
    pub fn record(&mut self, value: f64) -> Result<(), Error> {
        self.record_n(value, 1)
    }

    /// Record some count of a value.
    pub fn record_n(&mut self, value: f64, count: u64) -> Result<(), Error> {
        if value.is_nan() {
            return Err(Error::OutOfRange);
        }

        // checked before the window can move
        if self.values.total_count().checked_add(count).is_none() {
            return Err(Error::Overflow);
        }

        if value == 0.0 {
            return self.values.record_n(0, count);
        }

        if !self.window.contains(value) {
            self.adjust_range(value)?;
        }

        let code = self.to_code(value).ok_or(Error::OutOfRange)?;
        self.values.record_n(code, count)
    }

    /// Returns the total number of recorded values.
    pub fn total_count(&self) -> u64 {
        self.values.total_count()
    }

    /// Returns the count stored at a bucket index of the integer histogram.
    pub fn count_at_index(&self, index: usize) -> u64 {
        self.values.count_at(index)
    }

    /// Returns the count stored in the bucket which the value maps to with the
    /// current covering range, or zero if it maps to no bucket.
    pub fn count_at_value(&self, value: f64) -> u64 {
        self.index_of(value)
            .map(|index| self.values.count_at(index))
            .unwrap_or(0)
    }

    /// Returns the range of values which are equivalent to the provided value,
    /// that is, which map to the same bucket with the current covering range.
    pub fn equivalent_range(&self, value: f64) -> Option<Range<f64>> {
        let index = self.index_of(value)?;
        let range = self.values.config().index_to_range(index);

        let start = self.to_value(*range.start() as f64);
        let end = self.to_value(*range.end() as f64 + 1.0);

        Some(start..end)
    }

    /// Returns the lowest value which is equivalent to the provided value.
    pub fn lowest_equivalent_value(&self, value: f64) -> Option<f64> {
        self.equivalent_range(value).map(|range| range.start)
    }

    /// Returns the value in the middle of the range of values which are
    /// equivalent to the provided value.
    pub fn median_equivalent_value(&self, value: f64) -> Option<f64> {
        self.equivalent_range(value)
            .map(|range| range.start + (range.end - range.start) / 2.0)
    }

    /// The inclusive lower bound of the current covering range.
    pub fn lowest(&self) -> f64 {
        self.window.lowest
    }

    /// The exclusive upper bound of the current covering range.
    pub fn highest(&self) -> f64 {
        self.window.highest
    }

    /// The fixed ratio of `highest()` to `lowest()`.
    pub fn internal_ratio(&self) -> u64 {
        self.layout.internal_ratio()
    }

    pub fn highest_to_lowest_value_ratio(&self) -> u64 {
        self.parameters.highest_to_lowest_value_ratio
    }

    pub fn significant_figures(&self) -> u8 {
        self.parameters.significant_figures
    }

    pub fn parameters(&self) -> Parameters {
        self.parameters
    }

    /// Clears all recorded values and moves the covering range back to its
    /// initial position.
    pub fn reset(&mut self) {
        self.values.clear();
        self.window = Window::anchored(self.layout.internal_ratio());
    }

    fn adjust_range(&mut self, value: f64) -> Result<(), Error> {
        let (window, direction) = if value < self.window.lowest {
            if value < 0.0 {
                debug!("rejecting negative value: {value}");
                return Err(Error::OutOfRange);
            }
            (self.expand_downward(value), Direction::Down)
        } else {
            if value > HIGHEST_ALLOWED_VALUE {
                debug!("rejecting value above the highest allowed value: {value:e}");
                return Err(Error::OutOfRange);
            }
            (self.expand_upward(value), Direction::Up)
        };

        let orders = window.shift.abs_diff(self.window.shift);

        // when only zeros are recorded there is nothing to move
        if self.values.total_count() > self.values.count_at(0) {
            let result = match direction {
                Direction::Down => self.values.shift_left(orders),
                Direction::Up => self.values.shift_right(orders),
            };

            if let Err(e) = result {
                debug!("unable to move covered range {direction} by {orders} orders for {value:e}: {e}");
                return Err(e);
            }
        }

        self.window = window;

        debug!(
            "moved covered range {direction} by {orders} orders to [{:e}, {:e})",
            window.lowest, window.highest
        );

        Ok(())
    }

    fn expand_downward(&self, value: f64) -> Window {
        let mut window = self.window;

        while value < window.lowest {
            let step = self.capped_step((window.lowest / value).ceil() - 1.0);
            trace!("stepping covered range down by {step} for {value:e}");
            window = window.shifted(-(step as i32));
        }

        window
    }

    fn expand_upward(&self, value: f64) -> Window {
        let mut window = self.window;
        let limit = next_up(value);

        while value >= window.highest {
            let step = self.capped_step((limit / window.highest).ceil() - 1.0);
            trace!("stepping covered range up by {step} for {value:e}");
            window = window.shifted(step as i32);
        }

        window
    }

    /// Number of binary orders of magnitude needed to cover a ratio, capped
    /// to the largest single step.
    fn capped_step(&self, ratio: f64) -> u32 {
        if ratio >= (1_u64 << MAX_STEP) as f64 {
            return self.max_step;
        }

        // ratio is at least one while the value is outside the window
        bit_length(ratio as u64).clamp(1, self.max_step)
    }

    fn to_code(&self, value: f64) -> Option<u64> {
        if value.is_nan() || value < 0.0 {
            return None;
        }

        // exact, since the window only ever moves by powers of two
        let code = scale(value, -self.window.shift) * self.to_code_ratio;

        if code >= self.code_limit {
            return None;
        }

        Some(code as u64)
    }

    fn to_value(&self, code: f64) -> f64 {
        scale(code * self.to_value_ratio, self.window.shift)
    }

    fn index_of(&self, value: f64) -> Option<usize> {
        let code = self.to_code(value)?;

        // code zero is reserved for zero
        if code == 0 && value != 0.0 {
            return None;
        }

        self.values.config().value_to_index(code).ok()
    }
}
