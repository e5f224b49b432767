//! This crate provides a histogram for `f64` values, such as latencies in
//! seconds, which maintains a fixed number of significant figures and moves
//! its covering range to follow the recorded values.
//!
//! ```
//! use autohistogram::DoubleHistogram;
//!
//! // cover values spanning 6 orders of magnitude with 3 significant figures
//! let mut histogram = DoubleHistogram::new(1_000_000, 3).unwrap();
//!
//! for latency in [0.000_250, 0.001_5, 0.012, 0.8] {
//!     if !histogram.record_value(latency) {
//!         // the value could not be admitted without losing recorded data
//!     }
//! }
//!
//! assert_eq!(histogram.total_count(), 4);
//! ```
//!
//! The covering range is a window `[lowest, highest)` which is a power of two
//! wide. It moves by powers of two whenever a value outside of it arrives and
//! the already recorded values still fit. Underneath, values are stored as
//! integer codes in an [`IntegerHistogram`], which can also be used directly.

mod config;
mod double;
mod errors;
mod integer;
mod math;
mod parameters;

pub use config::Config;
pub use double::DoubleHistogram;
pub use errors::{BuildError, Error};
pub use integer::IntegerHistogram;
pub use parameters::{integer_code_range, internal_ratio, sub_bucket_count, Layout, Parameters};
