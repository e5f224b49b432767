//! Exact floating point helpers for power of two arithmetic.

/// Returns the position of the highest set bit, counting from one. Zero has a
/// bit length of zero.
pub fn bit_length(value: u64) -> u32 {
    u64::BITS - value.leading_zeros()
}

/// Returns `2^exponent` for exponents which produce a normal `f64`.
fn pow2(exponent: i32) -> f64 {
    debug_assert!((-1022..=1023).contains(&exponent));
    f64::from_bits(((exponent + 1023) as u64) << 52)
}

/// Multiplies the value by `2^exponent`.
///
/// The result is exact unless it is subnormal or overflows, in which case it
/// is rounded once.
pub fn scale(mut value: f64, mut exponent: i32) -> f64 {
    // both 2^1000 and 2^-1000 are normal
    const STEP: i32 = 1000;

    while exponent > STEP {
        value *= pow2(STEP);
        exponent -= STEP;
    }

    while exponent < -STEP {
        value *= pow2(-STEP);
        exponent += STEP;
    }

    value * pow2(exponent)
}

/// Returns the smallest `f64` which is greater than the value.
pub fn next_up(value: f64) -> f64 {
    if value.is_nan() || value == f64::INFINITY {
        return value;
    }

    if value == 0.0 {
        return f64::from_bits(1);
    }

    let bits = value.to_bits();
    if value > 0.0 {
        f64::from_bits(bits + 1)
    } else {
        f64::from_bits(bits - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_lengths() {
        assert_eq!(bit_length(0), 0);
        assert_eq!(bit_length(1), 1);
        assert_eq!(bit_length(2), 2);
        assert_eq!(bit_length(3), 2);
        assert_eq!(bit_length(255), 8);
        assert_eq!(bit_length(256), 9);
        assert_eq!(bit_length(u64::MAX), 64);
    }

    #[test]
    fn scaling() {
        assert_eq!(scale(1.0, 0), 1.0);
        assert_eq!(scale(3.0, 4), 48.0);
        assert_eq!(scale(3.0, -1), 1.5);
        assert_eq!(scale(1.0, 800), 2.0_f64.powi(800));
        assert_eq!(scale(1.0, -1074), f64::from_bits(1));
        assert_eq!(scale(f64::from_bits(1), 1074), 1.0);
        assert_eq!(scale(f64::from_bits(1), 1874), 2.0_f64.powi(800));
        assert_eq!(scale(2.0_f64.powi(800), -1874), f64::from_bits(1));
        assert_eq!(scale(1.0, 1024), f64::INFINITY);

        let value = 1.234_567_890_123;
        assert_eq!(scale(scale(value, 1000), -1000), value);
        assert_eq!(scale(scale(value, -900), 900), value);
    }

    #[test]
    fn next_values() {
        assert!(next_up(1.0) > 1.0);
        assert_eq!(next_up(1.0), 1.0 + f64::EPSILON);
        assert_eq!(next_up(0.0), f64::from_bits(1));
        assert_eq!(next_up(-0.0), f64::from_bits(1));
        assert_eq!(next_up(f64::MAX), f64::INFINITY);
        assert_eq!(next_up(f64::INFINITY), f64::INFINITY);
        assert!(next_up(-1.0) > -1.0);
        assert!(next_up(f64::NAN).is_nan());
    }
}
