use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits. All masses,
/// fractions and capacities in the mixer use this type.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Default tolerance below which a quantity counts as empty (~1e-6 kg).
pub const DEFAULT_EPSILON: Fixed64 = Fixed64::from_bits(4295);

/// Capacity used for buffers and throughput with no configured limit.
pub const UNBOUNDED: Fixed64 = Fixed64::MAX;

/// Convert an f64 to Fixed64. Use only for initialization, never in the tick path.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::saturating_from_num(v)
}

/// Convert Fixed64 to f64. Use only for display and logging.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Checked multiplication for Fixed64 that returns None on overflow.
#[inline]
pub fn checked_mul_64(a: Fixed64, b: Fixed64) -> Option<Fixed64> {
    a.checked_mul(b)
}

/// Checked division for Fixed64 that returns None on zero divisor or overflow.
#[inline]
pub fn checked_div_64(a: Fixed64, b: Fixed64) -> Option<Fixed64> {
    a.checked_div(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_epsilon_is_about_one_micro() {
        let eps = fixed64_to_f64(DEFAULT_EPSILON);
        assert!((eps - 1e-6).abs() < 1e-9);
    }

    #[test]
    fn fixed64_multiplication() {
        let a = f64_to_fixed64(3.0);
        let b = f64_to_fixed64(4.0);
        assert_eq!(fixed64_to_f64(a * b), 12.0);
    }

    #[test]
    fn f64_conversion_saturates() {
        assert_eq!(f64_to_fixed64(1e300), Fixed64::MAX);
        assert_eq!(f64_to_fixed64(f64::INFINITY), Fixed64::MAX);
    }

    #[test]
    fn fixed64_checked_mul_overflow() {
        let two = f64_to_fixed64(2.0);
        assert!(checked_mul_64(UNBOUNDED, two).is_none());
    }

    #[test]
    fn fixed64_checked_div_by_zero() {
        let a = f64_to_fixed64(1.0);
        assert!(checked_div_64(a, Fixed64::ZERO).is_none());
    }

    #[test]
    fn fixed64_checked_div_overflow() {
        let tiny = Fixed64::from_bits(1);
        assert!(checked_div_64(f64_to_fixed64(100.0), tiny).is_none());
    }

    #[test]
    fn complementary_fractions_sum_exactly() {
        let frac2 = f64_to_fixed64(0.3);
        let frac1 = Fixed64::ONE - frac2;
        assert_eq!(frac1 + frac2, Fixed64::ONE);
    }
}
