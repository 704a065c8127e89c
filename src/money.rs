//! Currency comparison helpers.
//!
//! Balances are stored as `f64` with two-digit display precision, so all
//! currency comparisons go through a fixed epsilon to absorb floating point
//! drift.

/// The threshold below which a balance change is treated as noise.
///
/// A delta smaller than one cent performs no mutation and records nothing.
pub const EPSILON: f64 = 0.01;

/// Whether `delta` is too small to count as a real balance change.
pub fn is_negligible(delta: f64) -> bool {
    delta.abs() < EPSILON
}

/// Whether two currency amounts are equal within [EPSILON].
pub fn approx_eq(a: f64, b: f64) -> bool {
    is_negligible(a - b)
}

#[cfg(test)]
mod tests {
    use super::{approx_eq, is_negligible};

    #[test]
    fn sub_cent_deltas_are_negligible() {
        assert!(is_negligible(0.0));
        assert!(is_negligible(0.009));
        assert!(is_negligible(-0.0099));
    }

    #[test]
    fn one_cent_is_a_real_change() {
        assert!(!is_negligible(0.01));
        assert!(!is_negligible(-0.01));
        assert!(!is_negligible(150.0));
    }

    #[test]
    fn float_drift_compares_equal() {
        assert!(approx_eq(0.1 + 0.2, 0.3));
        assert!(!approx_eq(100.0, 100.02));
    }
}
