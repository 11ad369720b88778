use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits. Used for every
/// simulation quantity (health, damage, durations) so replays are bit-exact.
pub type Fixed64 = I32F32;

/// Simulation time in seconds, as fixed-point.
pub type Seconds = Fixed64;

/// Convert an f64 to Fixed64. Use only for initialization and at the
/// collaborator boundary, never inside the combat loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert an f64 read from outside the simulation. `None` for NaN,
/// infinities and values outside the Q32.32 range.
#[inline]
pub fn checked_f64_to_fixed64(v: f64) -> Option<Fixed64> {
    if !v.is_finite() {
        return None;
    }
    Fixed64::checked_from_num(v)
}

/// Convert Fixed64 to f64. Use only for display.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Milliseconds to seconds, for hosts that report frame time in ms.
#[inline]
pub fn millis(ms: u32) -> Seconds {
    Fixed64::from_num(ms) / Fixed64::from_num(1000)
}

/// Halve a value. Used when a captured node comes back at half strength.
#[inline]
pub fn halve(v: Fixed64) -> Fixed64 {
    v / Fixed64::from_num(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed64_basic_arithmetic() {
        let a = f64_to_fixed64(1.5);
        let b = f64_to_fixed64(2.0);
        assert_eq!(fixed64_to_f64(a + b), 3.5);
    }

    #[test]
    fn checked_conversion_rejects_unrepresentable_values() {
        assert_eq!(checked_f64_to_fixed64(2.5), Some(f64_to_fixed64(2.5)));
        assert_eq!(checked_f64_to_fixed64(-7.0), Some(f64_to_fixed64(-7.0)));
        assert_eq!(checked_f64_to_fixed64(1e10), None);
        assert_eq!(checked_f64_to_fixed64(-1e10), None);
        assert_eq!(checked_f64_to_fixed64(f64::NAN), None);
        assert_eq!(checked_f64_to_fixed64(f64::INFINITY), None);
    }

    #[test]
    fn millis_converts_to_seconds() {
        assert_eq!(millis(500), f64_to_fixed64(0.5));
        assert_eq!(millis(0), Fixed64::ZERO);
    }

    #[test]
    fn halve_is_exact_for_even_values() {
        assert_eq!(halve(Fixed64::from_num(100)), Fixed64::from_num(50));
    }

    #[test]
    fn fixed64_determinism() {
        let a = f64_to_fixed64(1.0 / 3.0);
        let b = f64_to_fixed64(1.0 / 3.0);
        assert_eq!(a * f64_to_fixed64(3.0), b * f64_to_fixed64(3.0));
    }
}
