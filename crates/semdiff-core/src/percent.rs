//! Mapping of scale values onto a 0..=100 percentage.

/// Clamp `value` into `[min, max]`.
///
/// Unlike `f64::clamp` this never panics when the bounds are inverted; the
/// result is then pinned to `min`.
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    min.max(max.min(value))
}

/// Position of `value` inside `[min, max]` as a percentage.
///
/// Out-of-range values are clamped first. A degenerate range (`min == max`)
/// yields 0.
pub fn compute_percent(value: f64, min: f64, max: f64) -> f64 {
    if max == min {
        return 0.0;
    }
    let clamped = clamp(value, min, max);
    let pct = ((clamped - min) / (max - min)) * 100.0;
    clamp(pct, 0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_endpoints_and_midpoint() {
        assert!(approx(compute_percent(-3.0, -3.0, 3.0), 0.0));
        assert!(approx(compute_percent(3.0, -3.0, 3.0), 100.0));
        assert!(approx(compute_percent(0.0, -3.0, 3.0), 50.0));
        assert!(approx(compute_percent(3.0, 1.0, 5.0), 50.0));
    }

    #[test]
    fn test_degenerate_range_is_zero() {
        for k in [-3.0, 0.0, 2.5] {
            assert_eq!(compute_percent(k, k, k), 0.0);
            assert_eq!(compute_percent(k + 10.0, k, k), 0.0);
        }
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        assert!(approx(compute_percent(10.0, -3.0, 3.0), 100.0));
        assert!(approx(compute_percent(-10.0, -3.0, 3.0), 0.0));
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(5.0, -3.0, 3.0), 3.0);
        assert_eq!(clamp(-5.0, -3.0, 3.0), -3.0);
        assert_eq!(clamp(1.5, -3.0, 3.0), 1.5);
    }
}
