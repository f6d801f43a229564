/// Arithmetic mean, `None` for an empty slice
pub fn mean(data: &[f64]) -> Option<f64> {
    (!data.is_empty()).then(|| data.iter().sum::<f64>() / data.len() as f64)
}

/// Rounds to the nearest integer with halves going up, so `-2.5` becomes `-2`.
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_of_durations() {
        assert_eq!(mean(&[60., 120., 180.]), Some(120.));
        assert_eq!(mean(&[65.]), Some(65.));
    }

    #[test]
    fn test_mean_of_nothing() {
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_mean_below_freezing() {
        assert_eq!(mean(&[-1.5, 0.5, 35.0]), Some(34.0 / 3.0));
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(0.0), 0);
        assert_eq!(round_half_up(1.49), 1);
        assert_eq!(round_half_up(1.5), 2);
        assert_eq!(round_half_up(41.5), 42);
        assert_eq!(round_half_up(-0.5), 0);
        assert_eq!(round_half_up(-2.5), -2);
        assert_eq!(round_half_up(-2.51), -3);
    }
}
