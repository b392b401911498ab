//! Numeric helpers and the three rounding policies used across the pipeline.
//!
//! The policies are deliberately distinct and must not be unified:
//! per-day display values truncate, exported series round to one decimal,
//! and the score truncates the combined unrounded value once.

/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Per-day display value: truncation toward zero.
pub fn display_truncate(value: f64) -> i64 {
    value.trunc() as i64
}

/// Exported series value: rounded to one decimal place.
///
/// Rounds the exact binary value, so a true tie such as `7.25` goes to the
/// even digit and `0.15` (stored just below the tie) goes down.
pub fn export_round1(value: f64) -> f64 {
    format!("{value:.1}").parse().unwrap_or(value)
}

/// Ranking score: `avg_temp * 100 + avg_clear_hours`, truncated toward zero once.
pub fn score_truncate(avg_temp: f64, avg_clear_hours: f64) -> i64 {
    (avg_temp * 100.0 + avg_clear_hours).trunc() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[1.0, 2.0, 3.0, 4.0]), 2.5);
    }

    #[test]
    fn test_display_truncate_goes_toward_zero() {
        assert_eq!(display_truncate(15.9), 15);
        assert_eq!(display_truncate(15.0), 15);
        assert_eq!(display_truncate(-2.7), -2);
        assert_eq!(display_truncate(0.4), 0);
    }

    #[test]
    fn test_export_round1() {
        assert_eq!(export_round1(15.0), 15.0);
        assert_eq!(export_round1(15.27), 15.3);
        assert_eq!(export_round1(15.24), 15.2);
        assert_eq!(export_round1(-3.36), -3.4);
    }

    #[test]
    fn test_export_round1_ties_go_to_even() {
        assert_eq!(export_round1(7.25), 7.2);
        assert_eq!(export_round1(7.75), 7.8);
        assert_eq!(export_round1(18.25), 18.2);
        assert_eq!(export_round1(0.15), 0.1);
        assert_eq!(export_round1(-2.25), -2.2);
    }

    #[test]
    fn test_score_truncates_once_not_per_term() {
        assert_eq!(score_truncate(15.0, 8.0), 1508);
        // 15.006 * 100 = 1500.6, + 7.5 = 1508.1 -> 1508; per-term would give 1500 + 7 = 1507
        assert_eq!(score_truncate(15.006, 7.5), 1508);
        assert_eq!(score_truncate(-1.5, 4.0), -146);
    }

    #[test]
    fn test_policies_disagree_on_same_input() {
        let v = 15.96;
        assert_eq!(display_truncate(v), 15);
        assert_eq!(export_round1(v), 16.0);
    }
}
