//! Rate computation and payload sanity checks

use crate::metrics::ConsolidatedMetrics;

/// Compute a 0-100 percentage as `(numerator / denominator) * 100`.
///
/// A zero denominator yields 0, never NaN or a division error. The result
/// is clamped to the 0-100 range so a numerator larger than the denominator
/// (backend inconsistency) cannot produce an impossible percentage.
pub fn compute_rate(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    let rate = (numerator as f64 / denominator as f64) * 100.0;
    rate.clamp(0.0, 100.0)
}

/// Sanity-check a decoded consolidated payload.
///
/// Returns a list of human-readable data-health issues. Issues surface in
/// the health snapshot; they never block rendering best-effort values.
pub fn validate_consolidated(metrics: &ConsolidatedMetrics) -> Vec<String> {
    let mut issues = Vec::new();
    let counts = &metrics.inspections;

    if counts.completed > counts.total {
        issues.push(format!(
            "completed inspections ({}) exceed total ({})",
            counts.completed, counts.total
        ));
    }

    let bucket_sum = counts.completed + counts.in_progress + counts.pending + counts.cancelled;
    if bucket_sum > counts.total {
        issues.push(format!(
            "status buckets sum to {} but total is {}",
            bucket_sum, counts.total
        ));
    }

    if metrics.ai.suggestions_accepted > metrics.ai.suggestions_total {
        issues.push(format!(
            "accepted AI suggestions ({}) exceed total ({})",
            metrics.ai.suggestions_accepted, metrics.ai.suggestions_total
        ));
    }

    if metrics.users.active_last_30d > metrics.users.total {
        issues.push(format!(
            "active users ({}) exceed total users ({})",
            metrics.users.active_last_30d, metrics.users.total
        ));
    }

    if metrics.time.avg_completion_hours < 0.0 || metrics.time.avg_duration_minutes < 0.0 {
        issues.push("negative time analytics".to_string());
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{AiAccuracy, InspectionCounts, UserMetrics};
    use proptest::prelude::*;

    #[test]
    fn test_compute_rate_zero_denominator() {
        assert_eq!(compute_rate(0, 0), 0.0);
        assert_eq!(compute_rate(50, 0), 0.0);
    }

    #[test]
    fn test_compute_rate_basic() {
        assert!((compute_rate(50, 200) - 25.0).abs() < f64::EPSILON);
        assert!((compute_rate(80, 100) - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_compute_rate_clamps_overflow() {
        // Inconsistent backend data: numerator above denominator.
        assert_eq!(compute_rate(150, 100), 100.0);
    }

    #[test]
    fn test_validate_clean_payload() {
        let metrics = ConsolidatedMetrics {
            inspections: InspectionCounts {
                total: 100,
                completed: 80,
                in_progress: 10,
                pending: 8,
                cancelled: 2,
            },
            ..Default::default()
        };
        assert!(validate_consolidated(&metrics).is_empty());
    }

    #[test]
    fn test_validate_flags_completed_over_total() {
        let metrics = ConsolidatedMetrics {
            inspections: InspectionCounts {
                total: 10,
                completed: 20,
                ..Default::default()
            },
            ..Default::default()
        };
        let issues = validate_consolidated(&metrics);
        assert!(!issues.is_empty());
        assert!(issues[0].contains("exceed total"));
    }

    #[test]
    fn test_validate_flags_ai_and_user_inconsistency() {
        let metrics = ConsolidatedMetrics {
            ai: AiAccuracy {
                suggestions_total: 5,
                suggestions_accepted: 9,
            },
            users: UserMetrics {
                total: 3,
                active_last_30d: 7,
                ..Default::default()
            },
            ..Default::default()
        };
        let issues = validate_consolidated(&metrics);
        assert_eq!(issues.len(), 2);
    }

    proptest! {
        /// Property: rates are always finite and within [0, 100].
        #[test]
        fn prop_rate_always_bounded(num in 0u64..1_000_000, den in 0u64..1_000_000) {
            let rate = compute_rate(num, den);
            prop_assert!(rate.is_finite());
            prop_assert!((0.0..=100.0).contains(&rate));
        }

        /// Property: a numerator no larger than the denominator is exact.
        #[test]
        fn prop_rate_exact_when_consistent(den in 1u64..1_000_000, frac in 0.0f64..=1.0) {
            let num = (den as f64 * frac) as u64;
            let rate = compute_rate(num, den);
            let expected = (num as f64 / den as f64) * 100.0;
            prop_assert!((rate - expected).abs() < 1e-9);
        }
    }
}
