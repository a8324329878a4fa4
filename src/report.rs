use crate::model::{ProductivityComparison, WindowSummary};

/// Relative change in daily commit rate from `before` to `after`.
///
/// A zero before-rate (a dormant repository, say) is ordinary input, so both
/// figures come back as "not applicable" instead of dividing by zero.
pub fn compare(before: &WindowSummary, after: &WindowSummary) -> ProductivityComparison {
    let base = before.daily_rate;
    if base == 0.0 || !base.is_finite() {
        return ProductivityComparison {
            percentage_change: None,
            multiplier: None,
        };
    }

    ProductivityComparison {
        percentage_change: Some((after.daily_rate - base) / base * 100.0),
        multiplier: Some(after.daily_rate / base),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnalysisWindow, ComplexityCounts, LineChangeTotals};
    use chrono::NaiveDate;

    fn summary(commits: u64, days: u32) -> WindowSummary {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        WindowSummary {
            window: AnalysisWindow {
                start,
                end: start,
                day_count: days,
            },
            commit_count: commits,
            daily_rate: commits as f64 / f64::from(days),
            complexity: ComplexityCounts::default(),
            top_files: Vec::new(),
            top_days: Vec::new(),
            lines: LineChangeTotals::default(),
        }
    }

    #[test]
    fn ten_to_twenty_five_commits_is_two_and_a_half_times() {
        let cmp = compare(&summary(10, 30), &summary(25, 30));
        assert!((cmp.percentage_change.unwrap() - 150.0).abs() < 1e-9);
        assert!((cmp.multiplier.unwrap() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn slowdown_is_negative() {
        let cmp = compare(&summary(20, 10), &summary(5, 10));
        assert!((cmp.percentage_change.unwrap() + 75.0).abs() < 1e-9);
        assert!((cmp.multiplier.unwrap() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn zero_before_rate_is_not_applicable() {
        let cmp = compare(&summary(0, 30), &summary(12, 30));
        assert_eq!(cmp.percentage_change, None);
        assert_eq!(cmp.multiplier, None);

        let both_idle = compare(&summary(0, 30), &summary(0, 30));
        assert_eq!(both_idle.multiplier, None);
    }
}
