// src/engine/severity.rs

//! Severity classification for cascade conflicts.

use crate::config::SchedulePolicy;
use crate::engine::AffectedStage;
use crate::types::Severity;

/// Tier from the number of moved stages alone.
pub fn base_cascade_severity(policy: &SchedulePolicy, affected_count: usize) -> Severity {
    if affected_count <= policy.low_max_affected {
        Severity::Low
    } else if affected_count <= policy.medium_max_affected {
        Severity::Medium
    } else if affected_count <= policy.high_max_affected {
        Severity::High
    } else {
        Severity::Critical
    }
}

/// Tier from the total delay (sum of all adjustments) alone.
pub fn delay_severity(policy: &SchedulePolicy, total_delay_days: i64) -> Severity {
    if total_delay_days <= policy.low_max_total_delay_days {
        Severity::Low
    } else if total_delay_days <= policy.medium_max_total_delay_days {
        Severity::Medium
    } else {
        Severity::High
    }
}

/// Final cascade severity.
///
/// The worse of the count tier and the total-delay tier, escalated one more
/// tier when any moved stage is on the critical path (when enabled).
pub fn classify_cascade(policy: &SchedulePolicy, affected: &[AffectedStage]) -> Severity {
    let total_delay: i64 = affected.iter().map(|a| a.adjustment_days.abs()).sum();
    let severity = base_cascade_severity(policy, affected.len()).max(delay_severity(policy, total_delay));

    if policy.escalate_on_critical_path && affected.iter().any(|a| a.on_critical_path) {
        severity.escalate()
    } else {
        severity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::DateWindow;
    use chrono::NaiveDate;

    fn affected(days: i64, critical: bool) -> AffectedStage {
        let start = NaiveDate::from_ymd_opt(2026, 4, 1).expect("valid date");
        let w = DateWindow::new(start, start).unwrap();
        AffectedStage {
            stage_id: format!("s{days}"),
            stage_name: "stage".to_string(),
            number_index: 1,
            adjustment_days: days,
            original_window: w,
            new_window: w.shifted(days).unwrap(),
            on_critical_path: critical,
        }
    }

    #[test]
    fn count_tiers_follow_policy() {
        let p = SchedulePolicy::default();
        assert_eq!(base_cascade_severity(&p, 0), Severity::Low);
        assert_eq!(base_cascade_severity(&p, 2), Severity::Low);
        assert_eq!(base_cascade_severity(&p, 3), Severity::Medium);
        assert_eq!(base_cascade_severity(&p, 5), Severity::Medium);
        assert_eq!(base_cascade_severity(&p, 6), Severity::High);
        assert_eq!(base_cascade_severity(&p, 11), Severity::Critical);
    }

    #[test]
    fn delay_tiers_follow_policy() {
        let p = SchedulePolicy::default();
        assert_eq!(delay_severity(&p, 2), Severity::Low);
        assert_eq!(delay_severity(&p, 3), Severity::Medium);
        assert_eq!(delay_severity(&p, 7), Severity::Medium);
        assert_eq!(delay_severity(&p, 8), Severity::High);
    }

    #[test]
    fn one_stage_delayed_six_days_is_medium() {
        let p = SchedulePolicy::default();
        assert_eq!(classify_cascade(&p, &[affected(2, false)]), Severity::Low);
        assert_eq!(classify_cascade(&p, &[affected(6, false)]), Severity::Medium);
    }

    #[test]
    fn total_delay_sums_every_stage() {
        let p = SchedulePolicy::default();
        // Two stages, 4 days each: few stages, but 8 days of total delay.
        let moved = [affected(4, false), affected(4, false)];
        assert_eq!(classify_cascade(&p, &moved), Severity::High);
    }

    #[test]
    fn worse_dimension_wins() {
        let p = SchedulePolicy::default();
        // Six stages of one day each: delay tier medium, count tier high.
        let many: Vec<AffectedStage> = (0..6).map(|_| affected(1, false)).collect();
        assert_eq!(classify_cascade(&p, &many), Severity::High);
    }

    #[test]
    fn critical_path_escalation_can_be_disabled() {
        let mut p = SchedulePolicy::default();
        let moved = [affected(1, true), affected(1, false)];
        assert_eq!(classify_cascade(&p, &moved), Severity::Medium);

        p.escalate_on_critical_path = false;
        assert_eq!(classify_cascade(&p, &moved), Severity::Low);
    }

    #[test]
    fn escalation_saturates_at_critical() {
        let p = SchedulePolicy::default();
        let many: Vec<AffectedStage> = (1..=12).map(|d| affected(d, true)).collect();
        assert_eq!(classify_cascade(&p, &many), Severity::Critical);
    }
}
