use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a playbook stage.
///
/// `Completed` stages are frozen: the engine never proposes new dates for
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    NotReady,
    InProgress,
    Blocked,
    Completed,
}

impl StageStatus {
    pub fn is_completed(self) -> bool {
        matches!(self, StageStatus::Completed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StageStatus::NotReady => "not_ready",
            StageStatus::InProgress => "in_progress",
            StageStatus::Blocked => "blocked",
            StageStatus::Completed => "completed",
        }
    }
}

impl Default for StageStatus {
    fn default() -> Self {
        StageStatus::NotReady
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "not_ready" => Ok(StageStatus::NotReady),
            "in_progress" => Ok(StageStatus::InProgress),
            "blocked" => Ok(StageStatus::Blocked),
            "completed" => Ok(StageStatus::Completed),
            other => Err(format!(
                "invalid stage status: {other} (expected \"not_ready\", \"in_progress\", \"blocked\" or \"completed\")"
            )),
        }
    }
}

/// Playbook phase a stage belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageCategory {
    Onboarding,
    Research,
    Strategy,
    BrandBuilding,
    BrandCollaterals,
    BrandActivation,
    EmployerBranding,
    ProjectClosure,
}

impl StageCategory {
    pub const ALL: [StageCategory; 8] = [
        StageCategory::Onboarding,
        StageCategory::Research,
        StageCategory::Strategy,
        StageCategory::BrandBuilding,
        StageCategory::BrandCollaterals,
        StageCategory::BrandActivation,
        StageCategory::EmployerBranding,
        StageCategory::ProjectClosure,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StageCategory::Onboarding => "onboarding",
            StageCategory::Research => "research",
            StageCategory::Strategy => "strategy",
            StageCategory::BrandBuilding => "brand_building",
            StageCategory::BrandCollaterals => "brand_collaterals",
            StageCategory::BrandActivation => "brand_activation",
            StageCategory::EmployerBranding => "employer_branding",
            StageCategory::ProjectClosure => "project_closure",
        }
    }
}

impl fmt::Display for StageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        StageCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == needle)
            .ok_or_else(|| format!("invalid stage category: {needle}"))
    }
}

/// Severity attached to a schedule conflict.
///
/// Ordered from least to most severe so that `Ord` can be used to sort
/// conflicts with the worst first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// One tier up, saturating at `Critical`.
    pub fn escalate(self) -> Severity {
        match self {
            Severity::Low => Severity::Medium,
            Severity::Medium => Severity::High,
            Severity::High | Severity::Critical => Severity::Critical,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Completed".parse::<StageStatus>(), Ok(StageStatus::Completed));
        assert_eq!(" in_progress ".parse::<StageStatus>(), Ok(StageStatus::InProgress));
        assert!("done".parse::<StageStatus>().is_err());
    }

    #[test]
    fn category_round_trips_through_display() {
        for c in StageCategory::ALL {
            assert_eq!(c.to_string().parse::<StageCategory>(), Ok(c));
        }
    }

    #[test]
    fn severity_escalation_saturates() {
        assert_eq!(Severity::Low.escalate(), Severity::Medium);
        assert_eq!(Severity::High.escalate(), Severity::Critical);
        assert_eq!(Severity::Critical.escalate(), Severity::Critical);
        assert!(Severity::Critical > Severity::Low);
    }
}
