use serde::{Deserialize, Serialize};

use crate::domain::catalog::Sensitivity;

/// Approver roles in their fixed escalation order. A request's chain is
/// always a prefix of this order; no tier skips a role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproverRole {
    DirectManager,
    DepartmentDirector,
    SecurityTeam,
    SecurityOfficer,
}

pub const APPROVAL_CHAIN: [ApproverRole; 4] = [
    ApproverRole::DirectManager,
    ApproverRole::DepartmentDirector,
    ApproverRole::SecurityTeam,
    ApproverRole::SecurityOfficer,
];

impl ApproverRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectManager => "direct_manager",
            Self::DepartmentDirector => "department_director",
            Self::SecurityTeam => "security_team",
            Self::SecurityOfficer => "security_officer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "direct_manager" | "manager" => Some(Self::DirectManager),
            "department_director" | "director" => Some(Self::DepartmentDirector),
            "security_team" | "security" => Some(Self::SecurityTeam),
            "security_officer" | "ciso" => Some(Self::SecurityOfficer),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::DirectManager => "Direct Manager",
            Self::DepartmentDirector => "Department Director",
            Self::SecurityTeam => "Security Team",
            Self::SecurityOfficer => "Chief Information Security Officer",
        }
    }

    /// Per-role turnaround commitment, business days. Display only.
    pub fn sla_days(&self) -> u8 {
        match self {
            Self::DirectManager => 2,
            Self::DepartmentDirector => 3,
            Self::SecurityTeam => 5,
            Self::SecurityOfficer => 7,
        }
    }
}

impl std::fmt::Display for ApproverRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The approval path computed for one request at submit time. Derived purely
/// from sensitivity, so it can be recomputed from a stored request at any
/// point without drift.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalPlan {
    pub required: Vec<ApproverRole>,
    /// Estimated end-to-end approval time in business days. Display only,
    /// never enforced.
    pub sla_days: u8,
}

impl ApprovalPlan {
    pub fn auto_approves(&self) -> bool {
        self.required.is_empty()
    }

    /// Next role that still has to sign, given how many have already signed
    /// in chain order.
    pub fn next_after(&self, signed_count: usize) -> Option<ApproverRole> {
        self.required.get(signed_count).copied()
    }

    pub fn outstanding(&self, signed_count: usize) -> usize {
        self.required.len().saturating_sub(signed_count)
    }
}

/// Pure mapping from sensitivity to the required approval chain: `Low`
/// auto-approves, each tier above it takes one more role off the fixed
/// escalation order.
#[derive(Clone, Copy, Debug, Default)]
pub struct ApprovalPolicy;

impl ApprovalPolicy {
    pub fn plan(&self, sensitivity: Sensitivity) -> ApprovalPlan {
        let chain_len = match sensitivity {
            Sensitivity::Low => 0,
            Sensitivity::Moderate => 1,
            Sensitivity::Elevated => 2,
            Sensitivity::High => 3,
            Sensitivity::Critical => 4,
        };

        let required = APPROVAL_CHAIN[..chain_len].to_vec();
        let sla_days = if required.is_empty() { 0 } else { required.len() as u8 + 1 };

        ApprovalPlan { required, sla_days }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::catalog::Sensitivity;

    use super::{ApprovalPolicy, ApproverRole, APPROVAL_CHAIN};

    #[test]
    fn low_sensitivity_auto_approves() {
        let plan = ApprovalPolicy.plan(Sensitivity::Low);
        assert!(plan.auto_approves());
        assert_eq!(plan.sla_days, 0);
    }

    #[test]
    fn high_sensitivity_requires_three_approvers() {
        let plan = ApprovalPolicy.plan(Sensitivity::High);

        assert_eq!(
            plan.required,
            [
                ApproverRole::DirectManager,
                ApproverRole::DepartmentDirector,
                ApproverRole::SecurityTeam,
            ]
        );
        assert_eq!(plan.sla_days, 4);
    }

    #[test]
    fn critical_sensitivity_walks_the_full_chain() {
        let plan = ApprovalPolicy.plan(Sensitivity::Critical);
        assert_eq!(plan.required, APPROVAL_CHAIN);
        assert_eq!(plan.next_after(4), None);
    }

    #[test]
    fn chain_is_signed_in_fixed_order() {
        let plan = ApprovalPolicy.plan(Sensitivity::Elevated);

        assert_eq!(plan.next_after(0), Some(ApproverRole::DirectManager));
        assert_eq!(plan.next_after(1), Some(ApproverRole::DepartmentDirector));
        assert_eq!(plan.outstanding(1), 1);
        assert_eq!(plan.next_after(2), None);
    }

    #[test]
    fn role_aliases_parse_to_chain_roles() {
        assert_eq!(ApproverRole::parse("manager"), Some(ApproverRole::DirectManager));
        assert_eq!(ApproverRole::parse("CISO"), Some(ApproverRole::SecurityOfficer));
        assert_eq!(ApproverRole::parse("intern"), None);
    }
}
