use serde::{Deserialize, Serialize};

pub mod catalog;
pub mod checklist;
pub mod request;
pub mod session;
pub mod work_order;

/// A capability domain owned by exactly one specialist handler.
///
/// `ONBOARDING_SEQUENCE` is the fixed order in which the orchestrator walks
/// the domains for a compound onboarding task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Identity,
    Equipment,
    Access,
    HrOrientation,
    Meetings,
}

pub const ONBOARDING_SEQUENCE: [Capability; 5] = [
    Capability::Identity,
    Capability::Equipment,
    Capability::Access,
    Capability::HrOrientation,
    Capability::Meetings,
];

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Equipment => "equipment",
            Self::Access => "access",
            Self::HrOrientation => "hr_orientation",
            Self::Meetings => "meetings",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "identity" => Some(Self::Identity),
            "equipment" => Some(Self::Equipment),
            "access" => Some(Self::Access),
            "hr_orientation" => Some(Self::HrOrientation),
            "meetings" => Some(Self::Meetings),
            _ => None,
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
