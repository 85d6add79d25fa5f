use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::Capability;

/// How much scrutiny a request for an entry deserves. Drives the approval
/// chain length (see `policy`): `Low` auto-approves, `Critical` walks the
/// full four-role chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    Low,
    Moderate,
    Elevated,
    High,
    Critical,
}

impl Sensitivity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::Elevated => "elevated",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "moderate" => Some(Self::Moderate),
            "elevated" => Some(Self::Elevated),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Cost tier for equipment entries. Thresholds follow the procurement
    /// policy: under $1,000 is self-service, $5,000 and up needs the wider
    /// chain.
    pub fn from_unit_cost(unit_cost: Decimal) -> Self {
        if unit_cost < Decimal::new(1_000, 0) {
            Self::Low
        } else if unit_cost < Decimal::new(2_000, 0) {
            Self::Moderate
        } else if unit_cost < Decimal::new(5_000, 0) {
            Self::Elevated
        } else {
            Self::High
        }
    }
}

/// One entry of the read-only reference catalog: an AD group, an equipment
/// SKU, an orientation session, or a meeting template. Requests are validated
/// against the catalog; validation never mutates it. The only mutable field
/// is the `available` stock counter, reserved through a dedicated repository
/// operation so concurrent submits cannot race.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub capability: Capability,
    pub display_name: String,
    pub description: String,
    pub owner: String,
    pub sensitivity: Sensitivity,
    pub unit_cost: Option<Decimal>,
    pub available: Option<u32>,
}

impl CatalogEntry {
    pub fn group(
        id: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
        owner: impl Into<String>,
        sensitivity: Sensitivity,
    ) -> Self {
        Self {
            id: id.into(),
            capability: Capability::Access,
            display_name: display_name.into(),
            description: description.into(),
            owner: owner.into(),
            sensitivity,
            unit_cost: None,
            available: None,
        }
    }

    pub fn equipment(
        id: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
        owner: impl Into<String>,
        unit_cost: Decimal,
        available: u32,
    ) -> Self {
        Self {
            id: id.into(),
            capability: Capability::Equipment,
            display_name: display_name.into(),
            description: description.into(),
            owner: owner.into(),
            sensitivity: Sensitivity::from_unit_cost(unit_cost),
            unit_cost: Some(unit_cost),
            available: Some(available),
        }
    }
}
