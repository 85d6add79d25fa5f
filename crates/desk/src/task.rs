use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use concierge_core::domain::catalog::CatalogEntry;
use concierge_core::domain::checklist::Checklist;
use concierge_core::domain::request::Request;
use concierge_core::domain::work_order::WorkOrder;
use concierge_core::domain::Capability;
use concierge_core::errors::DomainError;
use concierge_core::policy::ApprovalPlan;

use crate::orchestrator::{OnboardingReport, OnboardingSummary};
use crate::service::ExecutionReport;

/// What an inbound task addresses: one specialist domain, or the compound
/// onboarding flow that fans out across all of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCapability {
    Identity,
    Equipment,
    Access,
    HrOrientation,
    Meetings,
    Onboarding,
}

impl TaskCapability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Equipment => "equipment",
            Self::Access => "access",
            Self::HrOrientation => "hr_orientation",
            Self::Meetings => "meetings",
            Self::Onboarding => "onboarding",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "onboarding" => Some(Self::Onboarding),
            other => Capability::parse(other).map(Self::from),
        }
    }

    /// The single specialist domain this capability names, unless compound.
    pub fn specialist(&self) -> Option<Capability> {
        match self {
            Self::Identity => Some(Capability::Identity),
            Self::Equipment => Some(Capability::Equipment),
            Self::Access => Some(Capability::Access),
            Self::HrOrientation => Some(Capability::HrOrientation),
            Self::Meetings => Some(Capability::Meetings),
            Self::Onboarding => None,
        }
    }
}

impl From<Capability> for TaskCapability {
    fn from(value: Capability) -> Self {
        match value {
            Capability::Identity => Self::Identity,
            Capability::Equipment => Self::Equipment,
            Capability::Access => Self::Access,
            Capability::HrOrientation => Self::HrOrientation,
            Capability::Meetings => Self::Meetings,
        }
    }
}

/// The operations every specialist accepts, declared in the task payload.
/// Natural-language interpretation that produces these descriptors lives
/// entirely outside this engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskAction {
    Submit,
    Status,
    Approve,
    Execute,
    Close,
    Cancel,
    List,
    Catalog,
}

impl TaskAction {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "submit" => Some(Self::Submit),
            "status" => Some(Self::Status),
            "approve" => Some(Self::Approve),
            "execute" => Some(Self::Execute),
            "close" => Some(Self::Close),
            "cancel" => Some(Self::Cancel),
            "list" => Some(Self::List),
            "catalog" => Some(Self::Catalog),
            _ => None,
        }
    }
}

/// Inbound task descriptor: declared capability, string payload, and the
/// caller identity the session context is keyed by.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskRequest {
    pub capability: TaskCapability,
    pub payload: BTreeMap<String, String>,
    pub requester: String,
}

impl TaskRequest {
    pub fn new(capability: TaskCapability, requester: impl Into<String>) -> Self {
        Self { capability, payload: BTreeMap::new(), requester: requester.into() }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.payload.get(key).map(String::as_str).filter(|value| !value.trim().is_empty())
    }

    pub fn require(&self, key: &str) -> Result<&str, DomainError> {
        self.get(key)
            .ok_or_else(|| DomainError::Validation(format!("missing required field `{key}`")))
    }

    pub fn action(&self) -> Result<TaskAction, DomainError> {
        let raw = self.require("action")?;
        TaskAction::parse(raw)
            .ok_or_else(|| DomainError::Validation(format!("unknown action `{raw}`")))
    }
}

/// A freshly submitted request together with the approval path it was put
/// on. The plan is display data; the request alone is authoritative.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub request: Request,
    pub plan: ApprovalPlan,
    pub work_order: Option<WorkOrder>,
}

/// Structured result of one dispatched task. Human-readable text is rendered
/// from this at the boundary (`render`), never inside the handlers.
#[derive(Clone, Debug, PartialEq)]
pub enum TaskReport {
    Submitted(SubmitReceipt),
    Status(Request),
    Approval(Request),
    Executed(ExecutionReport),
    Closed(Request),
    Cancelled(Request),
    Listing(Vec<Request>),
    Catalog(Vec<CatalogEntry>),
    Onboarding(OnboardingReport),
    OnboardingSummary(OnboardingSummary),
    Checklists(Vec<Checklist>),
}
