use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::request::{short_token, RequestId};
use crate::domain::Capability;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkOrderId(pub String);

impl WorkOrderId {
    pub fn generate() -> Self {
        Self(format!("WO-{}", short_token()))
    }
}

impl std::fmt::Display for WorkOrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
    /// Materialized from an approved request, waiting for fulfillment.
    Ready,
    /// Fulfillment ran; the outcome is recorded in `completion`.
    Done,
    Closed,
}

impl WorkOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Done => "done",
            Self::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ready" => Some(Self::Ready),
            "done" => Some(Self::Done),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Success,
    Failed,
}

impl CompletionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// The executable unit derived 1:1 from an approved request. Carries the same
/// target fields so the fulfillment seam never has to re-read the request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: WorkOrderId,
    pub request_id: RequestId,
    pub capability: Capability,
    pub subject: String,
    pub beneficiary: String,
    pub status: WorkOrderStatus,
    pub completion: Option<CompletionStatus>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl WorkOrder {
    pub fn materialize(
        request_id: RequestId,
        capability: Capability,
        subject: impl Into<String>,
        beneficiary: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: WorkOrderId::generate(),
            request_id,
            capability,
            subject: subject.into(),
            beneficiary: beneficiary.into(),
            status: WorkOrderStatus::Ready,
            completion: None,
            notes: None,
            created_at: now,
            closed_at: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewId(pub String);

impl ReviewId {
    pub fn generate() -> Self {
        Self(format!("AR-{}", short_token()))
    }
}

/// Follow-up review scheduled when a work order closes successfully. Stored
/// for the access-review process to pick up; never processed here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub id: ReviewId,
    pub request_id: RequestId,
    pub work_order_id: WorkOrderId,
    pub capability: Capability,
    pub subject: String,
    pub beneficiary: String,
    pub review_at: DateTime<Utc>,
    pub scheduled_at: DateTime<Utc>,
}
