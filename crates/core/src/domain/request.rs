use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::catalog::Sensitivity;
use crate::domain::work_order::WorkOrderId;
use crate::domain::Capability;
use crate::policy::ApproverRole;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        Self(format!("REQ-{}", short_token()))
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Short uppercase token used by all human-facing identifiers
/// (`REQ-`, `WO-`, `AR-`, `ONB-`).
pub(crate) fn short_token() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..8].to_ascii_uppercase()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Submitted,
    PendingApproval,
    Approved,
    AutoApproved,
    Executing,
    Executed,
    Closed,
    Rejected,
    Expired,
}

impl RequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::AutoApproved => "auto_approved",
            Self::Executing => "executing",
            Self::Executed => "executed",
            Self::Closed => "closed",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "submitted" => Some(Self::Submitted),
            "pending_approval" => Some(Self::PendingApproval),
            "approved" => Some(Self::Approved),
            "auto_approved" => Some(Self::AutoApproved),
            "executing" => Some(Self::Executing),
            "executed" => Some(Self::Executed),
            "closed" => Some(Self::Closed),
            "rejected" => Some(Self::Rejected),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Rejected | Self::Expired)
    }

    /// States in which the request must reference its work order.
    pub fn carries_work_order(&self) -> bool {
        matches!(
            self,
            Self::Approved | Self::AutoApproved | Self::Executing | Self::Executed | Self::Closed
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approved,
    Declined,
}

/// One recorded sign-off on a pending request, in chain order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalSignoff {
    pub role: ApproverRole,
    pub approver: String,
    pub decision: ApprovalDecision,
    pub note: Option<String>,
    pub signed_at: DateTime<Utc>,
}

/// A tracked, stateful ask: an access grant, an equipment ticket, an identity
/// provisioning job, an orientation booking. One shape for every capability
/// partition; the owning handler decides what fulfillment means.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub capability: Capability,
    /// Catalog entry id being requested.
    pub subject: String,
    pub requester: String,
    pub beneficiary: String,
    pub state: RequestState,
    pub sensitivity: Sensitivity,
    pub justification: Option<String>,
    pub approvals: Vec<ApprovalSignoff>,
    pub work_order_id: Option<WorkOrderId>,
    pub state_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Request {
    /// The work-order link invariant: the approved-and-beyond states must
    /// reference their work order, and no request carries one before
    /// approval. A request that fails or expires after approval keeps the
    /// link for the audit trail. Checked by the request service after every
    /// transition.
    pub fn work_order_link_consistent(&self) -> bool {
        match self.state {
            state if state.carries_work_order() => self.work_order_id.is_some(),
            RequestState::Submitted | RequestState::PendingApproval => {
                self.work_order_id.is_none()
            }
            _ => true,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        !self.state.is_terminal()
            && self.expires_at.map(|deadline| deadline <= now).unwrap_or(false)
    }

    pub fn signed_roles(&self) -> Vec<ApproverRole> {
        self.approvals
            .iter()
            .filter(|signoff| signoff.decision == ApprovalDecision::Approved)
            .map(|signoff| signoff.role)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::domain::catalog::Sensitivity;
    use crate::domain::work_order::WorkOrderId;
    use crate::domain::Capability;

    use super::{Request, RequestId, RequestState};

    fn request(state: RequestState) -> Request {
        Request {
            id: RequestId("REQ-11112222".to_string()),
            capability: Capability::Access,
            subject: "finance_team".to_string(),
            requester: "manager@company.com".to_string(),
            beneficiary: "alex.johnson@company.com".to_string(),
            state,
            sensitivity: Sensitivity::High,
            justification: None,
            approvals: Vec::new(),
            work_order_id: None,
            state_note: None,
            created_at: Utc::now(),
            expires_at: None,
            closed_at: None,
        }
    }

    #[test]
    fn request_state_round_trips_from_storage_encoding() {
        let cases = [
            RequestState::Submitted,
            RequestState::PendingApproval,
            RequestState::Approved,
            RequestState::AutoApproved,
            RequestState::Executing,
            RequestState::Executed,
            RequestState::Closed,
            RequestState::Rejected,
            RequestState::Expired,
        ];

        for state in cases {
            assert_eq!(RequestState::parse(state.as_str()), Some(state));
        }
    }

    #[test]
    fn work_order_link_invariant_tracks_state() {
        let mut pending = request(RequestState::PendingApproval);
        assert!(pending.work_order_link_consistent());

        pending.work_order_id = Some(WorkOrderId("WO-00000001".to_string()));
        assert!(!pending.work_order_link_consistent());

        let mut approved = request(RequestState::Approved);
        assert!(!approved.work_order_link_consistent());
        approved.work_order_id = Some(WorkOrderId("WO-00000001".to_string()));
        assert!(approved.work_order_link_consistent());
    }

    #[test]
    fn expiry_is_ignored_for_terminal_states() {
        let mut closed = request(RequestState::Closed);
        closed.expires_at = Some(Utc::now() - Duration::hours(1));
        assert!(!closed.is_expired_at(Utc::now()));

        let mut approved = request(RequestState::Approved);
        approved.expires_at = Some(Utc::now() - Duration::hours(1));
        assert!(approved.is_expired_at(Utc::now()));
    }

    #[test]
    fn generated_ids_carry_the_request_prefix() {
        let id = RequestId::generate();
        assert!(id.0.starts_with("REQ-"));
        assert_eq!(id.0.len(), "REQ-".len() + 8);
    }
}
