use serde::{Deserialize, Serialize};

pub use crate::domain::request::RequestState;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    ApprovalPathRequired,
    AutoApprovalGranted,
    ApproverSignedOff,
    ApprovalChainCompleted,
    ApprovalDeclined,
    FulfillmentStarted,
    FulfillmentSucceeded,
    FulfillmentFailed,
    ClosureRecorded,
    DeadlineReached,
    CancelRequested,
}

/// Follow-up work a transition asks the request service to perform. The
/// engine never performs side effects itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleAction {
    NotifyNextApprover,
    MaterializeWorkOrder,
    ScheduleAccessReview,
    NotifyRequester,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LifecycleContext {
    /// Sign-offs still missing from the approval chain. Guards the
    /// `ApprovalChainCompleted` transition.
    pub outstanding_approvals: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: RequestState,
    pub to: RequestState,
    pub event: LifecycleEvent,
    pub actions: Vec<LifecycleAction>,
}
