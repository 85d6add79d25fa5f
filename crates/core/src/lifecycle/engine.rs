use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::request::RequestState;
use crate::lifecycle::states::{
    LifecycleAction, LifecycleContext, LifecycleEvent, TransitionOutcome,
};

pub trait LifecycleDefinition {
    fn initial_state(&self) -> RequestState;
    fn transition(
        &self,
        current: &RequestState,
        event: &LifecycleEvent,
        context: &LifecycleContext,
    ) -> Result<TransitionOutcome, LifecycleError>;
}

/// The one request lifecycle every capability partition shares. Forward-only:
/// no `(state, event)` pair ever leads back to an earlier state, and terminal
/// states accept nothing.
#[derive(Clone, Debug, Default)]
pub struct StandardLifecycle;

impl LifecycleDefinition for StandardLifecycle {
    fn initial_state(&self) -> RequestState {
        RequestState::Submitted
    }

    fn transition(
        &self,
        current: &RequestState,
        event: &LifecycleEvent,
        context: &LifecycleContext,
    ) -> Result<TransitionOutcome, LifecycleError> {
        transition_standard(current, event, context)
    }
}

pub struct LifecycleEngine<D = StandardLifecycle> {
    definition: D,
}

impl Default for LifecycleEngine<StandardLifecycle> {
    fn default() -> Self {
        Self::new(StandardLifecycle)
    }
}

impl<D> LifecycleEngine<D>
where
    D: LifecycleDefinition,
{
    pub fn new(definition: D) -> Self {
        Self { definition }
    }

    pub fn initial_state(&self) -> RequestState {
        self.definition.initial_state()
    }

    pub fn apply(
        &self,
        current: &RequestState,
        event: &LifecycleEvent,
        context: &LifecycleContext,
    ) -> Result<TransitionOutcome, LifecycleError> {
        self.definition.transition(current, event, context)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: &RequestState,
        event: &LifecycleEvent,
        context: &LifecycleContext,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, LifecycleError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(current, event, context);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    AuditEvent::new(
                        audit.request_id.clone(),
                        audit.session.clone(),
                        audit.correlation_id.clone(),
                        "lifecycle.transition_applied",
                        AuditCategory::Lifecycle,
                        audit.actor.clone(),
                        AuditOutcome::Success,
                    )
                    .with_metadata("from", outcome.from.as_str())
                    .with_metadata("to", outcome.to.as_str())
                    .with_metadata("event", format!("{:?}", outcome.event)),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit.request_id.clone(),
                        audit.session.clone(),
                        audit.correlation_id.clone(),
                        "lifecycle.transition_rejected",
                        AuditCategory::Lifecycle,
                        audit.actor.clone(),
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: RequestState, event: LifecycleEvent },
    #[error("approval chain has {outstanding} outstanding sign-off(s) in state {state:?}")]
    ApprovalsOutstanding { state: RequestState, outstanding: usize },
}

fn transition_standard(
    current: &RequestState,
    event: &LifecycleEvent,
    context: &LifecycleContext,
) -> Result<TransitionOutcome, LifecycleError> {
    use LifecycleAction::{
        MaterializeWorkOrder, NotifyNextApprover, NotifyRequester, ScheduleAccessReview,
    };
    use LifecycleEvent::{
        ApprovalChainCompleted, ApprovalDeclined, ApprovalPathRequired, ApproverSignedOff,
        AutoApprovalGranted, CancelRequested, ClosureRecorded, DeadlineReached, FulfillmentFailed,
        FulfillmentStarted, FulfillmentSucceeded,
    };
    use RequestState::{
        Approved, AutoApproved, Closed, Executed, Executing, Expired, PendingApproval, Rejected,
        Submitted,
    };

    let (to, actions) = match (current, event) {
        (Submitted, ApprovalPathRequired) => (PendingApproval, vec![NotifyNextApprover]),
        (Submitted, AutoApprovalGranted) => (AutoApproved, vec![MaterializeWorkOrder]),
        (PendingApproval, ApproverSignedOff) => (PendingApproval, vec![NotifyNextApprover]),
        (PendingApproval, ApprovalChainCompleted) => {
            if context.outstanding_approvals > 0 {
                return Err(LifecycleError::ApprovalsOutstanding {
                    state: *current,
                    outstanding: context.outstanding_approvals,
                });
            }
            (Approved, vec![MaterializeWorkOrder])
        }
        (PendingApproval, ApprovalDeclined) => (Rejected, vec![NotifyRequester]),
        (Approved, FulfillmentStarted) | (AutoApproved, FulfillmentStarted) => {
            (Executing, Vec::new())
        }
        (Executing, FulfillmentSucceeded) => (Executed, vec![NotifyRequester]),
        (Executing, FulfillmentFailed) => (Rejected, vec![NotifyRequester]),
        (Executed, ClosureRecorded) => (Closed, vec![ScheduleAccessReview]),
        (state, DeadlineReached) if !state.is_terminal() => (Expired, Vec::new()),
        (state, CancelRequested) if !state.is_terminal() => (Rejected, vec![NotifyRequester]),
        _ => {
            return Err(LifecycleError::InvalidTransition { state: *current, event: *event });
        }
    };

    Ok(TransitionOutcome { from: *current, to, event: *event, actions })
}

#[cfg(test)]
mod tests {
    use crate::audit::{AuditContext, InMemoryAuditSink};
    use crate::domain::request::RequestState;
    use crate::lifecycle::engine::{LifecycleEngine, LifecycleError};
    use crate::lifecycle::states::{LifecycleAction, LifecycleContext, LifecycleEvent};

    const ALL_STATES: [RequestState; 9] = [
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

    const ALL_EVENTS: [LifecycleEvent; 11] = [
        LifecycleEvent::ApprovalPathRequired,
        LifecycleEvent::AutoApprovalGranted,
        LifecycleEvent::ApproverSignedOff,
        LifecycleEvent::ApprovalChainCompleted,
        LifecycleEvent::ApprovalDeclined,
        LifecycleEvent::FulfillmentStarted,
        LifecycleEvent::FulfillmentSucceeded,
        LifecycleEvent::FulfillmentFailed,
        LifecycleEvent::ClosureRecorded,
        LifecycleEvent::DeadlineReached,
        LifecycleEvent::CancelRequested,
    ];

    /// Order in which states appear along the longest path. Used to prove
    /// there are no back-edges.
    fn rank(state: RequestState) -> u8 {
        match state {
            RequestState::Submitted => 0,
            RequestState::PendingApproval => 1,
            RequestState::Approved | RequestState::AutoApproved => 2,
            RequestState::Executing => 3,
            RequestState::Executed => 4,
            RequestState::Closed | RequestState::Rejected | RequestState::Expired => 5,
        }
    }

    #[test]
    fn auto_approval_happy_path() {
        let engine = LifecycleEngine::default();
        let context = LifecycleContext::default();
        let mut state = engine.initial_state();

        let granted = engine
            .apply(&state, &LifecycleEvent::AutoApprovalGranted, &context)
            .expect("submitted -> auto_approved");
        assert!(granted.actions.contains(&LifecycleAction::MaterializeWorkOrder));

        state = granted.to;
        state = engine
            .apply(&state, &LifecycleEvent::FulfillmentStarted, &context)
            .expect("auto_approved -> executing")
            .to;
        state = engine
            .apply(&state, &LifecycleEvent::FulfillmentSucceeded, &context)
            .expect("executing -> executed")
            .to;
        let closed = engine
            .apply(&state, &LifecycleEvent::ClosureRecorded, &context)
            .expect("executed -> closed");

        assert_eq!(closed.to, RequestState::Closed);
        assert_eq!(closed.actions, vec![LifecycleAction::ScheduleAccessReview]);
    }

    #[test]
    fn approval_chain_path() {
        let engine = LifecycleEngine::default();

        let pending = engine
            .apply(
                &RequestState::Submitted,
                &LifecycleEvent::ApprovalPathRequired,
                &LifecycleContext { outstanding_approvals: 3 },
            )
            .expect("submitted -> pending_approval")
            .to;

        let still_pending = engine
            .apply(
                &pending,
                &LifecycleEvent::ApproverSignedOff,
                &LifecycleContext { outstanding_approvals: 2 },
            )
            .expect("intermediate sign-off stays pending");
        assert_eq!(still_pending.to, RequestState::PendingApproval);
        assert_eq!(still_pending.actions, vec![LifecycleAction::NotifyNextApprover]);

        let approved = engine
            .apply(
                &pending,
                &LifecycleEvent::ApprovalChainCompleted,
                &LifecycleContext { outstanding_approvals: 0 },
            )
            .expect("final sign-off approves");
        assert_eq!(approved.to, RequestState::Approved);
        assert!(approved.actions.contains(&LifecycleAction::MaterializeWorkOrder));
    }

    #[test]
    fn chain_completion_is_rejected_while_signoffs_remain() {
        let engine = LifecycleEngine::default();
        let error = engine
            .apply(
                &RequestState::PendingApproval,
                &LifecycleEvent::ApprovalChainCompleted,
                &LifecycleContext { outstanding_approvals: 2 },
            )
            .expect_err("chain must not complete early");

        assert_eq!(
            error,
            LifecycleError::ApprovalsOutstanding {
                state: RequestState::PendingApproval,
                outstanding: 2,
            }
        );
    }

    #[test]
    fn fulfillment_failure_reports_rejection() {
        let engine = LifecycleEngine::default();
        let outcome = engine
            .apply(
                &RequestState::Executing,
                &LifecycleEvent::FulfillmentFailed,
                &LifecycleContext::default(),
            )
            .expect("executing -> rejected");

        assert_eq!(outcome.to, RequestState::Rejected);
    }

    #[test]
    fn terminal_states_accept_no_events() {
        let engine = LifecycleEngine::default();
        let context = LifecycleContext::default();

        for state in [RequestState::Closed, RequestState::Rejected, RequestState::Expired] {
            for event in ALL_EVENTS {
                assert!(
                    engine.apply(&state, &event, &context).is_err(),
                    "{state:?} must reject {event:?}"
                );
            }
        }
    }

    #[test]
    fn no_back_edges_are_reachable() {
        let engine = LifecycleEngine::default();
        let context = LifecycleContext::default();

        for state in ALL_STATES {
            for event in ALL_EVENTS {
                if let Ok(outcome) = engine.apply(&state, &event, &context) {
                    let stays = outcome.to == state && event == LifecycleEvent::ApproverSignedOff;
                    assert!(
                        stays || rank(outcome.to) > rank(state),
                        "back-edge {state:?} -> {:?} via {event:?}",
                        outcome.to
                    );
                }
            }
        }
    }

    #[test]
    fn expiry_applies_to_every_non_terminal_state() {
        let engine = LifecycleEngine::default();
        let context = LifecycleContext::default();

        for state in ALL_STATES {
            let result = engine.apply(&state, &LifecycleEvent::DeadlineReached, &context);
            if state.is_terminal() {
                assert!(result.is_err());
            } else {
                assert_eq!(result.expect("non-terminal expires").to, RequestState::Expired);
            }
        }
    }

    #[test]
    fn transition_emits_audit_event() {
        let engine = LifecycleEngine::default();
        let sink = InMemoryAuditSink::default();

        let _ = engine
            .apply_with_audit(
                &RequestState::Submitted,
                &LifecycleEvent::AutoApprovalGranted,
                &LifecycleContext::default(),
                &sink,
                &AuditContext::new(None, None, "req-42", "request-service"),
            )
            .expect("transition should succeed");

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "lifecycle.transition_applied");
        assert_eq!(events[0].correlation_id, "req-42");
        assert_eq!(events[0].metadata.get("to").map(String::as_str), Some("auto_approved"));
    }
}
