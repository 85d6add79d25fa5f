use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use concierge_core::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use concierge_core::domain::request::{
    ApprovalDecision, ApprovalSignoff, Request, RequestId, RequestState,
};
use concierge_core::domain::work_order::{
    CompletionStatus, ReviewId, ReviewRecord, WorkOrder, WorkOrderId, WorkOrderStatus,
};
use concierge_core::domain::Capability;
use concierge_core::errors::{ApplicationError, DomainError, EntityKind};
use concierge_core::lifecycle::{
    LifecycleAction, LifecycleContext, LifecycleEngine, LifecycleError, LifecycleEvent,
};
use concierge_core::policy::{ApprovalPolicy, ApproverRole};
use concierge_db::repositories::{
    CatalogRepository, RepositoryError, RequestFilter, RequestRepository, ReviewRepository,
    StockReservation, WorkOrderRepository,
};

use crate::task::SubmitReceipt;

/// What happened when a work order's domain operation ran.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FulfillmentOutcome {
    Applied { note: Option<String> },
    /// The target is already in the requested shape. An informational no-op,
    /// never an error.
    AlreadySatisfied { note: String },
    Failed { reason: String },
}

/// The seam to the backend a capability fulfills against (directory,
/// inventory staging, booking). Implementations must be idempotent: running
/// against an already-satisfied target reports `AlreadySatisfied`.
#[async_trait]
pub trait Fulfillment: Send + Sync {
    async fn fulfill(&self, order: &WorkOrder) -> Result<FulfillmentOutcome, ApplicationError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecutionDisposition {
    Applied,
    AlreadySatisfied { note: String },
    Failed { reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionReport {
    pub work_order: WorkOrder,
    pub request: Request,
    pub disposition: ExecutionDisposition,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitInput {
    pub subject: String,
    pub beneficiary: String,
    pub requester: String,
    pub justification: Option<String>,
    pub quantity: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct WorkflowSettings {
    pub review_after_days: u32,
    pub request_expiry_days: u32,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self { review_after_days: 30, request_expiry_days: 90 }
    }
}

/// One capability's request partition: validates submissions against the
/// catalog, drives the lifecycle engine, and keeps the request/work-order
/// link invariant. Reads are pure apart from the lazy expiry check;
/// approvals and work orders only move through the explicit writer
/// operations below.
pub struct RequestService {
    capability: Capability,
    requests: Arc<dyn RequestRepository>,
    work_orders: Arc<dyn WorkOrderRepository>,
    reviews: Arc<dyn ReviewRepository>,
    catalog: Arc<dyn CatalogRepository>,
    fulfillment: Arc<dyn Fulfillment>,
    engine: LifecycleEngine,
    policy: ApprovalPolicy,
    audit: Arc<dyn AuditSink>,
    settings: WorkflowSettings,
}

fn persistence(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

fn correlation_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("corr-{}", &hex[..12])
}

impl RequestService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        capability: Capability,
        requests: Arc<dyn RequestRepository>,
        work_orders: Arc<dyn WorkOrderRepository>,
        reviews: Arc<dyn ReviewRepository>,
        catalog: Arc<dyn CatalogRepository>,
        fulfillment: Arc<dyn Fulfillment>,
        audit: Arc<dyn AuditSink>,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            capability,
            requests,
            work_orders,
            reviews,
            catalog,
            fulfillment,
            engine: LifecycleEngine::default(),
            policy: ApprovalPolicy,
            audit,
            settings,
        }
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub async fn submit(&self, input: SubmitInput) -> Result<SubmitReceipt, ApplicationError> {
        let subject = input.subject.trim().to_string();
        let beneficiary = input.beneficiary.trim().to_string();
        if subject.is_empty() {
            return Err(DomainError::Validation("subject must not be empty".to_string()).into());
        }
        if beneficiary.is_empty() {
            return Err(
                DomainError::Validation("beneficiary must not be empty".to_string()).into()
            );
        }
        if input.quantity == 0 {
            return Err(
                DomainError::Validation("quantity must be greater than zero".to_string()).into()
            );
        }

        let entry = self
            .catalog
            .find(self.capability, &subject)
            .await
            .map_err(persistence)?
            .ok_or_else(|| DomainError::not_found(EntityKind::CatalogEntry, subject.clone()))?;

        if let Some(open) = self
            .requests
            .find_open(self.capability, &subject, &beneficiary)
            .await
            .map_err(persistence)?
        {
            return Err(DomainError::Conflict {
                subject,
                beneficiary,
                open_request: open.id.0,
            }
            .into());
        }

        if entry.available.is_some() {
            match self
                .catalog
                .reserve(self.capability, &subject, input.quantity)
                .await
                .map_err(persistence)?
            {
                StockReservation::Reserved { .. } | StockReservation::Untracked => {}
                StockReservation::Insufficient { available } => {
                    return Err(DomainError::Validation(format!(
                        "requested quantity {} exceeds availability {} for `{}`",
                        input.quantity, available, subject
                    ))
                    .into());
                }
            }
        }

        let plan = self.policy.plan(entry.sensitivity);
        let now = Utc::now();
        let correlation = correlation_id();
        let mut request = Request {
            id: RequestId::generate(),
            capability: self.capability,
            subject,
            requester: input.requester,
            beneficiary,
            state: self.engine.initial_state(),
            sensitivity: entry.sensitivity,
            justification: input.justification,
            approvals: Vec::new(),
            work_order_id: None,
            state_note: None,
            created_at: now,
            expires_at: Some(now + Duration::days(i64::from(self.settings.request_expiry_days))),
            closed_at: None,
        };

        self.audit.emit(
            AuditEvent::new(
                Some(request.id.clone()),
                None,
                correlation.clone(),
                "request.submitted",
                AuditCategory::Ingress,
                request.requester.clone(),
                AuditOutcome::Success,
            )
            .with_metadata("capability", self.capability.as_str())
            .with_metadata("subject", request.subject.clone())
            .with_metadata("sensitivity", request.sensitivity.as_str()),
        );

        let event = if plan.auto_approves() {
            LifecycleEvent::AutoApprovalGranted
        } else {
            LifecycleEvent::ApprovalPathRequired
        };
        let outcome = self.engine.apply_with_audit(
            &request.state,
            &event,
            &LifecycleContext { outstanding_approvals: plan.required.len() },
            self.audit.as_ref(),
            &self.audit_context(&request.id, &correlation),
        )?;
        request.state = outcome.to;

        let work_order = if outcome.actions.contains(&LifecycleAction::MaterializeWorkOrder) {
            Some(self.materialize_work_order(&mut request).await?)
        } else {
            None
        };

        self.check_work_order_link(&request);
        self.requests.save(request.clone()).await.map_err(persistence)?;

        Ok(SubmitReceipt { request, plan, work_order })
    }

    /// Pure read apart from the lazy expiry check: a request past its
    /// deadline is moved to `Expired` when observed. Approvals never advance
    /// here.
    pub async fn check_status(&self, id: &RequestId) -> Result<Request, ApplicationError> {
        let request = self.find_request(id).await?;
        self.expire_if_due(request).await
    }

    /// The only driver of `PendingApproval -> Approved | Rejected`. Roles
    /// sign strictly in chain order; the final sign-off materializes the
    /// work order.
    pub async fn record_approval(
        &self,
        id: &RequestId,
        role: ApproverRole,
        approver: &str,
        decision: ApprovalDecision,
        note: Option<String>,
    ) -> Result<Request, ApplicationError> {
        let mut request = self.find_request(id).await?;
        if request.is_expired_at(Utc::now()) {
            let expired_at = request.expires_at.unwrap_or_else(Utc::now);
            let expired = self.expire_if_due(request).await?;
            return Err(DomainError::Expired { id: expired.id.0, expired_at }.into());
        }

        let correlation = correlation_id();
        let now = Utc::now();
        let signoff = ApprovalSignoff {
            role,
            approver: approver.to_string(),
            decision,
            note: note.clone(),
            signed_at: now,
        };

        match decision {
            ApprovalDecision::Declined => {
                let outcome = self.engine.apply_with_audit(
                    &request.state,
                    &LifecycleEvent::ApprovalDeclined,
                    &LifecycleContext::default(),
                    self.audit.as_ref(),
                    &self.audit_context(&request.id, &correlation),
                )?;
                request.approvals.push(signoff);
                request.state = outcome.to;
                request.state_note =
                    Some(note.unwrap_or_else(|| format!("declined by {}", role.title())));
            }
            ApprovalDecision::Approved => {
                if request.state != RequestState::PendingApproval {
                    return Err(DomainError::from(LifecycleError::InvalidTransition {
                        state: request.state,
                        event: LifecycleEvent::ApproverSignedOff,
                    })
                    .into());
                }

                let plan = self.policy.plan(request.sensitivity);
                let signed = request.signed_roles().len();
                let expected = plan.next_after(signed).ok_or_else(|| {
                    DomainError::Validation("approval chain is already satisfied".to_string())
                })?;
                if role != expected {
                    return Err(DomainError::Validation(format!(
                        "expected sign-off from `{}`, got `{}`",
                        expected, role
                    ))
                    .into());
                }

                let outstanding = plan.outstanding(signed + 1);
                let event = if outstanding == 0 {
                    LifecycleEvent::ApprovalChainCompleted
                } else {
                    LifecycleEvent::ApproverSignedOff
                };
                let outcome = self.engine.apply_with_audit(
                    &request.state,
                    &event,
                    &LifecycleContext { outstanding_approvals: outstanding },
                    self.audit.as_ref(),
                    &self.audit_context(&request.id, &correlation),
                )?;
                request.approvals.push(signoff);
                request.state = outcome.to;

                if outcome.actions.contains(&LifecycleAction::MaterializeWorkOrder) {
                    self.materialize_work_order(&mut request).await?;
                }
            }
        }

        self.check_work_order_link(&request);
        self.requests.save(request.clone()).await.map_err(persistence)?;
        Ok(request)
    }

    /// Runs the domain operation behind an approved work order. An expired
    /// parent fails with `Expired` and is left untouched in its approved
    /// state; an already-satisfied target reports as an informational no-op.
    pub async fn execute(&self, id: &WorkOrderId) -> Result<ExecutionReport, ApplicationError> {
        let mut order = self.find_work_order(id).await?;
        let mut request = self.find_request(&order.request_id).await?;

        if request.is_expired_at(Utc::now()) {
            let expired_at = request.expires_at.unwrap_or_else(Utc::now);
            return Err(DomainError::Expired { id: order.id.0, expired_at }.into());
        }

        let correlation = correlation_id();
        let started = self.engine.apply_with_audit(
            &request.state,
            &LifecycleEvent::FulfillmentStarted,
            &LifecycleContext::default(),
            self.audit.as_ref(),
            &self.audit_context(&request.id, &correlation),
        )?;
        request.state = started.to;

        let outcome = self.fulfillment.fulfill(&order).await?;
        let disposition = match outcome {
            FulfillmentOutcome::Applied { note } => {
                if note.is_some() {
                    order.notes = note;
                }
                ExecutionDisposition::Applied
            }
            FulfillmentOutcome::AlreadySatisfied { note } => {
                order.notes = Some(note.clone());
                ExecutionDisposition::AlreadySatisfied { note }
            }
            FulfillmentOutcome::Failed { reason } => {
                ExecutionDisposition::Failed { reason }
            }
        };

        let (event, audit_outcome) = match &disposition {
            ExecutionDisposition::Failed { .. } => {
                (LifecycleEvent::FulfillmentFailed, AuditOutcome::Failed)
            }
            _ => (LifecycleEvent::FulfillmentSucceeded, AuditOutcome::Success),
        };
        let finished = self.engine.apply_with_audit(
            &request.state,
            &event,
            &LifecycleContext::default(),
            self.audit.as_ref(),
            &self.audit_context(&request.id, &correlation),
        )?;
        request.state = finished.to;

        order.status = WorkOrderStatus::Done;
        if let ExecutionDisposition::Failed { reason } = &disposition {
            order.completion = Some(CompletionStatus::Failed);
            order.notes = Some(reason.clone());
            request.state_note = Some(reason.clone());
        }

        self.audit.emit(
            AuditEvent::new(
                Some(request.id.clone()),
                None,
                correlation,
                "work_order.executed",
                AuditCategory::Fulfillment,
                "request-service",
                audit_outcome,
            )
            .with_metadata("work_order", order.id.0.clone())
            .with_metadata("subject", order.subject.clone()),
        );

        self.check_work_order_link(&request);
        self.work_orders.save(order.clone()).await.map_err(persistence)?;
        self.requests.save(request.clone()).await.map_err(persistence)?;

        Ok(ExecutionReport { work_order: order, request, disposition })
    }

    /// Terminal transition. Idempotent only on the same completion status:
    /// repeating the closure returns the same terminal request, while a
    /// different status fails with an invalid-state error. A successful
    /// closure schedules the follow-up access review.
    pub async fn close(
        &self,
        id: &WorkOrderId,
        completion: CompletionStatus,
        notes: Option<String>,
    ) -> Result<Request, ApplicationError> {
        let mut order = self.find_work_order(id).await?;
        let mut request = self.find_request(&order.request_id).await?;

        if order.status == WorkOrderStatus::Closed {
            if order.completion == Some(completion) {
                return Ok(request);
            }
            return Err(DomainError::from(LifecycleError::InvalidTransition {
                state: request.state,
                event: LifecycleEvent::ClosureRecorded,
            })
            .into());
        }

        let correlation = correlation_id();
        let outcome = self.engine.apply_with_audit(
            &request.state,
            &LifecycleEvent::ClosureRecorded,
            &LifecycleContext::default(),
            self.audit.as_ref(),
            &self.audit_context(&request.id, &correlation),
        )?;

        let now = Utc::now();
        request.state = outcome.to;
        request.closed_at = Some(now);
        order.status = WorkOrderStatus::Closed;
        order.completion = Some(completion);
        if notes.is_some() {
            order.notes = notes;
        }
        order.closed_at = Some(now);

        self.check_work_order_link(&request);
        self.work_orders.save(order.clone()).await.map_err(persistence)?;
        self.requests.save(request.clone()).await.map_err(persistence)?;

        if completion == CompletionStatus::Success
            && outcome.actions.contains(&LifecycleAction::ScheduleAccessReview)
        {
            let review = ReviewRecord {
                id: ReviewId::generate(),
                request_id: request.id.clone(),
                work_order_id: order.id.clone(),
                capability: self.capability,
                subject: order.subject.clone(),
                beneficiary: order.beneficiary.clone(),
                review_at: now + Duration::days(i64::from(self.settings.review_after_days)),
                scheduled_at: now,
            };
            self.reviews.save(review).await.map_err(persistence)?;
        }

        Ok(request)
    }

    /// Explicit caller-invoked cancellation of a non-terminal request.
    pub async fn cancel(
        &self,
        id: &RequestId,
        reason: &str,
    ) -> Result<Request, ApplicationError> {
        let mut request = self.find_request(id).await?;
        let correlation = correlation_id();

        let outcome = self.engine.apply_with_audit(
            &request.state,
            &LifecycleEvent::CancelRequested,
            &LifecycleContext::default(),
            self.audit.as_ref(),
            &self.audit_context(&request.id, &correlation),
        )?;
        request.state = outcome.to;
        request.state_note = Some(format!("cancelled: {reason}"));

        self.check_work_order_link(&request);
        self.requests.save(request.clone()).await.map_err(persistence)?;
        Ok(request)
    }

    pub async fn list(&self, filter: &RequestFilter) -> Result<Vec<Request>, ApplicationError> {
        let filter =
            RequestFilter { capability: Some(self.capability), ..filter.clone() };
        self.requests.list(&filter).await.map_err(persistence)
    }

    pub async fn catalog_entries(
        &self,
    ) -> Result<Vec<concierge_core::domain::catalog::CatalogEntry>, ApplicationError> {
        self.catalog.list(self.capability).await.map_err(persistence)
    }

    pub async fn reviews_for(
        &self,
        id: &RequestId,
    ) -> Result<Vec<ReviewRecord>, ApplicationError> {
        self.reviews.list_for_request(id).await.map_err(persistence)
    }

    async fn find_request(&self, id: &RequestId) -> Result<Request, ApplicationError> {
        self.requests
            .find_by_id(id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| DomainError::not_found(EntityKind::Request, id.0.clone()).into())
    }

    async fn find_work_order(&self, id: &WorkOrderId) -> Result<WorkOrder, ApplicationError> {
        self.work_orders
            .find_by_id(id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| DomainError::not_found(EntityKind::WorkOrder, id.0.clone()).into())
    }

    async fn expire_if_due(&self, mut request: Request) -> Result<Request, ApplicationError> {
        if !request.is_expired_at(Utc::now()) {
            return Ok(request);
        }

        let correlation = correlation_id();
        let outcome = self.engine.apply_with_audit(
            &request.state,
            &LifecycleEvent::DeadlineReached,
            &LifecycleContext::default(),
            self.audit.as_ref(),
            &self.audit_context(&request.id, &correlation),
        )?;
        request.state = outcome.to;
        request.state_note = Some("deadline reached".to_string());
        self.requests.save(request.clone()).await.map_err(persistence)?;
        Ok(request)
    }

    async fn materialize_work_order(
        &self,
        request: &mut Request,
    ) -> Result<WorkOrder, ApplicationError> {
        let order = WorkOrder::materialize(
            request.id.clone(),
            request.capability,
            request.subject.clone(),
            request.beneficiary.clone(),
            Utc::now(),
        );
        self.work_orders.save(order.clone()).await.map_err(persistence)?;
        request.work_order_id = Some(order.id.clone());
        Ok(order)
    }

    fn audit_context(&self, request_id: &RequestId, correlation: &str) -> AuditContext {
        AuditContext::new(Some(request_id.clone()), None, correlation, "request-service")
    }

    fn check_work_order_link(&self, request: &Request) {
        if !request.work_order_link_consistent() {
            tracing::error!(
                event_name = "lifecycle.invariant_violated",
                request_id = %request.id,
                state = request.state.as_str(),
                "work order link invariant violated"
            );
            debug_assert!(
                request.work_order_link_consistent(),
                "work order link invariant violated for {}",
                request.id
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use concierge_core::audit::InMemoryAuditSink;
    use concierge_core::domain::catalog::{CatalogEntry, Sensitivity};
    use concierge_core::domain::request::{ApprovalDecision, RequestState};
    use concierge_core::domain::work_order::{CompletionStatus, WorkOrder, WorkOrderStatus};
    use concierge_core::domain::Capability;
    use concierge_core::errors::{ApplicationError, DomainError};
    use concierge_core::policy::ApproverRole;
    use concierge_db::repositories::{
        InMemoryCatalogRepository, InMemoryRequestRepository, InMemoryReviewRepository,
        InMemoryWorkOrderRepository, RequestFilter, RequestRepository,
    };

    use super::{
        ExecutionDisposition, Fulfillment, FulfillmentOutcome, RequestService, SubmitInput,
        WorkflowSettings,
    };

    struct StubFulfillment {
        outcome: FulfillmentOutcome,
    }

    #[async_trait]
    impl Fulfillment for StubFulfillment {
        async fn fulfill(&self, _order: &WorkOrder) -> Result<FulfillmentOutcome, ApplicationError> {
            Ok(self.outcome.clone())
        }
    }

    fn catalog_entries() -> Vec<CatalogEntry> {
        vec![
            CatalogEntry::group(
                "finance_team",
                "Finance Team",
                "Finance team access group",
                "john.doe@company.com",
                Sensitivity::High,
            ),
            CatalogEntry::group(
                "marketing_team",
                "Marketing Team",
                "Marketing team access group",
                "marketing.lead@company.com",
                Sensitivity::Low,
            ),
            CatalogEntry::equipment(
                "macbook_air_13",
                "MacBook Air 13-inch",
                "M2, 16GB RAM, 256GB SSD",
                "it.assets@company.com",
                Decimal::new(1_299, 0),
                1,
            ),
        ]
    }

    struct Harness {
        service: RequestService,
        requests: Arc<InMemoryRequestRepository>,
    }

    fn harness_with(capability: Capability, outcome: FulfillmentOutcome) -> Harness {
        let requests = Arc::new(InMemoryRequestRepository::default());
        let service = RequestService::new(
            capability,
            requests.clone(),
            Arc::new(InMemoryWorkOrderRepository::default()),
            Arc::new(InMemoryReviewRepository::default()),
            Arc::new(InMemoryCatalogRepository::with_entries(catalog_entries())),
            Arc::new(StubFulfillment { outcome }),
            Arc::new(InMemoryAuditSink::default()),
            WorkflowSettings::default(),
        );
        Harness { service, requests }
    }

    fn harness() -> Harness {
        harness_with(Capability::Access, FulfillmentOutcome::Applied { note: None })
    }

    fn submit_input(subject: &str, beneficiary: &str) -> SubmitInput {
        SubmitInput {
            subject: subject.to_string(),
            beneficiary: beneficiary.to_string(),
            requester: "manager@company.com".to_string(),
            justification: None,
            quantity: 1,
        }
    }

    #[tokio::test]
    async fn high_sensitivity_submit_lands_pending_with_three_approvers() {
        let harness = harness();
        let receipt = harness
            .service
            .submit(submit_input("finance_team", "john.new@company.com"))
            .await
            .expect("submit");

        assert_eq!(receipt.request.state, RequestState::PendingApproval);
        assert_eq!(receipt.plan.required.len(), 3);
        assert_eq!(receipt.plan.sla_days, 4);
        assert!(receipt.work_order.is_none());
        assert!(receipt.request.work_order_id.is_none());
    }

    #[tokio::test]
    async fn low_sensitivity_submit_auto_approves_with_work_order() {
        let harness = harness();
        let receipt = harness
            .service
            .submit(submit_input("marketing_team", "mike.marketing@company.com"))
            .await
            .expect("submit");

        assert_eq!(receipt.request.state, RequestState::AutoApproved);
        assert!(receipt.plan.auto_approves());
        let order = receipt.work_order.expect("work order auto-created");
        assert_eq!(receipt.request.work_order_id, Some(order.id.clone()));
        assert_eq!(order.status, WorkOrderStatus::Ready);
    }

    #[tokio::test]
    async fn unknown_catalog_entry_fails_without_creating_a_request() {
        let harness = harness();
        let error = harness
            .service
            .submit(submit_input("quantum_lab", "john.new@company.com"))
            .await
            .expect_err("unknown entry must fail");

        assert!(matches!(
            error,
            ApplicationError::Domain(DomainError::NotFound { .. })
        ));
        let all = harness.requests.list(&RequestFilter::default()).await.expect("list");
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn duplicate_open_submission_is_a_conflict() {
        let harness = harness();
        harness
            .service
            .submit(submit_input("finance_team", "john.new@company.com"))
            .await
            .expect("first submit");

        let error = harness
            .service
            .submit(submit_input("finance_team", "john.new@company.com"))
            .await
            .expect_err("duplicate must fail");

        assert!(matches!(error, ApplicationError::Domain(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn approval_chain_signs_in_order_and_materializes_work_order() {
        let harness = harness();
        let receipt = harness
            .service
            .submit(submit_input("finance_team", "john.new@company.com"))
            .await
            .expect("submit");
        let id = receipt.request.id.clone();

        let out_of_order = harness
            .service
            .record_approval(
                &id,
                ApproverRole::SecurityTeam,
                "secops@company.com",
                ApprovalDecision::Approved,
                None,
            )
            .await
            .expect_err("chain order must hold");
        assert!(matches!(
            out_of_order,
            ApplicationError::Domain(DomainError::Validation(_))
        ));

        let after_manager = harness
            .service
            .record_approval(
                &id,
                ApproverRole::DirectManager,
                "manager@company.com",
                ApprovalDecision::Approved,
                None,
            )
            .await
            .expect("manager signs");
        assert_eq!(after_manager.state, RequestState::PendingApproval);

        harness
            .service
            .record_approval(
                &id,
                ApproverRole::DepartmentDirector,
                "director@company.com",
                ApprovalDecision::Approved,
                None,
            )
            .await
            .expect("director signs");

        let approved = harness
            .service
            .record_approval(
                &id,
                ApproverRole::SecurityTeam,
                "secops@company.com",
                ApprovalDecision::Approved,
                None,
            )
            .await
            .expect("security completes the chain");

        assert_eq!(approved.state, RequestState::Approved);
        assert!(approved.work_order_id.is_some());
        assert!(approved.work_order_link_consistent());
    }

    #[tokio::test]
    async fn declined_approval_rejects_the_request() {
        let harness = harness();
        let receipt = harness
            .service
            .submit(submit_input("finance_team", "john.new@company.com"))
            .await
            .expect("submit");

        let rejected = harness
            .service
            .record_approval(
                &receipt.request.id,
                ApproverRole::DirectManager,
                "manager@company.com",
                ApprovalDecision::Declined,
                Some("no business need".to_string()),
            )
            .await
            .expect("decline");

        assert_eq!(rejected.state, RequestState::Rejected);
        assert_eq!(rejected.state_note.as_deref(), Some("no business need"));

        let error = harness
            .service
            .record_approval(
                &receipt.request.id,
                ApproverRole::DirectManager,
                "manager@company.com",
                ApprovalDecision::Approved,
                None,
            )
            .await
            .expect_err("terminal request accepts no approvals");
        assert!(matches!(error, ApplicationError::Domain(DomainError::InvalidState(_))));
    }

    #[tokio::test]
    async fn execute_reports_already_satisfied_as_info() {
        let harness = harness_with(
            Capability::Access,
            FulfillmentOutcome::AlreadySatisfied { note: "already a member".to_string() },
        );
        let receipt = harness
            .service
            .submit(submit_input("marketing_team", "marketer1@company.com"))
            .await
            .expect("submit");
        let order_id = receipt.work_order.expect("work order").id;

        let report = harness.service.execute(&order_id).await.expect("execute");

        assert!(matches!(report.disposition, ExecutionDisposition::AlreadySatisfied { .. }));
        assert_eq!(report.request.state, RequestState::Executed);
        assert_eq!(report.work_order.status, WorkOrderStatus::Done);
    }

    #[tokio::test]
    async fn failed_fulfillment_rejects_and_reports() {
        let harness = harness_with(
            Capability::Access,
            FulfillmentOutcome::Failed { reason: "directory unavailable".to_string() },
        );
        let receipt = harness
            .service
            .submit(submit_input("marketing_team", "mike.marketing@company.com"))
            .await
            .expect("submit");
        let order_id = receipt.work_order.expect("work order").id;

        let report = harness.service.execute(&order_id).await.expect("execute returns a report");

        assert!(matches!(report.disposition, ExecutionDisposition::Failed { .. }));
        assert_eq!(report.request.state, RequestState::Rejected);
        assert_eq!(report.work_order.completion, Some(CompletionStatus::Failed));
        assert_eq!(report.request.state_note.as_deref(), Some("directory unavailable"));
    }

    #[tokio::test]
    async fn execute_after_expiry_fails_and_leaves_parent_untouched() {
        let harness = harness();
        let receipt = harness
            .service
            .submit(submit_input("marketing_team", "mike.marketing@company.com"))
            .await
            .expect("submit");
        let order_id = receipt.work_order.expect("work order").id;

        let mut stale = receipt.request.clone();
        stale.expires_at = Some(Utc::now() - Duration::hours(1));
        harness.requests.save(stale).await.expect("backdate expiry");

        let error = harness.service.execute(&order_id).await.expect_err("expired must fail");
        assert!(matches!(error, ApplicationError::Domain(DomainError::Expired { .. })));

        let parent = harness
            .requests
            .find_by_id(&receipt.request.id)
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(parent.state, RequestState::AutoApproved);
    }

    #[tokio::test]
    async fn status_read_lazily_expires_overdue_requests() {
        let harness = harness();
        let receipt = harness
            .service
            .submit(submit_input("finance_team", "john.new@company.com"))
            .await
            .expect("submit");

        let mut stale = receipt.request.clone();
        stale.expires_at = Some(Utc::now() - Duration::hours(1));
        harness.requests.save(stale).await.expect("backdate expiry");

        let observed = harness.service.check_status(&receipt.request.id).await.expect("status");
        assert_eq!(observed.state, RequestState::Expired);
    }

    #[tokio::test]
    async fn close_is_idempotent_only_on_the_same_outcome() {
        let harness = harness();
        let receipt = harness
            .service
            .submit(submit_input("marketing_team", "mike.marketing@company.com"))
            .await
            .expect("submit");
        let order_id = receipt.work_order.expect("work order").id;

        harness.service.execute(&order_id).await.expect("execute");
        let closed = harness
            .service
            .close(&order_id, CompletionStatus::Success, Some("membership granted".to_string()))
            .await
            .expect("close");
        assert_eq!(closed.state, RequestState::Closed);
        assert!(closed.closed_at.is_some());

        let repeat = harness
            .service
            .close(&order_id, CompletionStatus::Success, None)
            .await
            .expect("same-status close is idempotent");
        assert_eq!(repeat.state, RequestState::Closed);

        let conflicting = harness
            .service
            .close(&order_id, CompletionStatus::Failed, None)
            .await
            .expect_err("different status after closure must fail");
        assert!(matches!(
            conflicting,
            ApplicationError::Domain(DomainError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn successful_close_schedules_a_follow_up_review() {
        let harness = harness();
        let receipt = harness
            .service
            .submit(submit_input("marketing_team", "mike.marketing@company.com"))
            .await
            .expect("submit");
        let order_id = receipt.work_order.expect("work order").id;

        harness.service.execute(&order_id).await.expect("execute");
        harness
            .service
            .close(&order_id, CompletionStatus::Success, None)
            .await
            .expect("close");

        let reviews =
            harness.service.reviews_for(&receipt.request.id).await.expect("reviews");
        assert_eq!(reviews.len(), 1);
        assert!(reviews[0].review_at > reviews[0].scheduled_at);
    }

    #[tokio::test]
    async fn cancel_moves_non_terminal_requests_to_rejected() {
        let harness = harness();
        let receipt = harness
            .service
            .submit(submit_input("finance_team", "john.new@company.com"))
            .await
            .expect("submit");

        let cancelled = harness
            .service
            .cancel(&receipt.request.id, "no longer needed")
            .await
            .expect("cancel");
        assert_eq!(cancelled.state, RequestState::Rejected);
        assert_eq!(cancelled.state_note.as_deref(), Some("cancelled: no longer needed"));

        let again = harness
            .service
            .cancel(&receipt.request.id, "twice")
            .await
            .expect_err("terminal request cannot be cancelled");
        assert!(matches!(again, ApplicationError::Domain(DomainError::InvalidState(_))));
    }

    #[tokio::test]
    async fn stock_exhaustion_fails_validation() {
        let harness = harness_with(
            Capability::Equipment,
            FulfillmentOutcome::Applied { note: None },
        );
        harness
            .service
            .submit(submit_input("macbook_air_13", "alex.johnson@company.com"))
            .await
            .expect("first unit reserves the last laptop");

        let error = harness
            .service
            .submit(submit_input("macbook_air_13", "sam.lee@company.com"))
            .await
            .expect_err("no stock left");
        assert!(matches!(error, ApplicationError::Domain(DomainError::Validation(_))));
    }
}
