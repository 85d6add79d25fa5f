use async_trait::async_trait;

use concierge_core::domain::request::{ApprovalDecision, RequestId, RequestState};
use concierge_core::domain::work_order::{CompletionStatus, WorkOrderId};
use concierge_core::domain::Capability;
use concierge_core::errors::{ApplicationError, DomainError};
use concierge_core::policy::ApproverRole;
use concierge_db::repositories::RequestFilter;

use crate::service::{RequestService, SubmitInput};
use crate::task::{TaskAction, TaskReport, TaskRequest};

pub mod access;
pub mod equipment;
pub mod hr;
pub mod identity;
pub mod meetings;

/// A capability domain's entry point: receives task descriptors for its
/// partition and runs the uniform request operations against it.
#[async_trait]
pub trait SpecialistHandler: Send + Sync {
    fn capability(&self) -> Capability;
    async fn handle(&self, task: &TaskRequest) -> Result<TaskReport, ApplicationError>;
}

/// The one specialist implementation every domain shares. Domains differ
/// only in their fulfillment seam and, for the odd domain with a canonical
/// target, the default submission subject.
pub struct SpecialistDesk {
    service: RequestService,
    default_subject: Option<&'static str>,
}

impl SpecialistDesk {
    pub fn new(service: RequestService, default_subject: Option<&'static str>) -> Self {
        Self { service, default_subject }
    }

    pub fn service(&self) -> &RequestService {
        &self.service
    }

    async fn submit(&self, task: &TaskRequest) -> Result<TaskReport, ApplicationError> {
        let subject = task
            .get("subject")
            .map(str::to_string)
            .or_else(|| self.default_subject.map(str::to_string))
            .ok_or_else(|| {
                DomainError::Validation("missing required field `subject`".to_string())
            })?;
        let beneficiary =
            task.get("beneficiary").unwrap_or(task.requester.as_str()).to_string();
        let quantity = match task.get("quantity") {
            None => 1,
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                DomainError::Validation(format!("invalid quantity `{raw}`"))
            })?,
        };

        let receipt = self
            .service
            .submit(SubmitInput {
                subject,
                beneficiary,
                requester: task.requester.clone(),
                justification: task.get("justification").map(str::to_string),
                quantity,
            })
            .await?;
        Ok(TaskReport::Submitted(receipt))
    }

    async fn approve(&self, task: &TaskRequest) -> Result<TaskReport, ApplicationError> {
        let id = RequestId(task.require("request_id")?.to_string());
        let role_raw = task.require("role")?;
        let role = ApproverRole::parse(role_raw).ok_or_else(|| {
            DomainError::Validation(format!("unknown approver role `{role_raw}`"))
        })?;
        let decision = parse_decision(task.require("decision")?)?;
        let approver = task.get("approver").unwrap_or(task.requester.as_str()).to_string();

        let request = self
            .service
            .record_approval(&id, role, &approver, decision, task.get("note").map(str::to_string))
            .await?;
        Ok(TaskReport::Approval(request))
    }

    async fn list(&self, task: &TaskRequest) -> Result<TaskReport, ApplicationError> {
        let state = match task.get("state") {
            None => None,
            Some(raw) => Some(RequestState::parse(raw).ok_or_else(|| {
                DomainError::Validation(format!("unknown request state `{raw}`"))
            })?),
        };
        let filter = RequestFilter {
            capability: None,
            requester: task.get("requester").map(str::to_string),
            state,
        };
        Ok(TaskReport::Listing(self.service.list(&filter).await?))
    }
}

fn parse_decision(raw: &str) -> Result<ApprovalDecision, DomainError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "approved" | "approve" => Ok(ApprovalDecision::Approved),
        "declined" | "decline" => Ok(ApprovalDecision::Declined),
        other => Err(DomainError::Validation(format!("unknown approval decision `{other}`"))),
    }
}

fn parse_completion(raw: &str) -> Result<CompletionStatus, DomainError> {
    CompletionStatus::parse(raw)
        .ok_or_else(|| DomainError::Validation(format!("unknown completion status `{raw}`")))
}

#[async_trait]
impl SpecialistHandler for SpecialistDesk {
    fn capability(&self) -> Capability {
        self.service.capability()
    }

    async fn handle(&self, task: &TaskRequest) -> Result<TaskReport, ApplicationError> {
        match task.action()? {
            TaskAction::Submit => self.submit(task).await,
            TaskAction::Status => {
                let id = RequestId(task.require("request_id")?.to_string());
                Ok(TaskReport::Status(self.service.check_status(&id).await?))
            }
            TaskAction::Approve => self.approve(task).await,
            TaskAction::Execute => {
                let id = WorkOrderId(task.require("work_order_id")?.to_string());
                Ok(TaskReport::Executed(self.service.execute(&id).await?))
            }
            TaskAction::Close => {
                let id = WorkOrderId(task.require("work_order_id")?.to_string());
                let completion = parse_completion(task.require("completion")?)?;
                let request = self
                    .service
                    .close(&id, completion, task.get("notes").map(str::to_string))
                    .await?;
                Ok(TaskReport::Closed(request))
            }
            TaskAction::Cancel => {
                let id = RequestId(task.require("request_id")?.to_string());
                let reason = task.get("reason").unwrap_or("cancelled by requester");
                Ok(TaskReport::Cancelled(self.service.cancel(&id, reason).await?))
            }
            TaskAction::List => self.list(task).await,
            TaskAction::Catalog => {
                Ok(TaskReport::Catalog(self.service.catalog_entries().await?))
            }
        }
    }
}
