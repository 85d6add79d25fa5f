use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use concierge_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use concierge_core::domain::checklist::{
    CategoryState, Checklist, ChecklistId, ChecklistStatus, EmployeeProfile,
};
use concierge_core::domain::request::Request;
use concierge_core::domain::session::SessionContext;
use concierge_core::domain::Capability;
use concierge_core::errors::{ApplicationError, DomainError, EntityKind};
use concierge_db::repositories::{ChecklistRepository, RepositoryError, SessionRepository};

use crate::router::Router;
use crate::task::{TaskCapability, TaskReport, TaskRequest};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OnboardingReport {
    pub checklist: Checklist,
    pub submitted: Vec<Request>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingSummary {
    pub checklist_id: ChecklistId,
    pub employee: String,
    pub status: ChecklistStatus,
    pub progress_pct: u8,
    pub completed: Vec<Capability>,
    pub in_progress: Vec<Capability>,
    pub pending: Vec<Capability>,
    pub blocked: Vec<Capability>,
    pub days_elapsed: i64,
}

fn persistence(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

/// Top-level entry point. Reads the caller's session context, routes the
/// task to its specialist (or walks the fixed onboarding sequence for the
/// compound capability), aggregates category results into the checklist,
/// and writes the session back. Handler failures propagate untouched so the
/// caller always sees the deepest, most specific error.
pub struct Orchestrator {
    router: Router,
    checklists: Arc<dyn ChecklistRepository>,
    sessions: Arc<dyn SessionRepository>,
    audit: Arc<dyn AuditSink>,
    session_ttl: Duration,
}

impl Orchestrator {
    pub fn new(
        router: Router,
        checklists: Arc<dyn ChecklistRepository>,
        sessions: Arc<dyn SessionRepository>,
        audit: Arc<dyn AuditSink>,
        session_idle_ttl_minutes: u32,
    ) -> Self {
        Self {
            router,
            checklists,
            sessions,
            audit,
            session_ttl: Duration::minutes(i64::from(session_idle_ttl_minutes)),
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub async fn handle(&self, task: &TaskRequest) -> Result<TaskReport, ApplicationError> {
        let now = Utc::now();
        if task.requester.trim().is_empty() {
            return Err(DomainError::Validation("requester must not be empty".to_string()).into());
        }

        let mut session = self
            .sessions
            .find(&task.requester)
            .await
            .map_err(persistence)?
            .unwrap_or_else(|| SessionContext::new(task.requester.clone(), now));
        session.touch(now);

        let result = match task.capability.specialist() {
            Some(capability) => self.router.dispatch_to(capability, task).await,
            None => self.handle_onboarding(task).await,
        };

        if let Ok(report) = &result {
            track_open_requests(&mut session, report);
        }
        self.sessions.save(session).await.map_err(persistence)?;

        result
    }

    pub async fn session_for(
        &self,
        caller: &str,
    ) -> Result<Option<SessionContext>, ApplicationError> {
        self.sessions.find(caller).await.map_err(persistence)
    }

    /// Explicit TTL sweep over session contexts. Nothing evicts mid-call.
    pub async fn evict_idle_sessions(&self) -> Result<Vec<String>, ApplicationError> {
        self.sessions.evict_idle(Utc::now(), self.session_ttl).await.map_err(persistence)
    }

    async fn handle_onboarding(&self, task: &TaskRequest) -> Result<TaskReport, ApplicationError> {
        match task.require("action")? {
            "start" => self.start_onboarding(task).await,
            "status" => {
                let checklist = self.find_checklist(task).await?;
                Ok(TaskReport::Onboarding(OnboardingReport { checklist, submitted: Vec::new() }))
            }
            "update" => self.update_category(task).await,
            "summary" => {
                let checklist = self.find_checklist(task).await?;
                Ok(TaskReport::OnboardingSummary(summarize(&checklist)))
            }
            "list" => {
                let active = self
                    .checklists
                    .list_active(task.get("department"))
                    .await
                    .map_err(persistence)?;
                Ok(TaskReport::Checklists(active))
            }
            other => Err(DomainError::Validation(format!(
                "unknown onboarding action `{other}`"
            ))
            .into()),
        }
    }

    async fn start_onboarding(&self, task: &TaskRequest) -> Result<TaskReport, ApplicationError> {
        let profile = parse_profile(task)?;
        let now = Utc::now();

        if let Some(existing) = self
            .checklists
            .find_by_email(&profile.email)
            .await
            .map_err(persistence)?
            .filter(|checklist| checklist.status == ChecklistStatus::Active)
        {
            return Err(DomainError::Conflict {
                subject: "onboarding".to_string(),
                beneficiary: profile.email,
                open_request: existing.id.0,
            }
            .into());
        }

        let mut checklist = Checklist::new(profile.clone(), now);
        self.audit.emit(
            AuditEvent::new(
                None,
                Some(checklist.id.0.clone()),
                format!("onb-{}", checklist.id.0.to_ascii_lowercase()),
                "onboarding.started",
                AuditCategory::Ingress,
                task.requester.clone(),
                AuditOutcome::Success,
            )
            .with_metadata("employee", profile.email.clone())
            .with_metadata("department", profile.department.clone()),
        );

        let mut submitted = Vec::new();
        for capability in self.router.onboarding_sequence() {
            let category_task = category_task(task, &profile, capability);
            let report = self.router.dispatch_to(capability, &category_task).await?;
            if let TaskReport::Submitted(receipt) = report {
                checklist.update_category(
                    capability,
                    CategoryState::InProgress,
                    Some(receipt.request.id.clone()),
                    None,
                    now,
                );
                submitted.push(receipt.request);
            }
        }

        self.checklists.save(checklist.clone()).await.map_err(persistence)?;
        Ok(TaskReport::Onboarding(OnboardingReport { checklist, submitted }))
    }

    async fn update_category(&self, task: &TaskRequest) -> Result<TaskReport, ApplicationError> {
        let id = ChecklistId(task.require("checklist_id")?.to_string());
        let category_raw = task.require("category")?;
        let category = Capability::parse(category_raw).ok_or_else(|| {
            DomainError::Validation(format!("unknown checklist category `{category_raw}`"))
        })?;
        let state_raw = task.require("state")?;
        let state = CategoryState::parse(state_raw).ok_or_else(|| {
            DomainError::Validation(format!("unknown category state `{state_raw}`"))
        })?;

        let mut checklist = self
            .checklists
            .find_by_id(&id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| DomainError::not_found(EntityKind::Checklist, id.0.clone()))?;

        checklist.update_category(
            category,
            state,
            None,
            task.get("note").map(str::to_string),
            Utc::now(),
        );
        self.checklists.save(checklist.clone()).await.map_err(persistence)?;

        Ok(TaskReport::Onboarding(OnboardingReport { checklist, submitted: Vec::new() }))
    }

    async fn find_checklist(&self, task: &TaskRequest) -> Result<Checklist, ApplicationError> {
        if let Some(id) = task.get("checklist_id") {
            return self
                .checklists
                .find_by_id(&ChecklistId(id.to_string()))
                .await
                .map_err(persistence)?
                .ok_or_else(|| DomainError::not_found(EntityKind::Checklist, id).into());
        }
        if let Some(email) = task.get("email") {
            return self
                .checklists
                .find_by_email(email)
                .await
                .map_err(persistence)?
                .ok_or_else(|| DomainError::not_found(EntityKind::Checklist, email).into());
        }
        Err(DomainError::Validation("either `checklist_id` or `email` is required".to_string())
            .into())
    }
}

fn summarize(checklist: &Checklist) -> OnboardingSummary {
    OnboardingSummary {
        checklist_id: checklist.id.clone(),
        employee: checklist.profile.email.clone(),
        status: checklist.status,
        progress_pct: checklist.progress_pct,
        completed: checklist.categories_in_state(CategoryState::Completed),
        in_progress: checklist.categories_in_state(CategoryState::InProgress),
        pending: checklist.categories_in_state(CategoryState::Pending),
        blocked: checklist.categories_in_state(CategoryState::Blocked),
        days_elapsed: (Utc::now() - checklist.created_at).num_days(),
    }
}

/// The per-category submission the compound flow sends a specialist. Access
/// targets the department's group, equipment honors an explicit model
/// choice, the rest use their canonical catalog targets.
fn category_task(
    task: &TaskRequest,
    profile: &EmployeeProfile,
    capability: Capability,
) -> TaskRequest {
    let mut sub = TaskRequest::new(TaskCapability::from(capability), task.requester.clone())
        .with("action", "submit")
        .with("beneficiary", profile.email.clone())
        .with("justification", format!("onboarding {}", profile.name));

    match capability {
        Capability::Access => {
            let group = format!("{}_team", profile.department.trim().to_ascii_lowercase());
            sub = sub.with("subject", group);
        }
        Capability::Equipment => {
            if let Some(model) = task.get("equipment") {
                sub = sub.with("subject", model.to_string());
            }
        }
        _ => {}
    }

    sub
}

fn parse_profile(task: &TaskRequest) -> Result<EmployeeProfile, DomainError> {
    let start_date_raw = task.require("start_date")?;
    let start_date = NaiveDate::parse_from_str(start_date_raw, "%Y-%m-%d").map_err(|_| {
        DomainError::Validation(format!(
            "invalid start_date `{start_date_raw}` (expected YYYY-MM-DD)"
        ))
    })?;

    Ok(EmployeeProfile {
        name: task.require("name")?.to_string(),
        email: task.require("email")?.to_string(),
        department: task.require("department")?.to_string(),
        job_title: task.require("job_title")?.to_string(),
        start_date,
        manager_email: task.get("manager_email").map(str::to_string),
        buddy_email: task.get("buddy_email").map(str::to_string),
    })
}

fn track_open_requests(session: &mut SessionContext, report: &TaskReport) {
    match report {
        TaskReport::Submitted(receipt) => session.note_request(receipt.request.id.clone()),
        TaskReport::Onboarding(onboarding) => {
            for request in &onboarding.submitted {
                session.note_request(request.id.clone());
            }
        }
        TaskReport::Status(request)
        | TaskReport::Approval(request)
        | TaskReport::Closed(request)
        | TaskReport::Cancelled(request) => {
            if request.state.is_terminal() {
                session.forget_request(&request.id);
            }
        }
        TaskReport::Executed(execution) => {
            if execution.request.state.is_terminal() {
                session.forget_request(&execution.request.id);
            }
        }
        _ => {}
    }
}
