//! End-to-end flows through the orchestrator: compound onboarding fan-out,
//! the access approval chain, and work-order execution/closure, all driven
//! through task descriptors the way an external surface would.

use concierge_core::domain::checklist::{CategoryState, ChecklistStatus};
use concierge_core::domain::request::RequestState;
use concierge_core::errors::{ApplicationError, DomainError};
use concierge_desk::{
    in_memory_desk, render_report, DeskOptions, ExecutionDisposition, Orchestrator, TaskCapability,
    TaskReport, TaskRequest,
};

fn desk() -> Orchestrator {
    in_memory_desk(DeskOptions::default())
}

fn onboarding_start(requester: &str) -> TaskRequest {
    TaskRequest::new(TaskCapability::Onboarding, requester)
        .with("action", "start")
        .with("name", "Alex Johnson")
        .with("email", "alex.johnson@company.com")
        .with("department", "Engineering")
        .with("job_title", "Software Developer")
        .with("start_date", "2026-03-02")
        .with("manager_email", "manager@company.com")
}

#[tokio::test]
async fn onboarding_start_fans_out_across_every_capability() {
    let desk = desk();

    let report = desk.handle(&onboarding_start("manager@company.com")).await.expect("start");
    let TaskReport::Onboarding(onboarding) = report else {
        panic!("expected onboarding report");
    };

    assert_eq!(onboarding.submitted.len(), 5);
    assert_eq!(onboarding.checklist.progress_pct, 0);
    assert!(onboarding
        .checklist
        .categories
        .iter()
        .all(|category| category.state == CategoryState::InProgress));
    assert!(onboarding
        .checklist
        .categories
        .iter()
        .all(|category| category.request_id.is_some()));

    // The engineering group is moderate sensitivity, so its access request
    // waits on the direct manager while low-sensitivity categories
    // auto-approve.
    let access = onboarding
        .submitted
        .iter()
        .find(|request| request.subject == "engineering_team")
        .expect("access request");
    assert_eq!(access.state, RequestState::PendingApproval);

    let identity = onboarding
        .submitted
        .iter()
        .find(|request| request.subject == "standard_account")
        .expect("identity request");
    assert_eq!(identity.state, RequestState::AutoApproved);

    let session = desk
        .session_for("manager@company.com")
        .await
        .expect("session lookup")
        .expect("session exists");
    assert_eq!(session.open_requests.len(), 5);
}

#[tokio::test]
async fn duplicate_onboarding_for_the_same_employee_conflicts() {
    let desk = desk();
    desk.handle(&onboarding_start("manager@company.com")).await.expect("first start");

    let error = desk
        .handle(&onboarding_start("manager@company.com"))
        .await
        .expect_err("second start must conflict");
    assert!(matches!(error, ApplicationError::Domain(DomainError::Conflict { .. })));
}

#[tokio::test]
async fn access_request_walks_approval_execution_and_closure() {
    let desk = desk();

    let submit = TaskRequest::new(TaskCapability::Access, "manager@company.com")
        .with("action", "submit")
        .with("subject", "finance_team")
        .with("beneficiary", "john.new@company.com")
        .with("justification", "quarterly reporting");
    let TaskReport::Submitted(receipt) = desk.handle(&submit).await.expect("submit") else {
        panic!("expected submission receipt");
    };
    assert_eq!(receipt.request.state, RequestState::PendingApproval);
    assert_eq!(receipt.plan.required.len(), 3);
    assert!(receipt.work_order.is_none());

    let request_id = receipt.request.id.0.clone();
    let mut approved_request = None;
    for role in ["direct_manager", "department_director", "security_team"] {
        let approve = TaskRequest::new(TaskCapability::Access, "approvals@company.com")
            .with("action", "approve")
            .with("request_id", request_id.clone())
            .with("role", role)
            .with("decision", "approved");
        let TaskReport::Approval(request) = desk.handle(&approve).await.expect("approve") else {
            panic!("expected approval report");
        };
        approved_request = Some(request);
    }

    let approved = approved_request.expect("approved request");
    assert_eq!(approved.state, RequestState::Approved);
    let work_order_id =
        approved.work_order_id.as_ref().expect("work order materialized").0.clone();

    let execute = TaskRequest::new(TaskCapability::Access, "ops@company.com")
        .with("action", "execute")
        .with("work_order_id", work_order_id.clone());
    let TaskReport::Executed(execution) = desk.handle(&execute).await.expect("execute") else {
        panic!("expected execution report");
    };
    assert_eq!(execution.disposition, ExecutionDisposition::Applied);
    assert_eq!(execution.request.state, RequestState::Executed);

    let close = TaskRequest::new(TaskCapability::Access, "ops@company.com")
        .with("action", "close")
        .with("work_order_id", work_order_id)
        .with("completion", "success")
        .with("notes", "membership granted");
    let TaskReport::Closed(closed) = desk.handle(&close).await.expect("close") else {
        panic!("expected closure report");
    };
    assert_eq!(closed.state, RequestState::Closed);
    assert!(closed.closed_at.is_some());
}

#[tokio::test]
async fn marketing_access_auto_approves_and_tolerates_existing_membership() {
    let desk = desk();

    // marketer1 is already on the demo roster.
    let submit = TaskRequest::new(TaskCapability::Access, "manager@company.com")
        .with("action", "submit")
        .with("subject", "marketing_team")
        .with("beneficiary", "marketer1@company.com");
    let TaskReport::Submitted(receipt) = desk.handle(&submit).await.expect("submit") else {
        panic!("expected submission receipt");
    };
    assert_eq!(receipt.request.state, RequestState::AutoApproved);
    let order_id = receipt.work_order.expect("auto-created work order").id.0;

    let execute = TaskRequest::new(TaskCapability::Access, "ops@company.com")
        .with("action", "execute")
        .with("work_order_id", order_id);
    let TaskReport::Executed(execution) = desk.handle(&execute).await.expect("execute") else {
        panic!("expected execution report");
    };

    assert!(matches!(
        execution.disposition,
        ExecutionDisposition::AlreadySatisfied { .. }
    ));
    assert_eq!(execution.request.state, RequestState::Executed);
}

#[tokio::test]
async fn checklist_updates_complete_the_onboarding() {
    let desk = desk();

    let TaskReport::Onboarding(onboarding) =
        desk.handle(&onboarding_start("manager@company.com")).await.expect("start")
    else {
        panic!("expected onboarding report");
    };
    let checklist_id = onboarding.checklist.id.0.clone();

    let mut last_progress = 0;
    for category in ["identity", "equipment", "access", "hr_orientation", "meetings"] {
        let update = TaskRequest::new(TaskCapability::Onboarding, "manager@company.com")
            .with("action", "update")
            .with("checklist_id", checklist_id.clone())
            .with("category", category)
            .with("state", "completed");
        let TaskReport::Onboarding(updated) = desk.handle(&update).await.expect("update") else {
            panic!("expected onboarding report");
        };
        assert!(updated.checklist.progress_pct >= last_progress);
        last_progress = updated.checklist.progress_pct;
    }

    assert_eq!(last_progress, 100);

    let summary_task = TaskRequest::new(TaskCapability::Onboarding, "manager@company.com")
        .with("action", "summary")
        .with("checklist_id", checklist_id);
    let TaskReport::OnboardingSummary(summary) =
        desk.handle(&summary_task).await.expect("summary")
    else {
        panic!("expected summary");
    };
    assert_eq!(summary.status, ChecklistStatus::Completed);
    assert_eq!(summary.progress_pct, 100);
    assert_eq!(summary.completed.len(), 5);
    assert!(summary.blocked.is_empty());
}

#[tokio::test]
async fn unknown_group_surfaces_the_deepest_error() {
    let desk = desk();

    let submit = TaskRequest::new(TaskCapability::Access, "manager@company.com")
        .with("action", "submit")
        .with("subject", "quantum_lab")
        .with("beneficiary", "john.new@company.com");

    let error = desk.handle(&submit).await.expect_err("unknown group must fail");
    assert!(matches!(error, ApplicationError::Domain(DomainError::NotFound { .. })));
}

#[tokio::test]
async fn reports_render_to_readable_text() {
    let desk = desk();

    let TaskReport::Onboarding(onboarding) =
        desk.handle(&onboarding_start("manager@company.com")).await.expect("start")
    else {
        panic!("expected onboarding report");
    };

    let text = render_report(&TaskReport::Onboarding(onboarding));
    assert!(text.contains("Alex Johnson"));
    assert!(text.contains("identity: in_progress"));
    assert!(text.contains("Submitted 5 request(s)"));
}
