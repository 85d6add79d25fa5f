//! Boundary rendering: structured task reports in, human-readable text out.
//! Nothing inside the handlers or the request service formats prose.

use std::fmt::Write as _;

use concierge_core::domain::catalog::CatalogEntry;
use concierge_core::domain::request::Request;
use concierge_core::errors::InterfaceError;
use concierge_core::policy::ApprovalPlan;

use crate::orchestrator::{OnboardingReport, OnboardingSummary};
use crate::service::ExecutionDisposition;
use crate::task::{SubmitReceipt, TaskReport};

pub fn render_report(report: &TaskReport) -> String {
    match report {
        TaskReport::Submitted(receipt) => render_submission(receipt),
        TaskReport::Status(request) => render_request("Request status", request),
        TaskReport::Approval(request) => render_request("Approval recorded", request),
        TaskReport::Executed(execution) => {
            let mut text = render_request("Work order executed", &execution.request);
            match &execution.disposition {
                ExecutionDisposition::Applied => {}
                ExecutionDisposition::AlreadySatisfied { note } => {
                    let _ = write!(text, "\nNo change needed: {note}");
                }
                ExecutionDisposition::Failed { reason } => {
                    let _ = write!(text, "\nFulfillment failed: {reason}");
                }
            }
            text
        }
        TaskReport::Closed(request) => render_request("Work order closed", request),
        TaskReport::Cancelled(request) => render_request("Request cancelled", request),
        TaskReport::Listing(requests) => render_listing(requests),
        TaskReport::Catalog(entries) => render_catalog(entries),
        TaskReport::Onboarding(onboarding) => render_onboarding(onboarding),
        TaskReport::OnboardingSummary(summary) => render_summary(summary),
        TaskReport::Checklists(checklists) => {
            let mut text = format!("{} active onboarding checklist(s)", checklists.len());
            for checklist in checklists {
                let _ = write!(
                    text,
                    "\n- {} — {} ({}, {}% complete)",
                    checklist.id,
                    checklist.profile.name,
                    checklist.profile.department,
                    checklist.progress_pct
                );
            }
            text
        }
    }
}

pub fn render_error(error: &InterfaceError) -> String {
    format!("{} (reference: {})", error.user_message(), correlation_of(error))
}

fn correlation_of(error: &InterfaceError) -> &str {
    match error {
        InterfaceError::BadRequest { correlation_id, .. }
        | InterfaceError::Gone { correlation_id, .. }
        | InterfaceError::Conflict { correlation_id, .. }
        | InterfaceError::ServiceUnavailable { correlation_id, .. }
        | InterfaceError::Internal { correlation_id, .. } => correlation_id,
    }
}

fn render_submission(receipt: &SubmitReceipt) -> String {
    let request = &receipt.request;
    let mut text = format!(
        "Request {} submitted: {} for {}\nState: {}",
        request.id,
        request.subject,
        request.beneficiary,
        request.state.as_str()
    );

    render_plan(&mut text, &receipt.plan);

    if let Some(order) = &receipt.work_order {
        let _ = write!(text, "\nWork order {} is ready for execution", order.id);
    }
    if let Some(expires_at) = request.expires_at {
        let _ = write!(text, "\nValid until {}", expires_at.format("%Y-%m-%d"));
    }

    text
}

fn render_plan(text: &mut String, plan: &ApprovalPlan) {
    if plan.auto_approves() {
        let _ = write!(text, "\nApproval: automatic (low sensitivity)");
        return;
    }

    let _ = write!(
        text,
        "\nApproval chain ({} step(s), ~{} business days):",
        plan.required.len(),
        plan.sla_days
    );
    for (position, role) in plan.required.iter().enumerate() {
        let _ = write!(
            text,
            "\n  {}. {} (within {} business days)",
            position + 1,
            role.title(),
            role.sla_days()
        );
    }
}

fn render_request(heading: &str, request: &Request) -> String {
    let mut text = format!(
        "{heading}: {}\nSubject: {} — beneficiary {}\nState: {}",
        request.id,
        request.subject,
        request.beneficiary,
        request.state.as_str()
    );
    if !request.approvals.is_empty() {
        let _ = write!(text, "\nSign-offs: {}", request.approvals.len());
    }
    if let Some(order_id) = &request.work_order_id {
        let _ = write!(text, "\nWork order: {order_id}");
    }
    if let Some(note) = &request.state_note {
        let _ = write!(text, "\nNote: {note}");
    }
    text
}

fn render_listing(requests: &[Request]) -> String {
    let mut text = format!("{} request(s)", requests.len());
    for request in requests {
        let _ = write!(
            text,
            "\n- {} {} for {} [{}]",
            request.id,
            request.subject,
            request.beneficiary,
            request.state.as_str()
        );
    }
    text
}

fn render_catalog(entries: &[CatalogEntry]) -> String {
    let mut text = format!("{} catalog entrie(s)", entries.len());
    for entry in entries {
        let _ = write!(
            text,
            "\n- {} ({}, sensitivity {})",
            entry.id,
            entry.display_name,
            entry.sensitivity.as_str()
        );
        if let Some(cost) = entry.unit_cost {
            let _ = write!(text, ", ${cost}");
        }
        if let Some(available) = entry.available {
            let _ = write!(text, ", {available} available");
        }
    }
    text
}

fn render_onboarding(onboarding: &OnboardingReport) -> String {
    let checklist = &onboarding.checklist;
    let mut text = format!(
        "Onboarding {} for {} ({})\nProgress: {}%",
        checklist.id,
        checklist.profile.name,
        checklist.profile.department,
        checklist.progress_pct
    );
    for category in &checklist.categories {
        let _ = write!(text, "\n- {}: {}", category.capability, category.state.as_str());
        if let Some(request_id) = &category.request_id {
            let _ = write!(text, " ({request_id})");
        }
    }
    if !onboarding.submitted.is_empty() {
        let _ = write!(text, "\nSubmitted {} request(s)", onboarding.submitted.len());
    }
    text
}

fn render_summary(summary: &OnboardingSummary) -> String {
    let mut text = format!(
        "Onboarding summary {} — {}\nProgress: {}% after {} day(s)",
        summary.checklist_id, summary.employee, summary.progress_pct, summary.days_elapsed
    );
    let sections: [(&str, &[concierge_core::domain::Capability]); 4] = [
        ("completed", &summary.completed),
        ("in progress", &summary.in_progress),
        ("pending", &summary.pending),
        ("blocked", &summary.blocked),
    ];
    for (label, capabilities) in sections {
        if capabilities.is_empty() {
            continue;
        }
        let names: Vec<&str> = capabilities.iter().map(|c| c.as_str()).collect();
        let _ = write!(text, "\n{}: {}", label, names.join(", "));
    }
    text
}
