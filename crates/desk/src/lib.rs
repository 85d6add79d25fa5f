//! Task-delegation and request-lifecycle engine.
//!
//! A root orchestrator receives declared task descriptors, consults the
//! caller's session context, and routes each task through a static table to
//! exactly one specialist handler (identity, equipment, access, HR
//! orientation, meetings). Every specialist drives the same request
//! lifecycle over its own store partition:
//!
//! 1. **Submit** — validate against the capability catalog, compute the
//!    sensitivity-driven approval path, auto-approve or queue for sign-off
//! 2. **Approve** — explicit sign-offs walk the fixed approver chain; the
//!    final one materializes the work order
//! 3. **Execute** — run the domain operation behind the work order
//!    (idempotent; already-satisfied targets are informational no-ops)
//! 4. **Close** — record the terminal outcome and schedule the follow-up
//!    review
//!
//! The compound onboarding capability fans out across all specialists in a
//! fixed order and aggregates their requests into one progress checklist.
//!
//! Natural-language understanding, policy-document search, and the real
//! directory/ticketing/calendar backends are external collaborators. This
//! crate only speaks typed task descriptors and typed results; prose is
//! rendered at the boundary (`render`).

pub mod handlers;
pub mod orchestrator;
pub mod render;
pub mod router;
pub mod service;
pub mod task;

use std::sync::Arc;

use concierge_core::audit::{AuditSink, InMemoryAuditSink};
use concierge_core::domain::catalog::CatalogEntry;
use concierge_core::domain::Capability;
use concierge_db::repositories::{
    CatalogRepository, DirectoryRepository, InMemoryCatalogRepository,
    InMemoryChecklistRepository, InMemoryDirectoryRepository, InMemoryRequestRepository,
    InMemoryReviewRepository, InMemorySessionRepository, InMemoryWorkOrderRepository,
};

use handlers::access::GroupMembershipFulfillment;
use handlers::equipment::EquipmentStagingFulfillment;
use handlers::hr::OrientationBookingFulfillment;
use handlers::identity::AccountProvisioningFulfillment;
use handlers::meetings::MeetingSchedulingFulfillment;
use handlers::SpecialistDesk;
use service::{Fulfillment, RequestService, WorkflowSettings};

pub use orchestrator::{OnboardingReport, OnboardingSummary, Orchestrator};
pub use render::{render_error, render_report};
pub use router::Router;
pub use service::{ExecutionDisposition, ExecutionReport, SubmitInput};
pub use task::{SubmitReceipt, TaskAction, TaskCapability, TaskReport, TaskRequest};

pub struct DeskOptions {
    pub catalog: Vec<CatalogEntry>,
    pub rosters: Vec<(String, Vec<String>)>,
    pub audit: Option<Arc<dyn AuditSink>>,
    pub settings: WorkflowSettings,
    pub session_idle_ttl_minutes: u32,
}

impl Default for DeskOptions {
    fn default() -> Self {
        Self {
            catalog: concierge_db::demo_catalog(),
            rosters: concierge_db::demo_rosters(),
            audit: None,
            settings: WorkflowSettings::default(),
            session_idle_ttl_minutes: 240,
        }
    }
}

/// Assembles a fully wired desk over in-memory storage: one request/work
/// order partition per specialist, a shared catalog snapshot, and a shared
/// directory for the identity/access fulfillments.
pub fn in_memory_desk(options: DeskOptions) -> Orchestrator {
    let audit: Arc<dyn AuditSink> =
        options.audit.unwrap_or_else(|| Arc::new(InMemoryAuditSink::default()));
    let catalog: Arc<dyn CatalogRepository> =
        Arc::new(InMemoryCatalogRepository::with_entries(options.catalog));
    let directory: Arc<dyn DirectoryRepository> =
        Arc::new(InMemoryDirectoryRepository::with_rosters(options.rosters));

    let specialists: Vec<(Capability, Arc<dyn Fulfillment>, Option<&'static str>)> = vec![
        (
            Capability::Identity,
            Arc::new(AccountProvisioningFulfillment::new(directory.clone())),
            Some("standard_account"),
        ),
        (Capability::Equipment, Arc::new(EquipmentStagingFulfillment), Some("macbook_air_13")),
        (Capability::Access, Arc::new(GroupMembershipFulfillment::new(directory.clone())), None),
        (
            Capability::HrOrientation,
            Arc::new(OrientationBookingFulfillment),
            Some("orientation_day_one"),
        ),
        (Capability::Meetings, Arc::new(MeetingSchedulingFulfillment), Some("welcome_meeting")),
    ];

    let mut router = Router::new();
    for (capability, fulfillment, default_subject) in specialists {
        let service = RequestService::new(
            capability,
            Arc::new(InMemoryRequestRepository::default()),
            Arc::new(InMemoryWorkOrderRepository::default()),
            Arc::new(InMemoryReviewRepository::default()),
            catalog.clone(),
            fulfillment,
            audit.clone(),
            options.settings,
        );
        router.register(Arc::new(SpecialistDesk::new(service, default_subject)));
    }

    Orchestrator::new(
        router,
        Arc::new(InMemoryChecklistRepository::default()),
        Arc::new(InMemorySessionRepository::default()),
        audit,
        options.session_idle_ttl_minutes,
    )
}
