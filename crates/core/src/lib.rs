pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod lifecycle;
pub mod policy;

pub use audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use domain::catalog::{CatalogEntry, Sensitivity};
pub use domain::checklist::{
    CategoryState, Checklist, ChecklistCategory, ChecklistId, ChecklistStatus, EmployeeProfile,
};
pub use domain::request::{
    ApprovalDecision, ApprovalSignoff, Request, RequestId, RequestState,
};
pub use domain::session::SessionContext;
pub use domain::work_order::{
    CompletionStatus, ReviewId, ReviewRecord, WorkOrder, WorkOrderId, WorkOrderStatus,
};
pub use domain::{Capability, ONBOARDING_SEQUENCE};
pub use errors::{ApplicationError, DomainError, EntityKind, InterfaceError};
pub use lifecycle::{
    LifecycleAction, LifecycleContext, LifecycleEngine, LifecycleError, LifecycleEvent,
    StandardLifecycle, TransitionOutcome,
};
pub use policy::{ApprovalPlan, ApprovalPolicy, ApproverRole, APPROVAL_CHAIN};
