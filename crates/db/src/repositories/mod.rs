use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use concierge_core::domain::catalog::CatalogEntry;
use concierge_core::domain::checklist::{Checklist, ChecklistId};
use concierge_core::domain::request::{Request, RequestId, RequestState};
use concierge_core::domain::session::SessionContext;
use concierge_core::domain::work_order::{ReviewRecord, WorkOrder, WorkOrderId};
use concierge_core::domain::Capability;

pub mod memory;
pub mod request;
pub mod review;
pub mod work_order;

pub use memory::{
    InMemoryCatalogRepository, InMemoryChecklistRepository, InMemoryDirectoryRepository,
    InMemoryRequestRepository, InMemoryReviewRepository, InMemorySessionRepository,
    InMemoryWorkOrderRepository,
};
pub use request::SqlRequestRepository;
pub use review::SqlReviewRepository;
pub use work_order::SqlWorkOrderRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestFilter {
    pub capability: Option<Capability>,
    pub requester: Option<String>,
    pub state: Option<RequestState>,
}

#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError>;
    async fn save(&self, request: Request) -> Result<(), RepositoryError>;
    /// Newest-first listing, optionally narrowed by capability, requester, or
    /// state.
    async fn list(&self, filter: &RequestFilter) -> Result<Vec<Request>, RepositoryError>;
    /// An open (non-terminal) request for the same subject and beneficiary,
    /// if one exists. Backs duplicate-submission detection.
    async fn find_open(
        &self,
        capability: Capability,
        subject: &str,
        beneficiary: &str,
    ) -> Result<Option<Request>, RepositoryError>;
}

#[async_trait]
pub trait WorkOrderRepository: Send + Sync {
    async fn find_by_id(&self, id: &WorkOrderId) -> Result<Option<WorkOrder>, RepositoryError>;
    async fn save(&self, order: WorkOrder) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn save(&self, review: ReviewRecord) -> Result<(), RepositoryError>;
    async fn list_for_request(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<ReviewRecord>, RepositoryError>;
}

/// Outcome of a stock reservation attempt. Unknown entry ids report as
/// `Insufficient { available: 0 }`; entries without a tracked counter are
/// `Untracked` and never block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StockReservation {
    Reserved { remaining: u32 },
    Insufficient { available: u32 },
    Untracked,
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find(
        &self,
        capability: Capability,
        id: &str,
    ) -> Result<Option<CatalogEntry>, RepositoryError>;
    async fn list(&self, capability: Capability) -> Result<Vec<CatalogEntry>, RepositoryError>;
    /// Check-and-decrement of the availability counter in one critical
    /// section, so concurrent submits cannot oversell an entry.
    async fn reserve(
        &self,
        capability: Capability,
        id: &str,
        quantity: u32,
    ) -> Result<StockReservation, RepositoryError>;
}

/// Group rosters the access fulfillment step mutates. Kept apart from the
/// catalog so reference data stays read-only.
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    async fn is_member(&self, group: &str, user: &str) -> Result<bool, RepositoryError>;
    async fn add_member(&self, group: &str, user: &str) -> Result<(), RepositoryError>;
    async fn members(&self, group: &str) -> Result<Vec<String>, RepositoryError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn find(&self, caller: &str) -> Result<Option<SessionContext>, RepositoryError>;
    async fn save(&self, session: SessionContext) -> Result<(), RepositoryError>;
    /// Removes sessions idle longer than `ttl` and returns the evicted
    /// caller identities.
    async fn evict_idle(
        &self,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Vec<String>, RepositoryError>;
}

#[async_trait]
pub trait ChecklistRepository: Send + Sync {
    async fn find_by_id(&self, id: &ChecklistId) -> Result<Option<Checklist>, RepositoryError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Checklist>, RepositoryError>;
    async fn save(&self, checklist: Checklist) -> Result<(), RepositoryError>;
    async fn list_active(
        &self,
        department: Option<&str>,
    ) -> Result<Vec<Checklist>, RepositoryError>;
}
