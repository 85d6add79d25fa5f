use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use concierge_core::domain::catalog::CatalogEntry;
use concierge_core::domain::checklist::{Checklist, ChecklistId, ChecklistStatus};
use concierge_core::domain::request::{Request, RequestId};
use concierge_core::domain::session::SessionContext;
use concierge_core::domain::work_order::{ReviewRecord, WorkOrder, WorkOrderId};
use concierge_core::domain::Capability;

use super::{
    CatalogRepository, ChecklistRepository, DirectoryRepository, RepositoryError, RequestFilter,
    RequestRepository, ReviewRepository, SessionRepository, StockReservation, WorkOrderRepository,
};

#[derive(Default)]
pub struct InMemoryRequestRepository {
    requests: RwLock<HashMap<String, Request>>,
}

#[async_trait]
impl RequestRepository for InMemoryRequestRepository {
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError> {
        let requests = self.requests.read().await;
        Ok(requests.get(&id.0).cloned())
    }

    async fn save(&self, request: Request) -> Result<(), RepositoryError> {
        let mut requests = self.requests.write().await;
        requests.insert(request.id.0.clone(), request);
        Ok(())
    }

    async fn list(&self, filter: &RequestFilter) -> Result<Vec<Request>, RepositoryError> {
        let requests = self.requests.read().await;
        let mut matching: Vec<Request> = requests
            .values()
            .filter(|request| {
                filter.capability.map(|c| request.capability == c).unwrap_or(true)
                    && filter
                        .requester
                        .as_deref()
                        .map(|requester| request.requester == requester)
                        .unwrap_or(true)
                    && filter.state.map(|state| request.state == state).unwrap_or(true)
            })
            .cloned()
            .collect();
        matching.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(matching)
    }

    async fn find_open(
        &self,
        capability: Capability,
        subject: &str,
        beneficiary: &str,
    ) -> Result<Option<Request>, RepositoryError> {
        let requests = self.requests.read().await;
        Ok(requests
            .values()
            .filter(|request| {
                request.capability == capability
                    && request.subject == subject
                    && request.beneficiary == beneficiary
                    && !request.state.is_terminal()
            })
            .max_by_key(|request| request.created_at)
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemoryWorkOrderRepository {
    orders: RwLock<HashMap<String, WorkOrder>>,
}

#[async_trait]
impl WorkOrderRepository for InMemoryWorkOrderRepository {
    async fn find_by_id(&self, id: &WorkOrderId) -> Result<Option<WorkOrder>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders.get(&id.0).cloned())
    }

    async fn save(&self, order: WorkOrder) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        orders.insert(order.id.0.clone(), order);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryReviewRepository {
    reviews: RwLock<Vec<ReviewRecord>>,
}

#[async_trait]
impl ReviewRepository for InMemoryReviewRepository {
    async fn save(&self, review: ReviewRecord) -> Result<(), RepositoryError> {
        let mut reviews = self.reviews.write().await;
        reviews.push(review);
        Ok(())
    }

    async fn list_for_request(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<ReviewRecord>, RepositoryError> {
        let reviews = self.reviews.read().await;
        Ok(reviews.iter().filter(|review| &review.request_id == request_id).cloned().collect())
    }
}

pub struct InMemoryCatalogRepository {
    entries: RwLock<HashMap<(Capability, String), CatalogEntry>>,
}

impl InMemoryCatalogRepository {
    pub fn with_entries(entries: Vec<CatalogEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|entry| ((entry.capability, entry.id.clone()), entry))
            .collect();
        Self { entries: RwLock::new(entries) }
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn find(
        &self,
        capability: Capability,
        id: &str,
    ) -> Result<Option<CatalogEntry>, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries.get(&(capability, id.to_string())).cloned())
    }

    async fn list(&self, capability: Capability) -> Result<Vec<CatalogEntry>, RepositoryError> {
        let entries = self.entries.read().await;
        let mut matching: Vec<CatalogEntry> = entries
            .values()
            .filter(|entry| entry.capability == capability)
            .cloned()
            .collect();
        matching.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(matching)
    }

    async fn reserve(
        &self,
        capability: Capability,
        id: &str,
        quantity: u32,
    ) -> Result<StockReservation, RepositoryError> {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(&(capability, id.to_string())) else {
            return Ok(StockReservation::Insufficient { available: 0 });
        };

        match entry.available {
            None => Ok(StockReservation::Untracked),
            Some(available) if available >= quantity => {
                let remaining = available - quantity;
                entry.available = Some(remaining);
                Ok(StockReservation::Reserved { remaining })
            }
            Some(available) => Ok(StockReservation::Insufficient { available }),
        }
    }
}

#[derive(Default)]
pub struct InMemoryDirectoryRepository {
    rosters: RwLock<HashMap<String, Vec<String>>>,
}

impl InMemoryDirectoryRepository {
    pub fn with_rosters(rosters: Vec<(String, Vec<String>)>) -> Self {
        Self { rosters: RwLock::new(rosters.into_iter().collect()) }
    }
}

#[async_trait]
impl DirectoryRepository for InMemoryDirectoryRepository {
    async fn is_member(&self, group: &str, user: &str) -> Result<bool, RepositoryError> {
        let rosters = self.rosters.read().await;
        Ok(rosters
            .get(group)
            .map(|members| members.iter().any(|member| member == user))
            .unwrap_or(false))
    }

    async fn add_member(&self, group: &str, user: &str) -> Result<(), RepositoryError> {
        let mut rosters = self.rosters.write().await;
        let members = rosters.entry(group.to_string()).or_default();
        if !members.iter().any(|member| member == user) {
            members.push(user.to_string());
        }
        Ok(())
    }

    async fn members(&self, group: &str) -> Result<Vec<String>, RepositoryError> {
        let rosters = self.rosters.read().await;
        Ok(rosters.get(group).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<String, SessionContext>>,
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn find(&self, caller: &str) -> Result<Option<SessionContext>, RepositoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(caller).cloned())
    }

    async fn save(&self, session: SessionContext) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.caller.clone(), session);
        Ok(())
    }

    async fn evict_idle(
        &self,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Vec<String>, RepositoryError> {
        let mut sessions = self.sessions.write().await;
        let idle: Vec<String> = sessions
            .values()
            .filter(|session| session.is_idle(now, ttl))
            .map(|session| session.caller.clone())
            .collect();
        for caller in &idle {
            sessions.remove(caller);
        }
        Ok(idle)
    }
}

#[derive(Default)]
pub struct InMemoryChecklistRepository {
    checklists: RwLock<HashMap<String, Checklist>>,
}

#[async_trait]
impl ChecklistRepository for InMemoryChecklistRepository {
    async fn find_by_id(&self, id: &ChecklistId) -> Result<Option<Checklist>, RepositoryError> {
        let checklists = self.checklists.read().await;
        Ok(checklists.get(&id.0).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Checklist>, RepositoryError> {
        let checklists = self.checklists.read().await;
        Ok(checklists.values().find(|checklist| checklist.profile.email == email).cloned())
    }

    async fn save(&self, checklist: Checklist) -> Result<(), RepositoryError> {
        let mut checklists = self.checklists.write().await;
        checklists.insert(checklist.id.0.clone(), checklist);
        Ok(())
    }

    async fn list_active(
        &self,
        department: Option<&str>,
    ) -> Result<Vec<Checklist>, RepositoryError> {
        let checklists = self.checklists.read().await;
        let mut active: Vec<Checklist> = checklists
            .values()
            .filter(|checklist| checklist.status == ChecklistStatus::Active)
            .filter(|checklist| {
                department
                    .map(|dept| checklist.profile.department.eq_ignore_ascii_case(dept))
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        active.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(active)
    }
}
