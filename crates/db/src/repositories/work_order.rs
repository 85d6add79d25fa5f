use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use concierge_core::domain::request::RequestId;
use concierge_core::domain::work_order::{
    CompletionStatus, WorkOrder, WorkOrderId, WorkOrderStatus,
};
use concierge_core::domain::Capability;

use super::{RepositoryError, WorkOrderRepository};
use crate::DbPool;

pub struct SqlWorkOrderRepository {
    pool: DbPool,
}

impl SqlWorkOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode<T>(value: Result<T, sqlx::Error>) -> Result<T, RepositoryError> {
    value.map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("bad timestamp `{raw}`: {e}")))
}

fn row_to_work_order(row: &sqlx::sqlite::SqliteRow) -> Result<WorkOrder, RepositoryError> {
    let id: String = decode(row.try_get("id"))?;
    let request_id: String = decode(row.try_get("request_id"))?;
    let capability_str: String = decode(row.try_get("capability"))?;
    let subject: String = decode(row.try_get("subject"))?;
    let beneficiary: String = decode(row.try_get("beneficiary"))?;
    let status_str: String = decode(row.try_get("status"))?;
    let completion_str: Option<String> = decode(row.try_get("completion"))?;
    let notes: Option<String> = decode(row.try_get("notes"))?;
    let created_at_str: String = decode(row.try_get("created_at"))?;
    let closed_at_str: Option<String> = decode(row.try_get("closed_at"))?;

    let capability = Capability::parse(&capability_str).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown capability `{capability_str}`"))
    })?;
    let status = WorkOrderStatus::parse(&status_str).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown work order status `{status_str}`"))
    })?;
    let completion = completion_str
        .as_deref()
        .map(|raw| {
            CompletionStatus::parse(raw).ok_or_else(|| {
                RepositoryError::Decode(format!("unknown completion status `{raw}`"))
            })
        })
        .transpose()?;

    Ok(WorkOrder {
        id: WorkOrderId(id),
        request_id: RequestId(request_id),
        capability,
        subject,
        beneficiary,
        status,
        completion,
        notes,
        created_at: parse_timestamp(&created_at_str)?,
        closed_at: closed_at_str.as_deref().map(parse_timestamp).transpose()?,
    })
}

#[async_trait]
impl WorkOrderRepository for SqlWorkOrderRepository {
    async fn find_by_id(&self, id: &WorkOrderId) -> Result<Option<WorkOrder>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, request_id, capability, subject, beneficiary, status, completion, \
                    notes, created_at, closed_at
             FROM work_order WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_work_order(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, order: WorkOrder) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO work_order (id, request_id, capability, subject, beneficiary, status, \
                                     completion, notes, created_at, closed_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 status = excluded.status,
                 completion = excluded.completion,
                 notes = excluded.notes,
                 closed_at = excluded.closed_at",
        )
        .bind(&order.id.0)
        .bind(&order.request_id.0)
        .bind(order.capability.as_str())
        .bind(&order.subject)
        .bind(&order.beneficiary)
        .bind(order.status.as_str())
        .bind(order.completion.map(|completion| completion.as_str()))
        .bind(&order.notes)
        .bind(order.created_at.to_rfc3339())
        .bind(order.closed_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use concierge_core::domain::catalog::Sensitivity;
    use concierge_core::domain::request::{Request, RequestId, RequestState};
    use concierge_core::domain::work_order::{
        CompletionStatus, WorkOrder, WorkOrderId, WorkOrderStatus,
    };
    use concierge_core::domain::Capability;

    use super::SqlWorkOrderRepository;
    use crate::repositories::{RequestRepository, SqlRequestRepository, WorkOrderRepository};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    /// Insert the parent request so the FK constraint is satisfied.
    async fn insert_request(pool: &sqlx::SqlitePool, request_id: &str) {
        let repo = SqlRequestRepository::new(pool.clone());
        repo.save(Request {
            id: RequestId(request_id.to_string()),
            capability: Capability::Access,
            subject: "marketing_team".to_string(),
            requester: "manager@company.com".to_string(),
            beneficiary: "alex.johnson@company.com".to_string(),
            state: RequestState::AutoApproved,
            sensitivity: Sensitivity::Low,
            justification: None,
            approvals: Vec::new(),
            work_order_id: None,
            state_note: None,
            created_at: Utc::now(),
            expires_at: None,
            closed_at: None,
        })
        .await
        .expect("insert parent request");
    }

    #[tokio::test]
    async fn save_and_find_round_trip() {
        let pool = setup().await;
        insert_request(&pool, "REQ-00000001").await;

        let repo = SqlWorkOrderRepository::new(pool);
        let order = WorkOrder::materialize(
            RequestId("REQ-00000001".to_string()),
            Capability::Access,
            "marketing_team",
            "alex.johnson@company.com",
            Utc::now(),
        );

        repo.save(order.clone()).await.expect("save");
        let found =
            repo.find_by_id(&order.id).await.expect("find").expect("should exist");

        assert_eq!(found.request_id.0, "REQ-00000001");
        assert_eq!(found.status, WorkOrderStatus::Ready);
        assert!(found.completion.is_none());
    }

    #[tokio::test]
    async fn completion_fields_survive_upsert() {
        let pool = setup().await;
        insert_request(&pool, "REQ-00000001").await;

        let repo = SqlWorkOrderRepository::new(pool);
        let mut order = WorkOrder::materialize(
            RequestId("REQ-00000001".to_string()),
            Capability::Access,
            "marketing_team",
            "alex.johnson@company.com",
            Utc::now(),
        );
        repo.save(order.clone()).await.expect("save ready");

        order.status = WorkOrderStatus::Closed;
        order.completion = Some(CompletionStatus::Success);
        order.notes = Some("membership granted".to_string());
        order.closed_at = Some(Utc::now());
        repo.save(order.clone()).await.expect("save closed");

        let found =
            repo.find_by_id(&order.id).await.expect("find").expect("should exist");
        assert_eq!(found.status, WorkOrderStatus::Closed);
        assert_eq!(found.completion, Some(CompletionStatus::Success));
        assert_eq!(found.notes.as_deref(), Some("membership granted"));
    }

    #[tokio::test]
    async fn missing_work_order_is_none() {
        let pool = setup().await;
        let repo = SqlWorkOrderRepository::new(pool);

        let found =
            repo.find_by_id(&WorkOrderId("WO-MISSING1".to_string())).await.expect("find");
        assert!(found.is_none());
    }
}
