use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use concierge_core::domain::catalog::Sensitivity;
use concierge_core::domain::request::{ApprovalSignoff, Request, RequestId, RequestState};
use concierge_core::domain::work_order::WorkOrderId;
use concierge_core::domain::Capability;

use super::{RepositoryError, RequestFilter, RequestRepository};
use crate::DbPool;

pub struct SqlRequestRepository {
    pool: DbPool,
}

impl SqlRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "SELECT id, capability, subject, requester, beneficiary, state, \
                              sensitivity, justification, approvals_json, work_order_id, \
                              state_note, created_at, expires_at, closed_at FROM request";

fn decode<T>(value: Result<T, sqlx::Error>) -> Result<T, RepositoryError> {
    value.map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("bad timestamp `{raw}`: {e}")))
}

fn row_to_request(row: &sqlx::sqlite::SqliteRow) -> Result<Request, RepositoryError> {
    let id: String = decode(row.try_get("id"))?;
    let capability_str: String = decode(row.try_get("capability"))?;
    let subject: String = decode(row.try_get("subject"))?;
    let requester: String = decode(row.try_get("requester"))?;
    let beneficiary: String = decode(row.try_get("beneficiary"))?;
    let state_str: String = decode(row.try_get("state"))?;
    let sensitivity_str: String = decode(row.try_get("sensitivity"))?;
    let justification: Option<String> = decode(row.try_get("justification"))?;
    let approvals_json: String = decode(row.try_get("approvals_json"))?;
    let work_order_id: Option<String> = decode(row.try_get("work_order_id"))?;
    let state_note: Option<String> = decode(row.try_get("state_note"))?;
    let created_at_str: String = decode(row.try_get("created_at"))?;
    let expires_at_str: Option<String> = decode(row.try_get("expires_at"))?;
    let closed_at_str: Option<String> = decode(row.try_get("closed_at"))?;

    let capability = Capability::parse(&capability_str).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown capability `{capability_str}`"))
    })?;
    let state = RequestState::parse(&state_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown request state `{state_str}`")))?;
    let sensitivity = Sensitivity::parse(&sensitivity_str).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown sensitivity `{sensitivity_str}`"))
    })?;
    let approvals: Vec<ApprovalSignoff> = serde_json::from_str(&approvals_json)
        .map_err(|e| RepositoryError::Decode(format!("bad approvals payload: {e}")))?;

    let created_at = parse_timestamp(&created_at_str)?;
    let expires_at = expires_at_str.as_deref().map(parse_timestamp).transpose()?;
    let closed_at = closed_at_str.as_deref().map(parse_timestamp).transpose()?;

    Ok(Request {
        id: RequestId(id),
        capability,
        subject,
        requester,
        beneficiary,
        state,
        sensitivity,
        justification,
        approvals,
        work_order_id: work_order_id.map(WorkOrderId),
        state_note,
        created_at,
        expires_at,
        closed_at,
    })
}

#[async_trait]
impl RequestRepository for SqlRequestRepository {
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_request(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, request: Request) -> Result<(), RepositoryError> {
        let approvals_json = serde_json::to_string(&request.approvals)
            .map_err(|e| RepositoryError::Decode(format!("bad approvals payload: {e}")))?;

        sqlx::query(
            "INSERT INTO request (id, capability, subject, requester, beneficiary, state, \
                                  sensitivity, justification, approvals_json, work_order_id, \
                                  state_note, created_at, expires_at, closed_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 state = excluded.state,
                 justification = excluded.justification,
                 approvals_json = excluded.approvals_json,
                 work_order_id = excluded.work_order_id,
                 state_note = excluded.state_note,
                 expires_at = excluded.expires_at,
                 closed_at = excluded.closed_at",
        )
        .bind(&request.id.0)
        .bind(request.capability.as_str())
        .bind(&request.subject)
        .bind(&request.requester)
        .bind(&request.beneficiary)
        .bind(request.state.as_str())
        .bind(request.sensitivity.as_str())
        .bind(&request.justification)
        .bind(&approvals_json)
        .bind(request.work_order_id.as_ref().map(|id| id.0.clone()))
        .bind(&request.state_note)
        .bind(request.created_at.to_rfc3339())
        .bind(request.expires_at.map(|dt| dt.to_rfc3339()))
        .bind(request.closed_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, filter: &RequestFilter) -> Result<Vec<Request>, RepositoryError> {
        let mut sql = format!("{SELECT_COLUMNS} WHERE 1 = 1");
        if filter.capability.is_some() {
            sql.push_str(" AND capability = ?");
        }
        if filter.requester.is_some() {
            sql.push_str(" AND requester = ?");
        }
        if filter.state.is_some() {
            sql.push_str(" AND state = ?");
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut query = sqlx::query(&sql);
        if let Some(capability) = filter.capability {
            query = query.bind(capability.as_str());
        }
        if let Some(requester) = &filter.requester {
            query = query.bind(requester.clone());
        }
        if let Some(state) = filter.state {
            query = query.bind(state.as_str());
        }

        let rows: Vec<sqlx::sqlite::SqliteRow> = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_request).collect()
    }

    async fn find_open(
        &self,
        capability: Capability,
        subject: &str,
        beneficiary: &str,
    ) -> Result<Option<Request>, RepositoryError> {
        let row = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE capability = ? AND subject = ? AND beneficiary = ? \
             AND state NOT IN ('closed', 'rejected', 'expired') \
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(capability.as_str())
        .bind(subject)
        .bind(beneficiary)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_request(r)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use concierge_core::domain::catalog::Sensitivity;
    use concierge_core::domain::request::{Request, RequestId, RequestState};
    use concierge_core::domain::Capability;

    use super::SqlRequestRepository;
    use crate::repositories::{RequestFilter, RequestRepository};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn sample_request(id: &str, state: RequestState) -> Request {
        Request {
            id: RequestId(id.to_string()),
            capability: Capability::Access,
            subject: "finance_team".to_string(),
            requester: "manager@company.com".to_string(),
            beneficiary: "alex.johnson@company.com".to_string(),
            state,
            sensitivity: Sensitivity::High,
            justification: Some("quarterly reporting".to_string()),
            approvals: Vec::new(),
            work_order_id: None,
            state_note: None,
            created_at: Utc::now(),
            expires_at: Some(Utc::now() + chrono::Duration::days(90)),
            closed_at: None,
        }
    }

    #[tokio::test]
    async fn save_and_find_by_id() {
        let pool = setup().await;
        let repo = SqlRequestRepository::new(pool);
        let request = sample_request("REQ-00000001", RequestState::PendingApproval);

        repo.save(request.clone()).await.expect("save");
        let found = repo
            .find_by_id(&RequestId("REQ-00000001".to_string()))
            .await
            .expect("find")
            .expect("should exist");

        assert_eq!(found.id, request.id);
        assert_eq!(found.state, RequestState::PendingApproval);
        assert_eq!(found.sensitivity, Sensitivity::High);
        assert_eq!(found.expires_at.is_some(), true);
    }

    #[tokio::test]
    async fn save_upserts_on_conflict() {
        let pool = setup().await;
        let repo = SqlRequestRepository::new(pool);

        let request = sample_request("REQ-00000001", RequestState::PendingApproval);
        repo.save(request.clone()).await.expect("save");

        let mut updated = request;
        updated.state = RequestState::Rejected;
        updated.state_note = Some("declined by security".to_string());
        repo.save(updated).await.expect("upsert");

        let found = repo
            .find_by_id(&RequestId("REQ-00000001".to_string()))
            .await
            .expect("find")
            .expect("should exist");
        assert_eq!(found.state, RequestState::Rejected);
        assert_eq!(found.state_note.as_deref(), Some("declined by security"));
    }

    #[tokio::test]
    async fn list_filters_by_requester_and_state() {
        let pool = setup().await;
        let repo = SqlRequestRepository::new(pool);

        repo.save(sample_request("REQ-00000001", RequestState::PendingApproval))
            .await
            .expect("save 1");

        let mut other = sample_request("REQ-00000002", RequestState::Closed);
        other.requester = "someone.else@company.com".to_string();
        repo.save(other).await.expect("save 2");

        let by_requester = repo
            .list(&RequestFilter {
                requester: Some("manager@company.com".to_string()),
                ..RequestFilter::default()
            })
            .await
            .expect("list by requester");
        assert_eq!(by_requester.len(), 1);
        assert_eq!(by_requester[0].id.0, "REQ-00000001");

        let closed = repo
            .list(&RequestFilter { state: Some(RequestState::Closed), ..RequestFilter::default() })
            .await
            .expect("list closed");
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].id.0, "REQ-00000002");
    }

    #[tokio::test]
    async fn find_open_ignores_terminal_requests() {
        let pool = setup().await;
        let repo = SqlRequestRepository::new(pool);

        repo.save(sample_request("REQ-00000001", RequestState::Rejected)).await.expect("save 1");

        let open = repo
            .find_open(Capability::Access, "finance_team", "alex.johnson@company.com")
            .await
            .expect("find open");
        assert!(open.is_none());

        repo.save(sample_request("REQ-00000002", RequestState::PendingApproval))
            .await
            .expect("save 2");

        let open = repo
            .find_open(Capability::Access, "finance_team", "alex.johnson@company.com")
            .await
            .expect("find open")
            .expect("should find pending request");
        assert_eq!(open.id.0, "REQ-00000002");
    }
}
