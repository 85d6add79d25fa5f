use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use concierge_core::domain::request::RequestId;
use concierge_core::domain::work_order::{ReviewId, ReviewRecord, WorkOrderId};
use concierge_core::domain::Capability;

use super::{RepositoryError, ReviewRepository};
use crate::DbPool;

pub struct SqlReviewRepository {
    pool: DbPool,
}

impl SqlReviewRepository {
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

fn row_to_review(row: &sqlx::sqlite::SqliteRow) -> Result<ReviewRecord, RepositoryError> {
    let id: String = decode(row.try_get("id"))?;
    let request_id: String = decode(row.try_get("request_id"))?;
    let work_order_id: String = decode(row.try_get("work_order_id"))?;
    let capability_str: String = decode(row.try_get("capability"))?;
    let subject: String = decode(row.try_get("subject"))?;
    let beneficiary: String = decode(row.try_get("beneficiary"))?;
    let review_at_str: String = decode(row.try_get("review_at"))?;
    let scheduled_at_str: String = decode(row.try_get("scheduled_at"))?;

    let capability = Capability::parse(&capability_str).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown capability `{capability_str}`"))
    })?;

    Ok(ReviewRecord {
        id: ReviewId(id),
        request_id: RequestId(request_id),
        work_order_id: WorkOrderId(work_order_id),
        capability,
        subject,
        beneficiary,
        review_at: parse_timestamp(&review_at_str)?,
        scheduled_at: parse_timestamp(&scheduled_at_str)?,
    })
}

#[async_trait]
impl ReviewRepository for SqlReviewRepository {
    async fn save(&self, review: ReviewRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO access_review (id, request_id, work_order_id, capability, subject, \
                                        beneficiary, review_at, scheduled_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET review_at = excluded.review_at",
        )
        .bind(&review.id.0)
        .bind(&review.request_id.0)
        .bind(&review.work_order_id.0)
        .bind(review.capability.as_str())
        .bind(&review.subject)
        .bind(&review.beneficiary)
        .bind(review.review_at.to_rfc3339())
        .bind(review.scheduled_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_request(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<ReviewRecord>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, request_id, work_order_id, capability, subject, beneficiary, \
                    review_at, scheduled_at
             FROM access_review WHERE request_id = ? ORDER BY review_at ASC",
        )
        .bind(&request_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_review).collect()
    }
}
