use std::sync::Arc;

use async_trait::async_trait;

use concierge_core::domain::work_order::WorkOrder;
use concierge_core::errors::ApplicationError;
use concierge_db::repositories::DirectoryRepository;

use crate::service::{Fulfillment, FulfillmentOutcome};

/// Access fulfillment: put the beneficiary on the requested group roster.
/// Re-running against an existing member is an informational no-op, so a
/// retried work order never duplicates membership.
pub struct GroupMembershipFulfillment {
    directory: Arc<dyn DirectoryRepository>,
}

impl GroupMembershipFulfillment {
    pub fn new(directory: Arc<dyn DirectoryRepository>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Fulfillment for GroupMembershipFulfillment {
    async fn fulfill(&self, order: &WorkOrder) -> Result<FulfillmentOutcome, ApplicationError> {
        let already_member = self
            .directory
            .is_member(&order.subject, &order.beneficiary)
            .await
            .map_err(|error| ApplicationError::Integration(error.to_string()))?;

        if already_member {
            return Ok(FulfillmentOutcome::AlreadySatisfied {
                note: format!("{} is already a member of {}", order.beneficiary, order.subject),
            });
        }

        self.directory
            .add_member(&order.subject, &order.beneficiary)
            .await
            .map_err(|error| ApplicationError::Integration(error.to_string()))?;

        Ok(FulfillmentOutcome::Applied {
            note: Some(format!("added {} to {}", order.beneficiary, order.subject)),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use concierge_core::domain::request::RequestId;
    use concierge_core::domain::work_order::WorkOrder;
    use concierge_core::domain::Capability;
    use concierge_db::repositories::{DirectoryRepository, InMemoryDirectoryRepository};

    use crate::service::{Fulfillment, FulfillmentOutcome};

    use super::GroupMembershipFulfillment;

    fn order(beneficiary: &str) -> WorkOrder {
        WorkOrder::materialize(
            RequestId("REQ-00000001".to_string()),
            Capability::Access,
            "finance_team",
            beneficiary,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn adds_missing_member_to_the_roster() {
        let directory = Arc::new(InMemoryDirectoryRepository::with_rosters(vec![(
            "finance_team".to_string(),
            vec!["alice@company.com".to_string()],
        )]));
        let fulfillment = GroupMembershipFulfillment::new(directory.clone());

        let outcome =
            fulfillment.fulfill(&order("john.new@company.com")).await.expect("fulfill");

        assert!(matches!(outcome, FulfillmentOutcome::Applied { .. }));
        assert!(directory
            .is_member("finance_team", "john.new@company.com")
            .await
            .expect("membership check"));
    }

    #[tokio::test]
    async fn existing_member_reports_already_satisfied() {
        let directory = Arc::new(InMemoryDirectoryRepository::with_rosters(vec![(
            "finance_team".to_string(),
            vec!["alice@company.com".to_string()],
        )]));
        let fulfillment = GroupMembershipFulfillment::new(directory.clone());

        let outcome =
            fulfillment.fulfill(&order("alice@company.com")).await.expect("fulfill");

        assert!(matches!(outcome, FulfillmentOutcome::AlreadySatisfied { .. }));
        let members = directory.members("finance_team").await.expect("members");
        assert_eq!(members.len(), 1);
    }
}
