use std::sync::Arc;

use async_trait::async_trait;

use concierge_core::domain::work_order::WorkOrder;
use concierge_core::errors::ApplicationError;
use concierge_db::repositories::DirectoryRepository;

use crate::service::{Fulfillment, FulfillmentOutcome};

/// Groups every provisioned account lands in on day one.
const DEFAULT_GROUPS: [&str; 2] = ["all_employees", "new_hires"];

/// Identity fulfillment: activate the account and place it in the default
/// groups. A beneficiary already present in `all_employees` has an account
/// and reports as satisfied.
pub struct AccountProvisioningFulfillment {
    directory: Arc<dyn DirectoryRepository>,
}

impl AccountProvisioningFulfillment {
    pub fn new(directory: Arc<dyn DirectoryRepository>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Fulfillment for AccountProvisioningFulfillment {
    async fn fulfill(&self, order: &WorkOrder) -> Result<FulfillmentOutcome, ApplicationError> {
        let integration = |error: concierge_db::repositories::RepositoryError| {
            ApplicationError::Integration(error.to_string())
        };

        if self
            .directory
            .is_member(DEFAULT_GROUPS[0], &order.beneficiary)
            .await
            .map_err(integration)?
        {
            return Ok(FulfillmentOutcome::AlreadySatisfied {
                note: format!("{} already has a provisioned account", order.beneficiary),
            });
        }

        for group in DEFAULT_GROUPS {
            self.directory.add_member(group, &order.beneficiary).await.map_err(integration)?;
        }

        Ok(FulfillmentOutcome::Applied {
            note: Some(format!(
                "account provisioned for {} with default group membership",
                order.beneficiary
            )),
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

    use super::AccountProvisioningFulfillment;

    fn order(beneficiary: &str) -> WorkOrder {
        WorkOrder::materialize(
            RequestId("REQ-00000001".to_string()),
            Capability::Identity,
            "standard_account",
            beneficiary,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn provisioning_places_the_account_in_default_groups() {
        let directory = Arc::new(InMemoryDirectoryRepository::default());
        let fulfillment = AccountProvisioningFulfillment::new(directory.clone());

        let outcome =
            fulfillment.fulfill(&order("alex.johnson@company.com")).await.expect("fulfill");

        assert!(matches!(outcome, FulfillmentOutcome::Applied { .. }));
        for group in ["all_employees", "new_hires"] {
            assert!(directory
                .is_member(group, "alex.johnson@company.com")
                .await
                .expect("membership check"));
        }
    }

    #[tokio::test]
    async fn existing_account_is_reported_not_recreated() {
        let directory = Arc::new(InMemoryDirectoryRepository::with_rosters(vec![(
            "all_employees".to_string(),
            vec!["alex.johnson@company.com".to_string()],
        )]));
        let fulfillment = AccountProvisioningFulfillment::new(directory);

        let outcome =
            fulfillment.fulfill(&order("alex.johnson@company.com")).await.expect("fulfill");

        assert!(matches!(outcome, FulfillmentOutcome::AlreadySatisfied { .. }));
    }
}
