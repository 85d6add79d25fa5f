use async_trait::async_trait;

use concierge_core::domain::work_order::WorkOrder;
use concierge_core::errors::ApplicationError;

use crate::service::{Fulfillment, FulfillmentOutcome};

/// Equipment fulfillment: the unit was reserved at submission, so execution
/// stages it for delivery and hands the rest to the logistics collaborator.
#[derive(Clone, Debug, Default)]
pub struct EquipmentStagingFulfillment;

#[async_trait]
impl Fulfillment for EquipmentStagingFulfillment {
    async fn fulfill(&self, order: &WorkOrder) -> Result<FulfillmentOutcome, ApplicationError> {
        Ok(FulfillmentOutcome::Applied {
            note: Some(format!(
                "{} staged for delivery to {}",
                order.subject, order.beneficiary
            )),
        })
    }
}
