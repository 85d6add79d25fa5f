use async_trait::async_trait;

use concierge_core::domain::work_order::WorkOrder;
use concierge_core::errors::ApplicationError;

use crate::service::{Fulfillment, FulfillmentOutcome};

/// HR orientation fulfillment: reserve the orientation seat. Policy-text
/// questions are answered by an external document-search collaborator, not
/// here.
#[derive(Clone, Debug, Default)]
pub struct OrientationBookingFulfillment;

#[async_trait]
impl Fulfillment for OrientationBookingFulfillment {
    async fn fulfill(&self, order: &WorkOrder) -> Result<FulfillmentOutcome, ApplicationError> {
        Ok(FulfillmentOutcome::Applied {
            note: Some(format!("{} booked into {}", order.beneficiary, order.subject)),
        })
    }
}
