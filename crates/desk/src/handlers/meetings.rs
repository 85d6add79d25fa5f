use async_trait::async_trait;

use concierge_core::domain::work_order::WorkOrder;
use concierge_core::errors::ApplicationError;

use crate::service::{Fulfillment, FulfillmentOutcome};

/// Meetings fulfillment: send the calendar invitations for the requested
/// meeting template. The calendar service itself is an external
/// collaborator; this engine only records the booking outcome.
#[derive(Clone, Debug, Default)]
pub struct MeetingSchedulingFulfillment;

#[async_trait]
impl Fulfillment for MeetingSchedulingFulfillment {
    async fn fulfill(&self, order: &WorkOrder) -> Result<FulfillmentOutcome, ApplicationError> {
        Ok(FulfillmentOutcome::Applied {
            note: Some(format!(
                "invitations sent for {} on behalf of {}",
                order.subject, order.beneficiary
            )),
        })
    }
}
