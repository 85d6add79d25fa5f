use std::collections::HashMap;
use std::sync::Arc;

use concierge_core::domain::{Capability, ONBOARDING_SEQUENCE};
use concierge_core::errors::{ApplicationError, DomainError};

use crate::handlers::SpecialistHandler;
use crate::task::{TaskReport, TaskRequest};

/// Static capability-to-handler table. Routing is a lookup, never inference:
/// whatever natural-language interpretation produced the task happened
/// before it got here.
#[derive(Default)]
pub struct Router {
    handlers: HashMap<Capability, Arc<dyn SpecialistHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn SpecialistHandler>) {
        self.handlers.insert(handler.capability(), handler);
    }

    pub fn resolve(
        &self,
        capability: Capability,
    ) -> Result<Arc<dyn SpecialistHandler>, DomainError> {
        self.handlers.get(&capability).cloned().ok_or_else(|| {
            DomainError::Validation(format!("no handler registered for `{capability}`"))
        })
    }

    pub async fn dispatch_to(
        &self,
        capability: Capability,
        task: &TaskRequest,
    ) -> Result<TaskReport, ApplicationError> {
        let handler = self.resolve(capability)?;
        handler.handle(task).await
    }

    /// The fixed handler order a compound onboarding task walks.
    pub fn onboarding_sequence(&self) -> [Capability; 5] {
        ONBOARDING_SEQUENCE
    }

    pub fn registered(&self) -> Vec<Capability> {
        let mut capabilities: Vec<Capability> = self.handlers.keys().copied().collect();
        capabilities.sort_by_key(|capability| capability.as_str());
        capabilities
    }
}
