use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::lifecycle::LifecycleError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    CatalogEntry,
    Request,
    WorkOrder,
    Checklist,
    Session,
    Group,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CatalogEntry => "catalog entry",
            Self::Request => "request",
            Self::WorkOrder => "work order",
            Self::Checklist => "checklist",
            Self::Session => "session",
            Self::Group => "group",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The workflow failure taxonomy. Every operation returns one of these as a
/// typed result; nothing is swallowed or retried inside the engine.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("{kind} `{id}` not found")]
    NotFound { kind: EntityKind, id: String },
    #[error(transparent)]
    InvalidState(#[from] LifecycleError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("`{id}` expired at {expired_at}")]
    Expired { id: String, expired_at: DateTime<Utc> },
    #[error("an open request for `{subject}` on behalf of `{beneficiary}` already exists ({open_request})")]
    Conflict { subject: String, beneficiary: String, open_request: String },
}

impl DomainError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl From<LifecycleError> for ApplicationError {
    fn from(value: LifecycleError) -> Self {
        Self::Domain(DomainError::from(value))
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("gone: {message}")]
    Gone { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Gone { .. } => "This request has expired and can no longer be acted on.",
            Self::Conflict { .. } => {
                "An identical request is already open. Check its status instead."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Gone { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let unassigned = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(DomainError::Expired { .. }) => {
                Self::Gone { message: "deadline passed".to_owned(), correlation_id: unassigned }
            }
            ApplicationError::Domain(DomainError::Conflict { .. }) => Self::Conflict {
                message: "duplicate open request".to_owned(),
                correlation_id: unassigned,
            },
            ApplicationError::Domain(
                DomainError::NotFound { .. }
                | DomainError::InvalidState(_)
                | DomainError::Validation(_),
            ) => Self::BadRequest {
                message: "domain validation failed".to_owned(),
                correlation_id: unassigned,
            },
            ApplicationError::Persistence(message) | ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id: unassigned }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: unassigned }
            }
        }
    }
}
