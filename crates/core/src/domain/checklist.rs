use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::request::{short_token, RequestId};
use crate::domain::{Capability, ONBOARDING_SEQUENCE};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChecklistId(pub String);

impl ChecklistId {
    pub fn generate() -> Self {
        Self(format!("ONB-{}", short_token()))
    }
}

impl std::fmt::Display for ChecklistId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryState {
    Pending,
    InProgress,
    Completed,
    Blocked,
}

impl CategoryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Blocked => "blocked",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "blocked" => Some(Self::Blocked),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistStatus {
    Active,
    Completed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeProfile {
    pub name: String,
    pub email: String,
    pub department: String,
    pub job_title: String,
    pub start_date: NaiveDate,
    pub manager_email: Option<String>,
    pub buddy_email: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistCategory {
    pub capability: Capability,
    pub state: CategoryState,
    pub request_id: Option<RequestId>,
    pub note: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Composite onboarding record: one category per capability in the fixed
/// onboarding order. Progress is recomputed on every category update; the
/// checklist completes exactly when every category does, and `Blocked` is
/// only ever set by an explicit caller report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checklist {
    pub id: ChecklistId,
    pub profile: EmployeeProfile,
    pub categories: Vec<ChecklistCategory>,
    pub status: ChecklistStatus,
    pub progress_pct: u8,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Checklist {
    pub fn new(profile: EmployeeProfile, now: DateTime<Utc>) -> Self {
        let categories = ONBOARDING_SEQUENCE
            .iter()
            .map(|capability| ChecklistCategory {
                capability: *capability,
                state: CategoryState::Pending,
                request_id: None,
                note: None,
                updated_at: None,
            })
            .collect();

        Self {
            id: ChecklistId::generate(),
            profile,
            categories,
            status: ChecklistStatus::Active,
            progress_pct: 0,
            created_at: now,
            completed_at: None,
        }
    }

    pub fn category(&self, capability: Capability) -> Option<&ChecklistCategory> {
        self.categories.iter().find(|category| category.capability == capability)
    }

    /// Completed categories over total, in whole percent.
    pub fn progress(&self) -> u8 {
        let completed = self
            .categories
            .iter()
            .filter(|category| category.state == CategoryState::Completed)
            .count();
        ((completed * 100) / self.categories.len().max(1)) as u8
    }

    /// Applies a category update and recomputes progress. Returns whether the
    /// capability names a known category.
    pub fn update_category(
        &mut self,
        capability: Capability,
        state: CategoryState,
        request_id: Option<RequestId>,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(category) =
            self.categories.iter_mut().find(|category| category.capability == capability)
        else {
            return false;
        };

        category.state = state;
        category.updated_at = Some(now);
        if request_id.is_some() {
            category.request_id = request_id;
        }
        if note.is_some() {
            category.note = note;
        }

        self.progress_pct = self.progress();
        if self.progress_pct == 100 {
            self.status = ChecklistStatus::Completed;
            self.completed_at = Some(now);
        }

        true
    }

    pub fn categories_in_state(&self, state: CategoryState) -> Vec<Capability> {
        self.categories
            .iter()
            .filter(|category| category.state == state)
            .map(|category| category.capability)
            .collect()
    }
}
