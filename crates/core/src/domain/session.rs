use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::request::RequestId;

/// Per-caller conversation state: which requests this identity has in flight
/// and when we last heard from them. Created on first orchestrated call,
/// touched on every call, removed only by the explicit idle sweep.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub caller: String,
    pub open_requests: Vec<RequestId>,
    pub started_at: DateTime<Utc>,
    pub last_touched: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(caller: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self { caller: caller.into(), open_requests: Vec::new(), started_at: now, last_touched: now }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_touched = now;
    }

    pub fn note_request(&mut self, id: RequestId) {
        if !self.open_requests.contains(&id) {
            self.open_requests.push(id);
        }
    }

    pub fn forget_request(&mut self, id: &RequestId) {
        self.open_requests.retain(|open| open != id);
    }

    pub fn is_idle(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.last_touched >= ttl
    }
}
